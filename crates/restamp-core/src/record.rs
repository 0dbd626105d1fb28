use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, TimeDelta};
use exif::{Field, Value};
use tracing::debug;

use crate::container::{self, resolve_field_name, ExifContainer, FieldPolicy};
use crate::date::{self, DateComponents, DateField, DateValue};
use crate::error::{PersistenceError, RestampError, Result};
use crate::writer;

/// Extensions whose container carries date fields.
pub const EMBEDDED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "bmp"];
/// Extensions accepted into a batch with filesystem time only.
pub const FILESYSTEM_ONLY_EXTENSIONS: &[&str] = &["png"];

pub fn is_supported_extension(ext: &str) -> bool {
    EMBEDDED_EXTENSIONS.contains(&ext) || FILESYSTEM_ONLY_EXTENSIONS.contains(&ext)
}

/// Lowercased extension without the dot; empty when the name has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// One image in a batch: its validated date fields, the decoded container
/// and, once the coordinator has run, the timestamp it will be saved with.
#[derive(Debug)]
pub struct MetadataRecord {
    path: PathBuf,
    supports_embedded_timestamp: bool,
    container: Option<ExifContainer>,
    date_fields: BTreeMap<DateField, DateValue>,
    assigned_timestamp: Option<NaiveDateTime>,
}

impl MetadataRecord {
    /// Load and validate `path`. `ext` is the lowercased extension.
    pub fn load(path: &Path, ext: &str, policy: &FieldPolicy) -> Result<Self> {
        if !path.is_file() {
            return Err(RestampError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        let container = if EMBEDDED_EXTENSIONS.contains(&ext) {
            Some(container::decode(path).map_err(|source| RestampError::Decode {
                path: path.to_path_buf(),
                source,
            })?)
        } else {
            None
        };
        Self::from_container(path, ext, container, policy)
    }

    /// Validate an already decoded container. `None` is only meaningful for
    /// filesystem-only extensions.
    pub fn from_container(
        path: &Path,
        ext: &str,
        container: Option<ExifContainer>,
        policy: &FieldPolicy,
    ) -> Result<Self> {
        let supports_embedded_timestamp = EMBEDDED_EXTENSIONS.contains(&ext);
        let container = if supports_embedded_timestamp {
            Some(container.unwrap_or_default())
        } else {
            None
        };

        let mut date_fields = BTreeMap::new();
        let mut unknown = Vec::new();

        if let Some(container) = &container {
            for (group, fields) in container.groups() {
                for field in fields {
                    let name = resolve_field_name(group, field.tag);
                    if policy.is_ignored(&name) {
                        debug!(path = %path.display(), field = %name, "ignoring field");
                        continue;
                    }
                    match DateField::from_name(&name) {
                        Some(date_field) => {
                            if date_fields.contains_key(&date_field) {
                                return Err(RestampError::DuplicateField {
                                    path: path.to_path_buf(),
                                    field: date_field.to_string(),
                                });
                            }
                            let value = parse_date_field(path, date_field, field)?;
                            date_fields.insert(date_field, value);
                        }
                        None => unknown.push((name.into_owned(), field.display_value().to_string())),
                    }
                }
            }
        }

        if !unknown.is_empty() {
            return Err(RestampError::UnrecognizedFields {
                path: path.to_path_buf(),
                fields: unknown,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            supports_embedded_timestamp,
            container,
            date_fields,
            assigned_timestamp: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn supports_embedded_timestamp(&self) -> bool {
        self.supports_embedded_timestamp
    }

    pub fn date_field(&self, field: DateField) -> Option<&DateValue> {
        self.date_fields.get(&field)
    }

    /// `DateTimeOriginal`, then `DateTimeDigitized`, then `DateTime`.
    pub fn origin_timestamp(&self) -> Option<(DateField, &DateValue)> {
        DateField::PRECEDENCE
            .iter()
            .find_map(|f| self.date_fields.get(f).map(|v| (*f, v)))
    }

    pub fn assigned_timestamp(&self) -> Option<NaiveDateTime> {
        self.assigned_timestamp
    }

    /// Set the timestamp to `reference + index` seconds. Allowed once.
    pub fn assign_timestamp(&mut self, reference: NaiveDateTime, index: usize) -> Result<()> {
        if self.assigned_timestamp.is_some() {
            return Err(RestampError::AlreadyAssigned {
                path: self.path.clone(),
            });
        }
        let assigned = i64::try_from(index)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|offset| reference.checked_add_signed(offset))
            .ok_or_else(|| RestampError::TimestampOverflow {
                path: self.path.clone(),
            })?;
        self.assigned_timestamp = Some(assigned);
        Ok(())
    }

    /// Write the assigned timestamp into the embedded field (when the format
    /// has one) and into the file's access and modification times.
    pub fn save(&mut self) -> Result<()> {
        let Some(assigned) = self.assigned_timestamp else {
            return Err(RestampError::NotAssigned {
                path: self.path.clone(),
            });
        };
        self.persist(assigned).map_err(|source| RestampError::Persistence {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, assigned: NaiveDateTime) -> std::result::Result<(), PersistenceError> {
        if let Some(container) = &self.container {
            writer::write_embedded(container, &self.path, &assigned)?;
        }
        writer::set_file_times(&self.path, &assigned)
    }
}

fn parse_date_field(path: &Path, field: DateField, raw: &Field) -> Result<DateValue> {
    let malformed = |value: String| RestampError::MalformedTimestamp {
        path: path.to_path_buf(),
        field: field.to_string(),
        value,
    };
    let text = match &raw.value {
        Value::Ascii(parts) if parts.len() == 1 => std::str::from_utf8(&parts[0])
            .map_err(|_| malformed(String::from_utf8_lossy(&parts[0]).into_owned()))?,
        _ => return Err(malformed(raw.display_value().to_string())),
    };
    let components: DateComponents =
        date::parse_exif_datetime(text).ok_or_else(|| malformed(text.to_string()))?;
    Ok(DateValue {
        field_id: raw.tag.number(),
        literal: text.to_string(),
        components,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::fixtures::{ascii, write_jpeg};
    use chrono::NaiveDate;
    use exif::{In, Tag};
    use filetime::FileTime;
    use std::fs;
    use tempfile::tempdir;

    fn record(fields: Vec<Field>) -> Result<MetadataRecord> {
        MetadataRecord::from_container(
            Path::new("a.jpg"),
            "jpg",
            Some(ExifContainer::from_fields(fields)),
            &FieldPolicy::default(),
        )
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_no_date_fields_has_no_origin() {
        let r = record(vec![ascii(Tag::Make, "Canon")]).unwrap();
        assert!(r.origin_timestamp().is_none());
    }

    #[test]
    fn test_original_beats_datetime() {
        let r = record(vec![
            ascii(Tag::DateTime, "2019:01:01 00:00:00"),
            ascii(Tag::DateTimeOriginal, "2017:03:21 10:15:30"),
        ])
        .unwrap();
        let (field, value) = r.origin_timestamp().unwrap();
        assert_eq!(field, DateField::DateTimeOriginal);
        assert_eq!(value.literal, "2017:03:21 10:15:30");
        assert_eq!(value.field_id, 36867);
        assert_eq!(value.components.year, 2017);
        assert_eq!(value.components.second, 30);
    }

    #[test]
    fn test_digitized_beats_datetime() {
        let r = record(vec![
            ascii(Tag::DateTime, "2019:01:01 00:00:00"),
            ascii(Tag::DateTimeDigitized, "2018:01:01 00:00:00"),
        ])
        .unwrap();
        assert_eq!(r.origin_timestamp().unwrap().0, DateField::DateTimeDigitized);
    }

    #[test]
    fn test_wrong_separator_is_malformed() {
        let err = record(vec![ascii(Tag::DateTimeOriginal, "2017-03-21 10:15:30")]).unwrap_err();
        match err {
            RestampError::MalformedTimestamp { field, value, .. } => {
                assert_eq!(field, "DateTimeOriginal");
                assert_eq!(value, "2017-03-21 10:15:30");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_text_date_is_malformed() {
        let field = Field {
            tag: Tag::DateTime,
            ifd_num: In::PRIMARY,
            value: Value::Long(vec![42]),
        };
        assert!(matches!(
            record(vec![field]),
            Err(RestampError::MalformedTimestamp { .. })
        ));
    }

    #[test]
    fn test_unlisted_field_is_rejected() {
        let err = record(vec![
            ascii(Tag::LensModel, "XF23mmF2 R WR"),
            ascii(Tag::Artist, "someone"),
            ascii(Tag::Make, "Fujifilm"),
        ])
        .unwrap_err();
        match err {
            RestampError::UnrecognizedFields { fields, .. } => {
                let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
                assert!(names.contains(&"LensModel"));
                assert!(names.contains(&"Artist"));
                assert!(!names.contains(&"Make"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extra_ignored_field_is_accepted() {
        let r = MetadataRecord::from_container(
            Path::new("a.jpg"),
            "jpg",
            Some(ExifContainer::from_fields(vec![ascii(Tag::LensModel, "XF23mmF2 R WR")])),
            &FieldPolicy::with_extra_ignored(["LensModel"]),
        );
        assert!(r.is_ok());
    }

    #[test]
    fn test_duplicate_date_field_is_fatal() {
        let err = record(vec![
            ascii(Tag::DateTimeOriginal, "2017:03:21 10:15:30"),
            ascii(Tag::DateTimeOriginal, "2017:03:21 10:15:31"),
        ])
        .unwrap_err();
        assert!(matches!(err, RestampError::DuplicateField { .. }));
    }

    #[test]
    fn test_duplicate_is_reported_before_its_value_is_parsed() {
        let err = record(vec![
            ascii(Tag::DateTime, "2017:03:21 10:15:30"),
            ascii(Tag::DateTime, "not a date"),
        ])
        .unwrap_err();
        match err {
            RestampError::DuplicateField { field, .. } => assert_eq!(field, "DateTime"),
            other => panic!("unexpected error: {other}"),
        }
    }

    fn thumbnail_ifd(tag: Tag, text: &str) -> Field {
        Field {
            tag,
            ifd_num: In::THUMBNAIL,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        }
    }

    #[test]
    fn test_thumbnail_ifd_fields_are_validated() {
        let err = record(vec![thumbnail_ifd(Tag::LensModel, "XF23mmF2 R WR")]).unwrap_err();
        match err {
            RestampError::UnrecognizedFields { fields, .. } => {
                assert_eq!(fields[0].0, "LensModel");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_thumbnail_ifd_layout_fields_are_ignored() {
        let layout = Field {
            tag: Tag::JPEGInterchangeFormatLength,
            ifd_num: In::THUMBNAIL,
            value: Value::Long(vec![1024]),
        };
        let r = record(vec![ascii(Tag::Make, "Canon"), layout]).unwrap();
        assert!(r.origin_timestamp().is_none());
    }

    #[test]
    fn test_thumbnail_ifd_datetime_counts_as_duplicate() {
        let err = record(vec![
            ascii(Tag::DateTime, "2017:03:21 10:15:30"),
            thumbnail_ifd(Tag::DateTime, "2017:03:21 10:15:30"),
        ])
        .unwrap_err();
        assert!(matches!(err, RestampError::DuplicateField { .. }));
    }

    #[test]
    fn test_thumbnail_ifd_date_is_checked() {
        let err = record(vec![thumbnail_ifd(Tag::DateTime, "yesterday")]).unwrap_err();
        assert!(matches!(err, RestampError::MalformedTimestamp { .. }));
    }

    #[test]
    fn test_png_has_no_embedded_support() {
        let r = MetadataRecord::from_container(
            Path::new("a.png"),
            "png",
            None,
            &FieldPolicy::default(),
        )
        .unwrap();
        assert!(!r.supports_embedded_timestamp());
        assert!(r.origin_timestamp().is_none());
    }

    #[test]
    fn test_assign_offsets_and_only_once() {
        let mut r = record(vec![]).unwrap();
        assert!(r.assigned_timestamp().is_none());
        r.assign_timestamp(at(2020, 12, 31, 23, 59, 58), 3).unwrap();
        assert_eq!(r.assigned_timestamp(), Some(at(2021, 1, 1, 0, 0, 1)));
        assert!(matches!(
            r.assign_timestamp(at(2020, 1, 1, 0, 0, 0), 0),
            Err(RestampError::AlreadyAssigned { .. })
        ));
    }

    #[test]
    fn test_save_requires_assignment() {
        let mut r = record(vec![]).unwrap();
        assert!(matches!(r.save(), Err(RestampError::NotAssigned { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = MetadataRecord::load(&dir.path().join("gone.jpg"), "jpg", &FieldPolicy::default())
            .unwrap_err();
        assert!(matches!(err, RestampError::NotAFile { .. }));
        let err = MetadataRecord::load(dir.path(), "jpg", &FieldPolicy::default()).unwrap_err();
        assert!(matches!(err, RestampError::NotAFile { .. }));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IMG_0001.jpg");
        write_jpeg(
            &path,
            vec![
                ascii(Tag::DateTime, "2001:02:03 04:05:06"),
                ascii(Tag::DateTimeOriginal, "2001:02:03 04:05:06"),
            ],
        );

        let mut r = MetadataRecord::load(&path, "jpg", &FieldPolicy::default()).unwrap();
        let target = NaiveDate::from_ymd_opt(2022, 7, 14)
            .unwrap()
            .and_hms_milli_opt(9, 30, 15, 750)
            .unwrap();
        r.assign_timestamp(target, 0).unwrap();
        r.save().unwrap();

        let reloaded = MetadataRecord::load(&path, "jpg", &FieldPolicy::default()).unwrap();
        let (field, value) = reloaded.origin_timestamp().unwrap();
        assert_eq!(field, DateField::DateTimeOriginal);
        assert_eq!(value.literal, "2022:07:14 09:30:15");
        assert_eq!(value.components, DateComponents::from_datetime(&at(2022, 7, 14, 9, 30, 15)));
        // Only the original capture time is rewritten.
        assert_eq!(
            reloaded.date_field(DateField::DateTime).unwrap().literal,
            "2001:02:03 04:05:06"
        );

        let meta = fs::metadata(&path).unwrap();
        let mtime = FileTime::from_last_modification_time(&meta);
        assert_eq!(mtime.unix_seconds(), writer::local_epoch_seconds(&target).unwrap());
    }

    #[test]
    fn test_save_adds_field_to_bare_jpeg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bare.jpeg");
        write_jpeg(&path, vec![]);

        let mut r = MetadataRecord::load(&path, "jpeg", &FieldPolicy::default()).unwrap();
        assert!(r.origin_timestamp().is_none());
        r.assign_timestamp(at(2020, 1, 1, 0, 0, 0), 2).unwrap();
        r.save().unwrap();

        let reloaded = MetadataRecord::load(&path, "jpeg", &FieldPolicy::default()).unwrap();
        assert_eq!(reloaded.origin_timestamp().unwrap().1.literal, "2020:01:01 00:00:02");
    }

    #[test]
    fn test_save_png_touches_only_file_times() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shot.png");
        fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();

        let mut r = MetadataRecord::load(&path, "png", &FieldPolicy::default()).unwrap();
        let target = at(2015, 5, 5, 5, 5, 5);
        r.assign_timestamp(target, 0).unwrap();
        r.save().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"\x89PNG\r\n\x1a\n");
        let meta = fs::metadata(&path).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&meta).unix_seconds(),
            writer::local_epoch_seconds(&target).unwrap()
        );
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(extension_of(Path::new("a/B.JPG")), "jpg");
        assert_eq!(extension_of(Path::new("README")), "");
        assert!(is_supported_extension("png"));
        assert!(!is_supported_extension("gif"));
    }
}
