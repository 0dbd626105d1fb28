//! EXIF container access: kamadak-exif decodes a file into grouped fields,
//! little_exif writes the capture time back into the image.

pub mod tags;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{Context, Field, In, Reader, Tag};
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;

use crate::error::PersistenceError;

pub use tags::{resolve_field_name, FieldPolicy, DEFAULT_IGNORED_FIELDS};

/// Field groups in container order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    Image,
    Exif,
    Gps,
    Interop,
    /// IFD1, the thumbnail's own tag directory. Its fields are named and
    /// validated like `Image`; the thumbnail bytes are never fields.
    Thumbnail,
}

impl Group {
    pub fn of(field: &Field) -> Group {
        if field.ifd_num == In::THUMBNAIL {
            return Group::Thumbnail;
        }
        match field.tag.context() {
            Context::Exif => Group::Exif,
            Context::Gps => Group::Gps,
            Context::Interop => Group::Interop,
            _ => Group::Image,
        }
    }
}

/// Decoded metadata of one file.
#[derive(Debug, Clone, Default)]
pub struct ExifContainer {
    fields: Vec<Field>,
}

impl ExifContainer {
    pub fn from_fields(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields grouped and ordered by [`Group`], file order within a group.
    pub fn groups(&self) -> Vec<(Group, Vec<&Field>)> {
        let mut groups: Vec<(Group, Vec<&Field>)> = Vec::new();
        for field in &self.fields {
            let group = Group::of(field);
            match groups.iter_mut().find(|(g, _)| *g == group) {
                Some((_, fields)) => fields.push(field),
                None => groups.push((group, vec![field])),
            }
        }
        groups.sort_by_key(|(g, _)| *g);
        groups
    }

    pub fn get(&self, tag: Tag, ifd: In) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag == tag && f.ifd_num == ifd)
    }
}

/// Read the EXIF container of `path`. A JPEG carrying no EXIF segment yields
/// an empty container.
pub fn decode(path: &Path) -> Result<ExifContainer, exif::Error> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Ok(ExifContainer::from_fields(exif.fields().cloned().collect())),
        Err(exif::Error::NotFound(_)) => Ok(ExifContainer::default()),
        Err(e) => Err(e),
    }
}

/// Set `DateTimeOriginal` in the image at `path` to `text`, keeping every
/// other field of its EXIF block. `container` is what [`decode`] read from the
/// same file; when it is empty a new block holding only this field is written.
pub fn insert(container: &ExifContainer, text: &str, path: &Path) -> Result<(), PersistenceError> {
    let mut metadata = if container.is_empty() {
        Metadata::new()
    } else {
        Metadata::new_from_path(path).map_err(|e| PersistenceError::Read(e.to_string()))?
    };
    metadata.set_tag(ExifTag::DateTimeOriginal(text.to_string()));
    metadata
        .write_to_file(path)
        .map_err(|e| PersistenceError::Write(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use exif::Value;
    use std::fs;
    use tempfile::tempdir;

    fn ascii_text(field: &Field) -> &[u8] {
        match &field.value {
            Value::Ascii(v) if v.len() == 1 => &v[0],
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_decode_without_exif_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        write_jpeg(&path, vec![]);

        let container = decode(&path).unwrap();
        assert!(container.is_empty());
        assert!(container.groups().is_empty());
    }

    #[test]
    fn test_decode_groups_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        write_jpeg(
            &path,
            vec![
                ascii(Tag::DateTimeOriginal, "2020:01:01 00:00:00"),
                ascii(Tag::Make, "Fujifilm"),
            ],
        );

        let container = decode(&path).unwrap();
        let groups = container.groups();
        let names: Vec<Group> = groups.iter().map(|(g, _)| *g).collect();
        assert_eq!(names, vec![Group::Image, Group::Exif]);
        assert_eq!(groups[1].1[0].tag, Tag::DateTimeOriginal);
    }

    #[test]
    fn test_group_of_thumbnail_ifd() {
        let field = Field {
            tag: Tag::DateTime,
            ifd_num: In::THUMBNAIL,
            value: Value::Ascii(vec![b"2020:01:01 00:00:00".to_vec()]),
        };
        assert_eq!(Group::of(&field), Group::Thumbnail);
        assert_eq!(Group::of(&ascii(Tag::DateTime, "x")), Group::Image);
    }

    #[test]
    fn test_insert_replaces_date_and_keeps_other_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        write_jpeg(
            &path,
            vec![
                ascii(Tag::Make, "Fujifilm"),
                ascii(Tag::DateTimeOriginal, "2020:01:01 00:00:00"),
            ],
        );

        let container = decode(&path).unwrap();
        insert(&container, "2021:06:07 08:09:10", &path).unwrap();

        let reloaded = decode(&path).unwrap();
        let field = reloaded.get(Tag::DateTimeOriginal, In::PRIMARY).unwrap();
        assert_eq!(ascii_text(field), b"2021:06:07 08:09:10");
        let make = reloaded.get(Tag::Make, In::PRIMARY).unwrap();
        assert_eq!(ascii_text(make), b"Fujifilm");
    }

    #[test]
    fn test_insert_into_jpeg_without_exif() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        write_jpeg(&path, vec![]);

        insert(&ExifContainer::default(), "1999:12:31 23:59:59", &path).unwrap();

        let reloaded = decode(&path).unwrap();
        let field = reloaded.get(Tag::DateTimeOriginal, In::PRIMARY).unwrap();
        assert_eq!(ascii_text(field), b"1999:12:31 23:59:59");
    }

    #[test]
    fn test_insert_missing_file_fails() {
        let dir = tempdir().unwrap();
        let container = ExifContainer::from_fields(vec![ascii(Tag::Make, "Canon")]);
        assert!(insert(&container, "2000:01:01 00:00:00", &dir.path().join("gone.jpg")).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bmp");
        fs::write(&path, b"BM\0\0\0\0").unwrap();
        assert!(decode(&path).is_err());
    }
}
