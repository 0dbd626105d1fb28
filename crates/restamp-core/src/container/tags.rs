use std::borrow::Cow;
use std::collections::BTreeSet;

use exif::Tag;

use super::Group;

/// Field names dropped without inspection.
pub const DEFAULT_IGNORED_FIELDS: &[&str] = &[
    "ImageWidth",
    "ImageLength",
    "BitsPerSample",
    "ColorSpace",
    "XResolution",
    "YResolution",
    "ResolutionUnit",
    "SamplesPerPixel",
    "Orientation",
    "ExifVersion",
    "PhotometricInterpretation",
    "JPEGInterchangeFormatLength",
    "ExifTag",
    "PixelXDimension",
    "Software",
    "JPEGInterchangeFormat",
    "Compression",
    "PixelYDimension",
    "Make",
    "Model",
    "YCbCrPositioning",
    "ExposureMode",
    "GPSTag",
    "ExposureTime",
    "FlashpixVersion",
    "DigitalZoomRatio",
    "FNumber",
    "SceneCaptureType",
    "WhiteBalance",
    "ISOSpeedRatings",
    "SubSecTimeOriginal",
    "SubSecTimeDigitized",
    "ComponentsConfiguration",
    "ShutterSpeedValue",
    "ApertureValue",
    "ExposureBiasValue",
    "MeteringMode",
    "LightSource",
    "Flash",
    "MakerNote",
];

// (group, tag number, name).
static FIELD_NAMES: &[(Group, u16, &str)] = &[
    (Group::Image, 256, "ImageWidth"),
    (Group::Image, 257, "ImageLength"),
    (Group::Image, 258, "BitsPerSample"),
    (Group::Image, 259, "Compression"),
    (Group::Image, 262, "PhotometricInterpretation"),
    (Group::Image, 270, "ImageDescription"),
    (Group::Image, 271, "Make"),
    (Group::Image, 272, "Model"),
    (Group::Image, 273, "StripOffsets"),
    (Group::Image, 274, "Orientation"),
    (Group::Image, 277, "SamplesPerPixel"),
    (Group::Image, 278, "RowsPerStrip"),
    (Group::Image, 279, "StripByteCounts"),
    (Group::Image, 282, "XResolution"),
    (Group::Image, 283, "YResolution"),
    (Group::Image, 296, "ResolutionUnit"),
    (Group::Image, 305, "Software"),
    (Group::Image, 306, "DateTime"),
    (Group::Image, 315, "Artist"),
    (Group::Image, 513, "JPEGInterchangeFormat"),
    (Group::Image, 514, "JPEGInterchangeFormatLength"),
    (Group::Image, 531, "YCbCrPositioning"),
    (Group::Image, 33432, "Copyright"),
    (Group::Image, 34665, "ExifTag"),
    (Group::Image, 34853, "GPSTag"),
    (Group::Exif, 33434, "ExposureTime"),
    (Group::Exif, 33437, "FNumber"),
    (Group::Exif, 34850, "ExposureProgram"),
    (Group::Exif, 34855, "ISOSpeedRatings"),
    (Group::Exif, 36864, "ExifVersion"),
    (Group::Exif, 36867, "DateTimeOriginal"),
    (Group::Exif, 36868, "DateTimeDigitized"),
    (Group::Exif, 36880, "OffsetTime"),
    (Group::Exif, 36881, "OffsetTimeOriginal"),
    (Group::Exif, 36882, "OffsetTimeDigitized"),
    (Group::Exif, 37121, "ComponentsConfiguration"),
    (Group::Exif, 37377, "ShutterSpeedValue"),
    (Group::Exif, 37378, "ApertureValue"),
    (Group::Exif, 37380, "ExposureBiasValue"),
    (Group::Exif, 37381, "MaxApertureValue"),
    (Group::Exif, 37383, "MeteringMode"),
    (Group::Exif, 37384, "LightSource"),
    (Group::Exif, 37385, "Flash"),
    (Group::Exif, 37386, "FocalLength"),
    (Group::Exif, 37500, "MakerNote"),
    (Group::Exif, 37510, "UserComment"),
    (Group::Exif, 37520, "SubSecTime"),
    (Group::Exif, 37521, "SubSecTimeOriginal"),
    (Group::Exif, 37522, "SubSecTimeDigitized"),
    (Group::Exif, 40960, "FlashpixVersion"),
    (Group::Exif, 40961, "ColorSpace"),
    (Group::Exif, 40962, "PixelXDimension"),
    (Group::Exif, 40963, "PixelYDimension"),
    (Group::Exif, 40965, "InteroperabilityTag"),
    (Group::Exif, 41495, "SensingMethod"),
    (Group::Exif, 41728, "FileSource"),
    (Group::Exif, 41729, "SceneType"),
    (Group::Exif, 41985, "CustomRendered"),
    (Group::Exif, 41986, "ExposureMode"),
    (Group::Exif, 41987, "WhiteBalance"),
    (Group::Exif, 41988, "DigitalZoomRatio"),
    (Group::Exif, 41989, "FocalLengthIn35mmFilm"),
    (Group::Exif, 41990, "SceneCaptureType"),
    (Group::Exif, 42016, "ImageUniqueID"),
    (Group::Exif, 42033, "BodySerialNumber"),
    (Group::Exif, 42034, "LensSpecification"),
    (Group::Exif, 42035, "LensMake"),
    (Group::Exif, 42036, "LensModel"),
    (Group::Gps, 0, "GPSVersionID"),
    (Group::Gps, 1, "GPSLatitudeRef"),
    (Group::Gps, 2, "GPSLatitude"),
    (Group::Gps, 3, "GPSLongitudeRef"),
    (Group::Gps, 4, "GPSLongitude"),
    (Group::Gps, 5, "GPSAltitudeRef"),
    (Group::Gps, 6, "GPSAltitude"),
    (Group::Gps, 7, "GPSTimeStamp"),
    (Group::Gps, 27, "GPSProcessingMethod"),
    (Group::Gps, 29, "GPSDateStamp"),
    (Group::Interop, 1, "InteroperabilityIndex"),
    (Group::Interop, 2, "InteroperabilityVersion"),
];

/// Resolve a field's name within `group` by tag number. IFD1 fields use the
/// Image rows. Tags missing from the table fall back to the codec's own name.
pub fn resolve_field_name(group: Group, tag: Tag) -> Cow<'static, str> {
    let table_group = match group {
        Group::Thumbnail => Group::Image,
        g => g,
    };
    let id = tag.number();
    FIELD_NAMES
        .iter()
        .find(|(g, number, _)| *g == table_group && *number == id)
        .map(|(_, _, name)| Cow::Borrowed(*name))
        .unwrap_or_else(|| Cow::Owned(tag.to_string()))
}

/// Which field names a record drops before classification.
#[derive(Debug, Clone)]
pub struct FieldPolicy {
    ignored: BTreeSet<String>,
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self {
            ignored: DEFAULT_IGNORED_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FieldPolicy {
    /// The default ignore set widened by operator-supplied names.
    pub fn with_extra_ignored<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut policy = Self::default();
        policy.ignored.extend(extra.into_iter().map(Into::into));
        policy
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.contains(name)
    }
}
