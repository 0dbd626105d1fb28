use std::path::Path;

use chrono::{Local, NaiveDateTime, TimeZone};
use filetime::FileTime;

use crate::container::{self, ExifContainer};
use crate::date::format_exif_datetime;
use crate::error::PersistenceError;

/// Store `dt` as the `DateTimeOriginal` of the image at `path`, whose decoded
/// metadata is `container`.
pub fn write_embedded(
    container: &ExifContainer,
    path: &Path,
    dt: &NaiveDateTime,
) -> Result<(), PersistenceError> {
    container::insert(container, &format_exif_datetime(dt), path)
}

/// Seconds since the epoch for a wall-clock time in the local zone. On a
/// backward DST shift the earlier instant is used.
pub fn local_epoch_seconds(dt: &NaiveDateTime) -> Result<i64, PersistenceError> {
    Local
        .from_local_datetime(dt)
        .earliest()
        .map(|local| local.timestamp())
        .ok_or(PersistenceError::LocalTime(*dt))
}

/// Set both access and modification time of `path` to `dt` (local time,
/// whole seconds).
pub fn set_file_times(path: &Path, dt: &NaiveDateTime) -> Result<(), PersistenceError> {
    let ft = FileTime::from_unix_time(local_epoch_seconds(dt)?, 0);
    filetime::set_file_times(path, ft, ft)?;
    Ok(())
}
