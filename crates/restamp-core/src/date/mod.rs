use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Layout written into the embedded field. Fractional seconds are dropped.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

static EXIF_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}):(\d{2}):(\d{2}) (\d{2}):(\d{2}):(\d{2})$").unwrap()
});

/// The date/time fields a record parses. Everything else is either ignored
/// or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DateField {
    DateTime,
    DateTimeOriginal,
    DateTimeDigitized,
}

impl DateField {
    /// Origin precedence: the first present field wins.
    pub const PRECEDENCE: [DateField; 3] = [
        DateField::DateTimeOriginal,
        DateField::DateTimeDigitized,
        DateField::DateTime,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DateTime" => Some(DateField::DateTime),
            "DateTimeOriginal" => Some(DateField::DateTimeOriginal),
            "DateTimeDigitized" => Some(DateField::DateTimeDigitized),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DateField::DateTime => "DateTime",
            DateField::DateTimeOriginal => "DateTimeOriginal",
            DateField::DateTimeDigitized => "DateTimeDigitized",
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric groups of a `YYYY:MM:DD HH:MM:SS` value, as written. They are not
/// checked against the calendar until [`DateComponents::to_datetime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateComponents {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DateComponents {
    /// `None` for values such as `0000:00:00 00:00:00` that match the
    /// pattern but name no real instant.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, self.second)
    }

    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }
}

/// A validated date field: tag number, the literal text and its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateValue {
    pub field_id: u16,
    pub literal: String,
    pub components: DateComponents,
}

/// Match `s` against the fixed EXIF layout. No trimming, no alternative
/// separators.
pub fn parse_exif_datetime(s: &str) -> Option<DateComponents> {
    let caps = EXIF_DATETIME.captures(s)?;
    let num = |i: usize| caps.get(i).map(|m| m.as_str());
    Some(DateComponents {
        year: num(1)?.parse().ok()?,
        month: num(2)?.parse().ok()?,
        day: num(3)?.parse().ok()?,
        hour: num(4)?.parse().ok()?,
        minute: num(5)?.parse().ok()?,
        second: num(6)?.parse().ok()?,
    })
}

pub fn format_exif_datetime(dt: &NaiveDateTime) -> String {
    dt.format(EXIF_DATETIME_FORMAT).to_string()
}
