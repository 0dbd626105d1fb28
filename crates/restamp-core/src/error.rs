use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RestampError>;

/// Every fatal condition a batch can hit. Unsupported extensions are not
/// errors; they land in the batch's ignored set instead.
#[derive(Error, Debug)]
pub enum RestampError {
    #[error("not a regular file: {}", .path.display())]
    NotAFile { path: PathBuf },

    #[error("cannot read metadata from {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: exif::Error,
    },

    #[error("unknown metadata fields in {}:\n{}", .path.display(), format_fields(.fields))]
    UnrecognizedFields {
        path: PathBuf,
        fields: Vec<(String, String)>,
    },

    #[error("malformed {field} in {}: {value:?}", .path.display())]
    MalformedTimestamp {
        path: PathBuf,
        field: String,
        value: String,
    },

    #[error("{field} appears more than once in {}", .path.display())]
    DuplicateField { path: PathBuf, field: String },

    #[error("timestamp already assigned to {}", .path.display())]
    AlreadyAssigned { path: PathBuf },

    #[error("no timestamp assigned to {} before save", .path.display())]
    NotAssigned { path: PathBuf },

    #[error("timestamp out of range for {}", .path.display())]
    TimestampOverflow { path: PathBuf },

    #[error("cannot save {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: PersistenceError,
    },

    #[error("aborted by operator (ignored extensions: {})", format_extensions(.extensions))]
    Aborted { extensions: BTreeSet<String> },
}

/// Failures while writing a record back to disk.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("cannot read EXIF block for rewrite: {0}")]
    Read(String),

    #[error("cannot write EXIF block: {0}")]
    Write(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} does not exist in the local time zone")]
    LocalTime(NaiveDateTime),
}

fn format_fields(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{} = {}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn format_extensions(extensions: &BTreeSet<String>) -> String {
    extensions
        .iter()
        .map(|ext| display_extension(ext))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `.gif` style rendering; files without an extension show as `(none)`.
pub fn display_extension(ext: &str) -> String {
    if ext.is_empty() {
        "(none)".to_string()
    } else {
        format!(".{}", ext)
    }
}
