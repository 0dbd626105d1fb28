pub mod batch;
pub mod container;
pub mod date;
pub mod error;
pub mod ordering;
pub mod record;
pub mod writer;

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use batch::{AddOutcome, Batch, ReportEntry};
pub use container::FieldPolicy;
pub use error::{PersistenceError, RestampError, Result};
pub use record::MetadataRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestampOptions {
    /// Compute and report timestamps without writing anything.
    #[serde(default)]
    pub dry_run: bool,
    /// Field names to drop in addition to the built-in ignore set.
    #[serde(default)]
    pub extra_ignored_fields: Vec<String>,
}

impl RestampOptions {
    pub fn field_policy(&self) -> FieldPolicy {
        FieldPolicy::with_extra_ignored(self.extra_ignored_fields.iter().cloned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    pub entries: Vec<ReportEntry>,
    pub ignored_extensions: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Type alias for progress callback: stage, current, total, message.
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + 'a;

/// Operator hook for ignored extensions; `false` aborts the batch.
pub type ConfirmCallback<'a> = dyn Fn(&BTreeSet<String>) -> bool + 'a;

/// Load every path into one batch, then restamp it (or only plan it on a dry
/// run). Files are loaded in batch order.
pub fn process(
    paths: &[PathBuf],
    options: &RestampOptions,
    confirm: &ConfirmCallback<'_>,
    progress_callback: &ProgressCallback<'_>,
) -> Result<ProcessResult> {
    let mut ordered = paths.to_vec();
    ordering::sort_paths(&mut ordered);

    let mut batch = Batch::new(options.field_policy());
    let total = ordered.len() as u64;
    for (i, path) in ordered.iter().enumerate() {
        batch.add(path)?;
        progress_callback("load", i as u64, total, &path.display().to_string());
    }
    info!(files = batch.len(), ignored = batch.ignored_extensions().len(), "batch loaded");

    let clock = || Local::now().naive_local();
    let entries = if options.dry_run {
        batch.plan_with(clock, confirm)?
    } else {
        batch.complete_with(clock, confirm, progress_callback)?
    };

    Ok(ProcessResult {
        entries,
        ignored_extensions: batch.ignored_extensions().iter().cloned().collect(),
        dry_run: options.dry_run,
    })
}
