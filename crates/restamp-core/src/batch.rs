use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::container::FieldPolicy;
use crate::error::{display_extension, RestampError, Result};
use crate::ordering::sort_key;
use crate::record::{extension_of, is_supported_extension, MetadataRecord};
use crate::{ConfirmCallback, ProgressCallback};

/// What [`Batch::add`] did with a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Ignored { extension: String },
}

/// One line of the final report, in batch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub index: usize,
    pub file_name: String,
    pub path: PathBuf,
    pub timestamp: NaiveDateTime,
}

/// Files processed together under one reference timestamp.
#[derive(Debug, Default)]
pub struct Batch {
    policy: FieldPolicy,
    records: Vec<MetadataRecord>,
    ignored_extensions: BTreeSet<String>,
}

impl Batch {
    pub fn new(policy: FieldPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Load `path` into the batch, or record its extension as ignored when it
    /// is not a supported image. A load failure aborts the batch.
    pub fn add(&mut self, path: &Path) -> Result<AddOutcome> {
        let ext = extension_of(path);
        if !is_supported_extension(&ext) {
            warn!(path = %path.display(), "ignoring {}", display_extension(&ext));
            self.ignored_extensions.insert(ext.clone());
            return Ok(AddOutcome::Ignored { extension: ext });
        }
        match MetadataRecord::load(path, &ext, &self.policy) {
            Ok(record) => {
                self.records.push(record);
                Ok(AddOutcome::Added)
            }
            Err(e) => {
                error!(path = %path.display(), "cannot load file");
                Err(e)
            }
        }
    }

    pub fn ignored_extensions(&self) -> &BTreeSet<String> {
        &self.ignored_extensions
    }

    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sort(&mut self) {
        self.records.sort_by_cached_key(|r| sort_key(r.path()));
    }

    /// Origin timestamp of the first record in batch order, or `now` when it
    /// has none.
    pub fn reference_timestamp(&self, now: NaiveDateTime) -> Result<NaiveDateTime> {
        let Some(first) = self.records.iter().min_by_key(|r| sort_key(r.path())) else {
            return Ok(now);
        };
        match first.origin_timestamp() {
            Some((field, value)) => {
                value
                    .components
                    .to_datetime()
                    .ok_or_else(|| RestampError::MalformedTimestamp {
                        path: first.path().to_path_buf(),
                        field: field.to_string(),
                        value: value.literal.clone(),
                    })
            }
            None => Ok(now),
        }
    }

    /// Order the records and give record `i` the reference plus `i` seconds.
    pub fn assign(&mut self, now: NaiveDateTime) -> Result<()> {
        self.sort();
        let reference = self.reference_timestamp(now)?;
        info!(reference = %reference, files = self.records.len(), "assigning timestamps");
        for (i, record) in self.records.iter_mut().enumerate() {
            record.assign_timestamp(reference, i)?;
        }
        Ok(())
    }

    /// Save every record in order; the first failure stops the batch.
    /// Records saved before it stay saved.
    pub fn save_all(&mut self, progress: &ProgressCallback<'_>) -> Result<()> {
        let total = self.records.len() as u64;
        for (i, record) in self.records.iter_mut().enumerate() {
            record.save()?;
            info!(path = %record.path().display(), "saved");
            progress("save", i as u64, total, &record.file_name());
        }
        Ok(())
    }

    pub fn report(&self) -> Vec<ReportEntry> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(index, r)| {
                Some(ReportEntry {
                    index,
                    file_name: r.file_name(),
                    path: r.path().to_path_buf(),
                    timestamp: r.assigned_timestamp()?,
                })
            })
            .collect()
    }

    fn confirm_ignored(&self, confirm: &ConfirmCallback<'_>) -> Result<()> {
        if !self.ignored_extensions.is_empty() && !confirm(&self.ignored_extensions) {
            return Err(RestampError::Aborted {
                extensions: self.ignored_extensions.clone(),
            });
        }
        Ok(())
    }

    /// Confirm, assign and save using the current local time as fallback
    /// reference.
    pub fn complete(
        &mut self,
        confirm: &ConfirmCallback<'_>,
        progress: &ProgressCallback<'_>,
    ) -> Result<Vec<ReportEntry>> {
        self.complete_with(|| Local::now().naive_local(), confirm, progress)
    }

    pub fn complete_at(
        &mut self,
        now: NaiveDateTime,
        confirm: &ConfirmCallback<'_>,
        progress: &ProgressCallback<'_>,
    ) -> Result<Vec<ReportEntry>> {
        self.complete_with(|| now, confirm, progress)
    }

    /// `clock` is read once, after the operator has confirmed the ignored
    /// extensions.
    pub fn complete_with(
        &mut self,
        clock: impl FnOnce() -> NaiveDateTime,
        confirm: &ConfirmCallback<'_>,
        progress: &ProgressCallback<'_>,
    ) -> Result<Vec<ReportEntry>> {
        self.confirm_ignored(confirm)?;
        self.assign(clock())?;
        self.save_all(progress)?;
        Ok(self.report())
    }

    /// Like [`Batch::complete_at`] without writing anything.
    pub fn plan(
        &mut self,
        now: NaiveDateTime,
        confirm: &ConfirmCallback<'_>,
    ) -> Result<Vec<ReportEntry>> {
        self.plan_with(|| now, confirm)
    }

    pub fn plan_with(
        &mut self,
        clock: impl FnOnce() -> NaiveDateTime,
        confirm: &ConfirmCallback<'_>,
    ) -> Result<Vec<ReportEntry>> {
        self.confirm_ignored(confirm)?;
        self.assign(clock())?;
        Ok(self.report())
    }
}
