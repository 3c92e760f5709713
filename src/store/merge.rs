/// Restoring saved labels into a freshly loaded dataset
///
/// Runs once at startup. Saved values only fill cells that are still empty;
/// anything already present in the dataset is left alone, so merging twice is
/// the same as merging once.
use tracing::info;

use super::document::LabelStore;
use crate::config::Settings;
use crate::dataset::Dataset;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Cells written
    pub filled: usize,
    /// Cells left alone because they already had a value
    pub kept: usize,
    /// Store entries whose key is not a live row
    pub orphaned: usize,
}

#[derive(Debug, Clone)]
pub struct ResumeMerger {
    target_columns: Vec<String>,
    sentinels: Vec<String>,
}

impl ResumeMerger {
    pub fn new(target_columns: Vec<String>) -> Self {
        Self {
            target_columns,
            sentinels: Settings::default().no_value_sentinels,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            target_columns: settings.label_columns.clone(),
            sentinels: settings.no_value_sentinels.clone(),
        }
    }

    pub fn with_sentinels(mut self, sentinels: Vec<String>) -> Self {
        self.sentinels = sentinels;
        self
    }

    /// Whether a cell counts as empty
    pub fn is_vacant(&self, cell: Option<&str>) -> bool {
        match cell.map(str::trim) {
            None | Some("") => true,
            Some(v) => self.sentinels.iter().any(|s| s == v),
        }
    }

    pub fn merge(&self, store: &LabelStore, dataset: &mut Dataset) -> MergeReport {
        let mut report = MergeReport::default();

        for (row_key, entry) in &store.labels {
            let Some(row) = dataset.row_index(row_key) else {
                report.orphaned += 1;
                continue;
            };

            for (column, value) in &entry.values {
                if !self.target_columns.iter().any(|c| c == column) {
                    continue;
                }
                if self.is_vacant(dataset.get(row, column)) {
                    dataset.set(row, column, value.clone());
                    report.filled += 1;
                } else {
                    report.kept += 1;
                }
            }
        }

        info!(
            "Restored {} label cells ({} already set, {} entries without a row)",
            report.filled, report.kept, report.orphaned
        );
        report
    }
}
