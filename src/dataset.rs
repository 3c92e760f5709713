/// In-memory inference dataset
///
/// Rows come from the inference CSV (one row per image). A row's key in the
/// label store is its ordinal position in that file, as a decimal string, so
/// it stays stable across restarts as long as the CSV is not reordered.
use std::path::Path;
use tracing::info;

use crate::error::{Result, ReviewError};
use crate::store::EntryPatch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Read a CSV file with a header row. Empty cells become `None`.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let csv_err = |source| ReviewError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(csv_err)?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut dataset = Dataset::new(columns);
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            let row = record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect();
            dataset.push_row(row);
        }

        info!("Loaded {} rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Append a row, padded or truncated to the column count
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Index of `column`, adding it (empty in every row) if needed
    pub fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(idx) = self.column_index(column) {
            return idx;
        }
        self.columns.push(column.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        self.columns.len() - 1
    }

    /// Store key of the row at `index`
    pub fn row_key(index: usize) -> String {
        index.to_string()
    }

    /// Row addressed by a store key, if it is a live row
    pub fn row_index(&self, row_key: &str) -> Option<usize> {
        let index: usize = row_key.trim().parse().ok()?;
        (index < self.rows.len()).then_some(index)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Set a cell, adding the column if it does not exist. Out-of-range rows
    /// are ignored.
    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) {
        if row >= self.rows.len() {
            return;
        }
        let col = self.ensure_column(column);
        self.rows[row][col] = Some(value.into());
    }

    /// Recorded image path of a row, trimmed; `None` when blank
    pub fn recorded_path(&self, row: usize, path_column: &str) -> Option<&str> {
        self.get(row, path_column)
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Mirror an edit into the live rows so the table reflects it before the
    /// store is written
    pub fn apply_patch(&mut self, row: usize, patch: &EntryPatch) {
        for (column, value) in &patch.values {
            self.set(row, column, value.clone());
        }
        if let Some(bookmark) = patch.bookmark {
            self.set(row, "bookmark", bookmark.to_string());
        }
    }
}
