/// Where the operator left off
///
/// Saved next to the label store as `<store stem>_session.json`, with the same
/// temp-file-and-rename write. A missing or unreadable file gives the default
/// state.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::store::document::write_atomic;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionState {
    /// Row the operator was looking at
    pub current_row: usize,
    /// Move to the next row after a label is assigned
    pub auto_advance: bool,
    /// Only bookmarked rows are shown
    pub bookmarks_only: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_row: 0,
            auto_advance: true,
            bookmarks_only: false,
        }
    }
}

impl SessionState {
    /// Session file that belongs to a label store file
    pub fn path_for(store_path: &Path) -> PathBuf {
        let stem = store_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        store_path.with_file_name(format!("{stem}_session.json"))
    }

    pub fn load(path: &Path) -> Self {
        std::fs::read(path)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> bool {
        let written = serde_json::to_vec_pretty(self)
            .map_err(|e| crate::error::ReviewError::json(path, e))
            .and_then(|json| write_atomic(path, &json));
        match written {
            Ok(()) => true,
            Err(e) => {
                warn!("Session state not saved: {}", e);
                false
            }
        }
    }

    /// Current row, clamped to a dataset of `len` rows
    pub fn row_within(&self, len: usize) -> usize {
        if self.current_row < len {
            self.current_row
        } else {
            0
        }
    }
}
