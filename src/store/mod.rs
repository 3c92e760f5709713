/// Label persistence module
///
/// This module handles everything the operator's work is saved in:
/// - The JSON label document and its atomic save (document.rs)
/// - Which file a session's labels live in (naming.rs)
/// - Debounced batching of edits (pending.rs)
/// - Restoring saved labels into the dataset at startup (merge.rs)
use std::path::Path;

pub mod document;
pub mod merge;
pub mod naming;
pub mod pending;

pub use document::{EntryPatch, LabelEntry, LabelStore};
pub use merge::{MergeReport, ResumeMerger};
pub use naming::{select_store_path, store_path_candidates};
pub use pending::{FlushReport, PendingOp, PendingOpBuffer};

/// Entry for `row_key` in the store at `path` (empty if absent)
pub fn get(path: &Path, row_key: &str) -> LabelEntry {
    LabelStore::load(path)
        .labels
        .remove(row_key)
        .unwrap_or_default()
}

/// Load, merge `patch` into `row_key`, save. Returns whether the save worked.
pub fn upsert(path: &Path, row_key: &str, patch: &EntryPatch) -> bool {
    let mut store = LabelStore::load(path);
    store.apply(row_key, patch);
    store.save(path)
}
