/// Label store file naming
///
/// The store lives next to the export it belongs to. `run_labeled.xlsx` keeps
/// its labels in `run_labels.json`; earlier versions always appended
/// `_labels` (`run_labeled_labels.json`), and such files are still picked up.
use std::path::{Path, PathBuf};
use tracing::info;

pub const STORE_EXTENSION: &str = "json";
const LABELED_SUFFIX: &str = "_labeled";
const LABELS_SUFFIX: &str = "_labels";

/// Candidate store files for `export_path`, preferred first.
///
/// An existing legacy file wins over a new name that does not exist yet, so the
/// legacy name is listed first in that case.
pub fn store_path_candidates(export_path: &Path) -> Vec<PathBuf> {
    let stem = export_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = export_path.parent().unwrap_or_else(|| Path::new(""));

    let current_stem = match stem.strip_suffix(LABELED_SUFFIX) {
        Some(root) => format!("{root}{LABELS_SUFFIX}"),
        None => format!("{stem}{LABELS_SUFFIX}"),
    };
    let current = parent.join(format!("{current_stem}.{STORE_EXTENSION}"));
    let legacy = parent.join(format!("{stem}{LABELS_SUFFIX}.{STORE_EXTENSION}"));

    if legacy == current {
        vec![current]
    } else if legacy.exists() && !current.exists() {
        vec![legacy, current]
    } else {
        vec![current, legacy]
    }
}

/// Pick the store file for a session. Called once, before the first load.
pub fn select_store_path(export_path: &Path) -> PathBuf {
    let mut candidates = store_path_candidates(export_path).into_iter();
    let first = candidates.next().unwrap_or_else(|| export_path.with_extension(STORE_EXTENSION));
    if first.exists() {
        info!("Using label store {}", first.display());
    }
    first
}
