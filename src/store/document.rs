/// The on-disk label document
///
/// ```json
/// { "version": 1,
///   "updated_at": "2025-08-18T09:12:44.120Z",
///   "labels": { "12": { "values": {"label": "NG"}, "bookmark": true, "memo": "" } } }
/// ```
///
/// Loading never fails. A missing file, or one that is not an object with a
/// `labels` object, yields an empty store. Inside `labels`, fields of the
/// wrong type fall back to their defaults and entries that are not objects
/// are skipped, so one bad row never costs the others.
/// Saving writes a sibling `.tmp` file and renames it over the target, so a
/// reader only ever sees the previous or the next complete document.
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, ReviewError};

pub const STORE_VERSION: u32 = 1;

/// Labels, bookmark and memo recorded for one dataset row
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct LabelEntry {
    pub values: BTreeMap<String, String>,
    pub bookmark: bool,
    pub memo: String,
    /// Fields written by other tools, kept as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl LabelEntry {
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && !self.bookmark && self.memo.is_empty() && self.extra.is_empty()
    }

    /// Read an entry leniently; `None` if `raw` is not an object
    fn from_value(raw: Value) -> Option<Self> {
        let Value::Object(mut fields) = raw else {
            return None;
        };

        // Older tools wrote numbers or nulls into `values`; keep what can be shown
        let values = match fields.remove("values") {
            Some(Value::Object(values)) => values
                .into_iter()
                .filter_map(|(column, value)| match value {
                    Value::String(s) => Some((column, s)),
                    Value::Null => None,
                    other => Some((column, other.to_string())),
                })
                .collect(),
            _ => BTreeMap::new(),
        };
        let bookmark = fields.remove("bookmark").and_then(|v| v.as_bool()).unwrap_or(false);
        let memo = match fields.remove("memo") {
            Some(Value::String(memo)) => memo,
            _ => String::new(),
        };

        Some(Self {
            values,
            bookmark,
            memo,
            extra: fields,
        })
    }
}

/// A partial update for one entry.
///
/// `values` is merged key by key; `bookmark` and `memo` replace the stored
/// field only when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub values: BTreeMap<String, String>,
    pub bookmark: Option<bool>,
    pub memo: Option<String>,
}

impl EntryPatch {
    pub fn value(column: impl Into<String>, value: impl Into<String>) -> Self {
        let mut patch = Self::default();
        patch.values.insert(column.into(), value.into());
        patch
    }

    pub fn bookmark(on: bool) -> Self {
        Self {
            bookmark: Some(on),
            ..Default::default()
        }
    }

    pub fn memo(text: impl Into<String>) -> Self {
        Self {
            memo: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.bookmark.is_none() && self.memo.is_none()
    }

    pub fn apply_to(&self, entry: &mut LabelEntry) {
        for (column, value) in &self.values {
            entry.values.insert(column.clone(), value.clone());
        }
        if let Some(bookmark) = self.bookmark {
            entry.bookmark = bookmark;
        }
        if let Some(memo) = &self.memo {
            entry.memo = memo.clone();
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LabelStore {
    pub version: u32,
    pub updated_at: Option<DateTime<Utc>>,
    pub labels: BTreeMap<String, LabelEntry>,
}

impl Default for LabelStore {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            updated_at: None,
            labels: BTreeMap::new(),
        }
    }
}

impl LabelStore {
    /// Read the store at `path`, or an empty one if that is not possible
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(store)) => store,
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Starting from an empty label store: {}", e);
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Option<Self>> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReviewError::io(path, e)),
        };
        let doc: Value = serde_json::from_slice(&raw).map_err(|e| ReviewError::json(path, e))?;
        let store = Self::from_value(doc);
        if store.is_none() {
            warn!("{} has no labels object, starting from an empty label store", path.display());
        }
        Ok(store)
    }

    fn from_value(doc: Value) -> Option<Self> {
        let Value::Object(mut doc) = doc else {
            return None;
        };
        let Some(Value::Object(raw_labels)) = doc.remove("labels") else {
            return None;
        };

        let version = doc
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(STORE_VERSION);
        // A timestamp that does not parse is treated as absent
        let updated_at = doc
            .get("updated_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let mut labels = BTreeMap::new();
        for (row_key, raw) in raw_labels {
            match LabelEntry::from_value(raw) {
                Some(entry) => {
                    labels.insert(row_key, entry);
                }
                None => warn!("Skipping label entry for row {}: not an object", row_key),
            }
        }

        Some(Self {
            version,
            updated_at,
            labels,
        })
    }

    /// Stamp `updated_at` and atomically replace the file at `path`.
    ///
    /// Returns `false` if anything failed; the previous file is then untouched.
    pub fn save(&mut self, path: &Path) -> bool {
        self.updated_at = Some(Utc::now());
        match self.stage(path).and_then(|tmp| commit(&tmp, path)) {
            Ok(()) => {
                debug!("Saved {} label entries to {}", self.labels.len(), path.display());
                true
            }
            Err(e) => {
                warn!("Label store save failed: {}", e);
                false
            }
        }
    }

    /// Write the document to the temporary sibling of `path` and return it.
    /// Nothing is visible at `path` until [`commit`] runs.
    pub fn stage(&self, path: &Path) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| ReviewError::json(path, e))?;
        write_temp(path, &json)
    }

    pub fn entry(&self, row_key: &str) -> Option<&LabelEntry> {
        self.labels.get(row_key)
    }

    /// Merge `patch` into the entry for `row_key`, creating it if needed
    pub fn apply(&mut self, row_key: &str, patch: &EntryPatch) {
        let entry = self.labels.entry(row_key.to_string()).or_default();
        patch.apply_to(entry);
    }
}

/// Temporary sibling used while saving `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to the temporary sibling of `path`, flushed to disk
pub fn write_temp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ReviewError::io(parent, e))?;
    }

    let tmp = temp_path(path);
    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(ReviewError::io(&tmp, e));
    }
    Ok(tmp)
}

/// Rename a staged file over its target
pub fn commit(tmp: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp, path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        ReviewError::io(path, e)
    })
}

/// Stage and commit in one step
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = write_temp(path, bytes)?;
    commit(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_malformed_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        assert_eq!(LabelStore::load(&path), LabelStore::default());

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(LabelStore::load(&path), LabelStore::default());

        fs::write(&path, r#"{"version": 1, "entries": {}}"#).unwrap();
        assert_eq!(LabelStore::load(&path), LabelStore::default());

        fs::write(&path, "[1, 2, 3]").unwrap();
        assert_eq!(LabelStore::load(&path), LabelStore::default());
    }

    #[test]
    fn test_save_sets_timestamp_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/run_labels.json");

        let mut store = LabelStore::default();
        store.apply("3", &EntryPatch::value("label", "NG").with_value("class", "scratch"));
        assert!(store.save(&path));
        assert!(store.updated_at.is_some());
        assert!(!temp_path(&path).exists());

        let loaded = LabelStore::load(&path);
        assert_eq!(loaded, store);
        assert_eq!(loaded.entry("3").unwrap().value("class"), Some("scratch"));
    }

    #[test]
    fn test_crash_between_stage_and_commit_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");

        let mut first = LabelStore::default();
        first.apply("1", &EntryPatch::value("label", "OK"));
        assert!(first.save(&path));
        let before = fs::read(&path).unwrap();

        let mut second = first.clone();
        second.apply("1", &EntryPatch::value("label", "NG"));
        second.apply("2", &EntryPatch::bookmark(true));
        let tmp = second.stage(&path).unwrap();
        assert!(tmp.exists());

        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(LabelStore::load(&path), first);
    }

    #[test]
    fn test_failed_save_reports_false_and_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();

        let mut store = LabelStore::default();
        assert!(!store.save(&blocker.join("labels.json")));
        assert_eq!(fs::read(&blocker).unwrap(), b"file, not a directory");
    }

    #[test]
    fn test_legacy_documents_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        fs::write(
            &path,
            r#"{"labels": {"1": {"values": {"label": "OK", "score": 0.5, "gone": null}, "reviewer": "kim"}},
                "updated_at": "2025-08-01T10:00:00.123456+09:00"}"#,
        )
        .unwrap();

        let store = LabelStore::load(&path);
        assert_eq!(store.version, 1);
        assert!(store.updated_at.is_some());
        let entry = store.entry("1").unwrap();
        assert_eq!(entry.value("label"), Some("OK"));
        assert_eq!(entry.value("score"), Some("0.5"));
        assert_eq!(entry.value("gone"), None);
        assert!(!entry.bookmark);
        assert_eq!(entry.extra.get("reviewer"), Some(&Value::from("kim")));
    }

    #[test]
    fn test_bad_entries_do_not_cost_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        fs::write(
            &path,
            r#"{"version": 1, "labels": {
                "1": {"values": {"label": "OK"}, "bookmark": false, "memo": ""},
                "2": {"values": {"label": "NG"}, "bookmark": null, "memo": null},
                "3": {"values": null, "bookmark": "yes", "memo": 7},
                "4": "not an entry",
                "5": null}}"#,
        )
        .unwrap();

        let store = LabelStore::load(&path);
        assert_eq!(store.labels.len(), 3);
        assert_eq!(store.entry("1").unwrap().value("label"), Some("OK"));
        let two = store.entry("2").unwrap();
        assert_eq!(two.value("label"), Some("NG"));
        assert!(!two.bookmark);
        assert!(two.memo.is_empty());
        assert!(store.entry("3").unwrap().is_empty());
        assert!(store.entry("4").is_none());
    }

    #[test]
    fn test_labels_must_be_an_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        fs::write(&path, r#"{"version": 1, "labels": []}"#).unwrap();
        assert_eq!(LabelStore::load(&path), LabelStore::default());
    }

    #[test]
    fn test_unparseable_timestamp_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        fs::write(&path, r#"{"updated_at": "yesterday", "labels": {"0": {"memo": "hi"}}}"#).unwrap();

        let store = LabelStore::load(&path);
        assert_eq!(store.updated_at, None);
        assert_eq!(store.entry("0").unwrap().memo, "hi");
    }

    #[test]
    fn test_patch_merges_values_key_by_key() {
        let mut entry = LabelEntry::default();
        EntryPatch::value("label", "OK").apply_to(&mut entry);
        EntryPatch::value("class", "dent").apply_to(&mut entry);
        EntryPatch::bookmark(true).apply_to(&mut entry);
        EntryPatch::default().apply_to(&mut entry);

        assert_eq!(entry.value("label"), Some("OK"));
        assert_eq!(entry.value("class"), Some("dent"));
        assert!(entry.bookmark);
        assert!(entry.memo.is_empty());
    }
}
