/// Debounced batching of label edits
///
/// Every operator action becomes a [`PendingOp`]. Ops are queued and written
/// in one load-apply-save cycle per store once the queue has been quiet for
/// the debounce window. The buffer owns no thread or timer: the event loop
/// that owns it calls [`PendingOpBuffer::poll`] whenever it wakes up (or waits
/// until [`PendingOpBuffer::deadline`]).
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::document::{EntryPatch, LabelStore};
use crate::config::Settings;

/// One queued edit
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOp {
    pub target: PathBuf,
    pub row_key: String,
    pub patch: EntryPatch,
    /// Row identity at the time of the edit (e.g. the recorded image path),
    /// reported when the edit is written
    pub identity_hints: BTreeMap<String, String>,
}

impl PendingOp {
    pub fn new(target: impl Into<PathBuf>, row_key: impl Into<String>, patch: EntryPatch) -> Self {
        Self {
            target: target.into(),
            row_key: row_key.into(),
            patch,
            identity_hints: BTreeMap::new(),
        }
    }

    pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.identity_hints.insert(key.into(), value.into());
        self
    }
}

/// What a flush did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Ops written to disk
    pub written: usize,
    /// Stores that were loaded and saved
    pub stores_saved: usize,
    /// Stores whose save failed; their ops are still queued
    pub failed: Vec<PathBuf>,
}

impl FlushReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
pub struct PendingOpBuffer {
    queue: Vec<PendingOp>,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl PendingOpBuffer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            queue: Vec::new(),
            debounce,
            deadline: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.debounce())
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> &[PendingOp] {
        &self.queue
    }

    /// When the queued ops become due, if a timer is running
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn enqueue(&mut self, op: PendingOp) {
        self.enqueue_at(op, Instant::now());
    }

    /// Queue `op` and restart the quiet period from `now`
    pub fn enqueue_at(&mut self, op: PendingOp, now: Instant) {
        debug!("Queued edit for row {} ({} pending)", op.row_key, self.queue.len() + 1);
        self.queue.push(op);
        self.deadline = Some(now + self.debounce);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Flush if the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<FlushReport> {
        self.is_due(now).then(|| self.flush())
    }

    /// Write every queued op now.
    ///
    /// Ops are grouped by store in first-seen order; each store is loaded
    /// once, patched in queue order and saved once. Ops for a store whose save
    /// failed stay queued and the quiet period starts again, so a later `poll`
    /// retries them.
    pub fn flush(&mut self) -> FlushReport {
        self.deadline = None;
        let mut report = FlushReport::default();
        if self.queue.is_empty() {
            return report;
        }

        let mut targets: Vec<PathBuf> = Vec::new();
        for op in &self.queue {
            if !targets.contains(&op.target) {
                targets.push(op.target.clone());
            }
        }

        for target in &targets {
            let ops: Vec<&PendingOp> = self.queue.iter().filter(|op| &op.target == target).collect();
            if write_batch(target, &ops) {
                report.written += ops.len();
                report.stores_saved += 1;
            } else {
                report.failed.push(target.clone());
            }
        }

        let failed = &report.failed;
        self.queue.retain(|op| failed.contains(&op.target));

        if report.is_success() {
            info!("Saved {} label edits", report.written);
        } else {
            self.deadline = Some(Instant::now() + self.debounce);
            warn!(
                "Label save pending: {} edits kept for retry ({} stores failed)",
                self.queue.len(),
                report.failed.len()
            );
        }
        report
    }
}

fn write_batch(target: &Path, ops: &[&PendingOp]) -> bool {
    let mut store = LabelStore::load(target);
    for op in ops {
        if !op.identity_hints.is_empty() {
            debug!("Row {} identity: {:?}", op.row_key, op.identity_hints);
        }
        store.apply(&op.row_key, &op.patch);
    }
    store.save(target)
}

impl Drop for PendingOpBuffer {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            let report = self.flush();
            if !report.is_success() {
                warn!("Dropped {} unsaved label edits", self.queue.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn test_debounce_restarts_on_enqueue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        let mut buffer = PendingOpBuffer::new(WINDOW);
        let t0 = Instant::now();

        buffer.enqueue_at(PendingOp::new(&path, "1", EntryPatch::value("label", "NG")), t0);
        let t1 = t0 + Duration::from_millis(200);
        buffer.enqueue_at(PendingOp::new(&path, "1", EntryPatch::value("label", "OK")), t1);

        assert!(buffer.poll(t0 + WINDOW).is_none());
        assert!(!path.exists());

        let report = buffer.poll(t1 + WINDOW).unwrap();
        assert_eq!(report.written, 2);
        assert!(buffer.is_empty());
        assert_eq!(buffer.deadline(), None);
    }

    #[test]
    fn test_last_writer_wins_within_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        let mut buffer = PendingOpBuffer::new(WINDOW);

        buffer.enqueue(PendingOp::new(&path, "5", EntryPatch::value("label", "NG")));
        buffer.enqueue(PendingOp::new(&path, "5", EntryPatch::value("class", "scratch")));
        buffer.enqueue(PendingOp::new(&path, "5", EntryPatch::value("label", "OK")));
        buffer.enqueue(PendingOp::new(&path, "6", EntryPatch::bookmark(true)).with_hint("File_path", "a/6.bmp"));

        let report = buffer.flush();
        assert!(report.is_success());
        assert_eq!(report.stores_saved, 1);

        let store = LabelStore::load(&path);
        let five = store.entry("5").unwrap();
        assert_eq!(five.value("label"), Some("OK"));
        assert_eq!(five.value("class"), Some("scratch"));
        assert!(store.entry("6").unwrap().bookmark);
    }

    #[test]
    fn test_failed_save_keeps_queue_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let blocked_dir = dir.path().join("out");
        fs::write(&blocked_dir, b"").unwrap();
        let blocked = blocked_dir.join("labels.json");
        let fine = dir.path().join("ok_labels.json");

        let mut buffer = PendingOpBuffer::new(WINDOW);
        buffer.enqueue(PendingOp::new(&blocked, "1", EntryPatch::value("label", "NG")));
        buffer.enqueue(PendingOp::new(&fine, "2", EntryPatch::value("label", "OK")));

        let report = buffer.flush();
        assert_eq!(report.failed, vec![blocked.clone()]);
        assert_eq!(report.written, 1);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.pending()[0].row_key, "1");

        fs::remove_file(&blocked_dir).unwrap();
        let report = buffer.flush();
        assert!(report.is_success());
        assert!(buffer.is_empty());
        assert_eq!(LabelStore::load(&blocked).entry("1").unwrap().value("label"), Some("NG"));
    }

    #[test]
    fn test_poll_retries_after_failed_save() {
        let dir = tempfile::tempdir().unwrap();
        let blocked_dir = dir.path().join("out");
        fs::write(&blocked_dir, b"").unwrap();
        let target = blocked_dir.join("labels.json");

        let mut buffer = PendingOpBuffer::new(WINDOW);
        let t0 = Instant::now();
        buffer.enqueue_at(PendingOp::new(&target, "1", EntryPatch::value("label", "NG")), t0);

        let report = buffer.poll(t0 + WINDOW).unwrap();
        assert!(!report.is_success());
        assert_eq!(buffer.len(), 1);
        let retry_at = buffer.deadline().unwrap();

        fs::remove_file(&blocked_dir).unwrap();
        let report = buffer.poll(retry_at).unwrap();
        assert!(report.is_success());
        assert!(buffer.is_empty());
        assert_eq!(buffer.deadline(), None);
        assert_eq!(LabelStore::load(&target).entry("1").unwrap().value("label"), Some("NG"));
    }

    #[test]
    fn test_drop_flushes_remaining_ops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        {
            let mut buffer = PendingOpBuffer::new(WINDOW);
            buffer.enqueue(PendingOp::new(&path, "9", EntryPatch::memo("check edge")));
        }
        assert_eq!(LabelStore::load(&path).entry("9").unwrap().memo, "check edge");
    }

    #[test]
    fn test_empty_flush_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = PendingOpBuffer::new(WINDOW);
        assert_eq!(buffer.flush(), FlushReport::default());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
