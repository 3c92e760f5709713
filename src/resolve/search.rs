/// Bounded candidate probing
///
/// A search is an ordered list of [`Pattern`]s. Literal patterns cost one
/// `stat`; wildcard patterns match file names inside one subtree, which is
/// walked at most once per search no matter how many patterns point at it.
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ScanLimits;
use crate::thumbnail::CACHE_DIR_NAME;

/// One search candidate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// An exact path that either exists as a file or doesn't
    Literal(PathBuf),
    /// A file-name wildcard applied to every file under `root`
    Wildcard {
        root: PathBuf,
        /// `glob` syntax, matched against the file name only
        name: String,
        /// If set, the match's file stem must equal this exactly
        stem: Option<String>,
    },
}

impl Pattern {
    pub fn literal(path: impl Into<PathBuf>) -> Self {
        Pattern::Literal(path.into())
    }

    pub fn wildcard(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Pattern::Wildcard {
            root: root.into(),
            name: name.into(),
            stem: None,
        }
    }

    /// Wildcard whose matches must additionally have exactly this stem
    pub fn wildcard_with_stem(
        root: impl Into<PathBuf>,
        name: impl Into<String>,
        stem: impl Into<String>,
    ) -> Self {
        Pattern::Wildcard {
            root: root.into(),
            name: name.into(),
            stem: Some(stem.into()),
        }
    }
}

/// Counters for one `search_first` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub patterns: usize,
    pub literals_checked: usize,
    pub subtrees_scanned: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateSearcher {
    limits: ScanLimits,
}

impl CandidateSearcher {
    pub fn new(limits: ScanLimits) -> Self {
        Self { limits }
    }

    /// Return the first pattern hit, in the given order
    pub fn search_first(&self, patterns: &[Pattern]) -> Option<PathBuf> {
        self.search_first_with_stats(patterns).0
    }

    pub fn search_first_with_stats(&self, patterns: &[Pattern]) -> (Option<PathBuf>, SearchStats) {
        let mut seen = HashSet::new();
        let unique: Vec<&Pattern> = patterns.iter().filter(|p| seen.insert(*p)).collect();

        let mut stats = SearchStats {
            patterns: unique.len(),
            ..Default::default()
        };
        let mut listings: HashMap<&Path, Vec<PathBuf>> = HashMap::new();

        for pattern in unique {
            let hit = match pattern {
                Pattern::Literal(path) => {
                    stats.literals_checked += 1;
                    is_file(path).then(|| path.clone())
                }
                Pattern::Wildcard { root, name, stem } => {
                    let Ok(matcher) = glob::Pattern::new(name) else {
                        warn!("Skipping invalid wildcard {:?}", name);
                        continue;
                    };
                    let files = listings.entry(root.as_path()).or_insert_with(|| {
                        stats.subtrees_scanned += 1;
                        self.list_files(root)
                    });
                    files
                        .iter()
                        .find(|file| name_matches(file, &matcher, stem.as_deref()))
                        .cloned()
                }
            };

            if let Some(path) = hit {
                debug!("Candidate hit: {}", path.display());
                return (Some(path), stats);
            }
        }

        (None, stats)
    }

    /// Every regular file under `root`, in a stable depth-first order.
    /// Unreadable entries are skipped.
    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut visited = 0usize;

        let walker = WalkDir::new(root)
            .max_depth(self.limits.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != CACHE_DIR_NAME);

        for entry in walker {
            visited += 1;
            if visited > self.limits.max_entries {
                warn!(
                    "Scan of {} stopped after {} entries",
                    root.display(),
                    self.limits.max_entries
                );
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_file() || (entry.path_is_symlink() && is_file(entry.path())) {
                files.push(entry.into_path());
            }
        }

        debug!("Scanned {} files under {}", files.len(), root.display());
        files
    }
}

fn is_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

fn name_matches(file: &Path, matcher: &glob::Pattern, stem: Option<&str>) -> bool {
    let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if !matcher.matches(name) {
        return false;
    }
    match stem {
        Some(stem) => file.file_stem().and_then(|s| s.to_str()) == Some(stem),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_literal_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        touch(&b);

        let searcher = CandidateSearcher::default();
        let hit = searcher.search_first(&[Pattern::literal(&a), Pattern::literal(&b)]);
        assert_eq!(hit, Some(b.clone()));

        touch(&a);
        let hit = searcher.search_first(&[Pattern::literal(&a), Pattern::literal(&b)]);
        assert_eq!(hit, Some(a));
    }

    #[test]
    fn test_directories_are_not_literal_hits() {
        let dir = tempfile::tempdir().unwrap();
        let searcher = CandidateSearcher::default();
        assert_eq!(searcher.search_first(&[Pattern::literal(dir.path())]), None);
    }

    #[test]
    fn test_subtree_scanned_once_and_patterns_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("x/y/0001.png"));

        let patterns = vec![
            Pattern::wildcard(dir.path(), "0002.bmp"),
            Pattern::wildcard(dir.path(), "0002.bmp"),
            Pattern::wildcard(dir.path(), "0003.*"),
            Pattern::wildcard_with_stem(dir.path(), "0001.*", "0001"),
        ];
        let (hit, stats) = CandidateSearcher::default().search_first_with_stats(&patterns);

        assert_eq!(hit, Some(dir.path().join("x/y/0001.png")));
        assert_eq!(stats.patterns, 3);
        assert_eq!(stats.subtrees_scanned, 1);
    }

    #[test]
    fn test_stem_filter_rejects_extra_characters() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("0001.v2.png"));
        touch(&dir.path().join("0001_v2.png"));

        let hit = CandidateSearcher::default()
            .search_first(&[Pattern::wildcard_with_stem(dir.path(), "0001.*", "0001")]);
        assert_eq!(hit, None);
    }

    #[test]
    fn test_missing_root_is_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let hit = CandidateSearcher::default().search_first(&[
            Pattern::wildcard(&missing, "*.png"),
            Pattern::literal(missing.join("a.png")),
        ]);
        assert_eq!(hit, None);
    }

    #[test]
    fn test_thumbnail_cache_is_not_scanned() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(CACHE_DIR_NAME).join("0001.png"));

        let hit = CandidateSearcher::default().search_first(&[Pattern::wildcard(dir.path(), "0001.png")]);
        assert_eq!(hit, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        let link = dir.path().join("a/0001.png");
        std::os::unix::fs::symlink(dir.path().join("gone/0001.png"), &link).unwrap();
        touch(&dir.path().join("b/0001.png"));

        let hit = CandidateSearcher::default().search_first(&[
            Pattern::literal(&link),
            Pattern::wildcard_with_stem(dir.path(), "0001.*", "0001"),
        ]);
        assert_eq!(hit, Some(dir.path().join("b/0001.png")));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_does_not_stop_scan() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("a_locked");
        touch(&locked.join("other.png"));
        touch(&dir.path().join("z/0001.png"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let hit = CandidateSearcher::default().search_first(&[
            Pattern::wildcard(&locked, "0001.*"),
            Pattern::wildcard(dir.path(), "0001.*"),
        ]);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(hit, Some(dir.path().join("z/0001.png")));
    }

    #[test]
    fn test_entry_limit_truncates_scan() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            touch(&dir.path().join(format!("{i}.png")));
        }
        let searcher = CandidateSearcher::new(ScanLimits {
            max_depth: 4,
            max_entries: 3,
        });
        // root + "0.png" + "1.png" fit, "4.png" is never visited
        assert!(searcher.search_first(&[Pattern::wildcard(dir.path(), "1.png")]).is_some());
        assert!(searcher.search_first(&[Pattern::wildcard(dir.path(), "4.png")]).is_none());
    }
}
