/// Path resolution module
///
/// Maps the image path recorded in a dataset row to a file that actually
/// exists under the images base directory:
/// - Parsing the numeric sample layout out of a path (pattern.rs)
/// - Bounded existence checks and subtree scans (search.rs)
/// - The ordered list of resolution strategies (strategy.rs)
///
/// A miss is reported as `None`. The resolver never substitutes a file with a
/// different stem, apart from the `_viz` render of the requested one.
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{FolderCatalog, Settings};

pub mod pattern;
pub mod search;
pub mod strategy;

pub use pattern::StructuralComponents;
pub use search::{CandidateSearcher, Pattern};
pub use strategy::{Strategy, StrategyContext};

/// A successful resolution and the strategy that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    pub strategy: &'static str,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    catalog: FolderCatalog,
    searcher: CandidateSearcher,
    strategies: Vec<Strategy>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl PathResolver {
    pub fn new(settings: &Settings) -> Self {
        Self {
            catalog: settings.catalog.clone(),
            searcher: CandidateSearcher::new(settings.scan),
            strategies: strategy::default_chain(),
        }
    }

    /// Replace the strategy chain (order matters: first hit wins)
    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Resolve `recorded` against `base_dir`
    pub fn resolve(&self, base_dir: &Path, recorded: &str) -> Option<PathBuf> {
        self.resolve_traced(base_dir, recorded).map(|r| r.path)
    }

    /// Like [`resolve`](Self::resolve), also naming the winning strategy
    pub fn resolve_traced(&self, base_dir: &Path, recorded: &str) -> Option<Resolution> {
        if recorded.trim().is_empty() {
            return None;
        }

        let ctx = StrategyContext {
            catalog: &self.catalog,
            searcher: &self.searcher,
        };

        for strategy in &self.strategies {
            let Some(path) = (strategy.run)(&ctx, base_dir, recorded) else {
                continue;
            };

            if !stem_is_acceptable(recorded, &path) {
                warn!(
                    "Rejected {} from '{}' for {}: file stem differs",
                    path.display(),
                    strategy.name,
                    recorded
                );
                continue;
            }

            debug!("Resolved {} via {} -> {}", recorded, strategy.name, path.display());
            return Some(Resolution {
                path,
                strategy: strategy.name,
            });
        }

        debug!("No match for {} under {}", recorded, base_dir.display());
        None
    }
}

/// Only the requested stem or its `_viz` render may be returned
fn stem_is_acceptable(recorded: &str, found: &Path) -> bool {
    let Some(name) = strategy::recorded_file_name(recorded) else {
        return false;
    };
    let (wanted, _) = pattern::split_name(&name);
    let Some(found) = found.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };

    found == wanted || found == format!("{wanted}{}", strategy::VIZ_SUFFIX)
}
