/// Resolution strategies
///
/// Each strategy maps `(base_dir, recorded_path)` to an existing file or
/// `None`. [`default_chain`] lists them in the order the resolver tries them;
/// the first hit wins.
use std::path::{Path, PathBuf};
use tracing::debug;

use super::pattern::{self, split_name, StructuralComponents};
use super::search::{CandidateSearcher, Pattern};
use crate::config::FolderCatalog;

/// Suffix used by visualisation renders saved next to the source image
pub const VIZ_SUFFIX: &str = "_viz";

/// What a strategy is allowed to look at besides its two arguments
pub struct StrategyContext<'a> {
    pub catalog: &'a FolderCatalog,
    pub searcher: &'a CandidateSearcher,
}

pub type StrategyFn = fn(&StrategyContext<'_>, &Path, &str) -> Option<PathBuf>;

#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub run: StrategyFn,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

pub fn default_chain() -> Vec<Strategy> {
    vec![
        Strategy { name: "absolute", run: absolute_existing },
        Strategy { name: "joined", run: joined_relative },
        Strategy { name: "viz-sibling", run: viz_sibling },
        Strategy { name: "structural", run: structural },
        Strategy { name: "basename-search", run: basename_search },
    ]
}

/// Convert separators and drop a leading dataset version/date segment.
///
/// `"20250801_v0.2/1.bondfinger/0001.jpg"` becomes `"1.bondfinger/0001.jpg"`;
/// single-segment paths are never shortened.
pub fn normalize_relative(recorded: &str) -> String {
    let normalized = recorded.trim().replace('\\', "/");
    match normalized.split_once('/') {
        Some((first, rest)) if first.chars().any(|c| c.is_ascii_digit()) => rest.to_string(),
        _ => normalized,
    }
}

/// The recorded path itself, if it is absolute and present
pub fn absolute_existing(_: &StrategyContext<'_>, _base: &Path, recorded: &str) -> Option<PathBuf> {
    let path = Path::new(recorded.trim());
    (path.is_absolute() && path.exists()).then(|| path.to_path_buf())
}

/// `base_dir / normalize(recorded)`
pub fn joined_relative(_: &StrategyContext<'_>, base: &Path, recorded: &str) -> Option<PathBuf> {
    let rel = normalize_relative(recorded);
    if rel.is_empty() {
        return None;
    }
    let candidate = base.join(&rel);
    candidate.is_file().then_some(candidate)
}

/// `<stem>_viz.png` next to where the joined path would be
pub fn viz_sibling(_: &StrategyContext<'_>, base: &Path, recorded: &str) -> Option<PathBuf> {
    let rel = normalize_relative(recorded);
    if rel.is_empty() {
        return None;
    }
    let joined = base.join(&rel);
    let stem = joined.file_stem()?.to_str()?;
    let candidate = joined.with_file_name(format!("{stem}{VIZ_SUFFIX}.png"));
    candidate.is_file().then_some(candidate)
}

/// Rebuild the recorded file's location under the base directory's sample
/// layout, enumerating the configured unit and type folders
pub fn structural(ctx: &StrategyContext<'_>, base: &Path, recorded: &str) -> Option<PathBuf> {
    let recorded_parts = pattern::parse(recorded)?;
    let base_parts = pattern::parse(&format!("{}/", base.to_string_lossy()))?;

    let file_name = recorded_file_name(recorded)?;
    let candidates = structural_candidates(ctx.catalog, &recorded_parts, &base_parts, &file_name);
    debug!("Structural step: {} candidates for {}", candidates.len(), file_name);

    let patterns: Vec<Pattern> = candidates.into_iter().map(Pattern::Literal).collect();
    ctx.searcher.search_first(&patterns)
}

/// Literal candidate paths for the structural step, most likely first
pub fn structural_candidates(
    catalog: &FolderCatalog,
    recorded: &StructuralComponents,
    base: &StructuralComponents,
    file_name: &str,
) -> Vec<PathBuf> {
    let root = PathBuf::from(format!("{}/{}", base.prefix, base.sample_number));
    let group = base.unit_group.as_deref().unwrap_or(&catalog.unit_group);

    let mut part1s: Vec<String> = Vec::new();
    if let Some(p) = recorded.part1.as_deref() {
        if p.len() == 4 && p.chars().all(|c| c.is_ascii_digit()) {
            part1s.push(p.to_string());
        }
    }
    part1s.push(base.part1.clone().unwrap_or_else(|| "0001".to_string()));
    part1s.extend(catalog.fallback_part1.iter().cloned());
    dedup_in_place(&mut part1s);
    part1s.truncate(catalog.max_part1);

    let mut units: Vec<String> = Vec::new();
    if let Some(u) = recorded.unit_folder.as_deref() {
        if u.starts_with('U') {
            units.push(u.to_string());
        }
    }
    units.extend(catalog.unit_folders.iter().cloned());
    if catalog.discover_units {
        if let Some(first) = part1s.first() {
            units.extend(discover_unit_folders(&root.join(first).join(group)));
        }
    }
    dedup_in_place(&mut units);
    units.truncate(catalog.max_units);

    let mut candidates = Vec::with_capacity(part1s.len() * units.len() * catalog.type_folders.len());
    for part1 in &part1s {
        for unit in &units {
            for type_folder in &catalog.type_folders {
                candidates.push(
                    root.join(part1)
                        .join(group)
                        .join(unit)
                        .join(type_folder)
                        .join(file_name),
                );
            }
        }
    }
    candidates
}

/// Sub-directories of the unit group folder, sorted by name
fn discover_unit_folders(group_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(group_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

/// Scan the base directory for the file name, then the same stem with any
/// extension, then the `_viz` render
pub fn basename_search(ctx: &StrategyContext<'_>, base: &Path, recorded: &str) -> Option<PathBuf> {
    let file_name = recorded_file_name(recorded)?;
    let (stem, _) = split_name(&file_name);
    if stem.is_empty() {
        return None;
    }

    let escaped = glob::Pattern::escape(&stem);
    let mut patterns = vec![
        Pattern::wildcard(base, glob::Pattern::escape(&file_name)),
        Pattern::wildcard_with_stem(base, format!("{escaped}.*"), stem.clone()),
    ];
    if !stem.ends_with(VIZ_SUFFIX) {
        patterns.push(Pattern::wildcard_with_stem(
            base,
            format!("{escaped}{VIZ_SUFFIX}.*"),
            format!("{stem}{VIZ_SUFFIX}"),
        ));
    }

    ctx.searcher.search_first(&patterns)
}

/// Last segment of the normalized recorded path
pub fn recorded_file_name(recorded: &str) -> Option<String> {
    let rel = normalize_relative(recorded);
    let name = rel.trim_end_matches('/').rsplit('/').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

fn dedup_in_place(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
