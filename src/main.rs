use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use vision_review::store::{select_store_path, LabelStore, ResumeMerger};
use vision_review::{logging, Dataset, PathResolver, Settings};

/// Inference CSV to check
const CSV_ENV: &str = "VISION_REVIEW_CSV";
/// Images base directory the CSV paths are resolved against
const IMAGES_ENV: &str = "VISION_REVIEW_IMAGES";

/// How many unresolved rows are listed individually
const MISS_SAMPLE: usize = 20;

/// Result of a matching run over one dataset
#[derive(Debug, Clone, Default)]
struct ProbeResult {
    resolved: usize,
    missing: Vec<(usize, String)>,
    blank: usize,
}

fn main() -> ExitCode {
    logging::init();

    let (Some(csv_path), Some(images_base)) = (env_path(CSV_ENV), env_path(IMAGES_ENV)) else {
        error!("Set {} and {} to run a matching probe", CSV_ENV, IMAGES_ENV);
        return ExitCode::FAILURE;
    };

    let settings = Settings::load_or_default();
    let mut dataset = match Dataset::from_csv_path(&csv_path) {
        Ok(dataset) => dataset,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let resolver = PathResolver::new(&settings);
    let result = probe(&resolver, &dataset, &images_base, &settings.path_column);

    info!(
        "Match summary: {} resolved, {} missing, {} without a path",
        result.resolved,
        result.missing.len(),
        result.blank
    );
    for (row, recorded) in result.missing.iter().take(MISS_SAMPLE) {
        warn!("Row {}: no image for {}", row, recorded);
    }

    let store_path = select_store_path(&csv_path);
    let store = LabelStore::load(&store_path);
    let report = ResumeMerger::from_settings(&settings).merge(&store, &mut dataset);
    info!(
        "Label store {}: {} entries, {} cells would be restored",
        store_path.display(),
        store.labels.len(),
        report.filled
    );

    ExitCode::SUCCESS
}

/// Resolve every row's recorded path
fn probe(resolver: &PathResolver, dataset: &Dataset, images_base: &std::path::Path, column: &str) -> ProbeResult {
    let mut result = ProbeResult::default();

    for row in 0..dataset.len() {
        let Some(recorded) = dataset.recorded_path(row, column) else {
            result.blank += 1;
            continue;
        };

        match resolver.resolve(images_base, recorded) {
            Some(_) => {
                result.resolved += 1;
                if result.resolved % 1000 == 0 {
                    info!("Resolved {} rows...", result.resolved);
                }
            }
            None => result.missing.push((row, recorded.to_string())),
        }
    }

    result
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name).map(PathBuf::from)
}
