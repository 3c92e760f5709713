/// Logging setup
///
/// Everything in the crate logs through `tracing`. Binaries and embedding
/// applications call [`init`] once at startup; library code never installs a
/// subscriber on its own.
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "vision_review=info";

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once: later calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
