/// Review session settings
///
/// Settings are stored as a JSON document. Every field has a default, so a
/// partial file (or no file at all) is always usable. The default location is:
/// - Linux: ~/.config/vision-review/settings.json
/// - macOS: ~/Library/Application Support/vision-review/settings.json
/// - Windows: %APPDATA%\vision-review\settings.json
///
/// `$VISION_REVIEW_CONFIG` overrides the location.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Result, ReviewError};

/// Environment variable that points at an explicit settings file
pub const CONFIG_ENV: &str = "VISION_REVIEW_CONFIG";

/// Accepted debounce window for batched label saves
const DEBOUNCE_MIN_MS: u64 = 150;
const DEBOUNCE_MAX_MS: u64 = 500;

/// Known folder names used by the structural resolution step.
///
/// Datasets captured on the inspection line are laid out as
/// `<number>/<part1>/<unit_group>/<unit>/<type>/<file>`, e.g.
/// `1/0001/Unit/U12/BC/p0001.bmp`. Only the names listed here are tried.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FolderCatalog {
    /// Unit folders, in the order they are tried
    pub unit_folders: Vec<String>,
    /// Type folders (BC, FC, DC), in the order they are tried
    pub type_folders: Vec<String>,
    /// Fixed folder between `part1` and the unit folder
    pub unit_group: String,
    /// `part1` values tried after the one taken from the recorded path
    pub fallback_part1: Vec<String>,
    /// How many `part1` values are enumerated
    pub max_part1: usize,
    /// How many unit folders are enumerated
    pub max_units: usize,
    /// Also list the unit-group directory on disk and try what is found there
    pub discover_units: bool,
}

impl Default for FolderCatalog {
    fn default() -> Self {
        let units = [
            "U0", "U1", "U2", "U6", "U7", "U8", "U9", "U10", "U11", "U12", "U13", "U14", "U15",
            "U16", "U19",
        ];
        Self {
            unit_folders: units.iter().map(|s| s.to_string()).collect(),
            type_folders: vec!["BC".into(), "FC".into(), "DC".into()],
            unit_group: "Unit".into(),
            fallback_part1: vec!["0001".into(), "0002".into(), "0003".into()],
            max_part1: 3,
            max_units: 10,
            discover_units: false,
        }
    }
}

/// Bounds for the recursive basename scan
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ScanLimits {
    /// Maximum directory depth below the scan root
    pub max_depth: usize,
    /// Maximum number of directory entries visited per subtree
    pub max_entries: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_depth: 12,
            max_entries: 200_000,
        }
    }
}

/// All tunables for a review session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub catalog: FolderCatalog,
    pub scan: ScanLimits,
    /// Quiet period before queued label edits are written (milliseconds)
    pub debounce_ms: u64,
    /// Longest edge of generated thumbnails (pixels)
    pub thumbnail_edge: u32,
    /// Number of decoded images kept in memory by the viewer
    pub image_cache_capacity: usize,
    /// Dataset column holding the recorded image path
    pub path_column: String,
    /// Dataset columns restored from the label store on startup
    pub label_columns: Vec<String>,
    /// Cell values treated as "no value" when restoring labels
    pub no_value_sentinels: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog: FolderCatalog::default(),
            scan: ScanLimits::default(),
            debounce_ms: DEBOUNCE_MAX_MS,
            thumbnail_edge: 1024,
            image_cache_capacity: 36,
            path_column: "File_path".into(),
            label_columns: vec!["label".into()],
            no_value_sentinels: ["nan", "NaN", "None", "NA", "<NA>", "null"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Settings {
    /// Read settings from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ReviewError::io(path, e))?;
        let settings: Settings =
            serde_json::from_str(&raw).map_err(|e| ReviewError::json(path, e))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from `$VISION_REVIEW_CONFIG` or the default location,
    /// falling back to defaults if nothing usable is found
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load(&path) {
            Ok(settings) => {
                info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("Ignoring settings file: {}", e);
                Self::default()
            }
        }
    }

    /// Where the settings file is expected to live
    pub fn default_path() -> Option<PathBuf> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(explicit));
        }
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("vision-review");
        path.push("settings.json");
        Some(path)
    }

    /// Debounce window, clamped into the range the save buffer supports
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.clamp(DEBOUNCE_MIN_MS, DEBOUNCE_MAX_MS))
    }

    fn validate(&self) -> Result<()> {
        if self.catalog.type_folders.is_empty() {
            return Err(ReviewError::Config("catalog.type_folders is empty".into()));
        }
        if self.thumbnail_edge == 0 {
            return Err(ReviewError::Config("thumbnail_edge must be positive".into()));
        }
        if self.path_column.trim().is_empty() {
            return Err(ReviewError::Config("path_column is empty".into()));
        }
        Ok(())
    }
}
