use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use brotzoom_core::{Bounds, FractalParams, RasterSize};
use brotzoom_render::{builtin_palette, ColorParams, Palette, TILE_SIZE};

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Startup configuration, stored as `preferences.json` next to the executable.
///
/// Every field has a serde default so older or hand-trimmed files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_raster_width")]
    pub raster_width: u32,
    #[serde(default = "default_raster_height")]
    pub raster_height: u32,
    #[serde(default = "default_tile_size")]
    pub tile_width: u32,
    #[serde(default = "default_tile_size")]
    pub tile_height: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Worker threads. `None` uses the hardware parallelism.
    #[serde(default)]
    pub worker_count: Option<usize>,
    #[serde(default)]
    pub palette_index: usize,
    #[serde(default = "default_true")]
    pub smooth_coloring: bool,
    #[serde(default = "default_cycle_length")]
    pub cycle_length: f64,
    #[serde(default)]
    pub initial_bounds: Bounds,
    /// Where frames are exported. When empty, an `images/` folder next to
    /// the executable is used.
    #[serde(default)]
    pub output_dir: String,
}

fn default_raster_width() -> u32 {
    960
}
fn default_raster_height() -> u32 {
    640
}
fn default_tile_size() -> u32 {
    TILE_SIZE
}
fn default_max_iterations() -> u32 {
    FractalParams::DEFAULT_MAX_ITERATIONS
}
fn default_true() -> bool {
    true
}
fn default_cycle_length() -> f64 {
    256.0
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            raster_width: default_raster_width(),
            raster_height: default_raster_height(),
            tile_width: default_tile_size(),
            tile_height: default_tile_size(),
            max_iterations: default_max_iterations(),
            worker_count: None,
            palette_index: 0,
            smooth_coloring: true,
            cycle_length: default_cycle_length(),
            initial_bounds: Bounds::default(),
            output_dir: String::new(),
        }
    }
}

impl Preferences {
    /// Load preferences from next to the executable, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Load from `path`. A missing, unreadable or corrupt file yields
    /// defaults; the problem is logged.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!("No preferences file at {}", path.display());
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<Preferences>(&json) {
                Ok(prefs) => {
                    info!("Loaded preferences from {}", path.display());
                    return prefs;
                }
                Err(e) => error!("Failed to parse preferences: {e}"),
            },
            Err(e) => error!("Failed to read preferences file: {e}"),
        }
        Self::default()
    }

    /// Persist preferences next to the executable. Returns the path written.
    pub fn save(&self) -> crate::error::Result<PathBuf> {
        let path = config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        debug!("Saved preferences to {}", path.display());
        Ok(())
    }

    pub fn raster(&self) -> brotzoom_core::Result<RasterSize> {
        RasterSize::new(self.raster_width, self.raster_height)
    }

    pub fn fractal_params(&self) -> brotzoom_core::Result<FractalParams> {
        FractalParams::new(self.max_iterations)
    }

    /// The selected builtin palette with the configured colouring applied.
    pub fn palette(&self) -> Palette {
        builtin_palette(self.palette_index)
            .with_params(ColorParams::new(self.smooth_coloring, self.cycle_length))
    }

    pub fn output_directory(&self) -> PathBuf {
        if self.output_dir.is_empty() {
            crate::app_dir::images_directory()
        } else {
            PathBuf::from(&self.output_dir)
        }
    }
}

fn config_path() -> PathBuf {
    crate::app_dir::exe_directory().join("preferences.json")
}
