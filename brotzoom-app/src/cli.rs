//! Command-line flags for the `brotzoom` driver.
//!
//! Every flag is optional; anything left out comes from `preferences.json`.

use std::path::PathBuf;

use clap::Parser;

use brotzoom_core::Selection;

use crate::preferences::Preferences;

/// Render the Mandelbrot set, then zoom through a sequence of drag selections.
#[derive(Debug, Parser)]
#[command(name = "brotzoom", version, about)]
pub struct Cli {
    /// Raster width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Raster height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Iteration budget per pixel
    #[arg(long = "max-iterations")]
    pub max_iterations: Option<u32>,

    /// Worker threads (default: hardware parallelism)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Device pixel ratio; the raster becomes width×height scaled by it
    #[arg(long = "dpr")]
    pub device_pixel_ratio: Option<f64>,

    /// Builtin palette index
    #[arg(long)]
    pub palette: Option<usize>,

    /// Drag selection in raster pixels, `x0,y0,x1,y1`. Repeat to zoom again.
    #[arg(long = "zoom", value_name = "X0,Y0,X1,Y1", value_parser = parse_selection)]
    pub zooms: Vec<Selection>,

    /// Directory for exported PNG frames
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Skip PNG export, only print readouts
    #[arg(long)]
    pub no_export: bool,

    /// Write the effective settings back to preferences.json
    #[arg(long)]
    pub save_preferences: bool,
}

impl Cli {
    /// Overlay the flags that were given onto `prefs`.
    pub fn apply_to(&self, prefs: &mut Preferences) {
        if let Some(width) = self.width {
            prefs.raster_width = width;
        }
        if let Some(height) = self.height {
            prefs.raster_height = height;
        }
        if let Some(max_iterations) = self.max_iterations {
            prefs.max_iterations = max_iterations;
        }
        if let Some(workers) = self.workers {
            prefs.worker_count = Some(workers);
        }
        if let Some(palette) = self.palette {
            prefs.palette_index = palette;
        }
        if let Some(out) = &self.out {
            prefs.output_dir = out.display().to_string();
        }
    }
}

/// Parse `x0,y0,x1,y1` as the two corners of a drag.
fn parse_selection(value: &str) -> Result<Selection, String> {
    let coords = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("'{}' is not a number: {e}", part.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    match coords.as_slice() {
        &[x0, y0, x1, y1] => Ok(Selection::from_drag((x0, y0), (x1, y1))),
        _ => Err(format!("expected 4 comma-separated values, got {}", coords.len())),
    }
}
