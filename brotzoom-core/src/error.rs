use thiserror::Error;

/// Errors raised at the core call boundary, before any tile work exists.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid max iterations: {0} (must be >= 1)")]
    InvalidMaxIterations(u32),

    #[error("invalid escape radius: {0} (must be > 0.0)")]
    InvalidEscapeRadius(f64),

    #[error("invalid viewport: {reason}")]
    InvalidViewport { reason: String },

    #[error("invalid aspect ratio: {0} (must be positive and finite)")]
    InvalidAspectRatio(f64),

    #[error("invalid raster dimensions: {width}×{height}")]
    InvalidRaster { width: u32, height: u32 },

    #[error("degenerate selection: start and end are the same point")]
    DegenerateSelection,
}
