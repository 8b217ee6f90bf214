pub mod complex;
pub mod error;
pub mod fractal;
pub mod mandelbrot;
pub mod raster;
pub mod selection;
pub mod viewport;

// Re-export primary types for convenience.
pub use complex::Complex;
pub use error::CoreError;
pub use fractal::{FractalParams, IterationResult};
pub use mandelbrot::Mandelbrot;
pub use raster::RasterSize;
pub use selection::{map_selection, zoom_to_selection, Selection};
pub use viewport::{Bounds, Viewport};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
