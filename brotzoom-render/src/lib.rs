pub mod buffer;
pub mod error;
pub mod export;
pub mod job;
pub mod kernel;
pub mod palette;
pub mod renderer;
pub mod scheduler;
pub mod tile;

pub use buffer::RenderBuffer;
pub use error::RenderError;
pub use export::{export_png, ExportMetadata};
pub use job::{TileFailure, TileJob, TileOutcome, TileResult};
pub use kernel::{compute_tile, compute_tile_until, EscapeTimeKernel, TileKernel};
pub use palette::{builtin_palette, builtin_palettes, ColorParams, Palette, INTERIOR_COLOR};
pub use renderer::{render_blocking, RenderOutput, RenderRequest};
pub use scheduler::{BatchHandle, BatchStatus, BatchSummary, SchedulerStats, TileScheduler};
pub use tile::{build_tile_grid, decompose, Tile, TILE_SIZE};

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
