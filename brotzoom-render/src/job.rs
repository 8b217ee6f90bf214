//! Values exchanged between the scheduler and its workers.

use brotzoom_core::{FractalParams, RasterSize, Viewport};

use crate::tile::Tile;

/// One tile's worth of work: everything a worker needs, by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileJob {
    /// Render generation this job belongs to; stamped by the scheduler.
    pub epoch: u64,
    pub tile: Tile,
    pub viewport: Viewport,
    pub inverse_width: f64,
    pub inverse_height: f64,
    pub max_iterations: u32,
}

impl TileJob {
    pub fn new(tile: Tile, viewport: Viewport, raster: &RasterSize, params: FractalParams) -> Self {
        Self {
            epoch: 0,
            tile,
            viewport,
            inverse_width: raster.inverse_width(),
            inverse_height: raster.inverse_height(),
            max_iterations: params.max_iterations,
        }
    }

    /// One job per tile, all sharing the same viewport.
    pub fn for_tiles(
        tiles: &[Tile],
        viewport: Viewport,
        raster: &RasterSize,
        params: FractalParams,
    ) -> Vec<Self> {
        tiles
            .iter()
            .map(|&tile| Self::new(tile, viewport, raster, params))
            .collect()
    }

    pub(crate) fn stamped(self, epoch: u64) -> Self {
        Self { epoch, ..self }
    }
}

/// RGBA pixels for one tile, row-major, `tile.width * tile.height * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResult {
    pub epoch: u64,
    pub tile: Tile,
    pub pixels: Vec<u8>,
}

/// A tile whose kernel returned an error, panicked, or produced a buffer of
/// the wrong size.
///
/// Carries the original job so the caller can hand it back for a retry.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFailure {
    pub epoch: u64,
    pub job: TileJob,
    pub reason: String,
}

/// What the per-tile callback receives for each tile of the active batch.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    Rendered(TileResult),
    Failed(TileFailure),
}

impl TileOutcome {
    pub fn epoch(&self) -> u64 {
        match self {
            Self::Rendered(r) => r.epoch,
            Self::Failed(f) => f.epoch,
        }
    }

    pub fn tile(&self) -> Tile {
        match self {
            Self::Rendered(r) => r.tile,
            Self::Failed(f) => f.job.tile,
        }
    }
}
