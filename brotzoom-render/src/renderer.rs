use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use brotzoom_core::{FractalParams, RasterSize, Viewport};

use crate::buffer::RenderBuffer;
use crate::error::RenderError;
use crate::job::{TileFailure, TileJob, TileOutcome};
use crate::scheduler::{BatchStatus, BatchSummary, TileScheduler};
use crate::tile::{decompose, TILE_SIZE};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Everything needed to turn one viewport into a batch of tile jobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub viewport: Viewport,
    pub raster: RasterSize,
    pub tile_width: u32,
    pub tile_height: u32,
    pub params: FractalParams,
}

impl RenderRequest {
    /// A request using the default [`TILE_SIZE`] square tiles.
    pub fn new(viewport: Viewport, raster: RasterSize, params: FractalParams) -> Self {
        Self {
            viewport,
            raster,
            tile_width: TILE_SIZE,
            tile_height: TILE_SIZE,
            params,
        }
    }

    pub fn with_tile_size(self, tile_width: u32, tile_height: u32) -> Self {
        Self {
            tile_width,
            tile_height,
            ..self
        }
    }

    /// Decompose the raster and build one unstamped job per tile.
    pub fn jobs(&self) -> crate::Result<Vec<TileJob>> {
        let tiles = decompose(
            self.raster.width,
            self.raster.height,
            self.tile_width,
            self.tile_height,
        )?;
        Ok(TileJob::for_tiles(
            &tiles,
            self.viewport,
            &self.raster,
            self.params,
        ))
    }
}

// ---------------------------------------------------------------------------
// Blocking render
// ---------------------------------------------------------------------------

/// A finished frame.
#[derive(Debug)]
pub struct RenderOutput {
    pub buffer: RenderBuffer,
    pub summary: BatchSummary,
    /// Tiles that failed; their region of `buffer` is left blank.
    pub failures: Vec<TileFailure>,
}

/// Submit `request` and block until every tile has reported.
///
/// Tiles are blitted into a fresh buffer as they arrive. Failed tiles do not
/// fail the frame; they come back in [`RenderOutput::failures`].
pub fn render_blocking(
    scheduler: &mut TileScheduler,
    request: &RenderRequest,
) -> crate::Result<RenderOutput> {
    let jobs = request.jobs()?;
    debug!(
        width = request.raster.width,
        height = request.raster.height,
        tiles = jobs.len(),
        "Blocking render"
    );

    let buffer = Rc::new(RefCell::new(RenderBuffer::new(&request.raster)));
    let failures = Rc::new(RefCell::new(Vec::new()));

    let handle = {
        let buffer = Rc::clone(&buffer);
        let failures = Rc::clone(&failures);
        scheduler.submit(jobs, move |outcome| match outcome {
            TileOutcome::Rendered(result) => buffer.borrow_mut().write_result(&result),
            TileOutcome::Failed(failure) => failures.borrow_mut().push(failure),
        })
    };

    let summary = match scheduler.wait(handle) {
        BatchStatus::Complete(summary) => summary,
        BatchStatus::Pending | BatchStatus::Superseded => {
            return Err(RenderError::Superseded {
                epoch: handle.epoch(),
            })
        }
    };

    // The scheduler still owns the callback (and its clones) until the next
    // submit, so copy out rather than unwrapping the Rc.
    let buffer = buffer.borrow().clone();
    let failures = failures.borrow().clone();
    Ok(RenderOutput {
        buffer,
        summary,
        failures,
    })
}
