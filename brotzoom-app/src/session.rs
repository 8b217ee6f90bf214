//! An explorer session: the current view, the raster it is drawn into, and
//! the scheduler drawing it.
//!
//! Collaborator events (drag updates, finalized selections, resizes) come in
//! as method calls; each one that changes the view submits a new batch and
//! supersedes whatever was still rendering.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use brotzoom_core::{zoom_to_selection, Bounds, FractalParams, RasterSize, Selection, Viewport};
use brotzoom_render::{
    BatchHandle, BatchStatus, BatchSummary, RenderBuffer, RenderRequest, SchedulerStats,
    TileFailure, TileOutcome, TileScheduler,
};

use crate::error::Result;
use crate::preferences::Preferences;

pub struct ExplorerSession {
    scheduler: TileScheduler,
    raster: RasterSize,
    viewport: Viewport,
    params: FractalParams,
    tile_width: u32,
    tile_height: u32,
    /// Shared with the active batch's callback, which blits into it.
    buffer: Rc<RefCell<RenderBuffer>>,
    failures: Rc<RefCell<Vec<TileFailure>>>,
    current: Option<BatchHandle>,
    last_summary: Option<BatchSummary>,
}

impl ExplorerSession {
    pub fn new(
        scheduler: TileScheduler,
        raster: RasterSize,
        bounds: Bounds,
        params: FractalParams,
    ) -> Result<Self> {
        let viewport = Viewport::for_raster(bounds, &raster)?;
        Ok(Self {
            scheduler,
            raster,
            viewport,
            params,
            tile_width: brotzoom_render::TILE_SIZE,
            tile_height: brotzoom_render::TILE_SIZE,
            buffer: Rc::new(RefCell::new(RenderBuffer::new(&raster))),
            failures: Rc::new(RefCell::new(Vec::new())),
            current: None,
            last_summary: None,
        })
    }

    /// Build the scheduler and initial view from `prefs`.
    pub fn from_preferences(prefs: &Preferences) -> Result<Self> {
        let scheduler = TileScheduler::with_palette(prefs.worker_count, prefs.palette())?;
        let session = Self::new(
            scheduler,
            prefs.raster()?,
            prefs.initial_bounds,
            prefs.fractal_params()?,
        )?;
        Ok(session.with_tile_size(prefs.tile_width, prefs.tile_height))
    }

    pub fn with_tile_size(self, tile_width: u32, tile_height: u32) -> Self {
        Self {
            tile_width,
            tile_height,
            ..self
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn raster(&self) -> RasterSize {
        self.raster
    }

    pub fn params(&self) -> FractalParams {
        self.params
    }

    pub fn buffer(&self) -> Ref<'_, RenderBuffer> {
        self.buffer.borrow()
    }

    /// Failed tiles of the active batch not yet handed back for retry.
    pub fn failures(&self) -> Ref<'_, Vec<TileFailure>> {
        self.failures.borrow()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Render the current viewport, superseding anything still in flight.
    ///
    /// The buffer is not cleared: the previous frame stays visible until the
    /// new tiles overwrite it.
    pub fn render(&mut self) -> Result<BatchHandle> {
        let request = RenderRequest::new(self.viewport, self.raster, self.params)
            .with_tile_size(self.tile_width, self.tile_height);
        let jobs = request.jobs()?;

        self.failures.borrow_mut().clear();
        let buffer = Rc::clone(&self.buffer);
        let failures = Rc::clone(&self.failures);
        let handle = self.scheduler.submit(jobs, move |outcome| match outcome {
            TileOutcome::Rendered(result) => buffer.borrow_mut().write_result(&result),
            TileOutcome::Failed(failure) => failures.borrow_mut().push(failure),
        });

        debug!(
            epoch = handle.epoch(),
            center_re = self.viewport.center_re(),
            center_im = self.viewport.center_im(),
            "Render submitted"
        );
        self.current = Some(handle);
        Ok(handle)
    }

    /// Block until the active batch completes.
    pub fn wait(&mut self) -> Option<BatchSummary> {
        let status = self.scheduler.wait(self.current?);
        self.record(status)
    }

    fn record(&mut self, status: BatchStatus) -> Option<BatchSummary> {
        match status {
            BatchStatus::Complete(summary) => {
                self.last_summary = Some(summary);
                Some(summary)
            }
            BatchStatus::Pending | BatchStatus::Superseded => None,
        }
    }

    /// The viewport a live drag would zoom to, without rendering anything.
    pub fn preview_selection(&self, selection: &Selection) -> Result<Viewport> {
        let selection = selection.clamp_to(&self.raster);
        Ok(zoom_to_selection(&self.viewport, &selection, &self.raster)?)
    }

    /// Zoom to a finished drag and re-render.
    ///
    /// A rejected selection leaves the view and the in-flight render alone.
    pub fn finalize_selection(&mut self, selection: &Selection) -> Result<BatchHandle> {
        let viewport = self.preview_selection(selection).map_err(|e| {
            warn!("Ignoring selection {selection:?}: {e}");
            e
        })?;
        info!(
            "Zoom to re [{:.8}, {:.8}] im [{:.8}, {:.8}]",
            viewport.min_re(),
            viewport.max_re(),
            viewport.min_im(),
            viewport.max_im()
        );
        self.viewport = viewport;
        self.render()
    }

    /// Adopt a new raster size: refit the view to its aspect ratio,
    /// reallocate the buffer and re-render.
    pub fn resize(&mut self, raster: RasterSize) -> Result<BatchHandle> {
        if raster == self.raster {
            debug!("Resize to the same raster, re-rendering only");
            return self.render();
        }
        self.viewport = self.viewport.refit(raster.aspect_ratio())?;
        self.raster = raster;
        *self.buffer.borrow_mut() = RenderBuffer::new(&raster);
        info!(width = raster.width, height = raster.height, "Raster resized");
        self.render()
    }

    /// Hand every recorded failure back to the scheduler. Returns how many
    /// were accepted; failures from a superseded batch are dropped.
    pub fn retry_failed(&mut self) -> usize {
        let failures: Vec<TileFailure> = self.failures.borrow_mut().drain(..).collect();
        let mut accepted = 0;
        for failure in failures {
            if self.scheduler.retry(failure) {
                accepted += 1;
            }
        }
        if accepted > 0 {
            info!(tiles = accepted, "Retrying failed tiles");
        }
        accepted
    }

    pub fn readout(&self) -> Readout {
        Readout {
            min_re: self.viewport.min_re(),
            max_re: self.viewport.max_re(),
            min_im: self.viewport.min_im(),
            max_im: self.viewport.max_im(),
            center_re: self.viewport.center_re(),
            center_im: self.viewport.center_im(),
            render_time: self.last_summary.map(|s| s.elapsed),
        }
    }
}

// ---------------------------------------------------------------------------
// Readout
// ---------------------------------------------------------------------------

/// Numeric view readout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readout {
    pub min_re: f64,
    pub max_re: f64,
    pub min_im: f64,
    pub max_im: f64,
    pub center_re: f64,
    pub center_im: f64,
    pub render_time: Option<Duration>,
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "re: {:.8}; {:.8}", self.min_re, self.max_re)?;
        writeln!(f, "im: {:.8}; {:.8}", self.min_im, self.max_im)?;
        write!(f, "center: {:.8}; {:.8}", self.center_re, self.center_im)?;
        if let Some(time) = self.render_time {
            write!(f, "\ntime: {:.1}ms", time.as_secs_f64() * 1000.0)?;
        }
        Ok(())
    }
}
