//! The escape-time kernel a worker runs for one tile.
//!
//! Pure: output depends only on the job and the palette, so tiles can run
//! on any thread in any order and a repeated job yields identical bytes.

use brotzoom_core::{FractalParams, Mandelbrot};

use crate::error::RenderError;
use crate::job::TileJob;
use crate::palette::Palette;

/// The per-tile computation a scheduler's workers run.
///
/// Implementations must be pure with respect to the job: same job, same
/// bytes. Returning `Ok(None)` means the work was abandoned because
/// `keep_going` reported `false`.
pub trait TileKernel: Send + Sync {
    fn render(
        &self,
        job: &TileJob,
        keep_going: &dyn Fn() -> bool,
    ) -> crate::Result<Option<Vec<u8>>>;
}

/// Mandelbrot escape-time colouring through a [`Palette`].
#[derive(Debug, Clone, Default)]
pub struct EscapeTimeKernel {
    palette: Palette,
}

impl EscapeTimeKernel {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

impl TileKernel for EscapeTimeKernel {
    fn render(
        &self,
        job: &TileJob,
        keep_going: &dyn Fn() -> bool,
    ) -> crate::Result<Option<Vec<u8>>> {
        compute_tile_until(job, &self.palette, keep_going)
    }
}

/// Compute the RGBA pixels of `job`'s tile.
pub fn compute_tile(job: &TileJob, palette: &Palette) -> crate::Result<Vec<u8>> {
    Ok(compute_tile_until(job, palette, || true)?.unwrap_or_default())
}

/// Like [`compute_tile`], but checks `keep_going` before every row and
/// returns `Ok(None)` as soon as it reports `false`.
pub fn compute_tile_until<F>(
    job: &TileJob,
    palette: &Palette,
    keep_going: F,
) -> crate::Result<Option<Vec<u8>>>
where
    F: Fn() -> bool,
{
    validate(job)?;

    let fractal = Mandelbrot::new(FractalParams::new(job.max_iterations)?);
    let tile = job.tile;
    let mut pixels = Vec::with_capacity(tile.pixel_count() * 4);

    for py in 0..tile.height {
        if !keep_going() {
            return Ok(None);
        }
        let y = (tile.y + py) as f64;
        for px in 0..tile.width {
            let x = (tile.x + px) as f64;
            let c = job
                .viewport
                .pixel_to_complex(x, y, job.inverse_width, job.inverse_height);
            pixels.extend_from_slice(&palette.color(fractal.iterate(c)));
        }
    }
    Ok(Some(pixels))
}

fn validate(job: &TileJob) -> crate::Result<()> {
    let tile = job.tile;
    if tile.width == 0 || tile.height == 0 {
        return Err(RenderError::InvalidJob {
            reason: format!("empty tile {}×{} at ({}, {})", tile.width, tile.height, tile.x, tile.y),
        });
    }
    let inverse_ok = |v: f64| v.is_finite() && v > 0.0;
    if !inverse_ok(job.inverse_width) || !inverse_ok(job.inverse_height) {
        return Err(RenderError::InvalidJob {
            reason: format!(
                "raster inverse dimensions must be positive, got {}×{}",
                job.inverse_width, job.inverse_height
            ),
        });
    }
    // The tile must sit inside the raster the inverse dimensions describe.
    let right = (tile.x + tile.width) as f64 * job.inverse_width;
    let bottom = (tile.y + tile.height) as f64 * job.inverse_height;
    if right > 1.0 + 1e-9 || bottom > 1.0 + 1e-9 {
        return Err(RenderError::InvalidJob {
            reason: format!(
                "tile at ({}, {}) size {}×{} extends past the raster",
                tile.x, tile.y, tile.width, tile.height
            ),
        });
    }
    Ok(())
}
