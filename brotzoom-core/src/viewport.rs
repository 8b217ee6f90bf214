use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::error::CoreError;
use crate::raster::RasterSize;

/// A requested rectangle on the complex plane, not yet fitted to a raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_re: f64,
    pub max_re: f64,
    pub min_im: f64,
    pub max_im: f64,
}

impl Bounds {
    /// The whole set with a little room on the right: `[-2.25, 0.75] × [-1, 1]`.
    pub const MANDELBROT: Self = Self {
        min_re: -2.25,
        max_re: 0.75,
        min_im: -1.0,
        max_im: 1.0,
    };

    pub fn new(min_re: f64, max_re: f64, min_im: f64, max_im: f64) -> Self {
        Self {
            min_re,
            max_re,
            min_im,
            max_im,
        }
    }

    fn validate(&self) -> crate::Result<()> {
        let all_finite = [self.min_re, self.max_re, self.min_im, self.max_im]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(CoreError::InvalidViewport {
                reason: format!("bounds must be finite, got {self:?}"),
            });
        }
        if self.max_re <= self.min_re {
            return Err(CoreError::InvalidViewport {
                reason: format!(
                    "real extent must be positive, got [{}, {}]",
                    self.min_re, self.max_re
                ),
            });
        }
        if self.max_im <= self.min_im {
            return Err(CoreError::InvalidViewport {
                reason: format!(
                    "imaginary extent must be positive, got [{}, {}]",
                    self.min_im, self.max_im
                ),
            });
        }
        Ok(())
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::MANDELBROT
    }
}

/// The visible rectangle of the complex plane, aspect-locked to the raster.
///
/// `length_re / length_im` always equals the aspect ratio it was computed
/// for. A viewport is never mutated; a zoom or resize builds a new one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    min_re: f64,
    max_re: f64,
    min_im: f64,
    max_im: f64,
    center_re: f64,
    center_im: f64,
    length_re: f64,
    length_im: f64,
}

impl Viewport {
    /// Fit `bounds` to `aspect_ratio` around its own center.
    ///
    /// Whichever length is too small relative to the other is grown; nothing
    /// is ever shrunk, so the result always contains the requested
    /// rectangle.
    pub fn compute(bounds: Bounds, aspect_ratio: f64) -> crate::Result<Self> {
        if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
            return Err(CoreError::InvalidAspectRatio(aspect_ratio));
        }
        bounds.validate()?;
        Ok(Self::fit(bounds, aspect_ratio))
    }

    /// [`compute`](Self::compute) with the aspect ratio of `raster`.
    pub fn for_raster(bounds: Bounds, raster: &RasterSize) -> crate::Result<Self> {
        Self::compute(bounds, raster.aspect_ratio())
    }

    /// The default Mandelbrot view fitted to `raster`.
    pub fn default_mandelbrot(raster: &RasterSize) -> Self {
        Self::fit(Bounds::MANDELBROT, raster.aspect_ratio())
    }

    fn fit(bounds: Bounds, aspect_ratio: f64) -> Self {
        let center_re = (bounds.min_re + bounds.max_re) / 2.0;
        let center_im = (bounds.min_im + bounds.max_im) / 2.0;

        let mut length_re = bounds.max_re - bounds.min_re;
        let mut length_im = bounds.max_im - bounds.min_im;

        if length_re / length_im < aspect_ratio {
            length_re = length_im * aspect_ratio;
        } else {
            length_im = length_re / aspect_ratio;
        }

        let half_re = length_re / 2.0;
        let half_im = length_im / 2.0;

        Self {
            min_re: center_re - half_re,
            max_re: center_re + half_re,
            min_im: center_im - half_im,
            max_im: center_im + half_im,
            center_re,
            center_im,
            length_re,
            length_im,
        }
    }

    #[inline]
    pub fn min_re(&self) -> f64 {
        self.min_re
    }

    #[inline]
    pub fn max_re(&self) -> f64 {
        self.max_re
    }

    #[inline]
    pub fn min_im(&self) -> f64 {
        self.min_im
    }

    #[inline]
    pub fn max_im(&self) -> f64 {
        self.max_im
    }

    #[inline]
    pub fn center_re(&self) -> f64 {
        self.center_re
    }

    #[inline]
    pub fn center_im(&self) -> f64 {
        self.center_im
    }

    #[inline]
    pub fn length_re(&self) -> f64 {
        self.length_re
    }

    #[inline]
    pub fn length_im(&self) -> f64 {
        self.length_im
    }

    pub fn center(&self) -> Complex {
        Complex::new(self.center_re, self.center_im)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.min_re, self.max_re, self.min_im, self.max_im)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.length_re / self.length_im
    }

    /// Map a raster position to the complex plane.
    ///
    /// Raster y grows downward while the imaginary axis grows upward, so the
    /// imaginary part is measured down from `max_im`.
    #[inline]
    pub fn pixel_to_complex(&self, px: f64, py: f64, inverse_width: f64, inverse_height: f64) -> Complex {
        Complex::new(
            self.min_re + self.length_re * px * inverse_width,
            self.max_im - self.length_im * py * inverse_height,
        )
    }

    /// Refit the same center and extent to a new aspect ratio (after a resize).
    pub fn refit(&self, aspect_ratio: f64) -> crate::Result<Self> {
        Self::compute(self.bounds(), aspect_ratio)
    }
}
