use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Pixel dimensions of the output raster.
///
/// Every mapping between raster pixels and the complex plane goes through
/// the inverse dimensions, which are computed once here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32,
}

impl RasterSize {
    pub fn new(width: u32, height: u32) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidRaster { width, height });
        }
        Ok(Self { width, height })
    }

    /// Derive the raster from a layout box measured in CSS-style pixels and
    /// the device pixel ratio.
    ///
    /// The raster is sized in device pixels so one raster pixel maps to one
    /// physical pixel. Each side is rounded and then clamped to at least 1,
    /// so a box that is merely tiny still yields a usable raster; a box with
    /// a zero side is rejected.
    pub fn from_device_pixels(
        content_width: f64,
        content_height: f64,
        device_pixel_ratio: f64,
    ) -> crate::Result<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(content_width) || !valid(content_height) || !valid(device_pixel_ratio) {
            return Err(CoreError::InvalidRaster {
                width: content_width.max(0.0) as u32,
                height: content_height.max(0.0) as u32,
            });
        }
        let width = (content_width * device_pixel_ratio).round().max(1.0) as u32;
        let height = (content_height * device_pixel_ratio).round().max(1.0) as u32;
        Self::new(width, height)
    }

    #[inline]
    pub fn inverse_width(&self) -> f64 {
        1.0 / self.width as f64
    }

    #[inline]
    pub fn inverse_height(&self) -> f64 {
        1.0 / self.height as f64
    }

    /// Width / height; the aspect the viewport must be locked to.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
