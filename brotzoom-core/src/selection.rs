//! Drag-rectangle to viewport mapping.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::raster::RasterSize;
use crate::viewport::{Bounds, Viewport};

/// A drag rectangle in raster-pixel space with `start <= end` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl Selection {
    /// Build a selection from the pointer-down and current pointer positions,
    /// in whatever order the user dragged them.
    pub fn from_drag(from: (f64, f64), to: (f64, f64)) -> Self {
        Self {
            start_x: from.0.min(to.0),
            start_y: from.1.min(to.1),
            end_x: from.0.max(to.0),
            end_y: from.1.max(to.1),
        }
    }

    /// The whole raster.
    pub fn full(raster: &RasterSize) -> Self {
        Self {
            start_x: 0.0,
            start_y: 0.0,
            end_x: raster.width as f64,
            end_y: raster.height as f64,
        }
    }

    /// A no-op drag: pointer released where it went down.
    pub fn is_degenerate(&self) -> bool {
        self.start_x == self.end_x && self.start_y == self.end_y
    }

    /// Clip the rectangle to the raster.
    pub fn clamp_to(&self, raster: &RasterSize) -> Self {
        let w = raster.width as f64;
        let h = raster.height as f64;
        Self {
            start_x: self.start_x.clamp(0.0, w),
            start_y: self.start_y.clamp(0.0, h),
            end_x: self.end_x.clamp(0.0, w),
            end_y: self.end_y.clamp(0.0, h),
        }
    }

    pub fn width(&self) -> f64 {
        self.end_x - self.start_x
    }

    pub fn height(&self) -> f64 {
        self.end_y - self.start_y
    }
}

/// Convert a raster selection over `viewport` into the plane rectangle it
/// covers.
///
/// Each edge is moved inward from the matching viewport edge by the pixel
/// distance it sits from the raster edge. Raster y grows downward, so the
/// top of the selection (`start_y`) trims `max_im` and the bottom
/// (`end_y`) trims `min_im`. This differs from measuring
/// `start_y` up from `min_im`, which would zoom to the region mirrored
/// about the view's horizontal centre line; a full-canvas selection maps
/// back to the same bounds either way. The result is not aspect-fitted;
/// feed it to [`Viewport::compute`].
pub fn map_selection(viewport: &Viewport, selection: &Selection, raster: &RasterSize) -> Bounds {
    let inverse_width = raster.inverse_width();
    let inverse_height = raster.inverse_height();
    let width = raster.width as f64;
    let height = raster.height as f64;

    let min_re = viewport.min_re() + viewport.length_re() * selection.start_x * inverse_width;
    let max_re =
        viewport.max_re() - viewport.length_re() * (width - selection.end_x) * inverse_width;
    let max_im = viewport.max_im() - viewport.length_im() * selection.start_y * inverse_height;
    let min_im =
        viewport.min_im() + viewport.length_im() * (height - selection.end_y) * inverse_height;

    Bounds::new(min_re, max_re, min_im, max_im)
}

/// Map `selection` and fit the result to the raster's aspect ratio.
///
/// A no-op drag is rejected with [`CoreError::DegenerateSelection`]; a
/// selection with zero extent on one axis fails viewport validation.
pub fn zoom_to_selection(
    viewport: &Viewport,
    selection: &Selection,
    raster: &RasterSize,
) -> crate::Result<Viewport> {
    if selection.is_degenerate() {
        return Err(CoreError::DegenerateSelection);
    }
    let bounds = map_selection(viewport, selection, raster);
    debug!(?selection, ?bounds, "Mapped selection");
    Viewport::for_raster(bounds, raster)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    fn setup() -> (Viewport, RasterSize) {
        let raster = RasterSize::new(300, 200).unwrap();
        let vp = Viewport::for_raster(Bounds::MANDELBROT, &raster).unwrap();
        (vp, raster)
    }

    #[test]
    fn drag_points_are_normalized() {
        let s = Selection::from_drag((120.0, 80.0), (20.0, 150.0));
        assert_eq!(s.start_x, 20.0);
        assert_eq!(s.end_x, 120.0);
        assert_eq!(s.start_y, 80.0);
        assert_eq!(s.end_y, 150.0);
        assert_eq!(s.width(), 100.0);
        assert_eq!(s.height(), 70.0);
    }

    #[test]
    fn full_selection_maps_to_same_viewport() {
        let (vp, raster) = setup();
        let b = map_selection(&vp, &Selection::full(&raster), &raster);
        assert!((b.min_re - vp.min_re()).abs() < EPSILON);
        assert!((b.max_re - vp.max_re()).abs() < EPSILON);
        assert!((b.min_im - vp.min_im()).abs() < EPSILON);
        assert!((b.max_im - vp.max_im()).abs() < EPSILON);
    }

    #[test]
    fn left_half_selection() {
        let (vp, raster) = setup();
        let s = Selection::from_drag((0.0, 0.0), (150.0, 200.0));
        let b = map_selection(&vp, &s, &raster);
        assert!((b.min_re - (-2.25)).abs() < EPSILON);
        assert!((b.max_re - (-0.75)).abs() < EPSILON);
        assert!((b.min_im - (-1.0)).abs() < EPSILON);
        assert!((b.max_im - 1.0).abs() < EPSILON);
    }

    #[test]
    fn top_strip_maps_to_upper_plane() {
        let (vp, raster) = setup();
        // Top quarter of the raster is the top quarter of the plane: im in [0.5, 1].
        let s = Selection::from_drag((0.0, 0.0), (300.0, 50.0));
        let b = map_selection(&vp, &s, &raster);
        assert!((b.max_im - 1.0).abs() < EPSILON);
        assert!((b.min_im - 0.5).abs() < EPSILON);
    }

    #[test]
    fn zoom_fits_aspect() {
        let (vp, raster) = setup();
        let s = Selection::from_drag((100.0, 50.0), (130.0, 150.0));
        let zoomed = zoom_to_selection(&vp, &s, &raster).unwrap();
        assert!((zoomed.aspect_ratio() - raster.aspect_ratio()).abs() < EPSILON);
        // Tall selection: imaginary length kept, real grown.
        assert!((zoomed.length_im() - 1.0).abs() < EPSILON);
        assert!((zoomed.length_re() - 1.5).abs() < EPSILON);
    }

    #[test]
    fn degenerate_selection_rejected() {
        let (vp, raster) = setup();
        let s = Selection::from_drag((42.0, 17.0), (42.0, 17.0));
        assert!(s.is_degenerate());
        assert!(matches!(
            zoom_to_selection(&vp, &s, &raster),
            Err(CoreError::DegenerateSelection)
        ));
    }

    #[test]
    fn zero_width_selection_is_invalid_viewport() {
        let (vp, raster) = setup();
        let s = Selection::from_drag((42.0, 10.0), (42.0, 90.0));
        assert!(!s.is_degenerate());
        assert!(matches!(
            zoom_to_selection(&vp, &s, &raster),
            Err(CoreError::InvalidViewport { .. })
        ));
    }

    #[test]
    fn clamp_clips_to_raster() {
        let raster = RasterSize::new(100, 100).unwrap();
        let s = Selection::from_drag((-10.0, 20.0), (140.0, 130.0)).clamp_to(&raster);
        assert_eq!(s, Selection::from_drag((0.0, 20.0), (100.0, 100.0)));
    }
}
