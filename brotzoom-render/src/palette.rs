use brotzoom_core::IterationResult;

const LUT_SIZE: usize = 256;

/// Colour of points that never escape.
pub const INTERIOR_COLOR: [u8; 4] = [0, 0, 0, 255];

/// How escape counts are turned into a position along the palette.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorParams {
    /// Use the fractional (renormalised) escape count instead of the integer one.
    pub smooth: bool,
    /// Iterations per full trip around the palette.
    pub cycle_length: f64,
}

impl ColorParams {
    pub const DEFAULT_CYCLE_LENGTH: f64 = 64.0;

    pub fn new(smooth: bool, cycle_length: f64) -> Self {
        Self {
            smooth,
            cycle_length,
        }
    }
}

impl Default for ColorParams {
    fn default() -> Self {
        Self::new(true, Self::DEFAULT_CYCLE_LENGTH)
    }
}

/// A colour palette backed by a gradient lookup table.
///
/// The palette is a ring of `LUT_SIZE` colours; an escape count picks a
/// fractional position on the ring and the two neighbouring entries are
/// blended. Colour depends on the iteration result alone, so identical
/// tiles always colour identically.
#[derive(Debug, Clone)]
pub struct Palette {
    pub name: &'static str,
    colors: Vec<[u8; 4]>,
    params: ColorParams,
}

impl Palette {
    /// Build a palette from a non-empty colour ring.
    pub fn new(name: &'static str, colors: Vec<[u8; 4]>) -> Option<Self> {
        if colors.is_empty() {
            return None;
        }
        Some(Self {
            name,
            colors,
            params: ColorParams::default(),
        })
    }

    /// Return a copy using different colouring parameters.
    pub fn with_params(self, params: ColorParams) -> Self {
        Self { params, ..self }
    }

    pub fn params(&self) -> &ColorParams {
        &self.params
    }

    /// Map one iteration result to RGBA.
    pub fn color(&self, result: IterationResult) -> [u8; 4] {
        match result {
            IterationResult::Interior => INTERIOR_COLOR,
            IterationResult::Escaped {
                iterations,
                norm_sq,
            } => {
                let t = if self.params.smooth {
                    smooth_iteration(iterations, norm_sq)
                } else {
                    iterations as f64
                };
                let cycle = self.params.cycle_length;
                let cycle_pos = if cycle > 0.0 && cycle.is_finite() {
                    t.rem_euclid(cycle) / cycle
                } else {
                    0.0
                };
                self.sample(cycle_pos * self.colors.len() as f64)
            }
        }
    }

    fn sample(&self, t: f64) -> [u8; 4] {
        let len = self.colors.len() as f64;
        let idx = t.rem_euclid(len);
        let lo = idx.floor() as usize % self.colors.len();
        let hi = (lo + 1) % self.colors.len();
        lerp_color(self.colors[lo], self.colors[hi], idx - idx.floor())
    }
}

impl Default for Palette {
    fn default() -> Self {
        classic()
    }
}

/// Continuous escape count `ν = n + 1 − log₂(ln|zₙ|)`.
fn smooth_iteration(iterations: u32, norm_sq: f64) -> f64 {
    let log_zn = norm_sq.ln() * 0.5;
    if log_zn <= 0.0 {
        return iterations as f64;
    }
    iterations as f64 + 1.0 - log_zn.ln() / std::f64::consts::LN_2
}

fn lerp_color(a: [u8; 4], b: [u8; 4], t: f64) -> [u8; 4] {
    let inv = 1.0 - t;
    [
        (a[0] as f64 * inv + b[0] as f64 * t) as u8,
        (a[1] as f64 * inv + b[1] as f64 * t) as u8,
        (a[2] as f64 * inv + b[2] as f64 * t) as u8,
        255,
    ]
}

// ---------------------------------------------------------------------------
// Builtin palettes
// ---------------------------------------------------------------------------

pub fn builtin_palettes() -> Vec<Palette> {
    vec![classic(), fire(), ocean(), grayscale()]
}

/// Builtin palette by index, wrapping around.
pub fn builtin_palette(index: usize) -> Palette {
    let mut all = builtin_palettes();
    let i = index % all.len();
    all.swap_remove(i)
}

/// Interpolate colour stops (positions in `[0, 1]`) into a LUT.
fn gradient_lut(stops: &[(f64, [u8; 3])]) -> Vec<[u8; 4]> {
    (0..LUT_SIZE)
        .map(|i| {
            let t = i as f64 / LUT_SIZE as f64;
            let lo = stops.iter().rposition(|&(pos, _)| pos <= t).unwrap_or(0);
            let hi = (lo + 1).min(stops.len() - 1);
            let (lo_t, lo_c) = stops[lo];
            let (hi_t, hi_c) = stops[hi];
            let frac = if (hi_t - lo_t).abs() < 1e-10 {
                0.0
            } else {
                ((t - lo_t) / (hi_t - lo_t)).clamp(0.0, 1.0)
            };
            lerp_color([lo_c[0], lo_c[1], lo_c[2], 255], [hi_c[0], hi_c[1], hi_c[2], 255], frac)
        })
        .collect()
}

fn from_stops(name: &'static str, stops: &[(f64, [u8; 3])]) -> Palette {
    Palette {
        name,
        colors: gradient_lut(stops),
        params: ColorParams::default(),
    }
}

fn classic() -> Palette {
    from_stops(
        "Classic",
        &[
            (0.0, [0, 7, 100]),
            (0.16, [32, 107, 203]),
            (0.42, [237, 255, 255]),
            (0.6425, [255, 170, 0]),
            (0.8575, [0, 2, 0]),
            (1.0, [0, 7, 100]),
        ],
    )
}

fn fire() -> Palette {
    from_stops(
        "Fire",
        &[
            (0.0, [0, 0, 0]),
            (0.25, [128, 0, 0]),
            (0.5, [255, 128, 0]),
            (0.75, [255, 255, 0]),
            (1.0, [255, 255, 255]),
        ],
    )
}

fn ocean() -> Palette {
    from_stops(
        "Ocean",
        &[
            (0.0, [0, 0, 30]),
            (0.3, [0, 50, 120]),
            (0.6, [0, 150, 200]),
            (0.8, [100, 220, 255]),
            (1.0, [240, 255, 255]),
        ],
    )
}

fn grayscale() -> Palette {
    from_stops("Grayscale", &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(iterations: u32, norm_sq: f64) -> IterationResult {
        IterationResult::Escaped {
            iterations,
            norm_sq,
        }
    }

    #[test]
    fn interior_uses_fixed_color() {
        for p in builtin_palettes() {
            assert_eq!(p.color(IterationResult::Interior), INTERIOR_COLOR);
        }
    }

    #[test]
    fn escaped_is_opaque_and_colored() {
        let c = Palette::default().color(escaped(10, 5.0));
        assert!(c[0] > 0 || c[1] > 0 || c[2] > 0);
        assert_eq!(c[3], 255);
    }

    #[test]
    fn smooth_and_raw_differ() {
        let result = escaped(20, 10.0);
        let smooth = Palette::default().with_params(ColorParams::new(true, 50.0));
        let raw = Palette::default().with_params(ColorParams::new(false, 50.0));
        assert_ne!(smooth.color(result), raw.color(result));
    }

    #[test]
    fn same_input_same_color() {
        let p = Palette::default();
        let r = escaped(137, 6.25);
        assert_eq!(p.color(r), p.color(r));
    }

    #[test]
    fn cycle_length_wraps_position() {
        let p = Palette::default().with_params(ColorParams::new(false, 100.0));
        assert_eq!(p.color(escaped(3, 1.0)), p.color(escaped(103, 1.0)));
    }

    #[test]
    fn builtin_palettes_have_full_lut() {
        for pal in builtin_palettes() {
            assert_eq!(pal.colors.len(), LUT_SIZE);
        }
    }

    #[test]
    fn builtin_palette_index_wraps() {
        let n = builtin_palettes().len();
        assert_eq!(builtin_palette(0).name, "Classic");
        assert_eq!(builtin_palette(n).name, "Classic");
        assert_eq!(builtin_palette(1).name, "Fire");
    }

    #[test]
    fn empty_palette_rejected() {
        assert!(Palette::new("Empty", Vec::new()).is_none());
        assert!(Palette::new("One", vec![[1, 2, 3, 255]]).is_some());
    }
}
