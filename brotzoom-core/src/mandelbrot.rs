use crate::complex::Complex;
use crate::fractal::{FractalParams, IterationResult};

/// The Mandelbrot set: `z_{n+1} = z_n² + c`, starting from `z₀ = 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mandelbrot {
    params: FractalParams,
}

impl Mandelbrot {
    pub fn new(params: FractalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FractalParams {
        &self.params
    }

    /// Iterate `c` until `|z| > 2` or the budget runs out.
    ///
    /// `iterations` in the escaped result counts the `z ← z² + c` steps
    /// taken, so a point that leaves the disc on the first step reports 1.
    #[inline]
    pub fn iterate(&self, c: Complex) -> IterationResult {
        if in_cardioid(c.re, c.im) || in_period2_bulb(c.re, c.im) {
            return IterationResult::Interior;
        }

        let mut z = Complex::ZERO;
        for n in 1..=self.params.max_iterations {
            z = z.sqr() + c;
            let norm_sq = z.norm_sq();
            if norm_sq > FractalParams::ESCAPE_RADIUS_SQ {
                return IterationResult::Escaped {
                    iterations: n,
                    norm_sq,
                };
            }
        }
        IterationResult::Interior
    }
}

/// Closed-form test for the main cardioid; these points never escape.
#[inline]
fn in_cardioid(re: f64, im: f64) -> bool {
    let im2 = im * im;
    let q = (re - 0.25) * (re - 0.25) + im2;
    q * (q + (re - 0.25)) <= 0.25 * im2
}

/// Closed-form test for the period-2 bulb centred on `-1`.
#[inline]
fn in_period2_bulb(re: f64, im: f64) -> bool {
    (re + 1.0) * (re + 1.0) + im * im <= 0.0625
}
