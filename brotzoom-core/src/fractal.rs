use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Outcome of iterating a single point.
///
/// Only raw iteration data is kept here; smoothing and colour happen in the
/// render crate's palette.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IterationResult {
    /// The orbit left the bailout disc after `iterations` steps.
    /// `norm_sq` is `|z|²` at that moment, used for smooth colouring.
    Escaped { iterations: u32, norm_sq: f64 },

    /// The orbit stayed bounded for the whole iteration budget.
    Interior,
}

impl IterationResult {
    pub fn is_interior(&self) -> bool {
        matches!(self, Self::Interior)
    }

    /// Escape count, or `None` for interior points.
    pub fn escape_count(&self) -> Option<u32> {
        match self {
            Self::Escaped { iterations, .. } => Some(*iterations),
            Self::Interior => None,
        }
    }
}

/// Iteration budget for a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FractalParams {
    /// Iterations after which a point is declared interior.
    pub max_iterations: u32,
}

impl FractalParams {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 2048;

    /// `|z| > 2` escapes; compared squared.
    pub const ESCAPE_RADIUS_SQ: f64 = 4.0;

    pub fn new(max_iterations: u32) -> crate::Result<Self> {
        if max_iterations < 1 {
            return Err(CoreError::InvalidMaxIterations(max_iterations));
        }
        Ok(Self { max_iterations })
    }
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }
}
