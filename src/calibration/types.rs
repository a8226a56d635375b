use crate::error::{Error, Result};
use crate::models::merton::merton_model::{MertonParams, Truncation};
use crate::surface::Grid;
use serde::{Deserialize, Serialize};

/// Process-wide pricing context for one calibration run; read-only once set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    /// Spot price of the underlying (must be > 0)
    pub spot: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Series truncation policy for the jump-diffusion pricer
    pub truncation: Truncation,
}

impl MarketContext {
    pub fn new(spot: f64, rate: f64, truncation: Truncation) -> Result<Self> {
        let ctx = Self {
            spot,
            rate,
            truncation,
        };
        ctx.validate()?;
        Ok(ctx)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.spot > 0.0) || !self.spot.is_finite() {
            return Err(Error::InvalidInput(format!(
                "spot (S0={}) must be > 0 and finite",
                self.spot
            )));
        }
        if !self.rate.is_finite() {
            return Err(Error::InvalidInput(format!(
                "risk-free rate (r={}) must be finite",
                self.rate
            )));
        }
        self.truncation.validate()
    }
}

/// Objective seam driven by the optimizer: a scalar loss over a bounded
/// parameter vector.
pub trait CalibrationObjective: Send + Sync {
    /// Returns the name of the model (e.g., "merton")
    fn model_name(&self) -> &str;

    /// How many parameters are in the model's optimization vector
    fn param_count(&self) -> usize;

    /// Returns the vector of (min, max) bounds for each parameter
    fn param_bounds(&self) -> &[(f64, f64)];

    /// Loss for the candidate vector `x`. An `Err` marks the trial point
    /// infeasible; the pipeline converts it into a finite penalty instead of
    /// aborting the search.
    fn evaluate(&self, x: &[f64]) -> Result<f64>;

    /// Model price grid at `x`, for diagnostic reporting.
    fn price_grid(&self, x: &[f64]) -> Result<Grid<f64>>;
}

/// Pluggable bounded minimizer seam. Any bounded quasi-Newton or
/// derivative-free implementation can drive the calibration.
pub trait BoundedMinimizer {
    fn minimize(
        &self,
        objective: &(dyn Fn(&[f64]) -> f64 + Sync),
        initial: &[f64],
        bounds: &[(f64, f64)],
        tolerance: f64,
        max_iterations: usize,
    ) -> MinimizerOutcome;
}

/// Outcome of one bounded minimization run.
#[derive(Debug, Clone)]
pub struct MinimizerOutcome {
    /// Best parameter vector found
    pub best_params: Vec<f64>,
    /// Loss at the best vector
    pub best_loss: f64,
    /// Local-refinement iterations consumed
    pub iterations: usize,
    /// Whether the minimizer met its convergence criterion within budget
    pub converged: bool,
}

/// Final state of a calibration run; created once, never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Calibrated jump parameters
    pub params: MertonParams,
    /// Weighted squared pricing error at `params`
    pub loss: f64,
    /// False when the iteration budget ran out before the tolerance was met
    pub converged: bool,
    /// Refinement iterations consumed
    pub iterations: usize,
}

/// Calibration outcome plus the diagnostic grids external reporting consumes.
#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub result: CalibrationResult,
    /// Target prices derived from the implied-volatility surface
    pub target_grid: Grid<f64>,
    /// Jump-diffusion prices at the calibrated parameters
    pub model_grid: Grid<f64>,
    /// Elementwise model minus target
    pub diff_grid: Grid<f64>,
}
