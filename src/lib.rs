//! # Merton-Lib: Jump-Diffusion Option Pricing and Parameter Calibration
//!
//! `merton-lib` calibrates the three free parameters of the Merton
//! Jump-Diffusion (MJD) model (jump intensity λ, mean log-jump size ν,
//! jump-size volatility δ) so that model-implied European call prices match
//! a target price surface derived from market implied volatilities.
//!
//! ## Core Features
//!
//! - **Closed-Form Pricing**: constant-volatility diffusion prices plus the
//!   MJD price as a truncated Poisson-weighted mixture of diffusion prices
//! - **Robust Calibration**: bounded L-BFGS-B refinement with an optional
//!   seeded CMA-ES global search, behind a pluggable minimizer seam
//! - **Diagnostic Grids**: target, model and difference price grids for
//!   external reporting
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use merton_lib::{
//!     calibrate_merton, default_configs, Grid, MarketContext, Truncation, VolSurface,
//! };
//!
//! // Implied-volatility surface: rows by maturity, columns by strike.
//! let vols = Grid::from_rows(vec![
//!     vec![0.32, 0.30, 0.31],
//!     vec![0.30, 0.28, 0.29],
//! ])?;
//! let surface = VolSurface::new(vec![10.0, 11.0, 12.0], vec![0.1, 0.3], vols)?;
//! let ctx = MarketContext::new(11.0, 0.06, Truncation::default())?;
//!
//! let report = calibrate_merton(surface, ctx, default_configs::fast())?;
//! println!(
//!     "lambda={:.4} nu={:.4} delta={:.4} loss={:.3e} converged={}",
//!     report.result.params.lambda,
//!     report.result.params.nu,
//!     report.result.params.delta,
//!     report.result.loss,
//!     report.result.converged,
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Model
//!
//! The MJD call price is the Poisson mixture
//!
//! ```text
//! price = Σ_k p_k · BS(S0, X, T, r − λκ, √(σ² + kδ²))
//! ```
//!
//! with `p_k = e^(−λT)(λT)^k / k!` and `κ = e^(ν+δ²/2) − 1`, truncated after
//! a configurable number of terms. With `λ = 0` it reduces exactly to the
//! diffusion price, which pins the objective's floor at zero for a target
//! grid built from the same surface.
//!
//! ## Configuration Presets
//!
//! - `production()`: high accuracy for live use
//! - `fast()`: balanced speed/accuracy for development
//! - `research()`: high-precision settings plus a CMA-ES global search
//! - `minimal()`: quick validation settings

// ================================================================================================
// MODULES
// ================================================================================================

pub mod calibration;
pub mod error;
pub mod models;
pub mod surface;

// ================================================================================================
// IMPORTS
// ================================================================================================

use anyhow::Result;

use calibration::pipeline::calibrate_model;
use calibration::types::CalibrationObjective;
use models::merton::merton_model;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

// Configuration and run types
pub use calibration::config::{CalibrationConfig, CmaEsConfig};
pub use calibration::pipeline::{Calibrator, LbfgsbMinimizer, EVALUATION_PENALTY};
pub use calibration::types::{
    BoundedMinimizer, CalibrationReport, CalibrationResult, MarketContext, MinimizerOutcome,
};

// Model types and parameters
pub use models::merton::merton_calibrator::{MertonModelCalibrator, MertonParamBounds};
pub use models::merton::merton_model::{MertonParams, Truncation};

// Market data types
pub use error::Error;
pub use surface::{build_target_grid, Grid, MarketPoint, VolSurface};

// ================================================================================================
// DEFAULT CONFIGURATIONS
// ================================================================================================

/// Pre-configured calibration settings for common use cases.
pub mod default_configs {
    use crate::calibration::config::CalibrationConfig;

    /// Production-grade configuration with a tight tolerance and a generous
    /// refinement budget.
    pub fn production() -> CalibrationConfig {
        CalibrationConfig::production()
    }

    /// Balanced speed/accuracy configuration for development and testing.
    pub fn fast() -> CalibrationConfig {
        CalibrationConfig::fast()
    }

    /// High-precision configuration for research; enables the seeded CMA-ES
    /// global search ahead of L-BFGS-B refinement.
    pub fn research() -> CalibrationConfig {
        CalibrationConfig::research()
    }

    /// Quick validation settings for debugging and unit tests.
    pub fn minimal() -> CalibrationConfig {
        CalibrationConfig::minimal()
    }
}

// ================================================================================================
// TOP-LEVEL API
// ================================================================================================

/// Calibrate Merton jump-diffusion parameters to an implied-volatility
/// surface.
///
/// Builds the target price grid from `surface` under the diffusion model,
/// then minimizes the inverse-target-weighted squared pricing error of the
/// jump-diffusion model over the configured bounds, starting from the
/// configured initial guess.
///
/// # Returns
///
/// A [`CalibrationReport`] carrying the [`CalibrationResult`] (parameters,
/// final loss, convergence flag, iteration count) plus three diagnostic
/// grids: the target prices, the model prices at the calibrated parameters,
/// and their elementwise difference.
///
/// # Errors
///
/// Fails on malformed inputs (non-positive spot, inconsistent bounds,
/// mismatched grid dimensions) before any optimization starts. Numeric
/// trouble at individual trial points during the search is penalized
/// internally rather than surfaced; non-convergence is reported through the
/// result's `converged` flag, not as an error.
pub fn calibrate_merton(
    surface: VolSurface,
    ctx: MarketContext,
    config: CalibrationConfig,
) -> Result<CalibrationReport> {
    let target = build_target_grid(ctx.spot, ctx.rate, &surface)?;
    let calibrator =
        MertonModelCalibrator::new(ctx, surface, target, Some(config.bounds.clone()))?;

    let guess = vec![
        config.initial_guess.lambda,
        config.initial_guess.nu,
        config.initial_guess.delta,
    ];
    let outcome = calibrate_model(&calibrator, &config, Some(guess))?;

    let params = MertonParams::new(
        outcome.best_params[0],
        outcome.best_params[1],
        outcome.best_params[2],
    )?;
    let model_grid = calibrator.price_grid(&outcome.best_params)?;
    let diff_grid = model_grid.zip_with(calibrator.target_grid(), |m, t| m - t)?;

    Ok(CalibrationReport {
        result: CalibrationResult {
            params,
            loss: outcome.best_loss,
            converged: outcome.converged,
            iterations: outcome.iterations,
        },
        target_grid: calibrator.target_grid().clone(),
        model_grid,
        diff_grid,
    })
}

/// Evaluate the calibration objective for a fixed parameter set.
///
/// This produces **exactly the same loss value** that [`calibrate_merton`]
/// minimises internally, so external callers can measure fit quality without
/// re-running the optimizer.
pub fn evaluate_merton(
    params: MertonParams,
    surface: VolSurface,
    ctx: MarketContext,
) -> Result<f64> {
    let target = build_target_grid(ctx.spot, ctx.rate, &surface)?;
    let calibrator = MertonModelCalibrator::new(ctx, surface, target, None)?;
    let loss = calibrator.evaluate(&[params.lambda, params.nu, params.delta])?;
    Ok(loss)
}

/// Price the whole surface under the Merton jump-diffusion model with the
/// given parameters, one call price per (maturity, strike) cell.
pub fn price_merton_grid(
    params: MertonParams,
    surface: &VolSurface,
    ctx: MarketContext,
) -> Result<Grid<f64>> {
    ctx.validate()?;
    params.validate()?;

    let mut rows = Vec::with_capacity(surface.n_maturities());
    for _ in 0..surface.n_maturities() {
        rows.push(Vec::with_capacity(surface.n_strikes()));
    }
    for (i, _j, point) in surface.points() {
        rows[i].push(merton_model::call_price(
            ctx.spot,
            point.strike,
            point.maturity,
            ctx.rate,
            point.implied_vol,
            &params,
            ctx.truncation,
        )?);
    }
    Ok(Grid::from_rows(rows)?)
}
