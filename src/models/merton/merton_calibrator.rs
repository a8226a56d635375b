// src/models/merton/merton_calibrator.rs

//! Weighted least-squares objective for the Merton jump-diffusion model.
//!
//! The calibrator owns the market context, the implied-volatility surface and
//! the target price grid, and exposes the scalar loss the optimizer drives:
//! for every grid cell the jump-diffusion price is compared against the
//! target price, with squared residuals weighted by the inverse target price.

use crate::calibration::types::{CalibrationObjective, MarketContext};
use crate::error::{Error, Result};
use crate::models::merton::merton_model::{self, MertonParams};
use crate::surface::{Grid, VolSurface};
use serde::{Deserialize, Serialize};

/// Per-parameter bounds for the optimization vector [λ, ν, δ].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MertonParamBounds {
    /// Jump intensity bounds (lower bound must be >= 0)
    pub lambda: (f64, f64),
    /// Mean log-jump size bounds
    pub nu: (f64, f64),
    /// Jump-size volatility bounds (lower bound must be >= 0)
    pub delta: (f64, f64),
}

impl Default for MertonParamBounds {
    fn default() -> Self {
        Self {
            lambda: (0.0, 1.0),
            nu: (-1.0, 1.0),
            delta: (0.0, 1.0),
        }
    }
}

impl From<&[(f64, f64)]> for MertonParamBounds {
    fn from(bounds: &[(f64, f64)]) -> Self {
        if bounds.len() != 3 {
            return Self::default();
        }
        Self {
            lambda: bounds[0],
            nu: bounds[1],
            delta: bounds[2],
        }
    }
}

impl MertonParamBounds {
    pub fn validate(&self) -> Result<()> {
        for (name, (lo, hi)) in [
            ("lambda", self.lambda),
            ("nu", self.nu),
            ("delta", self.delta),
        ] {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(Error::InvalidInput(format!(
                    "{} bounds [{}, {}] must be finite with lo <= hi",
                    name, lo, hi
                )));
            }
        }
        if self.lambda.0 < 0.0 || self.delta.0 < 0.0 {
            return Err(Error::InvalidInput(format!(
                "lambda and delta lower bounds must be >= 0 (lambda >= {}, delta >= {})",
                self.lambda.0, self.delta.0
            )));
        }
        Ok(())
    }

    pub fn as_vec(&self) -> Vec<(f64, f64)> {
        vec![self.lambda, self.nu, self.delta]
    }
}

/// Calibrator for the Merton jump-diffusion model with 3 parameters:
/// [lambda, nu, delta]
#[derive(Debug, Clone)]
pub struct MertonModelCalibrator {
    ctx: MarketContext,
    surface: VolSurface,
    target: Grid<f64>,
    param_bounds: Vec<(f64, f64)>,
}

impl MertonModelCalibrator {
    /// Constructor from the market context, the implied-volatility surface
    /// and the pre-built target price grid.
    pub fn new(
        ctx: MarketContext,
        surface: VolSurface,
        target: Grid<f64>,
        param_bounds_opt: Option<MertonParamBounds>,
    ) -> Result<Self> {
        ctx.validate()?;
        if target.n_rows() != surface.n_maturities() || target.n_cols() != surface.n_strikes() {
            return Err(Error::DimensionMismatch(format!(
                "target grid is {}x{} but the surface is {}x{}",
                target.n_rows(),
                target.n_cols(),
                surface.n_maturities(),
                surface.n_strikes()
            )));
        }

        let bounds = param_bounds_opt.unwrap_or_default();
        bounds.validate()?;

        Ok(Self {
            ctx,
            surface,
            target,
            param_bounds: bounds.as_vec(),
        })
    }

    pub fn context(&self) -> &MarketContext {
        &self.ctx
    }

    pub fn surface(&self) -> &VolSurface {
        &self.surface
    }

    pub fn target_grid(&self) -> &Grid<f64> {
        &self.target
    }

    fn params_from(&self, x: &[f64]) -> Result<MertonParams> {
        if x.len() != 3 {
            return Err(Error::InvalidInput(format!(
                "parameter vector must have length 3 for the Merton model, got {}",
                x.len()
            )));
        }
        MertonParams::new(x[0], x[1], x[2])
    }
}

impl CalibrationObjective for MertonModelCalibrator {
    fn model_name(&self) -> &str {
        "merton"
    }

    fn param_count(&self) -> usize {
        self.param_bounds.len() // Should be 3
    }

    fn param_bounds(&self) -> &[(f64, f64)] {
        &self.param_bounds
    }

    /// Inverse-target-weighted sum of squared price residuals over the grid.
    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        let params = self.params_from(x)?;

        let mut loss = 0.0;
        for (i, j, point) in self.surface.points() {
            let model_price = merton_model::call_price(
                self.ctx.spot,
                point.strike,
                point.maturity,
                self.ctx.rate,
                point.implied_vol,
                &params,
                self.ctx.truncation,
            )?;

            let target = self.target[(i, j)];
            // Zero-price cells fall back to unit weight instead of being
            // rejected; see the weighting notes in DESIGN.md.
            let weight = if target != 0.0 { 1.0 / target } else { 1.0 };
            let residual = model_price - target;
            loss += weight * residual * residual;
        }

        if !loss.is_finite() {
            return Err(Error::Evaluation(format!(
                "objective produced a non-finite loss for lambda={}, nu={}, delta={}",
                params.lambda, params.nu, params.delta
            )));
        }
        Ok(loss)
    }

    fn price_grid(&self, x: &[f64]) -> Result<Grid<f64>> {
        let params = self.params_from(x)?;
        let mut rows = Vec::with_capacity(self.surface.n_maturities());
        for _ in 0..self.surface.n_maturities() {
            rows.push(Vec::with_capacity(self.surface.n_strikes()));
        }
        for (i, _j, point) in self.surface.points() {
            rows[i].push(merton_model::call_price(
                self.ctx.spot,
                point.strike,
                point.maturity,
                self.ctx.rate,
                point.implied_vol,
                &params,
                self.ctx.truncation,
            )?);
        }
        Grid::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::merton::merton_model::Truncation;
    use crate::surface::build_target_grid;

    fn sample_calibrator() -> MertonModelCalibrator {
        let vols = Grid::from_rows(vec![
            vec![0.33, 0.31, 0.32],
            vec![0.31, 0.29, 0.30],
        ])
        .unwrap();
        let surface = VolSurface::new(vec![10.0, 11.0, 12.0], vec![0.1, 0.3], vols).unwrap();
        let ctx = MarketContext::new(11.0, 0.06, Truncation::default()).unwrap();
        let target = build_target_grid(ctx.spot, ctx.rate, &surface).unwrap();
        MertonModelCalibrator::new(ctx, surface, target, None).unwrap()
    }

    #[test]
    fn test_objective_floor_at_zero_jump_intensity() {
        let calibrator = sample_calibrator();
        // With lambda = 0 every model price equals its target regardless of
        // nu and delta, so the loss collapses to zero.
        for &(nu, delta) in &[(0.0, 0.2), (0.7, 0.9), (-0.4, 0.0)] {
            let loss = calibrator.evaluate(&[0.0, nu, delta]).unwrap();
            assert!(loss < 1e-16, "nu={}, delta={}: loss {}", nu, delta, loss);
        }
    }

    #[test]
    fn test_objective_is_positive_away_from_the_floor() {
        let calibrator = sample_calibrator();
        let loss = calibrator.evaluate(&[0.5, 0.3, 0.4]).unwrap();
        assert!(loss > 0.0);
    }

    #[test]
    fn test_invalid_parameter_vector_is_an_error() {
        let calibrator = sample_calibrator();
        assert!(calibrator.evaluate(&[0.1, 0.0]).is_err());
        assert!(calibrator.evaluate(&[-0.1, 0.0, 0.2]).is_err());
    }

    #[test]
    fn test_zero_target_cells_fall_back_to_unit_weight() {
        let vols = Grid::from_rows(vec![vec![0.3, 0.3]]).unwrap();
        let surface = VolSurface::new(vec![10.0, 11.0], vec![0.25], vols).unwrap();
        let ctx = MarketContext::new(11.0, 0.06, Truncation::default()).unwrap();
        // Hand-built target with a degenerate zero cell.
        let target = Grid::from_rows(vec![vec![0.0, 0.8]]).unwrap();
        let calibrator = MertonModelCalibrator::new(ctx, surface, target, None).unwrap();
        let loss = calibrator.evaluate(&[0.1, 0.0, 0.2]).unwrap();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_bounds_round_trip_through_flat_vector() {
        let bounds = MertonParamBounds::default();
        let round = MertonParamBounds::from(bounds.as_vec().as_slice());
        assert_eq!(round.lambda, bounds.lambda);
        assert_eq!(round.nu, bounds.nu);
        assert_eq!(round.delta, bounds.delta);
        // Wrong arity falls back to the defaults.
        let fallback = MertonParamBounds::from(&[(0.0, 1.0)][..]);
        assert_eq!(fallback.delta, MertonParamBounds::default().delta);
    }

    #[test]
    fn test_bounds_validation() {
        let calibrator = sample_calibrator();
        assert_eq!(calibrator.param_count(), 3);

        let bad = MertonParamBounds {
            lambda: (-0.5, 1.0),
            ..MertonParamBounds::default()
        };
        assert!(bad.validate().is_err());

        let flipped = MertonParamBounds {
            nu: (1.0, -1.0),
            ..MertonParamBounds::default()
        };
        assert!(flipped.validate().is_err());
    }
}
