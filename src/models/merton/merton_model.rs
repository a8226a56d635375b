// src/models/merton/merton_model.rs

//! Merton jump-diffusion model implementation
//!
//! Under Merton's assumptions (Poisson jump arrivals, i.i.d. normal log-jump
//! sizes) the European option price is an infinite Poisson-weighted mixture
//! of constant-volatility diffusion prices:
//!
//! price = Σ_k p_k · BS(S0, X, T, r_k, σ_k)
//!
//! with p_k = e^(−λT)(λT)^k / k!, κ = e^(ν+δ²/2) − 1, r_k = r − λκ and
//! σ_k = √(σ² + kδ²). The series is truncated after a configurable number of
//! terms; the truncation bias is bounded by the Poisson tail mass beyond the
//! last term, so the order is a tunable approximation knob rather than an
//! exact cutoff.

use crate::error::{Error, Result};
use crate::models::bs;
use serde::{Deserialize, Serialize};

/// Parameters of the Merton jump-diffusion model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MertonParams {
    /// Jump intensity (expected jumps per year, must be >= 0)
    pub lambda: f64,
    /// Mean log-jump size
    pub nu: f64,
    /// Jump-size volatility (must be >= 0)
    pub delta: f64,
}

fn validate_merton_params(lambda: f64, nu: f64, delta: f64) -> Result<()> {
    if lambda < 0.0 || !lambda.is_finite() {
        return Err(Error::InvalidInput(format!(
            "jump intensity (lambda={}) must be >= 0 and finite",
            lambda
        )));
    }
    if !nu.is_finite() {
        return Err(Error::InvalidInput(format!(
            "mean log-jump size (nu={}) must be finite",
            nu
        )));
    }
    if delta < 0.0 || !delta.is_finite() {
        return Err(Error::InvalidInput(format!(
            "jump-size volatility (delta={}) must be >= 0 and finite",
            delta
        )));
    }
    Ok(())
}

impl MertonParams {
    /// Creates new jump parameters with validation.
    pub fn new(lambda: f64, nu: f64, delta: f64) -> Result<Self> {
        validate_merton_params(lambda, nu, delta)?;
        Ok(Self { lambda, nu, delta })
    }

    /// Validates the current parameter set.
    pub fn validate(&self) -> Result<()> {
        validate_merton_params(self.lambda, self.nu, self.delta)
    }

    /// Expected relative jump size κ = E[e^J − 1] = e^(ν+δ²/2) − 1.
    pub fn kappa(&self) -> f64 {
        (self.nu + 0.5 * self.delta * self.delta).exp() - 1.0
    }

    /// Jump-compensated drift r − λκ, constant across mixture terms.
    pub fn compensated_rate(&self, rate: f64) -> f64 {
        rate - self.lambda * self.kappa()
    }
}

impl Default for MertonParams {
    /// Reference starting point for calibration.
    fn default() -> Self {
        Self {
            lambda: 0.1,
            nu: 0.0,
            delta: 0.2,
        }
    }
}

/// Truncation policy for the Poisson mixture series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Truncation {
    /// Sum a fixed number of mixture terms.
    Fixed(usize),
    /// Extend the series until the remaining Poisson tail mass drops below
    /// `tail_epsilon`, summing at most `max_order` terms.
    Adaptive { tail_epsilon: f64, max_order: usize },
}

impl Truncation {
    /// Reference truncation order; adequate for the small λT regimes the
    /// calibration targets.
    pub const DEFAULT_ORDER: usize = 50;

    pub fn validate(&self) -> Result<()> {
        match *self {
            Truncation::Fixed(order) if order == 0 => Err(Error::InvalidInput(
                "truncation order must be >= 1".to_string(),
            )),
            Truncation::Adaptive {
                tail_epsilon,
                max_order,
            } if !(tail_epsilon > 0.0) || max_order == 0 => Err(Error::InvalidInput(format!(
                "adaptive truncation requires tail_epsilon > 0 and max_order >= 1 \
                 (tail_epsilon={}, max_order={})",
                tail_epsilon, max_order
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for Truncation {
    fn default() -> Self {
        Truncation::Fixed(Self::DEFAULT_ORDER)
    }
}

/// Poisson probabilities p_0..p_{k_max−1} for rate `lambda_t`, computed with
/// the stable recurrence p_0 = e^(−λT), p_k = p_{k−1}·(λT)/k.  Direct
/// factorial evaluation overflows long before the weights become negligible,
/// so the recurrence is the only supported path.
pub fn poisson_weights(lambda_t: f64, k_max: usize) -> Vec<f64> {
    let mut weights = Vec::with_capacity(k_max);
    let mut p = (-lambda_t).exp();
    for k in 0..k_max {
        if k > 0 {
            p *= lambda_t / k as f64;
        }
        weights.push(p);
    }
    weights
}

/// Price of a European call under the Merton jump-diffusion model.
///
/// `sigma` is the diffusion volatility of the underlying; jump behaviour
/// comes from `params`. With `lambda = 0` every weight beyond p_0 is exactly
/// zero and the result equals [`bs::call_price`].
#[allow(non_snake_case)]
pub fn call_price(
    S: f64,
    X: f64,
    T: f64,
    r: f64,
    sigma: f64,
    params: &MertonParams,
    truncation: Truncation,
) -> Result<f64> {
    mixture_price(S, X, T, r, sigma, params, truncation, bs::call_price)
}

/// Price of a European put under the Merton jump-diffusion model.
#[allow(non_snake_case)]
pub fn put_price(
    S: f64,
    X: f64,
    T: f64,
    r: f64,
    sigma: f64,
    params: &MertonParams,
    truncation: Truncation,
) -> Result<f64> {
    mixture_price(S, X, T, r, sigma, params, truncation, bs::put_price)
}

#[allow(non_snake_case)]
#[allow(clippy::too_many_arguments)]
fn mixture_price(
    S: f64,
    X: f64,
    T: f64,
    r: f64,
    sigma: f64,
    params: &MertonParams,
    truncation: Truncation,
    diffusion: fn(f64, f64, f64, f64, f64) -> Result<f64>,
) -> Result<f64> {
    params.validate()?;
    truncation.validate()?;

    let lambda_t = params.lambda * T;
    let r_k = params.compensated_rate(r);
    let (k_max, tail_epsilon) = match truncation {
        Truncation::Fixed(order) => (order, None),
        Truncation::Adaptive {
            tail_epsilon,
            max_order,
        } => (max_order, Some(tail_epsilon)),
    };

    let mut price = 0.0;
    let mut weight_sum = 0.0;
    let mut p = (-lambda_t).exp();
    for k in 0..k_max {
        if k > 0 {
            p *= lambda_t / k as f64;
        }
        let sigma_k = (sigma * sigma + k as f64 * params.delta * params.delta).sqrt();
        price += p * diffusion(S, X, T, r_k, sigma_k)?;
        weight_sum += p;

        if let Some(eps) = tail_epsilon {
            if 1.0 - weight_sum < eps {
                break;
            }
        }
    }

    if !price.is_finite() {
        return Err(Error::Evaluation(format!(
            "jump-diffusion mixture produced a non-finite price \
             (lambda={}, nu={}, delta={}, S={}, X={}, T={})",
            params.lambda, params.nu, params.delta, S, X, T
        )));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> (f64, f64, f64, f64, f64) {
        // Spot, strike, maturity, rate, implied diffusion volatility.
        (11.0, 11.0, 0.3, 0.06, 0.296926)
    }

    #[test]
    fn test_params_validation() {
        assert!(MertonParams::new(0.1, 0.0, 0.2).is_ok());
        assert!(MertonParams::new(-0.1, 0.0, 0.2).is_err());
        assert!(MertonParams::new(0.1, f64::NAN, 0.2).is_err());
        assert!(MertonParams::new(0.1, 0.0, -0.2).is_err());
    }

    #[test]
    fn test_kappa_value() {
        let params = MertonParams::new(0.5, 0.1, 0.2).unwrap();
        let expected = (0.1_f64 + 0.5 * 0.2 * 0.2).exp() - 1.0;
        assert!((params.kappa() - expected).abs() < 1e-15);
    }

    #[test]
    fn test_poisson_weights_match_direct_formula() {
        // Small k where e^(−x)·x^k/k! is still safe to evaluate directly.
        let lambda_t = 1.3;
        let weights = poisson_weights(lambda_t, 6);
        let mut factorial = 1.0;
        for (k, &w) in weights.iter().enumerate() {
            if k > 0 {
                factorial *= k as f64;
            }
            let direct = (-lambda_t).exp() * lambda_t.powi(k as i32) / factorial;
            assert!((w - direct).abs() < 1e-14, "k={}: {} vs {}", k, w, direct);
        }
    }

    #[test]
    fn test_zero_jump_identity() {
        let (s, x, t, r, sigma) = scenario();
        let diffusion = bs::call_price(s, x, t, r, sigma).unwrap();
        for &(nu, delta) in &[(0.0, 0.0), (0.5, 0.3), (-0.8, 0.9)] {
            for &order in &[1usize, 10, 50] {
                let params = MertonParams::new(0.0, nu, delta).unwrap();
                let mjd =
                    call_price(s, x, t, r, sigma, &params, Truncation::Fixed(order)).unwrap();
                assert!(
                    (mjd - diffusion).abs() < 1e-12,
                    "nu={}, delta={}, order={}: {} vs {}",
                    nu,
                    delta,
                    order,
                    mjd,
                    diffusion
                );
            }
        }
    }

    #[test]
    fn test_calibrated_scenario_matches_diffusion_price() {
        let (s, x, t, r, sigma) = scenario();
        let params = MertonParams::new(0.0004, 0.0054, 0.1518).unwrap();
        let mjd = call_price(s, x, t, r, sigma, &params, Truncation::default()).unwrap();
        let diffusion = bs::call_price(s, x, t, r, sigma).unwrap();
        assert!((mjd - 0.8090).abs() < 5e-4, "got {}", mjd);
        assert!((mjd - diffusion).abs() < 1e-5);
    }

    #[test]
    fn test_truncation_convergence() {
        let (s, x, t, r, sigma) = scenario();
        // Aggressive jump activity: lambda * T = 4.5.
        let params = MertonParams::new(15.0, -0.05, 0.25).unwrap();

        let weights = poisson_weights(params.lambda * t, 50);
        let mass: f64 = weights.iter().sum();
        assert!((1.0 - mass).abs() < 1e-10);

        let p50 = call_price(s, x, t, r, sigma, &params, Truncation::Fixed(50)).unwrap();
        let p100 = call_price(s, x, t, r, sigma, &params, Truncation::Fixed(100)).unwrap();
        assert!((p50 - p100).abs() < 1e-6);
    }

    #[test]
    fn test_adaptive_truncation_matches_fixed() {
        let (s, x, t, r, sigma) = scenario();
        let params = MertonParams::new(2.0, 0.01, 0.3).unwrap();
        let fixed = call_price(s, x, t, r, sigma, &params, Truncation::Fixed(100)).unwrap();
        let adaptive = call_price(
            s,
            x,
            t,
            r,
            sigma,
            &params,
            Truncation::Adaptive {
                tail_epsilon: 1e-12,
                max_order: 100,
            },
        )
        .unwrap();
        assert!((fixed - adaptive).abs() < 1e-9);
    }

    #[test]
    fn test_put_call_parity_with_jumps() {
        let (s, x, t, r, sigma) = scenario();
        let params = MertonParams::new(0.4, -0.1, 0.2).unwrap();
        let call = call_price(s, x, t, r, sigma, &params, Truncation::default()).unwrap();
        let put = put_price(s, x, t, r, sigma, &params, Truncation::default()).unwrap();
        // Parity holds term by term under the compensated rate, so it holds
        // for the truncated sums up to the shared tail mass.
        let r_k = params.compensated_rate(r);
        let weights_mass: f64 = poisson_weights(params.lambda * t, 50).iter().sum();
        let forward = weights_mass * (s - x * (-r_k * t).exp());
        assert!((call - put - forward).abs() < 1e-10);
    }

    #[test]
    fn test_zero_truncation_order_is_rejected() {
        let (s, x, t, r, sigma) = scenario();
        let params = MertonParams::default();
        assert!(call_price(s, x, t, r, sigma, &params, Truncation::Fixed(0)).is_err());
    }
}
