// Closed-form European pricing under a constant-volatility diffusion.  Only
// the call and put helpers needed by the calibration pipeline are provided;
// implied-volatility inversion and Greeks are intentionally omitted.

use crate::error::{Error, Result};

fn norm_cdf(x: f64) -> f64 {
    // 0.5 * [1 + erf(x / sqrt(2))]
    0.5 * (1.0 + libm::erf(x / (2.0_f64).sqrt()))
}

/// Price of a European call option under constant-volatility diffusion.
///
/// Returns [`Error::InvalidInput`] for non-positive spot, strike, maturity or
/// volatility, and [`Error::NumericSingularity`] if `sigma * sqrt(T)`
/// underflows to zero.
#[allow(non_snake_case)]
pub fn call_price(S: f64, X: f64, T: f64, r: f64, sigma: f64) -> Result<f64> {
    let (d1, d2) = d1_d2(S, X, T, r, sigma)?;
    Ok(S * norm_cdf(d1) - X * (-r * T).exp() * norm_cdf(d2))
}

/// Price of a European put option under constant-volatility diffusion.
#[allow(non_snake_case)]
pub fn put_price(S: f64, X: f64, T: f64, r: f64, sigma: f64) -> Result<f64> {
    let (d1, d2) = d1_d2(S, X, T, r, sigma)?;
    Ok(X * (-r * T).exp() * norm_cdf(-d2) - S * norm_cdf(-d1))
}

#[allow(non_snake_case)]
fn d1_d2(S: f64, X: f64, T: f64, r: f64, sigma: f64) -> Result<(f64, f64)> {
    if !(S > 0.0) || !(X > 0.0) || !(T > 0.0) || !(sigma > 0.0) || !r.is_finite() {
        return Err(Error::InvalidInput(format!(
            "spot, strike, maturity and volatility must be positive and the rate finite \
             (S={}, X={}, T={}, r={}, sigma={})",
            S, X, T, r, sigma
        )));
    }

    let vol_sqrt_t = sigma * T.sqrt();
    if vol_sqrt_t == 0.0 {
        return Err(Error::NumericSingularity(format!(
            "sigma * sqrt(T) is zero (sigma={}, T={})",
            sigma, T
        )));
    }

    let d1 = ((S / X).ln() + (r + 0.5 * sigma * sigma) * T) / vol_sqrt_t;
    Ok((d1, d1 - vol_sqrt_t))
}
