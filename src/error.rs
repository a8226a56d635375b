//! Typed failure values shared by the pricing and calibration layers.

use thiserror::Error;

/// Failure modes of the pricing and calibration layers.
///
/// Non-convergence of the optimizer is deliberately not an error: it is
/// reported through the `converged` flag on
/// [`CalibrationResult`](crate::calibration::types::CalibrationResult).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Non-positive spot/strike/maturity/volatility or otherwise malformed input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A pricing formula hit a degenerate denominator (sigma * sqrt(T) = 0).
    #[error("numeric singularity: {0}")]
    NumericSingularity(String),

    /// A pricer or objective call produced a non-finite value.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// Rectangular data with inconsistent dimensions.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
}

/// Shorthand `Result` used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
