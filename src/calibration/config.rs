use crate::models::merton::merton_calibrator::MertonParamBounds;
use crate::models::merton::merton_model::MertonParams;
use serde::Deserialize;

/// CMA-ES global-search stage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CmaEsConfig {
    /// Whether the global-search stage runs before L-BFGS-B refinement
    pub enabled: bool,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
    /// Whether to evaluate the population in parallel
    pub parallel_eval: bool,
    /// Population size
    pub pop_size: usize,
    /// Maximum generations
    pub max_gen: usize,
    /// Number of IPOP restarts (0 = no IPOP)
    pub ipop_restarts: usize,
    /// Factor to increase population size in IPOP restarts
    pub ipop_increase_factor: f64,
    /// Number of BIPOP restarts (0 = no BIPOP)
    pub bipop_restarts: usize,
    /// Total function evaluations budget
    pub total_evals_budget: usize,
    /// Whether to use advanced sub-run budgeting logic
    pub use_subrun_budgeting: bool,
}

impl Default for CmaEsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: Some(123456),
            // Sequential evaluation keeps repeated runs bit-identical.
            parallel_eval: false,
            pop_size: 30,
            max_gen: 50,
            ipop_restarts: 0,
            ipop_increase_factor: 2.0,
            bipop_restarts: 2,
            total_evals_budget: 20000,
            use_subrun_budgeting: false,
        }
    }
}

/// Main configuration struct for a calibration run
#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationConfig {
    /// L-BFGS-B iteration budget
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Convergence tolerance for the refinement stage
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Starting point of the parameter search
    #[serde(default)]
    pub initial_guess: MertonParams,

    /// Box constraints on [lambda, nu, delta]
    #[serde(default)]
    pub bounds: MertonParamBounds,

    /// Verbosity level (0=silent, 1=progress, 2=per-iteration)
    #[serde(default)]
    pub verbosity: u8,

    /// Optional CMA-ES global-search stage
    #[serde(default)]
    pub cmaes: CmaEsConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            initial_guess: MertonParams::default(),
            bounds: MertonParamBounds::default(),
            verbosity: 0,
            cmaes: CmaEsConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Default configuration for production calibration with high accuracy
    pub fn production() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-8,
            ..Self::default()
        }
    }

    /// Fast configuration for development and testing
    pub fn fast() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-6,
            ..Self::default()
        }
    }

    /// High-precision configuration for research and backtesting; adds a
    /// seeded CMA-ES global search ahead of the refinement stage.
    pub fn research() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-9,
            cmaes: CmaEsConfig {
                enabled: true,
                pop_size: 50,
                max_gen: 100,
                ipop_restarts: 3,
                bipop_restarts: 5,
                total_evals_budget: 500000,
                ..CmaEsConfig::default()
            },
            ..Self::default()
        }
    }

    /// Minimal configuration for quick validation and debugging
    pub fn minimal() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-4,
            ..Self::default()
        }
    }

    /// Parses a configuration from a TOML document; missing fields fall back
    /// to their defaults.
    pub fn from_toml_str(raw: &str) -> crate::error::Result<Self> {
        toml::from_str(raw)
            .map_err(|e| crate::error::Error::InvalidInput(format!("bad TOML config: {}", e)))
    }
}

fn default_max_iterations() -> usize {
    200
}

fn default_tolerance() -> f64 {
    1e-6
}
