use crate::calibration::config::CalibrationConfig;
use crate::calibration::types::{
    BoundedMinimizer, CalibrationObjective, MinimizerOutcome,
};
use crate::error::{Error, Result};
use cmaes_lbfgsb::cmaes::{canonical_cmaes_optimize, CmaesCanonicalConfig};
use cmaes_lbfgsb::lbfgsb_optimize::lbfgsb_optimize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Loss substituted for trial points whose evaluation fails or turns
/// non-finite, large enough that the optimizer steps away from them but
/// finite so the search itself keeps going.
pub const EVALUATION_PENALTY: f64 = 1.0e12;

/// A reusable calibration run over a bounded objective.
pub struct Calibrator {
    config: CalibrationConfig,
    initial_guess: Option<Vec<f64>>,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            initial_guess: None,
        }
    }

    /// Set the starting point for optimization
    pub fn with_initial_guess(mut self, guess: Vec<f64>) -> Self {
        self.initial_guess = Some(guess);
        self
    }

    /// Run the calibration and return the best point found
    pub fn run(&self, model: &dyn CalibrationObjective) -> Result<MinimizerOutcome> {
        calibrate_model(model, &self.config, self.initial_guess.clone())
    }
}

/// Penalized view of the objective: infeasible or non-finite trials count as
/// a large finite loss so a single bad trial point cannot abort calibration.
fn penalized(model: &dyn CalibrationObjective, x: &[f64]) -> f64 {
    match model.evaluate(x) {
        Ok(loss) if loss.is_finite() => loss,
        _ => EVALUATION_PENALTY,
    }
}

/// Optimization driver combining an optional seeded CMA-ES global search
/// with bounded L-BFGS-B refinement. The reported parameters always lie
/// inside the model's bounds, including when the refinement stops early or
/// fails; in that case `converged` is false and the best point seen so far
/// is returned.
pub fn calibrate_model(
    model: &dyn CalibrationObjective,
    config: &CalibrationConfig,
    initial_guess: Option<Vec<f64>>,
) -> Result<MinimizerOutcome> {
    let bounds = model.param_bounds();
    validate_bounds(bounds, model.param_count())?;
    if let Some(ref guess) = initial_guess {
        if guess.len() != model.param_count() {
            return Err(Error::InvalidInput(format!(
                "initial guess has {} entries, the {} model expects {}",
                guess.len(),
                model.model_name(),
                model.param_count()
            )));
        }
    }

    let obj_fn = |x: &[f64]| penalized(model, x);

    // 1) Starting point: seeded CMA-ES global search when enabled, otherwise
    // the supplied guess (clamped into the box), otherwise the box midpoint.
    let (start_obj, start_sol) = if config.cmaes.enabled {
        if config.verbosity > 0 {
            println!(
                "Running CMA-ES global search for the {} model ({} BIPOP restarts)...",
                model.model_name(),
                config.cmaes.bipop_restarts
            );
        }

        let cmaes_config = CmaesCanonicalConfig {
            population_size: config.cmaes.pop_size,
            max_generations: config.cmaes.max_gen,
            seed: config.cmaes.seed.unwrap_or(123456),
            c1: None,
            c_mu: None,
            c_sigma: None,
            d_sigma: None,
            parallel_eval: config.cmaes.parallel_eval,
            verbosity: config.verbosity,
            ipop_restarts: config.cmaes.ipop_restarts,
            ipop_increase_factor: config.cmaes.ipop_increase_factor,
            bipop_restarts: config.cmaes.bipop_restarts,
            total_evals_budget: config.cmaes.total_evals_budget,
            use_subrun_budgeting: config.cmaes.use_subrun_budgeting,
            alpha_mu: None,
            hsig_threshold_factor: None,
            bipop_small_population_factor: None,
            bipop_small_budget_factor: None,
            bipop_large_budget_factor: None,
            bipop_large_pop_increase_factor: None,
            max_bound_iterations: None,
            eig_precision_threshold: None,
            min_eig_value: None,
            matrix_op_threshold: None,
            stagnation_limit: None,
            min_sigma: None,
        };

        let cmaes_result = canonical_cmaes_optimize(
            obj_fn,
            bounds,
            cmaes_config,
            initial_guess.clone().map(|g| clamped(&g, bounds)),
        );
        let (_, sol) = cmaes_result.best_solution;
        let obj = obj_fn(&sol);

        // The sampled population need not contain the guess itself; never
        // start refinement from a point worse than it.
        match initial_guess {
            Some(guess) => {
                let guess = clamped(&guess, bounds);
                let guess_obj = obj_fn(&guess);
                if guess_obj < obj {
                    (guess_obj, guess)
                } else {
                    (obj, sol)
                }
            }
            None => (obj, sol),
        }
    } else {
        let guess = initial_guess
            .map(|g| clamped(&g, bounds))
            .unwrap_or_else(|| midpoint(bounds));
        let obj = obj_fn(&guess);
        if config.verbosity > 0 {
            println!("Initial guess objective = {:.6}", obj);
        }
        (obj, guess)
    };

    // 2) Local refinement of the starting point with L-BFGS-B.
    let minimizer = LbfgsbMinimizer {
        verbosity: config.verbosity,
    };
    let refined = minimizer.minimize(
        &obj_fn,
        &start_sol,
        bounds,
        config.tolerance,
        config.max_iterations,
    );

    let mut best = if refined.best_loss <= start_obj {
        if config.verbosity > 0 && refined.best_loss < start_obj {
            println!(
                "L-BFGS-B improved objective: {:.6} -> {:.6}",
                start_obj, refined.best_loss
            );
        }
        refined
    } else {
        if config.verbosity > 0 {
            println!("L-BFGS-B did not improve objective, keeping starting point");
        }
        MinimizerOutcome {
            best_params: start_sol,
            best_loss: start_obj,
            ..refined
        }
    };

    // Bounds are hard constraints on the reported result, whatever the
    // refinement did.
    for (value, (lo, hi)) in best.best_params.iter_mut().zip(bounds) {
        *value = value.clamp(*lo, *hi);
    }
    Ok(best)
}

/// Bounded L-BFGS-B minimizer backed by the `cmaes-lbfgsb` crate.
pub struct LbfgsbMinimizer {
    /// Per-iteration logging when >= 2
    pub verbosity: u8,
}

impl BoundedMinimizer for LbfgsbMinimizer {
    fn minimize(
        &self,
        objective: &(dyn Fn(&[f64]) -> f64 + Sync),
        initial: &[f64],
        bounds: &[(f64, f64)],
        tolerance: f64,
        max_iterations: usize,
    ) -> MinimizerOutcome {
        let start_loss = objective(initial);
        let mut x = initial.to_vec();

        let iterations = AtomicUsize::new(0usize);
        let verbosity = self.verbosity;
        let progress = Some(|_current_x: &[f64], current_obj: f64| {
            let count = iterations.fetch_add(1, Ordering::Relaxed) + 1;
            if verbosity >= 2 {
                println!(
                    "L-BFGS-B iteration {} => objective = {:.6}",
                    count,
                    current_obj
                );
            }
        });

        let refine_res = lbfgsb_optimize(
            &mut x,
            bounds,
            &objective,
            max_iterations,
            tolerance,
            progress,
            None, // Use default config
        );

        match refine_res {
            Ok((loc_obj, loc_sol)) => {
                let iters = iterations.load(Ordering::Relaxed);
                // Stopping short of the budget means the internal criterion
                // (gradient norm / step size below tolerance) was met.
                let converged = iters < max_iterations && loc_obj.is_finite();
                if loc_obj <= start_loss {
                    MinimizerOutcome {
                        best_params: loc_sol,
                        best_loss: loc_obj,
                        iterations: iters,
                        converged,
                    }
                } else {
                    MinimizerOutcome {
                        best_params: initial.to_vec(),
                        best_loss: start_loss,
                        iterations: iters,
                        converged,
                    }
                }
            }
            Err(e) => {
                if verbosity > 0 {
                    println!("L-BFGS-B failed: {:?}, keeping starting point", e);
                }
                MinimizerOutcome {
                    best_params: initial.to_vec(),
                    best_loss: start_loss,
                    iterations: iterations.load(Ordering::Relaxed),
                    converged: false,
                }
            }
        }
    }
}

fn validate_bounds(bounds: &[(f64, f64)], expected: usize) -> Result<()> {
    if bounds.len() != expected {
        return Err(Error::InvalidInput(format!(
            "expected {} parameter bounds, got {}",
            expected,
            bounds.len()
        )));
    }
    for (idx, &(lo, hi)) in bounds.iter().enumerate() {
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(Error::InvalidInput(format!(
                "bounds [{}, {}] at index {} must be finite with lo <= hi",
                lo, hi, idx
            )));
        }
    }
    Ok(())
}

fn clamped(x: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    x.iter()
        .zip(bounds)
        .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
        .collect()
}

fn midpoint(bounds: &[(f64, f64)]) -> Vec<f64> {
    bounds.iter().map(|(lo, hi)| 0.5 * (lo + hi)).collect()
}
