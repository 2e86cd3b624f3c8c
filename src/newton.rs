//! Damped Newton solver for square nonlinear systems F(x) = 0.
//!
//! The Jacobian is estimated by finite differences, the step comes from the
//! Levenberg-regularized normal equations (J'J + lambda*I) d = -J'r, and a
//! backtracking line search enforces sufficient decrease of the merit
//! 0.5 * ||F||^2. Large lambda turns the step gradient-like far from a root;
//! near the root lambda shrinks back toward the full Newton step.

use colored::Colorize;
use nalgebra::{DMatrix, DVector, FullPivLU};
use serde::Serialize;

use crate::error::{SolverError, SolverResult};
use crate::finite_diff;
use crate::line_search;

/// A residual usable by the Newton solver: any object mapping a vector to a
/// vector of the same dimension. Implementations must be pure with respect
/// to the input vector.
pub trait Residual {
    fn eval(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>>;
}

/// Adapter wrapping a plain closure as a `Residual`, used to plug test
/// problems into the solver.
pub struct FnResidual<F> {
    f: F,
}

pub fn residual_fn<F>(f: F) -> FnResidual<F>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    FnResidual { f }
}

impl<F> Residual for FnResidual<F>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    fn eval(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok((self.f)(x))
    }
}

// ---------------------------------------------------------------------------
// Configuration and diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewtonConfig {
    /// Convergence tolerance on the residual norm.
    pub tol: f64,
    pub max_iters: usize,
    /// Finite difference step size.
    pub fd_step: f64,
    /// Central (vs forward) differences.
    pub central_diff: bool,
    /// Initial Levenberg regularization.
    pub lambda_init: f64,
    pub lambda_max: f64,
    /// Multiplicative factor for raising/lowering lambda.
    pub lambda_factor: f64,
    pub armijo_c: f64,
    pub armijo_rho: f64,
    pub max_backtracks: usize,
    pub use_line_search: bool,
    pub verbose: bool,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        NewtonConfig {
            tol: 1e-10,
            max_iters: 100,
            fd_step: 1e-7,
            central_diff: true,
            lambda_init: 1e-6,
            lambda_max: 1e6,
            lambda_factor: 10.0,
            armijo_c: 1e-4,
            armijo_rho: 0.5,
            max_backtracks: 20,
            use_line_search: true,
            verbose: false,
        }
    }
}

/// Per-iteration diagnostic record. `residual_norm` and `lambda` are the
/// values entering the iteration.
#[derive(Debug, Clone, Serialize)]
pub struct IterationStats {
    pub iteration: usize,
    pub residual_norm: f64,
    pub step_norm: f64,
    pub alpha: f64,
    pub lambda: f64,
    pub jacobian_cond: f64,
    pub converged: bool,
    pub status: String,
}

impl Default for IterationStats {
    fn default() -> Self {
        IterationStats {
            iteration: 0,
            residual_norm: 0.0,
            step_norm: 0.0,
            alpha: 1.0,
            lambda: 0.0,
            jacobian_cond: 0.0,
            converged: false,
            status: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SolverTrace {
    pub iterations: Vec<IterationStats>,
    pub success: bool,
    pub total_iterations: usize,
    pub final_residual: f64,
    pub termination_reason: String,
}

impl SolverTrace {
    pub fn add_iteration(&mut self, stats: IterationStats) {
        self.final_residual = stats.residual_norm;
        self.iterations.push(stats);
        self.total_iterations = self.iterations.len();
    }
}

#[derive(Debug)]
pub struct NewtonResult {
    pub x: DVector<f64>,
    pub trace: SolverTrace,
    pub converged: bool,
    pub iterations: usize,
    pub final_residual: f64,
}

/// Callback invoked once per iteration, in strictly increasing iteration
/// order, including the terminal "converged" emission. Errors abort the
/// solve and propagate to the caller.
pub type IterationCallback<'a> =
    Box<dyn FnMut(&IterationStats, &DVector<f64>) -> SolverResult<()> + 'a>;

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

const MAX_REGULARIZATION_TRIES: usize = 10;

pub struct NewtonSolver<'a> {
    config: NewtonConfig,
    callback: Option<IterationCallback<'a>>,
}

impl<'a> NewtonSolver<'a> {
    pub fn new(config: NewtonConfig) -> Self {
        NewtonSolver {
            config,
            callback: None,
        }
    }

    pub fn config(&self) -> &NewtonConfig {
        &self.config
    }

    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&IterationStats, &DVector<f64>) -> SolverResult<()> + 'a,
    {
        self.callback = Some(Box::new(callback));
    }

    fn emit(&mut self, stats: &IterationStats, x: &DVector<f64>) -> SolverResult<()> {
        if let Some(callback) = &mut self.callback {
            callback(stats, x)?;
        }
        Ok(())
    }

    /// Solve F(x) = 0 from `x0`. Numerical failures (singular Jacobian,
    /// stalled regularization, exhausted budget) are terminal states in the
    /// returned result, not errors; only dimension mismatches, residual
    /// failures and callback failures surface as `Err`.
    pub fn solve<R: Residual + ?Sized>(
        &mut self,
        residual: &R,
        x0: DVector<f64>,
    ) -> SolverResult<NewtonResult> {
        let n = x0.len();
        let mut x = x0;
        let mut lambda = self.config.lambda_init;
        let mut trace = SolverTrace::default();

        let mut r = residual.eval(&x)?;
        if r.len() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                got: r.len(),
            });
        }
        let mut residual_norm = r.norm();

        for iter in 0..self.config.max_iters {
            let mut stats = IterationStats {
                iteration: iter,
                residual_norm,
                lambda,
                ..Default::default()
            };

            if residual_norm < self.config.tol {
                stats.converged = true;
                stats.status = "Converged".to_string();
                trace.add_iteration(stats.clone());
                self.emit(&stats, &x)?;

                trace.success = true;
                trace.termination_reason = "Converged: residual below tolerance".to_string();
                return Ok(NewtonResult {
                    x,
                    trace,
                    converged: true,
                    iterations: iter,
                    final_residual: residual_norm,
                });
            }

            let jac = finite_diff::jacobian(
                residual,
                &x,
                self.config.fd_step,
                self.config.central_diff,
            )?;

            // Condition estimate from the singular values; informational
            // only, never gates behavior.
            let singular = jac.singular_values();
            let s_min = singular.iter().copied().fold(f64::INFINITY, f64::min);
            let s_max = singular.iter().copied().fold(0.0, f64::max);
            stats.jacobian_cond = if s_min > 0.0 {
                s_max / s_min
            } else {
                f64::INFINITY
            };

            // (J'J + lambda*I) d = -J'r, ramping lambda while the system
            // stays non-invertible.
            let jtj = jac.transpose() * &jac;
            let neg_jtr = -(jac.transpose() * &r);

            let mut step = None;
            for _ in 0..MAX_REGULARIZATION_TRIES {
                let damped = &jtj + DMatrix::identity(n, n) * lambda;
                if let Some(d) = FullPivLU::new(damped).solve(&neg_jtr) {
                    step = Some(d);
                    break;
                }
                lambda *= self.config.lambda_factor;
            }

            let Some(d) = step else {
                stats.status = "Failed: Jacobian singular".to_string();
                trace.add_iteration(stats.clone());
                self.emit(&stats, &x)?;

                trace.success = false;
                trace.termination_reason = "Failed: Jacobian singular".to_string();
                return Ok(NewtonResult {
                    x,
                    trace,
                    converged: false,
                    iterations: iter,
                    final_residual: residual_norm,
                });
            };

            stats.step_norm = d.norm();

            let x_new;
            let r_new;
            let new_residual_norm;
            let mut alpha = 1.0;

            if self.config.use_line_search {
                let ls = line_search::armijo_backtrack(
                    residual,
                    &x,
                    &d,
                    &jac,
                    self.config.armijo_c,
                    self.config.armijo_rho,
                    self.config.max_backtracks,
                )?;
                alpha = ls.alpha;

                if !ls.success && ls.alpha == 0.0 {
                    // Not a descent direction. More regularization bends the
                    // step toward the gradient; once lambda is saturated
                    // there is nothing left to try.
                    if lambda >= self.config.lambda_max {
                        stats.alpha = 0.0;
                        stats.status = "Stalled: no descent direction".to_string();
                        trace.add_iteration(stats.clone());
                        self.emit(&stats, &x)?;

                        trace.success = false;
                        trace.termination_reason =
                            "Stalled: regularization saturated without a descent direction"
                                .to_string();
                        return Ok(NewtonResult {
                            x,
                            trace,
                            converged: false,
                            iterations: iter,
                            final_residual: residual_norm,
                        });
                    }

                    lambda = (lambda * self.config.lambda_factor).min(self.config.lambda_max);
                    stats.alpha = 0.0;
                    stats.status = "No descent direction".to_string();
                    trace.add_iteration(stats.clone());
                    self.emit(&stats, &x)?;
                    continue;
                }

                x_new = &x + &d * alpha;
                r_new = residual.eval(&x_new)?;
                new_residual_norm = r_new.norm();

                if new_residual_norm < residual_norm {
                    lambda = (lambda / self.config.lambda_factor).max(self.config.lambda_init);
                } else {
                    lambda = (lambda * self.config.lambda_factor).min(self.config.lambda_max);
                }
            } else {
                x_new = &x + &d;
                r_new = residual.eval(&x_new)?;
                new_residual_norm = r_new.norm();
            }

            stats.alpha = alpha;
            stats.status = "Iteration complete".to_string();

            x = x_new;
            r = r_new;
            residual_norm = new_residual_norm;

            trace.add_iteration(stats.clone());
            self.emit(&stats, &x)?;

            if self.config.verbose {
                println!(
                    "  {} {:3}: ||r|| = {:.6e}, ||d|| = {:.6e}, alpha = {:.4}, lambda = {:.2e}",
                    "iter".dimmed(),
                    iter,
                    residual_norm,
                    stats.step_norm,
                    alpha,
                    lambda
                );
            }
        }

        trace.success = false;
        trace.termination_reason = "Max iterations reached".to_string();
        Ok(NewtonResult {
            x,
            trace,
            converged: false,
            iterations: self.config.max_iters,
            final_residual: residual_norm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_on_linear_system() {
        let f = residual_fn(|x: &DVector<f64>| {
            DVector::from_vec(vec![x[0] - 1.0, x[1] - 2.0])
        });

        let mut solver = NewtonSolver::new(NewtonConfig {
            tol: 1e-10,
            max_iters: 10,
            ..Default::default()
        });
        let result = solver.solve(&f, DVector::zeros(2)).unwrap();

        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-8);
        assert!((result.x[1] - 2.0).abs() < 1e-8);
    }

    #[test]
    fn rejects_non_square_residual() {
        let f = residual_fn(|x: &DVector<f64>| {
            DVector::from_vec(vec![x[0], x[1], x[0] + x[1]])
        });

        let mut solver = NewtonSolver::new(NewtonConfig::default());
        let err = solver.solve(&f, DVector::zeros(2)).unwrap_err();
        assert!(matches!(
            err,
            SolverError::DimensionMismatch { expected: 2, got: 3 }
        ));
    }

    #[test]
    fn callback_sees_increasing_iterations() {
        let f = residual_fn(|x: &DVector<f64>| {
            DVector::from_vec(vec![x[0] - 1.0, x[1] - 2.0])
        });

        let mut seen = Vec::new();
        {
            let mut solver = NewtonSolver::new(NewtonConfig::default());
            solver.set_callback(|stats, _| {
                seen.push(stats.iteration);
                Ok(())
            });
            solver.solve(&f, DVector::zeros(2)).unwrap();
        }

        assert!(!seen.is_empty());
        for window in seen.windows(2) {
            assert!(window[1] > window[0]);
        }
    }

    #[test]
    fn callback_errors_abort_the_solve() {
        let f = residual_fn(|x: &DVector<f64>| {
            DVector::from_vec(vec![x[0] - 1.0])
        });

        let mut solver = NewtonSolver::new(NewtonConfig::default());
        solver.set_callback(|_, _| {
            Err(SolverError::InvalidValue("sink unavailable".to_string()))
        });
        let err = solver.solve(&f, DVector::zeros(1)).unwrap_err();
        assert!(matches!(err, SolverError::InvalidValue(_)));
    }

    #[test]
    fn stats_serialize_to_json() {
        let stats = IterationStats {
            iteration: 3,
            residual_norm: 0.5,
            status: "Iteration complete".to_string(),
            ..Default::default()
        };
        let j = serde_json::to_value(&stats).unwrap();
        assert_eq!(j["iteration"], 3);
        assert_eq!(j["status"], "Iteration complete");
    }
}
