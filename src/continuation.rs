//! Temperature continuation driver.
//!
//! Solving the QRE condition directly at a sharp beta puts Newton far
//! outside its basin of convergence. The driver instead walks an increasing
//! beta schedule starting near zero, where the uniform (zero-logit) point is
//! already close to a root, and warm-starts each level from the previous
//! solution. Each solution varies continuously in beta, so the warm start
//! keeps Newton in its locally quadratic regime.

use nalgebra::DVector;

use crate::error::SolverResult;
use crate::game::PokerGame;
use crate::newton::{IterationStats, NewtonConfig, NewtonSolver};
use crate::qre::QreResidual;

/// Increasing schedule ending exactly at `target_beta`: 0.01 first, then a
/// geometric doubling ramp from 0.05.
pub fn beta_schedule(target_beta: f64) -> Vec<f64> {
    let mut schedule = vec![0.01];

    let mut beta = 0.05;
    while beta < target_beta {
        schedule.push(beta);
        beta *= 2.0;
    }

    schedule.push(target_beta);
    schedule
}

#[derive(Debug, Clone)]
pub struct ContinuationConfig {
    pub target_beta: f64,
    pub newton: NewtonConfig,
}

/// Outcome of one beta level.
#[derive(Debug, Clone)]
pub struct BetaStepResult {
    pub beta: f64,
    pub converged: bool,
    pub iterations: usize,
    pub final_residual: f64,
}

#[derive(Debug)]
pub struct ContinuationResult {
    /// Solution logits at the final beta level.
    pub w: DVector<f64>,
    pub steps: Vec<BetaStepResult>,
    pub total_iterations: usize,
}

impl ContinuationResult {
    pub fn final_step(&self) -> Option<&BetaStepResult> {
        self.steps.last()
    }
}

/// Run the Newton solver along the beta schedule, warm-starting each level.
/// `on_iteration` observes every Newton iteration annotated with the level's
/// beta; errors from it abort the run.
pub fn solve_continuation<F>(
    game: &dyn PokerGame,
    config: &ContinuationConfig,
    warm_start: Option<DVector<f64>>,
    mut on_iteration: F,
) -> SolverResult<ContinuationResult>
where
    F: FnMut(&IterationStats, &DVector<f64>, f64) -> SolverResult<()>,
{
    let mut residual = QreResidual::new(game, config.target_beta);
    let mut w = warm_start.unwrap_or_else(|| DVector::zeros(residual.dim()));

    let mut steps = Vec::new();
    let mut total_iterations = 0;

    for beta in beta_schedule(config.target_beta) {
        residual.set_beta(beta);

        let mut newton = NewtonSolver::new(config.newton.clone());
        newton.set_callback(|stats, x| on_iteration(stats, x, beta));

        let result = newton.solve(&residual, w)?;
        w = result.x;
        total_iterations += result.iterations;

        steps.push(BetaStepResult {
            beta,
            converged: result.converged,
            iterations: result.iterations,
            final_residual: result.final_residual,
        });
    }

    Ok(ContinuationResult {
        w,
        steps,
        total_iterations,
    })
}
