//! Armijo backtracking line search on the least-squares merit function.

use nalgebra::{DMatrix, DVector};

use crate::error::SolverResult;
use crate::newton::Residual;

#[derive(Debug, Clone, Copy)]
pub struct LineSearchResult {
    /// Accepted step size; 0 when the direction is not a descent direction.
    pub alpha: f64,
    /// Merit value at `x + alpha * d`.
    pub merit: f64,
    /// Number of residual evaluations spent.
    pub evaluations: usize,
    pub success: bool,
}

/// Merit function phi(x) = 0.5 * ||F(x)||^2.
pub fn merit_function<R: Residual + ?Sized>(
    residual: &R,
    x: &DVector<f64>,
) -> SolverResult<f64> {
    let r = residual.eval(x)?;
    Ok(0.5 * r.norm_squared())
}

/// Find alpha with phi(x + alpha*d) <= phi(x) + c * alpha * phi'(0), where
/// phi'(0) = r' * J * d. Starts at alpha = 1 and multiplies by rho on each
/// rejection. A non-descent direction (phi'(0) >= 0) returns alpha = 0
/// without moving.
pub fn armijo_backtrack<R: Residual + ?Sized>(
    residual: &R,
    x: &DVector<f64>,
    d: &DVector<f64>,
    jacobian: &DMatrix<f64>,
    c: f64,
    rho: f64,
    max_steps: usize,
) -> SolverResult<LineSearchResult> {
    let r0 = residual.eval(x)?;
    let phi0 = 0.5 * r0.norm_squared();
    let mut evaluations = 1;

    // Directional derivative of the merit along d.
    let dphi0 = r0.dot(&(jacobian * d));

    if dphi0 >= 0.0 {
        return Ok(LineSearchResult {
            alpha: 0.0,
            merit: phi0,
            evaluations,
            success: false,
        });
    }

    let mut alpha = 1.0;
    for _ in 0..max_steps {
        let x_new = x + d * alpha;
        let r_new = residual.eval(&x_new)?;
        let phi_new = 0.5 * r_new.norm_squared();
        evaluations += 1;

        if phi_new <= phi0 + c * alpha * dphi0 {
            return Ok(LineSearchResult {
                alpha,
                merit: phi_new,
                evaluations,
                success: true,
            });
        }

        alpha *= rho;
    }

    // Backtracking budget exhausted; report the final (tiny) step.
    let merit = merit_function(residual, &(x + d * alpha))?;
    Ok(LineSearchResult {
        alpha,
        merit,
        evaluations: evaluations + 1,
        success: false,
    })
}
