//! Finite-difference Jacobian assembly.
//!
//! Central differences give O(h^2) truncation error, which at double
//! precision is adequate for the dimensions this solver targets. A
//! rayon-parallel variant distributes column computations across workers;
//! it is exposed for tooling and benchmarks, the production Newton loop
//! stays sequential.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::error::SolverResult;
use crate::newton::Residual;

/// J_ij = dF_i / dx_j by finite differences. Central when `central` is set
/// (2n evaluations), forward otherwise (n + 1 evaluations).
pub fn jacobian<R: Residual + ?Sized>(
    residual: &R,
    x: &DVector<f64>,
    h: f64,
    central: bool,
) -> SolverResult<DMatrix<f64>> {
    let n = x.len();
    let f0 = residual.eval(x)?;
    let m = f0.len();

    let mut jac = DMatrix::zeros(m, n);

    if central {
        for j in 0..n {
            let mut x_plus = x.clone();
            let mut x_minus = x.clone();
            x_plus[j] += h;
            x_minus[j] -= h;

            let f_plus = residual.eval(&x_plus)?;
            let f_minus = residual.eval(&x_minus)?;
            jac.set_column(j, &((f_plus - f_minus) / (2.0 * h)));
        }
    } else {
        for j in 0..n {
            let mut x_plus = x.clone();
            x_plus[j] += h;

            let f_plus = residual.eval(&x_plus)?;
            jac.set_column(j, &((f_plus - &f0) / h));
        }
    }

    Ok(jac)
}

/// Step size scaled to the coordinate magnitude: h * max(1, |x_j|).
pub fn adaptive_step(x_j: f64, base_h: f64) -> f64 {
    base_h * x_j.abs().max(1.0)
}

/// Central-difference Jacobian with a per-coordinate adaptive step.
pub fn jacobian_adaptive<R: Residual + ?Sized>(
    residual: &R,
    x: &DVector<f64>,
    base_h: f64,
) -> SolverResult<DMatrix<f64>> {
    let n = x.len();
    let f0 = residual.eval(x)?;
    let m = f0.len();

    let mut jac = DMatrix::zeros(m, n);
    for j in 0..n {
        let h = adaptive_step(x[j], base_h);

        let mut x_plus = x.clone();
        let mut x_minus = x.clone();
        x_plus[j] += h;
        x_minus[j] -= h;

        let f_plus = residual.eval(&x_plus)?;
        let f_minus = residual.eval(&x_minus)?;
        jac.set_column(j, &((f_plus - f_minus) / (2.0 * h)));
    }

    Ok(jac)
}

/// Central-difference Jacobian with columns computed in parallel. The
/// residual must be re-entrant: pure with respect to its input vector and
/// free of mutable process-wide state.
pub fn jacobian_parallel<R: Residual + Sync + ?Sized>(
    residual: &R,
    x: &DVector<f64>,
    h: f64,
) -> SolverResult<DMatrix<f64>> {
    let n = x.len();
    let columns: Vec<DVector<f64>> = (0..n)
        .into_par_iter()
        .map(|j| -> SolverResult<DVector<f64>> {
            let mut x_plus = x.clone();
            let mut x_minus = x.clone();
            x_plus[j] += h;
            x_minus[j] -= h;

            let f_plus = residual.eval(&x_plus)?;
            let f_minus = residual.eval(&x_minus)?;
            Ok((f_plus - f_minus) / (2.0 * h))
        })
        .collect::<SolverResult<Vec<_>>>()?;

    Ok(DMatrix::from_columns(&columns))
}
