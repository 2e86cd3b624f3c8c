//! Tests for the Newton solver on known nonlinear systems with analytical
//! roots, plus the finite-difference Jacobian it relies on.

use nalgebra::DVector;

use qre_solver::finite_diff::jacobian;
use qre_solver::newton::{residual_fn, NewtonConfig, NewtonSolver};

// ---------------------------------------------------------------------------
// Convergence on systems with known roots
// ---------------------------------------------------------------------------

#[test]
fn linear_system_converges_from_any_start() {
    // F(x) = x - c with c = (1, 2).
    let f = residual_fn(|x: &DVector<f64>| {
        DVector::from_vec(vec![x[0] - 1.0, x[1] - 2.0])
    });

    for x0 in [
        DVector::zeros(2),
        DVector::from_vec(vec![100.0, -50.0]),
        DVector::from_vec(vec![-3.0, 7.0]),
    ] {
        let mut solver = NewtonSolver::new(NewtonConfig {
            tol: 1e-10,
            max_iters: 10,
            ..Default::default()
        });
        let result = solver.solve(&f, x0.clone()).unwrap();

        assert!(result.converged, "failed to converge from {:?}", x0);
        assert!(
            result.iterations <= 5,
            "linear system took {} iterations from {:?}",
            result.iterations,
            x0
        );
        assert!((result.x[0] - 1.0).abs() < 1e-8);
        assert!((result.x[1] - 2.0).abs() < 1e-8);
    }
}

#[test]
fn three_dimensional_linear_system_converges() {
    let f = residual_fn(|x: &DVector<f64>| {
        DVector::from_vec(vec![x[0] - 1.0, x[1] - 2.0, x[2] - 3.0])
    });

    let mut solver = NewtonSolver::new(NewtonConfig {
        tol: 1e-10,
        ..Default::default()
    });
    let x0 = DVector::from_element(3, 10.0);
    let result = solver.solve(&f, x0).unwrap();

    assert!(result.converged);
    assert!((result.x[0] - 1.0).abs() < 1e-8);
    assert!((result.x[1] - 2.0).abs() < 1e-8);
    assert!((result.x[2] - 3.0).abs() < 1e-8);
}

#[test]
fn rosenbrock_system_converges_with_line_search() {
    // F(x, y) = (10*(y - x^2), 1 - x), root at (1, 1). Classic test for
    // damped Newton: the full step overshoots badly from (-1, 1).
    let f = residual_fn(|x: &DVector<f64>| {
        DVector::from_vec(vec![10.0 * (x[1] - x[0] * x[0]), 1.0 - x[0]])
    });

    let mut solver = NewtonSolver::new(NewtonConfig {
        tol: 1e-10,
        max_iters: 50,
        use_line_search: true,
        ..Default::default()
    });
    let result = solver
        .solve(&f, DVector::from_vec(vec![-1.0, 1.0]))
        .unwrap();

    assert!(result.converged, "no convergence in {} iters", result.iterations);
    assert!(result.iterations <= 50);
    assert!((result.x[0] - 1.0).abs() < 1e-6);
    assert!((result.x[1] - 1.0).abs() < 1e-6);
}

#[test]
fn scalar_quadratic_converges_to_nearest_root() {
    // F(x) = x^2 - 4 from x0 = 1 lands on x = 2.
    let f = residual_fn(|x: &DVector<f64>| DVector::from_vec(vec![x[0] * x[0] - 4.0]));

    let mut solver = NewtonSolver::new(NewtonConfig {
        tol: 1e-10,
        ..Default::default()
    });
    let result = solver.solve(&f, DVector::from_vec(vec![1.0])).unwrap();

    assert!(result.converged);
    assert!((result.x[0] - 2.0).abs() < 1e-8);
}

// ---------------------------------------------------------------------------
// Non-convergence and diagnostics
// ---------------------------------------------------------------------------

#[test]
fn rootless_problem_exhausts_exactly_max_iters() {
    // F(x) = exp(x) has no real root; every step descends but never reaches
    // zero.
    let f = residual_fn(|x: &DVector<f64>| DVector::from_vec(vec![x[0].exp()]));

    let max_iters = 10;
    let mut solver = NewtonSolver::new(NewtonConfig {
        tol: 1e-10,
        max_iters,
        ..Default::default()
    });
    let result = solver.solve(&f, DVector::zeros(1)).unwrap();

    assert!(!result.converged);
    assert_eq!(result.iterations, max_iters);
    assert_eq!(result.trace.termination_reason, "Max iterations reached");
}

#[test]
fn trace_records_every_iteration() {
    let f = residual_fn(|x: &DVector<f64>| {
        DVector::from_vec(vec![x[0] - 1.0, x[1] - 2.0])
    });

    let mut solver = NewtonSolver::new(NewtonConfig {
        tol: 1e-10,
        ..Default::default()
    });
    let result = solver.solve(&f, DVector::zeros(2)).unwrap();

    assert!(!result.trace.iterations.is_empty());
    assert!(result.trace.success);
    assert_eq!(result.trace.total_iterations, result.trace.iterations.len());

    // Iteration indices are strictly increasing from zero.
    for (k, stats) in result.trace.iterations.iter().enumerate() {
        assert_eq!(stats.iteration, k);
    }
}

#[test]
fn residual_norm_is_non_increasing_across_accepted_iterations() {
    for problem in 0..2 {
        let f: Box<dyn qre_solver::newton::Residual> = if problem == 0 {
            Box::new(residual_fn(|x: &DVector<f64>| {
                DVector::from_vec(vec![10.0 * (x[1] - x[0] * x[0]), 1.0 - x[0]])
            }))
        } else {
            Box::new(residual_fn(|x: &DVector<f64>| {
                DVector::from_vec(vec![x[0].exp()])
            }))
        };

        let x0 = if problem == 0 {
            DVector::from_vec(vec![-1.0, 1.0])
        } else {
            DVector::zeros(1)
        };

        let mut solver = NewtonSolver::new(NewtonConfig {
            tol: 1e-10,
            max_iters: 50,
            ..Default::default()
        });
        let result = solver.solve(f.as_ref(), x0).unwrap();

        let norms: Vec<f64> = result
            .trace
            .iterations
            .iter()
            .filter(|s| s.alpha > 0.0 || s.converged)
            .map(|s| s.residual_norm)
            .collect();
        for window in norms.windows(2) {
            assert!(
                window[1] <= window[0] + 1e-12,
                "residual increased: {} -> {}",
                window[0],
                window[1]
            );
        }
    }
}

#[test]
fn condition_number_is_recorded() {
    let f = residual_fn(|x: &DVector<f64>| {
        DVector::from_vec(vec![x[0] - 1.0, 10.0 * x[1] - 2.0])
    });

    let mut solver = NewtonSolver::new(NewtonConfig::default());
    let result = solver.solve(&f, DVector::zeros(2)).unwrap();

    // J = diag(1, 10), so the condition estimate sits near 10 on every
    // non-terminal iteration.
    let working: Vec<_> = result
        .trace
        .iterations
        .iter()
        .filter(|s| !s.converged)
        .collect();
    assert!(!working.is_empty());
    for stats in working {
        assert!(
            (stats.jacobian_cond - 10.0).abs() < 1e-3,
            "condition estimate {}",
            stats.jacobian_cond
        );
    }
}

// ---------------------------------------------------------------------------
// Finite-difference Jacobian accuracy
// ---------------------------------------------------------------------------

#[test]
fn central_difference_jacobian_matches_analytic() {
    // F(x, y) = (x^2 + y, x*y - 1); at (1, 2) the Jacobian is
    // [[2, 1], [2, 1]].
    let f = residual_fn(|x: &DVector<f64>| {
        DVector::from_vec(vec![x[0] * x[0] + x[1], x[0] * x[1] - 1.0])
    });

    let x = DVector::from_vec(vec![1.0, 2.0]);
    let jac = jacobian(&f, &x, 1e-7, true).unwrap();

    let exact = [[2.0, 1.0], [2.0, 1.0]];
    for i in 0..2 {
        for j in 0..2 {
            assert!(
                (jac[(i, j)] - exact[i][j]).abs() < 1e-5,
                "J[{},{}] = {} expected {}",
                i,
                j,
                jac[(i, j)],
                exact[i][j]
            );
        }
    }
}

#[test]
fn solver_works_without_line_search() {
    let f = residual_fn(|x: &DVector<f64>| {
        DVector::from_vec(vec![x[0] - 1.0, x[1] - 2.0])
    });

    let mut solver = NewtonSolver::new(NewtonConfig {
        tol: 1e-10,
        use_line_search: false,
        ..Default::default()
    });
    let result = solver.solve(&f, DVector::zeros(2)).unwrap();

    assert!(result.converged);
    assert!((result.x[0] - 1.0).abs() < 1e-8);
}
