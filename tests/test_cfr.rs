//! CFR oracle tests: convergence on Kuhn poker and cross-validation of the
//! Newton/QRE solver against the regret-minimization solution.

use nalgebra::DVector;

use qre_solver::cfr::CfrTrainer;
use qre_solver::expected_value::compute_exploitability;
use qre_solver::game::{InfoSetIndex, PokerGame};
use qre_solver::kuhn::KuhnPoker;
use qre_solver::newton::{NewtonConfig, NewtonSolver};
use qre_solver::qre::QreResidual;
use qre_solver::strategy::Strategy;

// ---------------------------------------------------------------------------
// CFR convergence
// ---------------------------------------------------------------------------

#[test]
fn cfr_converges_on_kuhn() {
    let kuhn = KuhnPoker::new();
    let mut cfr = CfrTrainer::new(&kuhn);
    cfr.solve(100).unwrap();

    let exploit = cfr.exploitability().unwrap();
    assert!(exploit < 0.5, "exploitability {} after 100 iterations", exploit);
}

#[test]
fn average_strategy_improves_with_iterations() {
    let kuhn = KuhnPoker::new();

    let mut exploits = Vec::new();
    for iters in [10, 50, 100, 500] {
        let mut cfr = CfrTrainer::new(&kuhn);
        cfr.solve(iters).unwrap();
        exploits.push(cfr.exploitability().unwrap());
    }

    // Not strictly monotone step to step, but the trend must be down.
    assert!(
        exploits.last().unwrap() < exploits.first().unwrap(),
        "exploitability did not improve: {:?}",
        exploits
    );
}

#[test]
fn cfr_plus_is_at_least_as_good_as_vanilla() {
    let kuhn = KuhnPoker::new();

    let mut vanilla = CfrTrainer::new(&kuhn);
    let mut plus = CfrTrainer::new_plus(&kuhn);
    vanilla.solve(200).unwrap();
    plus.solve(200).unwrap();

    let vanilla_exploit = vanilla.exploitability().unwrap();
    let plus_exploit = plus.exploitability().unwrap();

    assert!(
        plus_exploit <= vanilla_exploit * 1.1,
        "CFR+ {} worse than CFR {}",
        plus_exploit,
        vanilla_exploit
    );
}

#[test]
fn regret_matching_strategies_stay_valid() {
    let kuhn = KuhnPoker::new();
    let mut cfr = CfrTrainer::new(&kuhn);
    cfr.solve(10).unwrap();

    for (id, data) in cfr.regret_data() {
        let sigma = data.regret_matching_strategy();
        let total: f64 = sigma.iter().sum();
        assert!((total - 1.0).abs() < 1e-10, "info set {}", id);
        assert!(sigma.iter().all(|&p| p >= 0.0), "info set {}", id);
    }
}

// ---------------------------------------------------------------------------
// Cross-validation: CFR vs Newton/QRE
// ---------------------------------------------------------------------------

#[test]
fn cfr_and_newton_find_comparable_equilibria() {
    let kuhn = KuhnPoker::new();

    // Oracle: vanilla CFR average strategy.
    let mut cfr = CfrTrainer::new(&kuhn);
    cfr.solve(5000).unwrap();
    let cfr_strategy = cfr.average_strategy().unwrap();
    let cfr_exploit = cfr.exploitability().unwrap();

    // Newton/QRE with the standard continuation schedule.
    let mut qre = QreResidual::new(&kuhn, 0.1);
    let mut w = DVector::zeros(qre.dim());
    for beta in [0.1, 0.5, 1.0, 2.0, 5.0, 10.0] {
        qre.set_beta(beta);
        let mut newton = NewtonSolver::new(NewtonConfig {
            tol: 1e-10,
            max_iters: 100,
            ..Default::default()
        });
        let result = newton.solve(&qre, w).unwrap();
        w = result.x;
    }
    let newton_strategy = Strategy::from_logits(&w, qre.index()).unwrap();
    let newton_exploit = compute_exploitability(kuhn.root(), &newton_strategy).unwrap();

    // Both methods reach the same ballpark; the signed exploitability
    // convention makes exact comparison meaningless, so compare within a
    // factor.
    assert!(cfr_exploit < 1.0, "CFR exploitability {}", cfr_exploit);
    assert!(newton_exploit < 1.0, "Newton exploitability {}", newton_exploit);
    assert!(
        cfr_exploit < newton_exploit * 3.0,
        "CFR {} vs Newton {}",
        cfr_exploit,
        newton_exploit
    );
    assert!(
        newton_exploit < cfr_exploit * 3.0,
        "Newton {} vs CFR {}",
        newton_exploit,
        cfr_exploit
    );

    // Both produce valid distributions at every info set.
    let index = InfoSetIndex::build(&kuhn.info_sets());
    for i in 0..index.num_info_sets() {
        let id = &index.info_set(i).id;
        for sigma in [&cfr_strategy, &newton_strategy] {
            let probs = sigma.probs(id).unwrap();
            let total: f64 = probs.iter().sum();
            assert!((total - 1.0).abs() < 1e-6, "info set {}", id);
            assert!(probs.iter().all(|&p| p >= -1e-10), "info set {}", id);
        }
    }
}

#[test]
fn cfr_average_strategy_seeds_a_newton_solve() {
    let kuhn = KuhnPoker::new();

    let mut cfr = CfrTrainer::new(&kuhn);
    cfr.solve(500).unwrap();

    // Seed Newton at a moderate temperature from the CFR average via the
    // canonical log inverse.
    let qre = QreResidual::new(&kuhn, 1.0);
    let w0 = cfr.average_strategy().unwrap().to_flat_logits(qre.index());

    let mut newton = NewtonSolver::new(NewtonConfig {
        tol: 1e-8,
        max_iters: 100,
        ..Default::default()
    });
    let result = newton.solve(&qre, w0).unwrap();

    assert!(result.converged, "seeded solve failed to converge");
    assert!(result.final_residual < 1e-8);
}
