//! Quantal response equilibrium residual.
//!
//! A QRE at temperature beta is a fixed point of the logit best response:
//! sigma = LogitBR_beta(sigma), with LogitBR_beta(I, a) proportional to
//! exp(beta * EU(I, a)). Parameterizing sigma by logits w via softmax turns
//! the fixed-point condition into the root-finding problem
//! R(w) = softmax(w) - LogitBR_beta(softmax(w)) = 0, which is smooth in w
//! and solvable by Newton's method. As beta -> 0 the logit response tends
//! to uniform, so the zero-logit point is nearly a root; as beta -> infinity
//! it tends to the exact best response.

use nalgebra::DVector;

use crate::error::SolverResult;
use crate::expected_value::compute_all_expected_utilities;
use crate::game::{InfoSetIndex, PokerGame};
use crate::newton::Residual;
use crate::strategy::{stable_softmax, Strategy};

pub struct QreResidual<'a> {
    game: &'a dyn PokerGame,
    beta: f64,
    index: InfoSetIndex,
}

impl<'a> QreResidual<'a> {
    pub fn new(game: &'a dyn PokerGame, beta: f64) -> Self {
        let index = InfoSetIndex::build(&game.info_sets());
        QreResidual { game, beta, index }
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Temperature lives on the residual, not in any global state.
    pub fn set_beta(&mut self, beta: f64) {
        self.beta = beta;
    }

    /// Dimension of the flat strategy vector.
    pub fn dim(&self) -> usize {
        self.index.total_dim()
    }

    pub fn index(&self) -> &InfoSetIndex {
        &self.index
    }

    pub fn game(&self) -> &dyn PokerGame {
        self.game
    }

    /// LogitBR_beta(sigma) flattened to the index layout: per info set,
    /// softmax over beta-scaled expected utilities. Probabilities, not
    /// logits.
    pub fn logit_best_response(&self, sigma: &Strategy) -> SolverResult<DVector<f64>> {
        let all_eu = compute_all_expected_utilities(self.game.root(), sigma, &self.index)?;

        let mut br = DVector::zeros(self.index.total_dim());
        for i in 0..self.index.num_info_sets() {
            let is = self.index.info_set(i);
            let start = self.index.start(i);

            let scaled: Vec<f64> = all_eu[&is.id].iter().map(|&eu| self.beta * eu).collect();
            let probs = stable_softmax(&scaled);
            for (a, &p) in probs.iter().enumerate() {
                br[start + a] = p;
            }
        }

        Ok(br)
    }

    /// Current strategy probabilities flattened to the index layout.
    fn flatten_probs(&self, sigma: &Strategy) -> SolverResult<DVector<f64>> {
        let mut flat = DVector::zeros(self.index.total_dim());
        for i in 0..self.index.num_info_sets() {
            let is = self.index.info_set(i);
            let start = self.index.start(i);
            let probs = sigma.probs(&is.id)?;
            for (a, &p) in probs.iter().enumerate() {
                flat[start + a] = p;
            }
        }
        Ok(flat)
    }
}

impl Residual for QreResidual<'_> {
    fn eval(&self, w: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let sigma = Strategy::from_logits(w, &self.index)?;
        let br = self.logit_best_response(&sigma)?;
        let sigma_flat = self.flatten_probs(&sigma)?;
        Ok(sigma_flat - br)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kuhn::KuhnPoker;

    #[test]
    fn dimension_matches_index() {
        let kuhn = KuhnPoker::new();
        let qre = QreResidual::new(&kuhn, 1.0);
        assert_eq!(qre.dim(), 24);

        let r = qre.eval(&DVector::zeros(qre.dim())).unwrap();
        assert_eq!(r.len(), qre.dim());
    }

    #[test]
    fn uniform_is_near_fixed_at_low_beta() {
        let kuhn = KuhnPoker::new();
        let qre = QreResidual::new(&kuhn, 0.001);
        let r = qre.eval(&DVector::zeros(qre.dim())).unwrap();
        assert!(r.norm() < 0.1, "residual norm {} at beta 0.001", r.norm());
    }

    #[test]
    fn higher_beta_sharpens_the_response() {
        let kuhn = KuhnPoker::new();
        let low = QreResidual::new(&kuhn, 0.1);
        let high = QreResidual::new(&kuhn, 10.0);

        let sigma = Strategy::uniform(low.index());
        let br_low = low.logit_best_response(&sigma).unwrap();
        let br_high = high.logit_best_response(&sigma).unwrap();

        let entropy = |p: &[f64]| -> f64 {
            p.iter()
                .filter(|&&x| x > 1e-10)
                .map(|&x| -x * x.ln())
                .sum()
        };

        // Per info set, the sharper response never has higher entropy.
        for i in 0..low.index().num_info_sets() {
            let start = low.index().start(i);
            let k = low.index().info_set(i).actions.len();
            let e_low = entropy(&br_low.as_slice()[start..start + k]);
            let e_high = entropy(&br_high.as_slice()[start..start + k]);
            assert!(
                e_high <= e_low + 1e-12,
                "info set {} entropy {} > {}",
                low.index().info_set(i).id,
                e_high,
                e_low
            );
        }
    }

    #[test]
    fn beta_is_mutable_between_solves() {
        let kuhn = KuhnPoker::new();
        let mut qre = QreResidual::new(&kuhn, 0.01);
        assert_eq!(qre.beta(), 0.01);
        qre.set_beta(5.0);
        assert_eq!(qre.beta(), 5.0);
    }

    #[test]
    fn residual_entries_cancel_per_info_set() {
        // Both sigma and the logit response are distributions per info set,
        // so each block of the residual sums to zero.
        let kuhn = KuhnPoker::new();
        let qre = QreResidual::new(&kuhn, 2.0);
        let w = DVector::from_fn(qre.dim(), |i, _| (i as f64 * 0.37).sin());
        let r = qre.eval(&w).unwrap();

        for i in 0..qre.index().num_info_sets() {
            let start = qre.index().start(i);
            let k = qre.index().info_set(i).actions.len();
            let block_sum: f64 = r.as_slice()[start..start + k].iter().sum();
            assert!(block_sum.abs() < 1e-9);
        }
    }
}
