//! Counterfactual regret minimization, kept as a cross-validation oracle
//! for the Newton/QRE solver.
//!
//! CFR walks the tree accumulating, per information set, the regret for not
//! having played each action; regret matching turns positive regrets into
//! the next strategy, and the reach-weighted average strategy converges to
//! Nash at O(1/sqrt(T)). The CFR+ variant floors cumulative regrets at zero
//! after every sweep.

use std::collections::HashMap;
use std::time::Instant;

use crate::error::{SolverError, SolverResult};
use crate::game::{
    GameNode, InfoSetId, InfoSetIndex, NodeKind, PlayerId, PokerGame, PLAYER_0, PLAYER_1,
};
use crate::expected_value::compute_exploitability;
use crate::strategy::{probs_to_logits, Strategy};

/// Regret and strategy accumulator for one information set.
#[derive(Debug, Clone, Default)]
pub struct InfoSetData {
    pub cumulative_regret: Vec<f64>,
    pub cumulative_strategy: Vec<f64>,
}

impl InfoSetData {
    pub fn new(num_actions: usize) -> Self {
        InfoSetData {
            cumulative_regret: vec![0.0; num_actions],
            cumulative_strategy: vec![0.0; num_actions],
        }
    }

    /// Regret matching: proportional to positive regrets, uniform when none
    /// are positive.
    pub fn regret_matching_strategy(&self) -> Vec<f64> {
        let positive: Vec<f64> = self
            .cumulative_regret
            .iter()
            .map(|&r| r.max(0.0))
            .collect();
        let total: f64 = positive.iter().sum();

        if total > 0.0 {
            positive.into_iter().map(|r| r / total).collect()
        } else {
            let n = self.cumulative_regret.len();
            vec![1.0 / n as f64; n]
        }
    }

    /// Average strategy, the Nash approximation.
    pub fn average_strategy(&self) -> Vec<f64> {
        let total: f64 = self.cumulative_strategy.iter().sum();
        if total > 0.0 {
            self.cumulative_strategy.iter().map(|&s| s / total).collect()
        } else {
            let n = self.cumulative_strategy.len();
            vec![1.0 / n as f64; n]
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CfrStats {
    pub iteration: usize,
    pub exploitability: f64,
    pub avg_regret: f64,
    pub wall_time_ms: f64,
}

pub type CfrCallback<'a> = Box<dyn FnMut(&CfrStats) -> SolverResult<()> + 'a>;

pub struct CfrTrainer<'a> {
    game: &'a dyn PokerGame,
    index: InfoSetIndex,
    data: HashMap<InfoSetId, InfoSetData>,
    iterations: usize,
    /// CFR+ floors cumulative regrets at zero after each sweep.
    plus: bool,
    callback: Option<CfrCallback<'a>>,
}

impl<'a> CfrTrainer<'a> {
    pub fn new(game: &'a dyn PokerGame) -> Self {
        Self::with_variant(game, false)
    }

    pub fn new_plus(game: &'a dyn PokerGame) -> Self {
        Self::with_variant(game, true)
    }

    fn with_variant(game: &'a dyn PokerGame, plus: bool) -> Self {
        let info_sets = game.info_sets();
        let index = InfoSetIndex::build(&info_sets);

        let mut data = HashMap::with_capacity(info_sets.len());
        for is in &info_sets {
            data.insert(is.id.clone(), InfoSetData::new(is.actions.len()));
        }

        CfrTrainer {
            game,
            index,
            data,
            iterations: 0,
            plus,
            callback: None,
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn regret_data(&self) -> &HashMap<InfoSetId, InfoSetData> {
        &self.data
    }

    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&CfrStats) -> SolverResult<()> + 'a,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Run `iterations` sweeps, traversing for both players each sweep.
    pub fn solve(&mut self, iterations: usize) -> SolverResult<()> {
        let start = Instant::now();

        let game = self.game;
        for iter in 0..iterations {
            self.iterations += 1;

            for player in [PLAYER_0, PLAYER_1] {
                self.cfr_recursive(game.root(), player, 1.0, 1.0, 1.0)?;
            }

            if self.plus {
                for data in self.data.values_mut() {
                    for regret in &mut data.cumulative_regret {
                        *regret = regret.max(0.0);
                    }
                }
            }

            if self.callback.is_some() && (iter % 10 == 0 || iter == iterations - 1) {
                let stats = CfrStats {
                    iteration: self.iterations,
                    exploitability: self.exploitability()?,
                    avg_regret: self.average_absolute_regret(),
                    wall_time_ms: start.elapsed().as_secs_f64() * 1000.0,
                };
                if let Some(callback) = &mut self.callback {
                    callback(&stats)?;
                }
            }
        }

        Ok(())
    }

    /// Current strategy from regret matching, exported through the canonical
    /// log inverse so it can seed a Newton solve.
    pub fn current_strategy(&self) -> SolverResult<Strategy> {
        self.export_strategy(InfoSetData::regret_matching_strategy)
    }

    /// Average strategy, the Nash equilibrium approximation.
    pub fn average_strategy(&self) -> SolverResult<Strategy> {
        self.export_strategy(InfoSetData::average_strategy)
    }

    pub fn exploitability(&self) -> SolverResult<f64> {
        let avg = self.average_strategy()?;
        compute_exploitability(self.game.root(), &avg)
    }

    fn export_strategy(&self, probs_of: fn(&InfoSetData) -> Vec<f64>) -> SolverResult<Strategy> {
        let mut sigma = Strategy::default();
        for i in 0..self.index.num_info_sets() {
            let is = self.index.info_set(i);
            let data = self
                .data
                .get(&is.id)
                .ok_or_else(|| SolverError::UnknownInfoSet(is.id.clone()))?;
            sigma.set_logits(&is.id, probs_to_logits(&probs_of(data)), is.actions.clone());
        }
        Ok(sigma)
    }

    fn average_absolute_regret(&self) -> f64 {
        let mut total = 0.0;
        let mut count = 0;
        for data in self.data.values() {
            total += data.cumulative_regret.iter().map(|r| r.abs()).sum::<f64>();
            count += data.cumulative_regret.len();
        }
        total / count.max(1) as f64
    }

    /// One traversal for `traverser`. Returns the traverser's expected value
    /// at `node`; regrets update only at the traverser's own info sets,
    /// weighted by the counterfactual (opponent and chance) reach.
    fn cfr_recursive(
        &mut self,
        node: &GameNode,
        traverser: PlayerId,
        reach_p0: f64,
        reach_p1: f64,
        reach_chance: f64,
    ) -> SolverResult<f64> {
        match &node.kind {
            NodeKind::Terminal { payoff } => Ok(if traverser == PLAYER_1 {
                -payoff
            } else {
                *payoff
            }),

            NodeKind::Chance { edges } => {
                let mut ev = 0.0;
                for edge in edges {
                    ev += edge.probability
                        * self.cfr_recursive(
                            &edge.child,
                            traverser,
                            reach_p0,
                            reach_p1,
                            reach_chance * edge.probability,
                        )?;
                }
                Ok(ev)
            }

            NodeKind::Player {
                player,
                info_set_id,
                edges,
                ..
            } => {
                let strategy = self
                    .data
                    .get(info_set_id)
                    .ok_or_else(|| SolverError::UnknownInfoSet(info_set_id.clone()))?
                    .regret_matching_strategy();

                let mut action_values = Vec::with_capacity(edges.len());
                for (edge, &p) in edges.iter().zip(strategy.iter()) {
                    let (new_reach_p0, new_reach_p1) = if *player == PLAYER_0 {
                        (reach_p0 * p, reach_p1)
                    } else {
                        (reach_p0, reach_p1 * p)
                    };
                    action_values.push(self.cfr_recursive(
                        &edge.child,
                        traverser,
                        new_reach_p0,
                        new_reach_p1,
                        reach_chance,
                    )?);
                }

                let node_value: f64 = strategy
                    .iter()
                    .zip(action_values.iter())
                    .map(|(p, v)| p * v)
                    .sum();

                let player_reach = if *player == PLAYER_0 { reach_p0 } else { reach_p1 };
                let cf_reach = if *player == PLAYER_0 { reach_p1 } else { reach_p0 }
                    * reach_chance;

                let update_regrets = *player == traverser;
                let data = self
                    .data
                    .get_mut(info_set_id)
                    .ok_or_else(|| SolverError::UnknownInfoSet(info_set_id.clone()))?;

                if update_regrets {
                    for (regret, &value) in
                        data.cumulative_regret.iter_mut().zip(action_values.iter())
                    {
                        *regret += cf_reach * (value - node_value);
                    }
                }

                for (cum, &p) in data.cumulative_strategy.iter_mut().zip(strategy.iter()) {
                    *cum += player_reach * p;
                }

                Ok(node_value)
            }
        }
    }
}
