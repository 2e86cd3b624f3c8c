//! Logit-parameterized strategy profiles.
//!
//! A strategy maps each information set to a logit vector; probabilities are
//! derived on demand by stable softmax, so they are strictly positive and
//! sum to 1 regardless of the logits. The flat layout of the logits follows
//! the `InfoSetIndex`, which lets the Newton solver treat a whole profile as
//! one unconstrained vector in R^D.

use std::collections::HashMap;

use nalgebra::DVector;
use serde_json::{json, Value};

use crate::error::{SolverError, SolverResult};
use crate::game::{Action, InfoSetId, InfoSetIndex};

/// Probability floor used when inverting probabilities back to logits.
pub const LOGIT_FLOOR: f64 = 1e-10;

/// Softmax with the per-row maximum subtracted before exponentiating.
pub fn stable_softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[derive(Debug, Clone, Default)]
pub struct Strategy {
    logits: HashMap<InfoSetId, Vec<f64>>,
    actions: HashMap<InfoSetId, Vec<Action>>,
}

impl Strategy {
    /// Decode a flat logit vector into a per-info-set strategy.
    pub fn from_logits(w: &DVector<f64>, index: &InfoSetIndex) -> SolverResult<Self> {
        if w.len() != index.total_dim() {
            return Err(SolverError::DimensionMismatch {
                expected: index.total_dim(),
                got: w.len(),
            });
        }

        let mut strategy = Strategy::default();
        for i in 0..index.num_info_sets() {
            let is = index.info_set(i);
            let start = index.start(i);
            let logits = w.as_slice()[start..start + is.actions.len()].to_vec();
            strategy.logits.insert(is.id.clone(), logits);
            strategy.actions.insert(is.id.clone(), is.actions.clone());
        }
        Ok(strategy)
    }

    /// Uniform strategy: all logits zero.
    pub fn uniform(index: &InfoSetIndex) -> Self {
        let mut strategy = Strategy::default();
        for i in 0..index.num_info_sets() {
            let is = index.info_set(i);
            strategy.logits.insert(is.id.clone(), vec![0.0; is.actions.len()]);
            strategy.actions.insert(is.id.clone(), is.actions.clone());
        }
        strategy
    }

    /// Action probabilities at an information set, in legal-action order.
    pub fn probs(&self, info_set_id: &str) -> SolverResult<Vec<f64>> {
        let logits = self
            .logits
            .get(info_set_id)
            .ok_or_else(|| SolverError::UnknownInfoSet(info_set_id.to_string()))?;
        Ok(stable_softmax(logits))
    }

    /// Probability of a single action at an information set.
    pub fn prob(&self, info_set_id: &str, action: Action) -> SolverResult<f64> {
        let actions = self
            .actions
            .get(info_set_id)
            .ok_or_else(|| SolverError::UnknownInfoSet(info_set_id.to_string()))?;
        let pos = actions.iter().position(|&a| a == action).ok_or_else(|| {
            SolverError::IllegalAction {
                info_set: info_set_id.to_string(),
                action: action.as_str().to_string(),
            }
        })?;
        Ok(self.probs(info_set_id)?[pos])
    }

    pub fn logits(&self, info_set_id: &str) -> SolverResult<&[f64]> {
        self.logits
            .get(info_set_id)
            .map(Vec::as_slice)
            .ok_or_else(|| SolverError::UnknownInfoSet(info_set_id.to_string()))
    }

    pub fn actions(&self, info_set_id: &str) -> SolverResult<&[Action]> {
        self.actions
            .get(info_set_id)
            .map(Vec::as_slice)
            .ok_or_else(|| SolverError::UnknownInfoSet(info_set_id.to_string()))
    }

    pub fn set_logits(&mut self, info_set_id: &str, logits: Vec<f64>, actions: Vec<Action>) {
        self.logits.insert(info_set_id.to_string(), logits);
        self.actions.insert(info_set_id.to_string(), actions);
    }

    /// Flatten back to the index layout. Info sets absent from this strategy
    /// contribute zero logits (uniform).
    pub fn to_flat_logits(&self, index: &InfoSetIndex) -> DVector<f64> {
        let mut w = DVector::zeros(index.total_dim());
        for i in 0..index.num_info_sets() {
            let is = index.info_set(i);
            let start = index.start(i);
            if let Some(logits) = self.logits.get(&is.id) {
                for (a, &l) in logits.iter().enumerate() {
                    w[start + a] = l;
                }
            }
        }
        w
    }

    /// Probabilities as JSON: info-set id -> { action name -> probability }.
    pub fn to_json(&self) -> Value {
        let mut out = serde_json::Map::new();
        for (id, logits) in &self.logits {
            let Some(actions) = self.actions.get(id) else {
                continue;
            };
            let probs = stable_softmax(logits);
            let mut is_json = serde_json::Map::new();
            for (action, p) in actions.iter().zip(probs.iter()) {
                is_json.insert(action.as_str().to_string(), json!(p));
            }
            out.insert(id.clone(), Value::Object(is_json));
        }
        Value::Object(out)
    }
}

/// Canonical (non-unique) inverse of softmax used to seed a Newton solve
/// from a probability vector: log of the floored probabilities.
pub fn probs_to_logits(probs: &[f64]) -> Vec<f64> {
    probs.iter().map(|&p| p.max(LOGIT_FLOOR).ln()).collect()
}
