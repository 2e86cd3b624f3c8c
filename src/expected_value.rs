//! Expected-value, best-response and exploitability traversals.
//!
//! One recursive pass computes player 0's expected payoff under a strategy
//! profile by accumulating three reach factors (player 0, player 1, chance)
//! down to the terminals. The same pass with an override pins one
//! information set to a single action, which is how per-action expected
//! utilities are produced for the logit best response.

use std::collections::HashMap;

use crate::error::SolverResult;
use crate::game::{
    Action, GameNode, InfoSetId, InfoSetIndex, NodeKind, PlayerId, PLAYER_0, PLAYER_1,
};
use crate::strategy::Strategy;

// ---------------------------------------------------------------------------
// Expected value under a profile
// ---------------------------------------------------------------------------

fn ev_recursive(
    node: &GameNode,
    sigma: &Strategy,
    reach_p0: f64,
    reach_p1: f64,
    reach_chance: f64,
    override_play: Option<(&str, Action)>,
) -> SolverResult<f64> {
    match &node.kind {
        NodeKind::Terminal { payoff } => Ok(reach_p0 * reach_p1 * reach_chance * payoff),

        NodeKind::Chance { edges } => {
            let mut ev = 0.0;
            for edge in edges {
                ev += ev_recursive(
                    &edge.child,
                    sigma,
                    reach_p0,
                    reach_p1,
                    reach_chance * edge.probability,
                    override_play,
                )?;
            }
            Ok(ev)
        }

        NodeKind::Player {
            player,
            info_set_id,
            actions,
            edges,
        } => {
            // At the overridden info set the strategy collapses to a
            // degenerate distribution on the override action.
            let action_probs = match override_play {
                Some((id, forced)) if id == info_set_id.as_str() => actions
                    .iter()
                    .map(|&a| if a == forced { 1.0 } else { 0.0 })
                    .collect(),
                _ => sigma.probs(info_set_id)?,
            };

            let mut ev = 0.0;
            for (edge, &p) in edges.iter().zip(action_probs.iter()) {
                let (new_reach_p0, new_reach_p1) = if *player == PLAYER_0 {
                    (reach_p0 * p, reach_p1)
                } else {
                    (reach_p0, reach_p1 * p)
                };
                ev += ev_recursive(
                    &edge.child,
                    sigma,
                    new_reach_p0,
                    new_reach_p1,
                    reach_chance,
                    override_play,
                )?;
            }
            Ok(ev)
        }
    }
}

/// Expected payoff to player 0 when both players follow `sigma`.
pub fn compute_ev(root: &GameNode, sigma: &Strategy) -> SolverResult<f64> {
    ev_recursive(root, sigma, 1.0, 1.0, 1.0, None)
}

/// Expected payoff to player 0 when the acting player at `info_set` is
/// forced to play `action` and everything else follows `sigma`.
pub fn compute_ev_with_override(
    root: &GameNode,
    sigma: &Strategy,
    info_set: &str,
    action: Action,
) -> SolverResult<f64> {
    ev_recursive(root, sigma, 1.0, 1.0, 1.0, Some((info_set, action)))
}

/// EU(I, a): signed expected payoff for the acting player of the forced
/// deviation, negated for player 1 by the zero-sum convention.
pub fn expected_utility(
    root: &GameNode,
    sigma: &Strategy,
    info_set: &str,
    action: Action,
    acting_player: PlayerId,
) -> SolverResult<f64> {
    let ev = compute_ev_with_override(root, sigma, info_set, action)?;
    Ok(if acting_player == PLAYER_1 { -ev } else { ev })
}

/// EU for every legal action at every information set, keyed by id and
/// aligned with each info set's legal-action order.
pub fn compute_all_expected_utilities(
    root: &GameNode,
    sigma: &Strategy,
    index: &InfoSetIndex,
) -> SolverResult<HashMap<InfoSetId, Vec<f64>>> {
    let mut result = HashMap::with_capacity(index.num_info_sets());
    for i in 0..index.num_info_sets() {
        let is = index.info_set(i);
        let mut eus = Vec::with_capacity(is.actions.len());
        for &action in &is.actions {
            eus.push(expected_utility(root, sigma, &is.id, action, is.player)?);
        }
        result.insert(is.id.clone(), eus);
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Best response and exploitability
// ---------------------------------------------------------------------------

fn br_recursive(
    node: &GameNode,
    sigma: &Strategy,
    br_player: PlayerId,
    reach_opponent: f64,
    reach_chance: f64,
) -> SolverResult<f64> {
    match &node.kind {
        NodeKind::Terminal { payoff } => {
            let payoff = if br_player == PLAYER_1 { -payoff } else { *payoff };
            Ok(reach_opponent * reach_chance * payoff)
        }

        NodeKind::Chance { edges } => {
            let mut ev = 0.0;
            for edge in edges {
                ev += br_recursive(
                    &edge.child,
                    sigma,
                    br_player,
                    reach_opponent,
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
            if *player == br_player {
                // The responder maximizes; opponent reach carries the
                // counterfactual weight unchanged.
                let mut best = f64::NEG_INFINITY;
                for edge in edges {
                    let ev = br_recursive(
                        &edge.child,
                        sigma,
                        br_player,
                        reach_opponent,
                        reach_chance,
                    )?;
                    best = best.max(ev);
                }
                Ok(best)
            } else {
                let probs = sigma.probs(info_set_id)?;
                let mut ev = 0.0;
                for (edge, &p) in edges.iter().zip(probs.iter()) {
                    ev += br_recursive(
                        &edge.child,
                        sigma,
                        br_player,
                        reach_opponent * p,
                        reach_chance,
                    )?;
                }
                Ok(ev)
            }
        }
    }
}

/// Value `br_player` can secure against the fixed profile `sigma`.
pub fn best_response_value(
    root: &GameNode,
    sigma: &Strategy,
    br_player: PlayerId,
) -> SolverResult<f64> {
    br_recursive(root, sigma, br_player, 1.0, 1.0)
}

/// (BR_0 + BR_1) / 2: zero exactly at Nash, positive otherwise.
pub fn compute_exploitability(root: &GameNode, sigma: &Strategy) -> SolverResult<f64> {
    let br0 = best_response_value(root, sigma, PLAYER_0)?;
    let br1 = best_response_value(root, sigma, PLAYER_1)?;
    Ok((br0 + br1) / 2.0)
}
