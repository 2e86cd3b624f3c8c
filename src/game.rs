//! Extensive-form game tree and information-set index.
//!
//! The tree is a strict owner: each edge owns its child node, there are no
//! parent pointers and no cycles. Strategy is defined per information set,
//! and the `InfoSetIndex` lays all (info set, action) pairs out in one flat
//! coordinate vector so solvers can work on a plain `R^D` parameterization.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Card identifier. Kuhn: 0=J, 1=Q, 2=K. Leduc: rank * 2 + suit over
/// 3 ranks x 2 suits. -1 means no card (not yet dealt).
pub type Card = i32;

pub type PlayerId = usize;
pub const PLAYER_0: PlayerId = 0;
pub const PLAYER_1: PlayerId = 1;

pub fn opponent(player: PlayerId) -> PlayerId {
    1 - player
}

/// Information set identifier in the stable wire grammar:
/// Kuhn `P{p}:{card}:{history}`, Leduc `P{p}:{priv}:{pub|-}:R{1|2}:{history}`.
pub type InfoSetId = String;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Check,
    Bet,
    Call,
    Fold,
    Raise,
}

impl Action {
    /// Single-character history encoding. Call is 'k' so it cannot be
    /// confused with 'c'heck.
    pub fn as_char(self) -> char {
        match self {
            Action::Check => 'c',
            Action::Bet => 'b',
            Action::Call => 'k',
            Action::Fold => 'f',
            Action::Raise => 'r',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Check => "check",
            Action::Bet => "bet",
            Action::Call => "call",
            Action::Fold => "fold",
            Action::Raise => "raise",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Game tree nodes
// ---------------------------------------------------------------------------

/// Outgoing edge of a chance node: a dealt card with its probability.
#[derive(Debug)]
pub struct ChanceEdge {
    pub card: Card,
    pub probability: f64,
    pub child: GameNode,
}

/// Outgoing edge of a player node, one per legal action (same order as the
/// node's legal-action list).
#[derive(Debug)]
pub struct ActionEdge {
    pub action: Action,
    pub child: GameNode,
}

/// The closed set of node kinds with their per-case payloads.
#[derive(Debug)]
pub enum NodeKind {
    Chance {
        edges: Vec<ChanceEdge>,
    },
    Player {
        player: PlayerId,
        info_set_id: InfoSetId,
        actions: Vec<Action>,
        edges: Vec<ActionEdge>,
    },
    Terminal {
        /// Payoff to player 0. Zero-sum: player 1 receives the negation.
        payoff: f64,
    },
}

#[derive(Debug)]
pub struct GameNode {
    pub pot: i32,
    pub history: String,
    pub p0_card: Card,
    pub p1_card: Card,
    pub public_card: Card,
    pub kind: NodeKind,
}

impl GameNode {
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal { .. })
    }

    /// Navigate to the child reached by an action, if this is a player node
    /// and the action is legal.
    pub fn child(&self, action: Action) -> Option<&GameNode> {
        match &self.kind {
            NodeKind::Player { edges, .. } => edges
                .iter()
                .find(|e| e.action == action)
                .map(|e| &e.child),
            _ => None,
        }
    }

    /// Navigate to the child reached by a dealt card, if this is a chance node.
    pub fn chance_child(&self, card: Card) -> Option<&GameNode> {
        match &self.kind {
            NodeKind::Chance { edges } => {
                edges.iter().find(|e| e.card == card).map(|e| &e.child)
            }
            _ => None,
        }
    }
}

/// Pre-order traversal over the owned tree.
pub fn traverse_tree<F: FnMut(&GameNode, usize)>(node: &GameNode, visitor: &mut F) {
    fn walk<F: FnMut(&GameNode, usize)>(node: &GameNode, depth: usize, visitor: &mut F) {
        visitor(node, depth);
        match &node.kind {
            NodeKind::Chance { edges } => {
                for edge in edges {
                    walk(&edge.child, depth + 1, visitor);
                }
            }
            NodeKind::Player { edges, .. } => {
                for edge in edges {
                    walk(&edge.child, depth + 1, visitor);
                }
            }
            NodeKind::Terminal { .. } => {}
        }
    }
    walk(node, 0, visitor);
}

// ---------------------------------------------------------------------------
// Tree statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub chance_nodes: usize,
    pub player_nodes: usize,
    pub terminal_nodes: usize,
    pub max_depth: usize,
}

pub fn tree_stats(root: &GameNode) -> TreeStats {
    let mut stats = TreeStats::default();
    traverse_tree(root, &mut |node, depth| {
        stats.total_nodes += 1;
        stats.max_depth = stats.max_depth.max(depth);
        match node.kind {
            NodeKind::Chance { .. } => stats.chance_nodes += 1,
            NodeKind::Player { .. } => stats.player_nodes += 1,
            NodeKind::Terminal { .. } => stats.terminal_nodes += 1,
        }
    });
    stats
}

// ---------------------------------------------------------------------------
// Poker game abstraction
// ---------------------------------------------------------------------------

/// A two-player zero-sum poker variant with a fully built game tree.
pub trait PokerGame {
    fn root(&self) -> &GameNode;

    fn name(&self) -> &'static str;

    fn deck_size(&self) -> usize;

    /// All unique information sets, sorted by id for deterministic ordering.
    fn info_sets(&self) -> Vec<InfoSet> {
        collect_info_sets(self.root())
    }
}

/// One information set: every player node sharing this id has the same
/// acting player and the same legal-action list.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoSet {
    pub id: InfoSetId,
    pub player: PlayerId,
    pub actions: Vec<Action>,
}

/// Enumerate unique player-node situations from a tree, sorted by id.
pub fn collect_info_sets(root: &GameNode) -> Vec<InfoSet> {
    let mut map: BTreeMap<InfoSetId, InfoSet> = BTreeMap::new();
    traverse_tree(root, &mut |node, _| {
        if let NodeKind::Player {
            player,
            info_set_id,
            actions,
            ..
        } = &node.kind
        {
            map.entry(info_set_id.clone()).or_insert_with(|| InfoSet {
                id: info_set_id.clone(),
                player: *player,
                actions: actions.clone(),
            });
        }
    });
    map.into_values().collect()
}

// ---------------------------------------------------------------------------
// Flat coordinate layout
// ---------------------------------------------------------------------------

/// Mapping between flat vector coordinates and (info set, action) pairs.
///
/// Info set `i` with `k_i` actions occupies the contiguous block
/// `[start(i), start(i) + k_i)`. Built once per game, immutable after.
#[derive(Debug, Clone)]
pub struct InfoSetIndex {
    info_sets: Vec<InfoSet>,
    id_to_idx: HashMap<InfoSetId, usize>,
    starts: Vec<usize>,
    flat_to_pair: Vec<(usize, usize)>,
    total_dim: usize,
}

impl InfoSetIndex {
    pub fn build(info_sets: &[InfoSet]) -> Self {
        let mut id_to_idx = HashMap::new();
        let mut starts = Vec::with_capacity(info_sets.len());
        let mut flat_to_pair = Vec::new();

        let mut flat = 0;
        for (i, is) in info_sets.iter().enumerate() {
            id_to_idx.insert(is.id.clone(), i);
            starts.push(flat);
            for a in 0..is.actions.len() {
                flat_to_pair.push((i, a));
            }
            flat += is.actions.len();
        }

        InfoSetIndex {
            info_sets: info_sets.to_vec(),
            id_to_idx,
            starts,
            flat_to_pair,
            total_dim: flat,
        }
    }

    /// Total dimension of the flat strategy vector (sum of action counts).
    pub fn total_dim(&self) -> usize {
        self.total_dim
    }

    pub fn num_info_sets(&self) -> usize {
        self.info_sets.len()
    }

    pub fn info_set(&self, idx: usize) -> &InfoSet {
        &self.info_sets[idx]
    }

    pub fn info_sets(&self) -> &[InfoSet] {
        &self.info_sets
    }

    pub fn info_set_idx(&self, id: &str) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    /// Start coordinate of info set `idx` in the flat vector.
    pub fn start(&self, idx: usize) -> usize {
        self.starts[idx]
    }

    /// (info set index, action index) for a flat coordinate.
    pub fn flat_to_pair(&self, flat: usize) -> (usize, usize) {
        self.flat_to_pair[flat]
    }

    /// Flat coordinate for (info set id, action), if both exist.
    pub fn flat_index(&self, id: &str, action: Action) -> Option<usize> {
        let idx = self.info_set_idx(id)?;
        let a = self.info_sets[idx].actions.iter().position(|&x| x == action)?;
        Some(self.starts[idx] + a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info_sets() -> Vec<InfoSet> {
        vec![
            InfoSet {
                id: "P0:J:".to_string(),
                player: PLAYER_0,
                actions: vec![Action::Check, Action::Bet],
            },
            InfoSet {
                id: "P1:Q:b".to_string(),
                player: PLAYER_1,
                actions: vec![Action::Call, Action::Fold, Action::Raise],
            },
        ]
    }

    #[test]
    fn index_layout_is_contiguous() {
        let index = InfoSetIndex::build(&sample_info_sets());
        assert_eq!(index.total_dim(), 5);
        assert_eq!(index.num_info_sets(), 2);
        assert_eq!(index.start(0), 0);
        assert_eq!(index.start(1), 2);
    }

    #[test]
    fn flat_and_pair_mappings_agree() {
        let index = InfoSetIndex::build(&sample_info_sets());
        for flat in 0..index.total_dim() {
            let (i, a) = index.flat_to_pair(flat);
            let is = index.info_set(i);
            assert_eq!(index.flat_index(&is.id, is.actions[a]), Some(flat));
        }
    }

    #[test]
    fn unknown_lookups_return_none() {
        let index = InfoSetIndex::build(&sample_info_sets());
        assert_eq!(index.info_set_idx("P0:K:cb"), None);
        assert_eq!(index.flat_index("P0:J:", Action::Raise), None);
    }

    #[test]
    fn action_chars_are_distinct() {
        let actions = [
            Action::Check,
            Action::Bet,
            Action::Call,
            Action::Fold,
            Action::Raise,
        ];
        let mut chars: Vec<char> = actions.iter().map(|a| a.as_char()).collect();
        chars.sort_unstable();
        chars.dedup();
        assert_eq!(chars.len(), actions.len());
    }

    #[test]
    fn opponent_flips() {
        assert_eq!(opponent(PLAYER_0), PLAYER_1);
        assert_eq!(opponent(PLAYER_1), PLAYER_0);
    }
}
