//! Kuhn poker game tree.
//!
//! Three-card deck (J < Q < K), both players ante 1, one betting round with
//! a fixed bet of 1. The action sequences reaching a terminal are exactly
//! cc, cbk, cbf, bk and bf. Twelve information sets in total.

use crate::game::{
    opponent, Action, ActionEdge, Card, ChanceEdge, GameNode, InfoSetId, NodeKind, PlayerId,
    PokerGame, PLAYER_0, PLAYER_1,
};

pub const KUHN_DECK: usize = 3;

pub struct KuhnPoker {
    root: GameNode,
}

impl KuhnPoker {
    pub fn new() -> Self {
        KuhnPoker {
            root: build_root(),
        }
    }

    /// Higher card wins: K > Q > J.
    pub fn compare_cards(c1: Card, c2: Card) -> i32 {
        match c1.cmp(&c2) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
        }
    }

    pub fn card_name(card: Card) -> &'static str {
        match card {
            0 => "J",
            1 => "Q",
            2 => "K",
            _ => "?",
        }
    }

    /// Wire format "P{player}:{card}:{history}", e.g. "P1:K:b".
    pub fn make_info_set_id(player: PlayerId, card: Card, history: &str) -> InfoSetId {
        format!("P{}:{}:{}", player, Self::card_name(card), history)
    }
}

impl Default for KuhnPoker {
    fn default() -> Self {
        Self::new()
    }
}

impl PokerGame for KuhnPoker {
    fn root(&self) -> &GameNode {
        &self.root
    }

    fn name(&self) -> &'static str {
        "kuhn"
    }

    fn deck_size(&self) -> usize {
        KUHN_DECK
    }
}

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

fn build_root() -> GameNode {
    // All 6 ordered deals of two distinct cards, 1/6 each.
    let mut edges = Vec::new();
    for p0_card in 0..3 {
        for p1_card in 0..3 {
            if p0_card == p1_card {
                continue;
            }
            edges.push(ChanceEdge {
                card: p0_card * 10 + p1_card,
                probability: 1.0 / 6.0,
                child: player_node(
                    p0_card,
                    p1_card,
                    String::new(),
                    2,
                    PLAYER_0,
                    vec![Action::Check, Action::Bet],
                ),
            });
        }
    }

    GameNode {
        pot: 2,
        history: String::new(),
        p0_card: -1,
        p1_card: -1,
        public_card: -1,
        kind: NodeKind::Chance { edges },
    }
}

fn player_node(
    p0_card: Card,
    p1_card: Card,
    history: String,
    pot: i32,
    player: PlayerId,
    actions: Vec<Action>,
) -> GameNode {
    let card = if player == PLAYER_0 { p0_card } else { p1_card };
    let edges = actions
        .iter()
        .map(|&action| ActionEdge {
            action,
            child: apply_action(p0_card, p1_card, &history, pot, player, action),
        })
        .collect();

    GameNode {
        pot,
        history: history.clone(),
        p0_card,
        p1_card,
        public_card: -1,
        kind: NodeKind::Player {
            player,
            info_set_id: KuhnPoker::make_info_set_id(player, card, &history),
            actions,
            edges,
        },
    }
}

fn apply_action(
    p0_card: Card,
    p1_card: Card,
    history: &str,
    pot: i32,
    player: PlayerId,
    action: Action,
) -> GameNode {
    let new_history = format!("{}{}", history, action.as_char());

    match action {
        Action::Check => {
            if player == PLAYER_0 {
                // P0 checks, P1 may check behind or bet.
                player_node(
                    p0_card,
                    p1_card,
                    new_history,
                    pot,
                    PLAYER_1,
                    vec![Action::Check, Action::Bet],
                )
            } else {
                // Check behind closes the round: showdown.
                showdown(p0_card, p1_card, new_history, pot)
            }
        }
        Action::Bet => player_node(
            p0_card,
            p1_card,
            new_history,
            pot + 1,
            opponent(player),
            vec![Action::Call, Action::Fold],
        ),
        Action::Call => showdown(p0_card, p1_card, new_history, pot + 1),
        Action::Fold => fold_terminal(p0_card, p1_card, new_history, pot, player),
        Action::Raise => unreachable!("kuhn has no raise action"),
    }
}

fn showdown(p0_card: Card, p1_card: Card, history: String, pot: i32) -> GameNode {
    let payoff = match KuhnPoker::compare_cards(p0_card, p1_card) {
        cmp if cmp > 0 => f64::from(pot) / 2.0,
        cmp if cmp < 0 => -f64::from(pot) / 2.0,
        _ => 0.0,
    };

    GameNode {
        pot,
        history,
        p0_card,
        p1_card,
        public_card: -1,
        kind: NodeKind::Terminal { payoff },
    }
}

fn fold_terminal(
    p0_card: Card,
    p1_card: Card,
    history: String,
    pot: i32,
    folder: PlayerId,
) -> GameNode {
    // The folder always loses exactly their ante: in both fold lines (bf and
    // cbf) the folding player faces a bet without having bet themselves.
    let payoff = if folder == PLAYER_0 { -1.0 } else { 1.0 };

    GameNode {
        pot,
        history,
        p0_card,
        p1_card,
        public_card: -1,
        kind: NodeKind::Terminal { payoff },
    }
}
