//! Leduc poker game tree.
//!
//! Six-card deck (3 ranks x 2 suits), ante 1, two betting rounds with a
//! fixed bet of 2 in round 1 and 4 in round 2, at most two raises per round.
//! When round 1 completes by a closing call or a mutual check, a chance node
//! deals one of the 4 unseen cards face up and round 2 begins. At showdown a
//! pair with the public card beats everything else, then higher rank wins.
//!
//! Suits never affect strategy, so information-set ids carry ranks only.

use crate::game::{
    opponent, Action, ActionEdge, Card, ChanceEdge, GameNode, InfoSetId, NodeKind, PlayerId,
    PokerGame, PLAYER_0,
};

pub const LEDUC_DECK: usize = 6;
const ANTE: i32 = 1;
const SMALL_BET: i32 = 2;
const BIG_BET: i32 = 4;
const MAX_RAISES: i32 = 2;

pub struct LeducPoker {
    root: GameNode,
}

impl LeducPoker {
    pub fn new() -> Self {
        LeducPoker {
            root: build_root(),
        }
    }

    pub fn card_rank(card: Card) -> i32 {
        card / 2
    }

    pub fn rank_name(card: Card) -> &'static str {
        match Self::card_rank(card) {
            0 => "J",
            1 => "Q",
            2 => "K",
            _ => "?",
        }
    }

    /// Showdown order: exactly one player pairing the public card wins,
    /// otherwise the higher private rank; equal ranks split.
    pub fn compare_hands(p0_card: Card, p1_card: Card, public_card: Card) -> i32 {
        let p0_rank = Self::card_rank(p0_card);
        let p1_rank = Self::card_rank(p1_card);
        let pub_rank = Self::card_rank(public_card);

        let p0_pair = p0_rank == pub_rank;
        let p1_pair = p1_rank == pub_rank;

        if p0_pair && !p1_pair {
            return 1;
        }
        if !p0_pair && p1_pair {
            return -1;
        }

        match p0_rank.cmp(&p1_rank) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
        }
    }

    /// Wire format "P{p}:{priv}:{pub|-}:R{round}:{history}" with '|' in the
    /// history separating rounds, e.g. "P1:Q:K:R2:cc|b".
    pub fn make_info_set_id(
        player: PlayerId,
        private_card: Card,
        public_card: Card,
        history: &str,
        round: u8,
    ) -> InfoSetId {
        let pub_str = if public_card < 0 {
            "-"
        } else {
            Self::rank_name(public_card)
        };
        format!(
            "P{}:{}:{}:R{}:{}",
            player,
            Self::rank_name(private_card),
            pub_str,
            round,
            history
        )
    }
}

impl Default for LeducPoker {
    fn default() -> Self {
        Self::new()
    }
}

impl PokerGame for LeducPoker {
    fn root(&self) -> &GameNode {
        &self.root
    }

    fn name(&self) -> &'static str {
        "leduc"
    }

    fn deck_size(&self) -> usize {
        LEDUC_DECK
    }
}

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

/// Per-round constants threaded through the betting recursion.
#[derive(Clone, Copy)]
struct RoundSetup {
    p0_card: Card,
    p1_card: Card,
    public_card: Card,
    round: u8,
    bet_size: i32,
}

fn build_root() -> GameNode {
    // All 30 ordered private deals (6 * 5), 1/30 each.
    let deal_prob = 1.0 / 30.0;
    let mut edges = Vec::new();
    for p0_card in 0..LEDUC_DECK as Card {
        for p1_card in 0..LEDUC_DECK as Card {
            if p0_card == p1_card {
                continue;
            }
            edges.push(ChanceEdge {
                card: p0_card * 10 + p1_card,
                probability: deal_prob,
                child: round_start(p0_card, p1_card, -1, 2 * ANTE, 1, String::new()),
            });
        }
    }

    GameNode {
        pot: 2 * ANTE,
        history: String::new(),
        p0_card: -1,
        p1_card: -1,
        public_card: -1,
        kind: NodeKind::Chance { edges },
    }
}

/// First decision of a betting round; player 0 acts first in both rounds.
fn round_start(
    p0_card: Card,
    p1_card: Card,
    public_card: Card,
    pot: i32,
    round: u8,
    history: String,
) -> GameNode {
    let setup = RoundSetup {
        p0_card,
        p1_card,
        public_card,
        round,
        bet_size: if round == 1 { SMALL_BET } else { BIG_BET },
    };
    player_node(
        setup,
        pot,
        0,
        MAX_RAISES,
        history,
        String::new(),
        PLAYER_0,
        vec![Action::Check, Action::Bet],
    )
}

#[allow(clippy::too_many_arguments)]
fn player_node(
    setup: RoundSetup,
    pot: i32,
    to_call: i32,
    raises_left: i32,
    history: String,
    local_history: String,
    player: PlayerId,
    actions: Vec<Action>,
) -> GameNode {
    let card = if player == PLAYER_0 {
        setup.p0_card
    } else {
        setup.p1_card
    };
    let edges = actions
        .iter()
        .map(|&action| ActionEdge {
            action,
            child: apply_action(
                setup,
                pot,
                to_call,
                raises_left,
                &history,
                &local_history,
                player,
                action,
            ),
        })
        .collect();

    GameNode {
        pot,
        history: history.clone(),
        p0_card: setup.p0_card,
        p1_card: setup.p1_card,
        public_card: setup.public_card,
        kind: NodeKind::Player {
            player,
            info_set_id: LeducPoker::make_info_set_id(
                player,
                card,
                setup.public_card,
                &history,
                setup.round,
            ),
            actions,
            edges,
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_action(
    setup: RoundSetup,
    pot: i32,
    to_call: i32,
    raises_left: i32,
    history: &str,
    local_history: &str,
    player: PlayerId,
    action: Action,
) -> GameNode {
    let new_history = format!("{}{}", history, action.as_char());
    let new_local = format!("{}{}", local_history, action.as_char());

    match action {
        Action::Fold => fold_terminal(setup, new_history, pot, player),
        Action::Check => {
            if local_history.is_empty() {
                // Opening check: the opponent still has the option to bet.
                player_node(
                    setup,
                    pot,
                    0,
                    raises_left,
                    new_history,
                    new_local,
                    opponent(player),
                    vec![Action::Check, Action::Bet],
                )
            } else {
                // Mutual check closes the round.
                end_round(setup, new_history, pot)
            }
        }
        Action::Call => end_round(setup, new_history, pot + to_call),
        Action::Bet => {
            let responses = if raises_left > 0 {
                vec![Action::Fold, Action::Call, Action::Raise]
            } else {
                vec![Action::Fold, Action::Call]
            };
            player_node(
                setup,
                pot + setup.bet_size,
                setup.bet_size,
                raises_left,
                new_history,
                new_local,
                opponent(player),
                responses,
            )
        }
        Action::Raise => {
            let new_raises = raises_left - 1;
            let responses = if new_raises > 0 {
                vec![Action::Fold, Action::Call, Action::Raise]
            } else {
                vec![Action::Fold, Action::Call]
            };
            player_node(
                setup,
                pot + to_call + setup.bet_size,
                setup.bet_size,
                new_raises,
                new_history,
                new_local,
                opponent(player),
                responses,
            )
        }
    }
}

fn end_round(setup: RoundSetup, history: String, pot: i32) -> GameNode {
    if setup.round == 1 {
        public_chance_node(setup.p0_card, setup.p1_card, history, pot)
    } else {
        showdown(setup, history, pot)
    }
}

/// Deal the public card: uniform over the 4 cards neither player holds.
fn public_chance_node(p0_card: Card, p1_card: Card, history: String, pot: i32) -> GameNode {
    let remaining: Vec<Card> = (0..LEDUC_DECK as Card)
        .filter(|&c| c != p0_card && c != p1_card)
        .collect();
    let deal_prob = 1.0 / remaining.len() as f64;

    let edges = remaining
        .into_iter()
        .map(|public_card| ChanceEdge {
            card: public_card,
            probability: deal_prob,
            child: round_start(
                p0_card,
                p1_card,
                public_card,
                pot,
                2,
                format!("{}|", history),
            ),
        })
        .collect();

    GameNode {
        pot,
        history,
        p0_card,
        p1_card,
        public_card: -1,
        kind: NodeKind::Chance { edges },
    }
}

fn showdown(setup: RoundSetup, history: String, pot: i32) -> GameNode {
    let payoff = match LeducPoker::compare_hands(setup.p0_card, setup.p1_card, setup.public_card) {
        cmp if cmp > 0 => f64::from(pot) / 2.0,
        cmp if cmp < 0 => -f64::from(pot) / 2.0,
        _ => 0.0,
    };

    GameNode {
        pot,
        history,
        p0_card: setup.p0_card,
        p1_card: setup.p1_card,
        public_card: setup.public_card,
        kind: NodeKind::Terminal { payoff },
    }
}

fn fold_terminal(setup: RoundSetup, history: String, pot: i32, folder: PlayerId) -> GameNode {
    let payoff = if folder == PLAYER_0 {
        -f64::from(pot) / 2.0
    } else {
        f64::from(pot) / 2.0
    };

    GameNode {
        pot,
        history,
        p0_card: setup.p0_card,
        p1_card: setup.p1_card,
        public_card: setup.public_card,
        kind: NodeKind::Terminal { payoff },
    }
}
