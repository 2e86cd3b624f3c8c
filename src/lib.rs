//! Newton-based quantal response equilibrium solver for small two-player
//! zero-sum poker games.
//!
//! The QRE fixed point sigma = LogitBR_beta(sigma) is written as a smooth
//! residual over unconstrained logits and driven to zero by a damped Newton
//! method with a finite-difference Jacobian, Levenberg regularization and
//! Armijo backtracking, along an increasing temperature schedule that
//! warm-starts each level from the last. A tabular CFR implementation is
//! kept as a cross-validation oracle.

pub mod cfr;
pub mod cli;
pub mod continuation;
pub mod display;
pub mod error;
pub mod expected_value;
pub mod finite_diff;
pub mod game;
pub mod kuhn;
pub mod leduc;
pub mod line_search;
pub mod newton;
pub mod qre;
pub mod strategy;
pub mod telemetry;
