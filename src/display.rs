//! Console rendering for solver output.

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use itertools::Itertools;

use crate::error::SolverResult;
use crate::game::{InfoSet, TreeStats};
use crate::newton::IterationStats;
use crate::strategy::Strategy;

pub fn print_error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

/// Game summary printed before solving.
pub fn tree_summary(name: &str, stats: &TreeStats, num_info_sets: usize, dim: usize) -> String {
    format!(
        "  {} {}\n  Tree nodes: {} ({} chance, {} player, {} terminal)\n  Information sets: {}\n  Strategy dimensions: {}",
        "Game:".bold(),
        name,
        stats.total_nodes,
        stats.chance_nodes,
        stats.player_nodes,
        stats.terminal_nodes,
        num_info_sets,
        dim,
    )
}

pub fn beta_schedule_line(schedule: &[f64]) -> String {
    format!(
        "  {} {}",
        "Beta schedule:".bold(),
        schedule.iter().map(|b| format!("{}", b)).join(" ")
    )
}

/// One colored line per Newton iteration for verbose output.
pub fn iteration_line(stats: &IterationStats, beta: f64, exploitability: f64) -> String {
    format!(
        "  iter {:3} | beta {:<8} | residual {:.3e} | step {:.3e} | alpha {:.3} | exploit {:.4}",
        stats.iteration,
        beta,
        stats.residual_norm,
        stats.step_norm,
        stats.alpha,
        exploitability,
    )
}

/// Per-beta-level completion line.
pub fn level_line(beta: f64, converged: bool, iterations: usize, residual: f64) -> String {
    let outcome = if converged {
        "converged".green().to_string()
    } else {
        "max iters".yellow().to_string()
    };
    format!(
        "  beta {:<8} {} in {} iterations, residual = {:.3e}",
        beta, outcome, iterations, residual,
    )
}

/// Full strategy table: one row per (info set, action) with probabilities.
pub fn strategy_table(info_sets: &[InfoSet], sigma: &Strategy) -> SolverResult<String> {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Info Set").set_alignment(CellAlignment::Left),
        Cell::new("Action").set_alignment(CellAlignment::Left),
        Cell::new("Probability").set_alignment(CellAlignment::Right),
    ]);

    for is in info_sets {
        let probs = sigma.probs(&is.id)?;
        for (action, &p) in is.actions.iter().zip(probs.iter()) {
            let prob_cell = if p >= 0.5 {
                Cell::new(format!("{:.4}", p).green().bold().to_string())
            } else if p >= 0.1 {
                Cell::new(format!("{:.4}", p))
            } else {
                Cell::new(format!("{:.4}", p).dimmed().to_string())
            };
            table.add_row(vec![
                Cell::new(&is.id),
                Cell::new(action.as_str()),
                prob_cell.set_alignment(CellAlignment::Right),
            ]);
        }
    }

    Ok(table.to_string())
}
