//! Command-line front end.

use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use colored::Colorize;

use crate::continuation::{beta_schedule, solve_continuation, ContinuationConfig};
use crate::display;
use crate::error::{SolverError, SolverResult};
use crate::expected_value::{
    compute_all_expected_utilities, compute_ev, compute_exploitability,
};
use crate::game::{tree_stats, InfoSetIndex, PokerGame};
use crate::kuhn::KuhnPoker;
use crate::leduc::LeducPoker;
use crate::newton::NewtonConfig;
use crate::strategy::Strategy;
use crate::telemetry::{action_evs_json, FileTelemetry, TelemetrySnapshot};

#[derive(Parser)]
#[command(
    name = "qre",
    version = "1.0.0",
    about = "Newton-based QRE poker solver — walks a temperature continuation path to an approximate Nash equilibrium of Kuhn or Leduc poker."
)]
struct Cli {
    /// Game to solve
    #[arg(long, value_enum, default_value_t = GameChoice::Kuhn)]
    game: GameChoice,

    /// Target temperature (higher = closer to exact best response)
    #[arg(long, default_value_t = 10.0)]
    beta: f64,

    /// Convergence tolerance on the residual norm
    #[arg(long, default_value_t = 1e-8)]
    tol: f64,

    /// Max Newton iterations per beta level
    #[arg(long = "max-iters", default_value_t = 50)]
    max_iters: usize,

    /// Telemetry JSON file for the live visualization
    #[arg(long, default_value = "viz/solver_output.json")]
    output: PathBuf,

    /// Print per-iteration details
    #[arg(long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum GameChoice {
    Kuhn,
    Leduc,
}

pub fn run() {
    let cli = Cli::parse();
    if let Err(e) = run_solver(&cli) {
        display::print_error(&e.to_string());
        process::exit(1);
    }
}

fn run_solver(cli: &Cli) -> SolverResult<()> {
    if cli.beta <= 0.0 {
        return Err(SolverError::InvalidValue(
            "beta must be positive".to_string(),
        ));
    }
    if cli.tol <= 0.0 {
        return Err(SolverError::InvalidValue("tol must be positive".to_string()));
    }
    if cli.max_iters == 0 {
        return Err(SolverError::InvalidValue(
            "max-iters must be positive".to_string(),
        ));
    }

    println!("{}", "QRE Solver — Newton on the logit fixed point".bold());
    println!();

    let game: Box<dyn PokerGame> = match cli.game {
        GameChoice::Kuhn => Box::new(KuhnPoker::new()),
        GameChoice::Leduc => Box::new(LeducPoker::new()),
    };

    let stats = tree_stats(game.root());
    let info_sets = game.info_sets();
    let index = InfoSetIndex::build(&info_sets);

    println!(
        "{}",
        display::tree_summary(game.name(), &stats, info_sets.len(), index.total_dim())
    );
    println!();

    let mut telemetry = FileTelemetry::new(&cli.output)?;
    println!("  Writing telemetry to: {}", cli.output.display());

    let config = ContinuationConfig {
        target_beta: cli.beta,
        newton: NewtonConfig {
            tol: cli.tol,
            max_iters: cli.max_iters,
            fd_step: 1e-6,
            ..Default::default()
        },
    };

    println!("{}", display::beta_schedule_line(&beta_schedule(cli.beta)));
    println!();

    let start = Instant::now();
    let mut total_iters = 0usize;

    let result = solve_continuation(game.as_ref(), &config, None, |stats, x, beta| {
        total_iters += 1;

        let sigma = Strategy::from_logits(x, &index)?;
        let exploit = compute_exploitability(game.root(), &sigma)?;
        let ev = compute_ev(game.root(), &sigma)?;
        let all_eu = compute_all_expected_utilities(game.root(), &sigma, &index)?;

        if cli.verbose {
            println!("{}", display::iteration_line(stats, beta, exploit));
        }

        let snapshot = TelemetrySnapshot::from_solver_stats(
            stats,
            beta,
            &sigma,
            game.name(),
            Some(exploit),
            Some(ev),
            action_evs_json(&index, &all_eu),
        );
        telemetry.log_iteration(snapshot.to_json())
    })?;

    println!();
    for step in &result.steps {
        println!(
            "{}",
            display::level_line(step.beta, step.converged, step.iterations, step.final_residual)
        );
    }

    let final_sigma = Strategy::from_logits(&result.w, &index)?;
    let final_exploit = compute_exploitability(game.root(), &final_sigma)?;
    let final_ev = compute_ev(game.root(), &final_sigma)?;

    println!();
    println!("{}", "Solver complete".bold());
    println!("  Total iterations: {}", total_iters);
    println!("  Time: {} ms", start.elapsed().as_millis());
    println!("  Final exploitability: {:.6e}", final_exploit);
    println!("  Expected value (P0): {:.6}", final_ev);
    println!();

    println!("{}", display::strategy_table(&info_sets, &final_sigma)?);

    telemetry.finish(final_exploit, total_iters)?;
    println!("  Visualization data written to: {}", cli.output.display());

    Ok(())
}
