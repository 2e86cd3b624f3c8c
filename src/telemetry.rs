//! File-based telemetry sink for live visualization.
//!
//! The whole document is rewritten after every iteration. Writes go to a
//! temporary sibling which is renamed over the visible file, so a reader
//! polling the path never observes truncated JSON.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::error::SolverResult;
use crate::game::{InfoSetId, InfoSetIndex};
use crate::newton::IterationStats;
use crate::strategy::Strategy;

/// One per-iteration record in the telemetry stream.
#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    pub iteration: usize,
    pub residual_norm: f64,
    pub step_norm: f64,
    pub alpha: f64,
    pub lambda: f64,
    pub beta: f64,
    pub game: String,
    pub strategy: Value,
    pub action_evs: Value,
    pub exploitability: Option<f64>,
    pub expected_value: Option<f64>,
}

impl TelemetrySnapshot {
    pub fn from_solver_stats(
        stats: &IterationStats,
        beta: f64,
        sigma: &Strategy,
        game: &str,
        exploitability: Option<f64>,
        expected_value: Option<f64>,
        action_evs: Value,
    ) -> Self {
        TelemetrySnapshot {
            iteration: stats.iteration,
            residual_norm: stats.residual_norm,
            step_norm: stats.step_norm,
            alpha: stats.alpha,
            lambda: stats.lambda,
            beta,
            game: game.to_string(),
            strategy: sigma.to_json(),
            action_evs,
            exploitability,
            expected_value,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut j = json!({
            "type": "iteration",
            "iteration": self.iteration,
            "residual_norm": self.residual_norm,
            "step_norm": self.step_norm,
            "alpha": self.alpha,
            "lambda": self.lambda,
            "beta": self.beta,
            "game": self.game,
            "strategy": self.strategy,
        });
        if !self.action_evs.is_null() {
            j["action_evs"] = self.action_evs.clone();
        }
        if let Some(exploit) = self.exploitability {
            j["exploitability"] = json!(exploit);
        }
        if let Some(ev) = self.expected_value {
            j["expected_value"] = json!(ev);
        }
        j
    }
}

/// Per-action expected utilities as JSON: info-set id -> { action -> EU }.
pub fn action_evs_json(index: &InfoSetIndex, all_eu: &HashMap<InfoSetId, Vec<f64>>) -> Value {
    let mut out = serde_json::Map::new();
    for i in 0..index.num_info_sets() {
        let is = index.info_set(i);
        let Some(eus) = all_eu.get(&is.id) else {
            continue;
        };
        let mut is_json = serde_json::Map::new();
        for (action, &eu) in is.actions.iter().zip(eus.iter()) {
            is_json.insert(action.as_str().to_string(), json!(eu));
        }
        out.insert(is.id.clone(), Value::Object(is_json));
    }
    Value::Object(out)
}

/// JSON telemetry file a browser can poll. Shape:
/// `{status, iteration_count, iterations: [snapshot...], latest}`.
pub struct FileTelemetry {
    path: PathBuf,
    history: Vec<Value>,
    latest: Value,
    finished: bool,
}

impl FileTelemetry {
    /// Creates the sink and writes the initial empty document.
    pub fn new<P: Into<PathBuf>>(path: P) -> SolverResult<Self> {
        let telemetry = FileTelemetry {
            path: path.into(),
            history: Vec::new(),
            latest: Value::Null,
            finished: false,
        };
        telemetry.write_file()?;
        Ok(telemetry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_iteration(&mut self, snapshot: Value) -> SolverResult<()> {
        self.history.push(snapshot.clone());
        self.latest = snapshot;
        self.write_file()
    }

    /// Replace `latest` with the completion record and mark the document
    /// complete.
    pub fn finish(&mut self, final_exploitability: f64, total_iterations: usize) -> SolverResult<()> {
        self.latest = json!({
            "type": "complete",
            "status": "done",
            "final_exploitability": final_exploitability,
            "total_iterations": total_iterations,
        });
        self.finished = true;
        self.write_file()
    }

    fn write_file(&self) -> SolverResult<()> {
        let document = json!({
            "status": if self.finished { "complete" } else { "running" },
            "iteration_count": self.history.len(),
            "iterations": self.history,
            "latest": self.latest,
        });

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Temp file + rename keeps the visible file whole at all times.
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        fs::write(&tmp_path, serde_json::to_string_pretty(&document)?)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
