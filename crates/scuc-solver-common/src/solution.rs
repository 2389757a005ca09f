//! Raw result handed back by a MILP backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Termination status reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// Proven optimal within the configured gap.
    Optimal,
    /// Integer-feasible point without an optimality proof.
    Feasible,
    Infeasible,
    Unbounded,
    /// Wall-clock limit reached before a usable point was returned.
    Timeout,
    /// Backend crashed or reported a numerical failure.
    Error,
}

impl SolverStatus {
    /// A schedule may be read from the values.
    pub fn is_success(&self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverStatus::Optimal => write!(f, "optimal"),
            SolverStatus::Feasible => write!(f, "feasible"),
            SolverStatus::Infeasible => write!(f, "infeasible"),
            SolverStatus::Unbounded => write!(f, "unbounded"),
            SolverStatus::Timeout => write!(f, "timeout"),
            SolverStatus::Error => write!(f, "error"),
        }
    }
}

/// Variable assignment keyed by variable name, plus status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSolution {
    pub status: SolverStatus,
    /// Objective value as reported by the backend
    pub objective: Option<f64>,
    pub values: BTreeMap<String, f64>,
    /// Row duals keyed by constraint name, when the backend reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duals: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub solve_time_ms: u64,
}

impl RawSolution {
    pub fn new(status: SolverStatus, objective: Option<f64>, values: BTreeMap<String, f64>) -> Self {
        Self {
            status,
            objective,
            values,
            duals: None,
            message: None,
            solve_time_ms: 0,
        }
    }

    /// Result without any assignment.
    pub fn failed(status: SolverStatus, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(status, None, BTreeMap::new())
        }
    }

    pub fn timeout(limit_seconds: f64) -> Self {
        Self::failed(
            SolverStatus::Timeout,
            format!("time limit of {}s reached", limit_seconds),
        )
    }

    pub fn with_duals(mut self, duals: BTreeMap<String, f64>) -> Self {
        self.duals = Some(duals);
        self
    }

    pub fn with_solve_time_ms(mut self, ms: u64) -> Self {
        self.solve_time_ms = ms;
        self
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}
