//! Explicit configuration passed into every pipeline stage.
//!
//! All fields have defaults, so an empty TOML document (or `ScucConfig::default()`)
//! is a complete configuration:
//!
//! ```toml
//! [formulation]
//! cost_segments = 10
//! isf_cutoff = 0.005
//! lodf_cutoff = 0.001
//! enforce_security = true
//! convexity_tolerance = 1e-6
//!
//! [solver]
//! backend = "microlp"
//! time_limit_seconds = 300
//! mip_gap = 1e-3
//!
//! [tolerances]
//! epsilon = 1e-6
//! hard_threshold = 1e-3
//!
//! [parallel]
//! threads = 0
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use scuc_core::{ScucError, ScucResult};
use scuc_solver_common::SolveOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScucConfig {
    pub formulation: FormulationConfig,
    pub solver: SolverConfig,
    pub tolerances: ToleranceConfig,
    pub parallel: ParallelConfig,
}

impl ScucConfig {
    /// Reject values no stage can work with.
    pub fn validate(&self) -> ScucResult<()> {
        let f = &self.formulation;
        if f.cost_segments == 0 {
            return Err(ScucError::Config("cost_segments must be at least 1".into()));
        }
        for (name, value) in [
            ("isf_cutoff", f.isf_cutoff),
            ("lodf_cutoff", f.lodf_cutoff),
            ("convexity_tolerance", f.convexity_tolerance),
            ("mip_gap", self.solver.mip_gap),
            ("epsilon", self.tolerances.epsilon),
            ("hard_threshold", self.tolerances.hard_threshold),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ScucError::Config(format!("{} must be a non-negative number", name)));
            }
        }
        if self.tolerances.hard_threshold < self.tolerances.epsilon {
            return Err(ScucError::Config(
                "hard_threshold must not be smaller than epsilon".into(),
            ));
        }
        if let Some(limit) = self.solver.time_limit_seconds {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(ScucError::Config("time_limit_seconds must be positive".into()));
            }
            if Duration::try_from_secs_f64(limit).is_err() {
                return Err(ScucError::Config(format!(
                    "time_limit_seconds of {} is too large",
                    limit
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulationConfig {
    /// Sampling resolution for polynomial cost curves
    pub cost_segments: usize,
    /// |ISF| below this is treated as zero
    pub isf_cutoff: f64,
    /// |LODF| below this is treated as zero
    pub lodf_cutoff: f64,
    /// Emit post-contingency limits
    pub enforce_security: bool,
    /// Relative slack allowed when checking non-decreasing marginal cost
    pub convexity_tolerance: f64,
}

impl Default for FormulationConfig {
    fn default() -> Self {
        Self {
            cost_segments: 10,
            isf_cutoff: 0.005,
            lodf_cutoff: 0.001,
            enforce_security: true,
            convexity_tolerance: scuc_core::DEFAULT_CONVEXITY_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Wall-clock limit; `None` waits indefinitely
    pub time_limit_seconds: Option<f64>,
    pub mip_gap: f64,
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::default(),
            time_limit_seconds: Some(300.0),
            mip_gap: 1e-3,
            verbose: false,
        }
    }
}

impl SolverConfig {
    /// Limits that do not fit in a [`Duration`] are dropped; `validate` rejects them first.
    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            time_limit: self
                .time_limit_seconds
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            mip_gap: self.mip_gap,
            verbose: self.verbose,
        }
    }
}

/// MILP backend behind `good_lp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    /// Pure-Rust branch and bound
    #[default]
    Microlp,
    /// HiGHS (native, `solver-highs` feature)
    Highs,
}

impl SolverBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverBackend::Microlp => "microlp",
            SolverBackend::Highs => "highs",
        }
    }

    /// Backends compiled into this build.
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_BACKENDS
    }

    pub fn is_available(&self) -> bool {
        AVAILABLE_BACKENDS.contains(&self.as_str())
    }
}

const AVAILABLE_BACKENDS: &[&str] = &[
    #[cfg(feature = "solver-microlp")]
    "microlp",
    #[cfg(feature = "solver-highs")]
    "highs",
];

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolverBackend {
    type Err = ScucError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "microlp" => Ok(SolverBackend::Microlp),
            "highs" => Ok(SolverBackend::Highs),
            other => Err(ScucError::Config(format!(
                "unknown solver backend '{}'; supported values: {}",
                other,
                SolverBackend::available().join(", ")
            ))),
        }
    }
}

/// Thresholds used when re-checking an extracted schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Drift above this is reported as a tolerance warning
    pub epsilon: f64,
    /// Drift above this rejects the solution
    pub hard_threshold: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            hard_threshold: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads for factor computation (0 = rayon default)
    pub threads: usize,
}
