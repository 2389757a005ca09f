//! Unified error type for the SCUC workspace
//!
//! Every stage of the pipeline (instance validation, cost linearization,
//! sensitivity factors, model construction, I/O) reports failures through
//! [`ScucError`]. A solver that returns "infeasible" or "timed out" is NOT an
//! error: those outcomes travel back as data in the solve result.
//!
//! # Example
//!
//! ```
//! use scuc_core::{ScucError, ScucResult};
//!
//! fn check_horizon(periods: usize) -> ScucResult<()> {
//!     if periods == 0 {
//!         return Err(ScucError::validation("instance", "time horizon must be at least 1"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_horizon(0).is_err());
//! ```

use thiserror::Error;

/// Unified error type for all SCUC operations.
#[derive(Error, Debug)]
pub enum ScucError {
    /// Structural or numeric problem with the instance data.
    #[error("Validation error ({entity}): {message}")]
    Validation { entity: String, message: String },

    /// Cost curve whose marginal cost decreases somewhere.
    #[error(
        "Non-convex cost curve for generator {generator}: segment {segment} slope {slope} is below previous slope {previous}"
    )]
    NonConvexCost {
        generator: String,
        segment: usize,
        slope: f64,
        previous: f64,
    },

    /// Susceptance matrix could not be factorized (islanded network, zero reactance).
    #[error("Singular network: {0}")]
    SingularNetwork(String),

    /// Fixed commitments or initial conditions that no schedule can satisfy.
    #[error("Infeasible instance ({generator}): {message}")]
    InfeasibleInstance { generator: String, message: String },

    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend failures that prevent a solve from even starting.
    #[error("Solver error: {0}")]
    Solver(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl ScucError {
    pub fn validation(entity: impl Into<String>, message: impl Into<String>) -> Self {
        ScucError::Validation {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn infeasible(generator: impl Into<String>, message: impl Into<String>) -> Self {
        ScucError::InfeasibleInstance {
            generator: generator.into(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results using ScucError.
pub type ScucResult<T> = Result<T, ScucError>;

impl From<anyhow::Error> for ScucError {
    fn from(err: anyhow::Error) -> Self {
        ScucError::Other(err.to_string())
    }
}

impl From<String> for ScucError {
    fn from(s: String) -> Self {
        ScucError::Other(s)
    }
}

impl From<&str> for ScucError {
    fn from(s: &str) -> Self {
        ScucError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for ScucError {
    fn from(err: serde_json::Error) -> Self {
        ScucError::Parse(err.to_string())
    }
}
