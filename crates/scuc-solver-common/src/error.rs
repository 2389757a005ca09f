//! Errors raised at the solver boundary.

use thiserror::Error;

/// Errors that prevent a model from being handed to, or read back from, a backend.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Backend name not recognised or not compiled in.
    #[error("Unknown solver backend: {0}")]
    UnknownBackend(String),

    /// Model contains data the backend cannot represent.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Backend-specific failure.
    #[error("Backend error: {0}")]
    Backend(String),

    /// I/O error while writing a model file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SolverError::UnknownBackend("gurobi".into());
        assert!(err.to_string().contains("gurobi"));
    }
}
