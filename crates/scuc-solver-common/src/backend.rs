//! Backend trait and wall-clock limit enforcement.
//!
//! ```text
//! caller ──solve()──▶ run_with_time_limit ──spawn──▶ worker thread (backend)
//!        ◀──RawSolution── recv_timeout(limit) ◀──channel──┘
//! ```
//!
//! The caller waits at most the configured limit. When it expires the result
//! is [`SolverStatus::Timeout`]; the worker is detached and its late answer is
//! dropped. Nothing here retries.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{Model, RawSolution, SolverStatus};

/// Per-solve options passed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    /// Wall-clock limit; `None` waits indefinitely
    pub time_limit: Option<Duration>,
    /// Relative MIP gap for backends that accept one
    pub mip_gap: f64,
    pub verbose: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(300)),
            mip_gap: 1e-3,
            verbose: false,
        }
    }
}

impl SolveOptions {
    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn with_mip_gap(mut self, gap: f64) -> Self {
        self.mip_gap = gap;
        self
    }
}

/// A mixed-integer solver that consumes a [`Model`].
///
/// Implementations never panic or error on solver outcomes: infeasibility,
/// timeouts and crashes are all reported through [`RawSolution::status`].
pub trait MilpSolver: Send + Sync {
    fn name(&self) -> &str;

    /// Whether row duals are reported (LP relaxations only, typically).
    fn reports_duals(&self) -> bool {
        false
    }

    fn solve(&self, model: &Model, options: &SolveOptions) -> RawSolution;
}

/// Run `job` on a worker thread and wait at most `limit`.
pub fn run_with_time_limit<F>(limit: Option<Duration>, job: F) -> RawSolution
where
    F: FnOnce() -> RawSolution + Send + 'static,
{
    let started = Instant::now();
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("scuc-solver".into())
        .spawn(move || {
            // receiver may be gone after a timeout
            let _ = tx.send(job());
        });
    if let Err(err) = spawned {
        return RawSolution::failed(SolverStatus::Error, format!("failed to spawn solver thread: {}", err));
    }

    let received = match limit {
        Some(limit) => rx.recv_timeout(limit).map_err(|err| match err {
            mpsc::RecvTimeoutError::Timeout => Some(limit),
            mpsc::RecvTimeoutError::Disconnected => None,
        }),
        None => rx.recv().map_err(|_| None),
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match received {
        Ok(solution) => {
            debug!(elapsed_ms, status = %solution.status, "solver thread finished");
            solution.with_solve_time_ms(elapsed_ms)
        }
        Err(Some(limit)) => {
            warn!(limit_s = limit.as_secs_f64(), "solver time limit reached");
            RawSolution::timeout(limit.as_secs_f64()).with_solve_time_ms(elapsed_ms)
        }
        Err(None) => RawSolution::failed(SolverStatus::Error, "solver thread panicked")
            .with_solve_time_ms(elapsed_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn fast_job_returns_its_result() {
        let sol = run_with_time_limit(Some(Duration::from_secs(5)), || {
            RawSolution::new(SolverStatus::Optimal, Some(1.0), BTreeMap::new())
        });
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert_eq!(sol.objective, Some(1.0));
    }

    #[test]
    fn slow_job_times_out() {
        let sol = run_with_time_limit(Some(Duration::from_millis(20)), || {
            thread::sleep(Duration::from_millis(500));
            RawSolution::new(SolverStatus::Optimal, Some(1.0), BTreeMap::new())
        });
        assert_eq!(sol.status, SolverStatus::Timeout);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn panicking_job_is_an_error() {
        let sol = run_with_time_limit(None, || panic!("backend blew up"));
        assert_eq!(sol.status, SolverStatus::Error);
    }
}
