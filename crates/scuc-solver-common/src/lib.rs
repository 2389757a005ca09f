//! Solver boundary for the SCUC workspace.
//!
//! The model builder emits a [`Model`]: plain variables with bounds and
//! domains, linear rows tagged with a [`ConstraintClass`], and a linear
//! objective. A backend implementing [`MilpSolver`] turns it into a
//! [`RawSolution`]: a name → value map plus a [`SolverStatus`].
//!
//! ```text
//! Model ──MilpSolver::solve──▶ RawSolution { status, values, duals? }
//!   │
//!   └──to_lp_string──▶ CPLEX LP text (hand-off to external solvers)
//! ```
//!
//! Solver outcomes (infeasible, timeout, ...) are data, never errors.
//! [`SolverError`] is reserved for failures that prevent a solve from being
//! attempted at all.

pub mod backend;
pub mod error;
pub mod lp_format;
pub mod model;
pub mod solution;

pub use backend::{run_with_time_limit, MilpSolver, SolveOptions};
pub use error::SolverError;
pub use lp_format::{to_lp_string, write_lp_file};
pub use model::{
    Constraint, ConstraintClass, ConstraintSense, LinearExpr, Model, ModelStats, VarDomain,
    VarId, Variable,
};
pub use solution::{RawSolution, SolverStatus};
