//! `good_lp` backend for the solver-neutral model.
//!
//! The generic [`Model`] is translated column by column and row by row into a
//! `good_lp` problem, which runs on a worker thread under the configured
//! wall-clock limit. Backend features:
//!
//! - `solver-microlp` (default): pure-Rust branch and bound
//! - `solver-highs`: HiGHS
//!
//! HiGHS receives the relative MIP gap, the time limit and the verbose flag
//! as solver options, so it stops on its own once the limit expires. microlp
//! has no such knobs: it always proves optimality (which satisfies any gap),
//! prints nothing, and is bounded only by the wall-clock limit. A microlp
//! worker that outlives the limit is abandoned rather than interrupted.

use std::collections::BTreeMap;
use std::time::Instant;

use good_lp::solvers::{ResolutionError, Solver as LpSolver};
use good_lp::{variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use scuc_core::{ScucError, ScucResult};
use scuc_solver_common::{
    run_with_time_limit, ConstraintSense, LinearExpr, MilpSolver, Model, RawSolution, SolveOptions,
    SolverStatus, VarDomain,
};
use tracing::{debug, info};

use crate::config::SolverBackend;

/// [`MilpSolver`] backed by `good_lp`.
#[derive(Debug, Clone)]
pub struct GoodLpSolver {
    backend: SolverBackend,
}

impl GoodLpSolver {
    /// Fails when `backend` was not compiled into this build.
    pub fn new(backend: SolverBackend) -> ScucResult<Self> {
        if !backend.is_available() {
            return Err(ScucError::Config(format!(
                "solver backend '{}' is not available in this build (available: {})",
                backend,
                SolverBackend::available().join(", ")
            )));
        }
        Ok(Self { backend })
    }

    pub fn backend(&self) -> SolverBackend {
        self.backend
    }
}

impl MilpSolver for GoodLpSolver {
    fn name(&self) -> &str {
        self.backend.as_str()
    }

    fn solve(&self, model: &Model, options: &SolveOptions) -> RawSolution {
        info!(
            backend = self.backend.as_str(),
            variables = model.num_variables(),
            constraints = model.num_constraints(),
            "starting MILP solve"
        );
        for option in ignored_options(self.backend, options) {
            debug!(backend = self.backend.as_str(), option, "option has no effect on this backend");
        }
        let backend = self.backend;
        let model = model.clone();
        let job_options = options.clone();
        let solution = run_with_time_limit(options.time_limit, move || {
            solve_blocking(backend, &model, &job_options)
        });
        info!(
            status = %solution.status,
            objective = ?solution.objective,
            solve_time_ms = solution.solve_time_ms,
            "MILP solve finished"
        );
        solution
    }
}

/// Options in `options` that `backend` cannot pass on to its solver.
pub fn ignored_options(backend: SolverBackend, options: &SolveOptions) -> Vec<&'static str> {
    let mut ignored = Vec::new();
    if backend == SolverBackend::Microlp {
        if options.mip_gap > 0.0 {
            ignored.push("mip_gap");
        }
        if options.verbose {
            ignored.push("verbose");
        }
    }
    ignored
}

#[cfg_attr(not(feature = "solver-highs"), allow(unused_variables))]
fn solve_blocking(backend: SolverBackend, model: &Model, options: &SolveOptions) -> RawSolution {
    match backend {
        #[cfg(feature = "solver-microlp")]
        SolverBackend::Microlp => solve_with(model, good_lp::solvers::microlp::microlp, Ok),
        #[cfg(feature = "solver-highs")]
        SolverBackend::Highs => solve_with(model, good_lp::solvers::highs::highs, |problem| {
            tune_highs(problem, options)
        }),
        #[allow(unreachable_patterns)]
        other => RawSolution::failed(
            SolverStatus::Error,
            format!("solver backend '{}' is not compiled in", other),
        ),
    }
}

/// Apply the gap, time limit and verbosity from `options` to a HiGHS problem.
#[cfg(feature = "solver-highs")]
fn tune_highs(
    mut problem: good_lp::solvers::highs::HighsProblem,
    options: &SolveOptions,
) -> Result<good_lp::solvers::highs::HighsProblem, String> {
    problem.set_verbose(options.verbose);
    let mut problem = problem
        .set_mip_rel_gap(options.mip_gap as f32)
        .map_err(|err| format!("invalid MIP gap {}: {}", options.mip_gap, err))?;
    if let Some(limit) = options.time_limit {
        problem = problem.set_time_limit(limit.as_secs_f64());
    }
    Ok(problem)
}

fn to_expression(expr: &LinearExpr, columns: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant_term());
    for &(var, coef) in expr.terms() {
        out += coef * columns[var.index()];
    }
    out
}

/// Translate `model`, solve it with `solver` and read back every column by name.
///
/// `tune` sets backend-specific options on the problem before it is solved.
fn solve_with<S, F>(model: &Model, solver: S, tune: F) -> RawSolution
where
    S: LpSolver,
    S::Model: SolverModel<Error = ResolutionError>,
    F: FnOnce(S::Model) -> Result<S::Model, String>,
{
    let started = Instant::now();
    let mut vars = ProblemVariables::new();
    let columns: Vec<Variable> = model
        .variables()
        .iter()
        .map(|v| {
            let mut def = variable().name(v.name.clone());
            if v.lower.is_finite() {
                def = def.min(v.lower);
            }
            if v.upper.is_finite() {
                def = def.max(v.upper);
            }
            def = match v.domain {
                VarDomain::Binary => def.binary(),
                VarDomain::Integer => def.integer(),
                VarDomain::Continuous => def,
            };
            vars.add(def)
        })
        .collect();

    let objective = to_expression(&model.canonical_objective(), &columns);
    let mut problem = vars.minimise(objective).using(solver);
    for row in model.constraints() {
        let lhs = to_expression(&row.expr, &columns);
        let constraint = match row.sense {
            ConstraintSense::LessEqual => good_lp::constraint::leq(lhs, row.rhs),
            ConstraintSense::GreaterEqual => good_lp::constraint::geq(lhs, row.rhs),
            ConstraintSense::Equal => good_lp::constraint::eq(lhs, row.rhs),
        };
        problem = problem.with(constraint);
    }
    debug!(
        translate_ms = started.elapsed().as_millis() as u64,
        "translated model to good_lp"
    );
    let problem = match tune(problem) {
        Ok(problem) => problem,
        Err(message) => return RawSolution::failed(SolverStatus::Error, message),
    };

    match problem.solve() {
        Ok(solution) => {
            let values: BTreeMap<String, f64> = model
                .variables()
                .iter()
                .zip(&columns)
                .map(|(v, &col)| (v.name.clone(), solution.value(col)))
                .collect();
            let assignment = model.column_values(&values);
            let objective = model.canonical_objective().evaluate(&assignment);
            RawSolution::new(SolverStatus::Optimal, Some(objective), values)
        }
        Err(ResolutionError::Infeasible) => {
            RawSolution::failed(SolverStatus::Infeasible, "problem is infeasible")
        }
        Err(ResolutionError::Unbounded) => {
            RawSolution::failed(SolverStatus::Unbounded, "problem is unbounded")
        }
        Err(err) => RawSolution::failed(SolverStatus::Error, err.to_string()),
    }
}

#[cfg(all(test, feature = "solver-microlp"))]
mod tests {
    use super::*;
    use scuc_solver_common::ConstraintClass;
    use std::time::Duration;

    fn solver() -> GoodLpSolver {
        GoodLpSolver::new(SolverBackend::Microlp).unwrap()
    }

    #[test]
    fn solves_small_mip() {
        // min 3x + 2y + 10z, x + y >= 1.5, x <= 4z, z binary, y <= 1
        let mut model = Model::new("mip");
        let x = model.add_continuous("x", 0.0, 10.0);
        let y = model.add_continuous("y", 0.0, 1.0);
        let z = model.add_binary("z");
        model.add_objective_term(x, 3.0);
        model.add_objective_term(y, 2.0);
        model.add_objective_term(z, 10.0);
        model.add_constraint(
            "demand",
            ConstraintClass::PowerBalance,
            LinearExpr::new().term(x, 1.0).term(y, 1.0),
            ConstraintSense::GreaterEqual,
            1.5,
        );
        model.add_constraint(
            "gate",
            ConstraintClass::Production,
            LinearExpr::new().term(x, 1.0).term(z, -4.0),
            ConstraintSense::LessEqual,
            0.0,
        );
        let sol = solver().solve(&model, &SolveOptions::default().with_time_limit(Some(Duration::from_secs(30))));
        assert_eq!(sol.status, SolverStatus::Optimal);
        // y = 1, x = 0.5, z = 1 → 1.5 + 2 + 10
        assert!((sol.objective.unwrap() - 13.5).abs() < 1e-6);
        assert!((sol.value("z").unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reports_infeasible() {
        let mut model = Model::new("bad");
        let x = model.add_continuous("x", 0.0, 1.0);
        model.add_objective_term(x, 1.0);
        model.add_constraint("c", ConstraintClass::PowerBalance, LinearExpr::from(x), ConstraintSense::GreaterEqual, 2.0);
        let sol = solver().solve(&model, &SolveOptions::default());
        assert_eq!(sol.status, SolverStatus::Infeasible);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn objective_constant_is_included() {
        let mut model = Model::new("const");
        let x = model.add_continuous("x", 1.0, 2.0);
        model.add_objective_term(x, 1.0);
        model.add_objective_constant(100.0);
        let sol = solver().solve(&model, &SolveOptions::default());
        assert!((sol.objective.unwrap() - 101.0).abs() < 1e-9);
    }

    #[test]
    fn microlp_reports_gap_and_verbose_as_ignored() {
        let mut options = SolveOptions::default().with_mip_gap(0.05);
        options.verbose = true;
        assert_eq!(
            ignored_options(SolverBackend::Microlp, &options),
            vec!["mip_gap", "verbose"]
        );
        let exact = SolveOptions::default().with_mip_gap(0.0);
        assert!(ignored_options(SolverBackend::Microlp, &exact).is_empty());
        assert!(ignored_options(SolverBackend::Highs, &options).is_empty());
    }

    #[test]
    fn gap_and_verbose_do_not_change_microlp_result() {
        let mut model = Model::new("gap");
        let x = model.add_variable("x", 0.0, 10.0, VarDomain::Integer);
        model.add_objective_term(x, 1.0);
        model.add_constraint("floor", ConstraintClass::PowerBalance, LinearExpr::from(x), ConstraintSense::GreaterEqual, 2.5);
        let mut options = SolveOptions::default().with_mip_gap(0.5);
        options.verbose = true;
        let sol = solver().solve(&model, &options);
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert!((sol.objective.unwrap() - 3.0).abs() < 1e-9);
    }
}
