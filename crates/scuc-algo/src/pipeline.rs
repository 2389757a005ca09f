//! End-to-end solve: build, hand to a backend, extract.

use scuc_core::{Instance, ScucResult};
use scuc_solver_common::MilpSolver;
use tracing::info;

use crate::backend::GoodLpSolver;
use crate::builder::{ModelBuilder, UcModel};
use crate::config::ScucConfig;
use crate::schedule::{extract, SolveOutcome};
use crate::sensitivity::SensitivityFactors;

/// Backend selected by `config.solver.backend`.
pub fn solver_for(config: &ScucConfig) -> ScucResult<GoodLpSolver> {
    GoodLpSolver::new(config.solver.backend)
}

/// Build the model for `instance` and solve it with `solver`.
///
/// Invalid input and configuration are errors; solver outcomes
/// (infeasible, timeout, ...) are returned as [`SolveOutcome::Failed`].
pub fn solve(
    instance: &Instance,
    config: &ScucConfig,
    solver: &dyn MilpSolver,
) -> ScucResult<SolveOutcome> {
    solve_with_factors(instance, config, None, solver)
}

/// Like [`solve`], reusing precomputed sensitivity factors when given.
pub fn solve_with_factors(
    instance: &Instance,
    config: &ScucConfig,
    factors: Option<SensitivityFactors>,
    solver: &dyn MilpSolver,
) -> ScucResult<SolveOutcome> {
    let uc = build_model(instance, config, factors)?;
    Ok(solve_model(instance, config, &uc, solver))
}

pub fn build_model(
    instance: &Instance,
    config: &ScucConfig,
    factors: Option<SensitivityFactors>,
) -> ScucResult<UcModel> {
    let builder = ModelBuilder::new(instance, config);
    match factors {
        Some(factors) => builder.with_factors(factors).build(),
        None => builder.build(),
    }
}

/// Solve an already built model.
pub fn solve_model(
    instance: &Instance,
    config: &ScucConfig,
    uc: &UcModel,
    solver: &dyn MilpSolver,
) -> SolveOutcome {
    let raw = solver.solve(&uc.model, &config.solver.solve_options());
    let outcome = extract(instance, uc, &raw, &config.tolerances);
    info!(
        solver = solver.name(),
        status = %outcome.status(),
        "unit commitment solve complete"
    );
    outcome
}
