use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use scuc_algo::{pipeline, Schedule, SolveOutcome, SolverBackend};
use scuc_cli::SolveArgs;
use scuc_io::{read_factors, read_instance, SolutionExport};
use tabwriter::TabWriter;
use tracing::{info, warn};

use crate::commands::config;

/// Exit status when the solver finished without a usable schedule.
pub const SOLVE_FAILURE_EXIT: u8 = 2;

/// Returns whether a schedule was produced.
pub fn handle(args: &SolveArgs, config_path: Option<&Path>) -> Result<bool> {
    let start = Instant::now();
    let mut config = config::load(config_path, &args.model)?;
    if let Some(backend) = &args.backend {
        config.solver.backend = backend.parse::<SolverBackend>()?;
    }
    if let Some(limit) = args.time_limit {
        config.solver.time_limit_seconds = Some(limit);
    }
    if let Some(gap) = args.mip_gap {
        config.solver.mip_gap = gap;
    }
    config.validate().context("invalid solver options")?;

    let imported = read_instance(&args.model.instance)?;
    let factors = args.model.factors.as_deref().map(read_factors).transpose()?;
    let solver = pipeline::solver_for(&config)?;
    let outcome = pipeline::solve_with_factors(&imported.instance, &config, factors, &solver)
        .context("solving unit commitment")?;

    match &args.out {
        Some(path) => {
            outcome.to_json(path)?;
            print_summary(&outcome)?;
        }
        None => {
            let value = outcome.to_json_value()?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    if let Some(path) = &args.csv {
        outcome.to_csv(path)?;
    }

    info!(
        status = %outcome.status(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "solve command finished"
    );
    if let SolveOutcome::Failed(failure) = &outcome {
        warn!(
            status = %failure.status,
            message = failure.message.as_deref().unwrap_or(""),
            "no schedule produced"
        );
    }
    Ok(outcome.schedule().is_some())
}

fn print_summary(outcome: &SolveOutcome) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "Status\t{}", outcome.status())?;
    if let Some(schedule) = outcome.schedule() {
        write_costs(&mut writer, schedule)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_costs<W: Write>(writer: &mut W, schedule: &Schedule) -> io::Result<()> {
    let costs = &schedule.costs;
    writeln!(writer, "Objective\t{:.4}", schedule.objective)?;
    writeln!(writer, "  production\t{:.4}", costs.production)?;
    writeln!(writer, "  startup\t{:.4}", costs.startup)?;
    writeln!(writer, "  curtailment\t{:.4}", costs.curtailment)?;
    writeln!(writer, "  reserve shortfall\t{:.4}", costs.reserve_shortfall)?;
    writeln!(writer, "  overflow\t{:.4}", costs.overflow)?;
    writeln!(writer, "  price-sensitive revenue\t{:.4}", costs.price_sensitive_revenue)?;
    writeln!(writer, "Curtailment (MW)\t{:.4}", schedule.total_curtailment())?;
    writeln!(writer, "Tolerance warnings\t{}", schedule.warnings.len())?;
    Ok(())
}
