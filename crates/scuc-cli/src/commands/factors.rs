use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use scuc_algo::{ParallelConfig, SensitivityFactors};
use scuc_io::{read_instance, write_factors};
use tracing::info;

pub fn handle(instance: &Path, out: &Path, parallel: &ParallelConfig) -> Result<()> {
    let start = Instant::now();
    let imported = read_instance(instance)?;
    let factors = SensitivityFactors::compute(&imported.instance, parallel)
        .context("computing sensitivity factors")?;
    write_factors(&factors, out)?;
    info!(
        lines = factors.isf.num_lines(),
        buses = factors.isf.num_buses(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "sensitivity factors computed"
    );
    println!(
        "Wrote ISF ({} x {}) and LODF to {}",
        factors.isf.num_lines(),
        factors.isf.num_buses(),
        out.display()
    );
    Ok(())
}
