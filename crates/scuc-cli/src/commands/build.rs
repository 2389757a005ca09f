use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use scuc_algo::pipeline;
use scuc_cli::BuildArgs;
use scuc_io::{read_factors, read_instance};
use scuc_solver_common::write_lp_file;
use tabwriter::TabWriter;

use crate::commands::config;

/// Write the model as an LP file and print its size by constraint class.
pub fn handle(args: &BuildArgs, config_path: Option<&Path>) -> Result<()> {
    let config = config::load(config_path, &args.model)?;
    let imported = read_instance(&args.model.instance)?;
    let factors = args.model.factors.as_deref().map(read_factors).transpose()?;

    let uc = pipeline::build_model(&imported.instance, &config, factors)
        .context("building unit commitment model")?;
    write_lp_file(&uc.model, &args.out)
        .with_context(|| format!("writing LP file '{}'", args.out.display()))?;

    let stats = uc.model.stats();
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "Variables\t{}", stats.variables)?;
    writeln!(writer, "Binaries\t{}", stats.binaries)?;
    writeln!(writer, "Constraints\t{}", stats.constraints)?;
    writeln!(writer, "Nonzeros\t{}", stats.nonzeros)?;
    writeln!(writer, "Security rows\t{}", uc.screening.pairs.len())?;
    for (class, count) in &stats.constraints_by_class {
        writeln!(writer, "  {}\t{}", class, count)?;
    }
    writer.flush()?;
    println!("Model written to {}", args.out.display());
    Ok(())
}
