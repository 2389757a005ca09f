use std::process::ExitCode;

use clap::Parser;
use scuc_algo::ParallelConfig;
use scuc_cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{build, factors, solve, validate};

fn init_tracing(level: tracing::Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(err) = installed {
        eprintln!("failed to install log subscriber: {err}");
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Solve(args) => {
            if solve::handle(args, config_path)? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(solve::SOLVE_FAILURE_EXIT))
            }
        }
        Commands::Build(args) => build::handle(args, config_path).map(|_| ExitCode::SUCCESS),
        Commands::Validate { instance } => validate::handle(instance).map(|_| ExitCode::SUCCESS),
        Commands::Factors {
            instance,
            out,
            threads,
        } => {
            let parallel = ParallelConfig {
                threads: threads.unwrap_or_default(),
            };
            factors::handle(instance, out, &parallel).map(|_| ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
