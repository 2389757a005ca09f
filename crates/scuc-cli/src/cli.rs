use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scuc", author, version, about = "Security-constrained unit commitment", long_about = None)]
pub struct Cli {
    /// Set the logging level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    /// TOML configuration file
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and solve the unit commitment model
    Solve(SolveArgs),
    /// Build the model and write it in LP format
    Build(BuildArgs),
    /// Check an instance document and report diagnostics
    Validate {
        /// Instance document (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        instance: PathBuf,
    },
    /// Compute ISF and LODF matrices for an instance
    Factors {
        /// Instance document (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        instance: PathBuf,
        /// Output file for the factors (JSON)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
        /// Worker threads (0 = all cores)
        #[arg(long)]
        threads: Option<usize>,
    },
}

/// Options shared by commands that build a model.
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Instance document (JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub instance: PathBuf,
    /// Precomputed sensitivity factors (JSON) instead of deriving them
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub factors: Option<PathBuf>,
    /// Override the ISF cutoff
    #[arg(long)]
    pub isf_cutoff: Option<f64>,
    /// Override the LODF cutoff
    #[arg(long)]
    pub lodf_cutoff: Option<f64>,
    /// Skip post-contingency limits
    #[arg(long)]
    pub no_security: bool,
    /// Worker threads for factor computation (0 = all cores)
    #[arg(long)]
    pub threads: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SolveArgs {
    #[command(flatten)]
    pub model: ModelArgs,
    /// Solution document (JSON); printed to stdout when omitted
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
    /// Also write the schedule as CSV
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub csv: Option<PathBuf>,
    /// MILP backend (microlp, highs)
    #[arg(long)]
    pub backend: Option<String>,
    /// Wall-clock limit in seconds
    #[arg(long)]
    pub time_limit: Option<f64>,
    /// Relative MIP gap
    #[arg(long)]
    pub mip_gap: Option<f64>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub model: ModelArgs,
    /// LP file to write
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: PathBuf,
}
