use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use scuc_algo::ScucConfig;
use scuc_cli::ModelArgs;
use tracing::debug;

/// Read the TOML file (if any) and apply the command-line overrides.
pub fn load(path: Option<&Path>, args: &ModelArgs) -> Result<ScucConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config '{}'", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config '{}'", path.display()))?
        }
        None => ScucConfig::default(),
    };

    let formulation = &mut config.formulation;
    if let Some(cutoff) = args.isf_cutoff {
        formulation.isf_cutoff = cutoff;
    }
    if let Some(cutoff) = args.lodf_cutoff {
        formulation.lodf_cutoff = cutoff;
    }
    if args.no_security {
        formulation.enforce_security = false;
    }
    if let Some(threads) = args.threads {
        config.parallel.threads = threads;
    }

    config.validate().context("invalid configuration")?;
    debug!(?config, "configuration loaded");
    Ok(config)
}
