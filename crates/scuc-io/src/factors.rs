//! Precomputed sensitivity factor files.
//!
//! The file is the JSON form of [`SensitivityFactors`]: line and bus ID lists
//! plus dense ISF and LODF rows. Factors read here are checked against the
//! instance when the model is built.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use scuc_algo::SensitivityFactors;
use tracing::info;

pub fn read_factors(path: &Path) -> Result<SensitivityFactors> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading factor file '{}'", path.display()))?;
    let factors: SensitivityFactors = serde_json::from_str(&json)
        .with_context(|| format!("parsing factor file '{}'", path.display()))?;
    info!(
        path = %path.display(),
        lines = factors.isf.num_lines(),
        buses = factors.isf.num_buses(),
        "loaded sensitivity factors"
    );
    Ok(factors)
}

pub fn write_factors(factors: &SensitivityFactors, path: &Path) -> Result<()> {
    let json = serde_json::to_string(factors).context("serializing sensitivity factors")?;
    fs::write(path, json).with_context(|| format!("writing factor file '{}'", path.display()))
}
