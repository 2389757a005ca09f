//! Reading and writing instance documents.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use scuc_core::{Diagnostics, Instance};
use tracing::{info, warn};

use crate::document::InstanceDocument;

/// Validated instance plus the non-fatal findings of validation.
#[derive(Debug)]
pub struct ImportResult {
    pub instance: Instance,
    pub diagnostics: Diagnostics,
}

pub fn parse_instance_str(json: &str) -> Result<ImportResult> {
    let document: InstanceDocument =
        serde_json::from_str(json).context("parsing instance document")?;
    let (instance, diagnostics) = document
        .to_builder()?
        .build_with_diagnostics()
        .context("validating instance")?;
    for issue in diagnostics.warnings() {
        warn!(entity = ?issue.entity, category = %issue.category, "{}", issue.message);
    }
    Ok(ImportResult {
        instance,
        diagnostics,
    })
}

pub fn read_instance(path: &Path) -> Result<ImportResult> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading instance file '{}'", path.display()))?;
    let result = parse_instance_str(&json)
        .with_context(|| format!("loading instance '{}'", path.display()))?;
    let stats = result.instance.stats();
    info!(
        path = %path.display(),
        periods = stats.periods,
        buses = stats.buses,
        generators = stats.generators,
        lines = stats.lines,
        contingencies = stats.contingencies,
        "loaded instance"
    );
    Ok(result)
}

pub fn instance_to_string(instance: &Instance) -> Result<String> {
    serde_json::to_string_pretty(&InstanceDocument::from_instance(instance))
        .context("serializing instance document")
}

pub fn write_instance(instance: &Instance, path: &Path) -> Result<()> {
    let json = instance_to_string(instance)?;
    fs::write(path, json).with_context(|| format!("writing instance file '{}'", path.display()))
}
