use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use scuc_io::InstanceDocument;

/// Print every finding for the document; errors make the command fail.
pub fn handle(path: &Path) -> Result<()> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading instance file '{}'", path.display()))?;
    let document: InstanceDocument =
        serde_json::from_str(&json).context("parsing instance document")?;
    let builder = document
        .to_builder()
        .with_context(|| format!("loading instance '{}'", path.display()))?;
    let diagnostics = builder.validate();

    print!("{}", diagnostics);
    if diagnostics.has_errors() {
        anyhow::bail!(
            "instance '{}' is invalid ({})",
            path.display(),
            diagnostics.summary()
        );
    }
    Ok(())
}
