//! Validate command

use anyhow::{Context, Result};
use std::path::Path;

use super::load_model;

/// Check that a catalog converts and forms a valid upgrade graph
pub fn validate(path: &Path) -> Result<()> {
    let model = load_model(path)?;
    model
        .validate()
        .with_context(|| format!("Catalog {} failed validation", path.display()))?;

    let channels: usize = model.packages.values().map(|p| p.channels.len()).sum();
    println!(
        "{} is valid: {} packages, {} channels, {} bundles",
        path.display(),
        model.packages.len(),
        channels,
        model.bundle_count()
    );
    Ok(())
}
