//! Include command

use anyhow::{Context, Result};
use catdiff_core::{include_config_from_catalog, update_include_config};
use catdiff_schema::IncludeConfig;
use std::fs;
use std::path::Path;

use super::load_model;

/// Print an include config that starts every channel at its lowest version
pub fn init(path: &Path) -> Result<()> {
    let model = load_model(path)?;
    print_config(&include_config_from_catalog(&model))
}

/// Refresh a previous include config against a catalog
pub fn update(path: &Path, previous: &Path) -> Result<()> {
    let content = fs::read_to_string(previous)
        .with_context(|| format!("Failed to read {}", previous.display()))?;
    let prev: IncludeConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse include config {}", previous.display()))?;

    let model = load_model(path)?;
    let next = update_include_config(&model, &prev).context("Failed to update include config")?;
    print_config(&next)
}

fn print_config(cfg: &IncludeConfig) -> Result<()> {
    let yaml = serde_yaml::to_string(cfg).context("Failed to encode include config")?;
    print!("{yaml}");
    Ok(())
}
