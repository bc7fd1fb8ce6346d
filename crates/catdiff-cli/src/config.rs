//! Mirror configuration file.

use anyhow::{Context, Result};
use catdiff_schema::include::{IncludeConfig, IncludePackage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Per-catalog mirror settings. Command-line flags override these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorConfig {
    /// Catalog reference, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    /// Keep only channel heads plus dependencies.
    #[serde(default)]
    pub heads_only: bool,
    /// Keep heads alongside explicitly requested versions.
    #[serde(default)]
    pub additive: bool,
    /// Do not resolve bundle dependencies.
    #[serde(default)]
    pub skip_dependencies: bool,
    /// Channel suggested when a default channel cannot be chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_channel: Option<String>,
    /// Packages to keep; empty means the whole catalog.
    #[serde(default)]
    pub packages: Vec<IncludePackage>,
}

impl MirrorConfig {
    /// Load a mirror config, as TOML for `.toml` files and YAML otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read mirror config {}", path.display()))?;

        let config = if path.extension().is_some_and(|e| e == "toml") {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {} as TOML", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {} as YAML", path.display()))?
        };
        Ok(config)
    }

    /// The packages section as an include config.
    pub fn include_config(&self) -> IncludeConfig {
        IncludeConfig {
            packages: self.packages.clone(),
        }
    }
}
