pub mod diff;
pub mod images;
pub mod include;
pub mod validate;

use anyhow::{Context, Result};
use catdiff_core::Model;
use catdiff_schema::DeclarativeConfig;
use std::path::{Path, PathBuf};

/// Load a catalog file or directory into a model.
pub(crate) fn load_model(path: &Path) -> Result<Model> {
    let cfg = DeclarativeConfig::load_path(path)
        .with_context(|| format!("Failed to load catalog {}", path.display()))?;
    Model::from_declcfg(&cfg).with_context(|| format!("Invalid catalog {}", path.display()))
}

/// Load several catalogs, later ones replacing packages, channels and
/// bundles of the same name.
pub(crate) fn load_merged(paths: &[PathBuf]) -> Result<Model> {
    if let [path] = paths {
        return load_model(path);
    }
    let configs = paths
        .iter()
        .map(|path| {
            DeclarativeConfig::load_path(path)
                .with_context(|| format!("Failed to load catalog {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    let merged = DeclarativeConfig::merge_prefer_last(configs);
    Model::from_declcfg(&merged).context("Invalid merged catalog")
}
