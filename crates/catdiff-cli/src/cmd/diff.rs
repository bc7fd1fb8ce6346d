//! Diff command

use anyhow::{Context, Result};
use catdiff_core::{DEFAULT_FALLBACK_CHANNEL, DiffError, DiffGenerator, DiffIncluder, Model};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::info;

use super::{load_merged, load_model};
use crate::config::MirrorConfig;

/// Name of the catalog document written into the output directory.
pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    pub new: Vec<PathBuf>,
    pub old: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub heads_only: bool,
    pub additive: bool,
    pub skip_deps: bool,
    pub fallback_channel: Option<String>,
    pub output: Option<PathBuf>,
}

/// Compute what to mirror from `--new` and write it as a catalog document
pub fn diff(opts: &DiffOptions) -> Result<()> {
    let mirror = match &opts.config {
        Some(path) => MirrorConfig::load(path)?,
        None => MirrorConfig::default(),
    };
    let includer =
        DiffIncluder::from_config(&mirror.include_config()).context("Invalid include config")?;

    let new = load_merged(&opts.new)?;
    let old = match &opts.old {
        Some(path) => load_model(path)?,
        None => Model::default(),
    };

    let fallback = opts
        .fallback_channel
        .as_deref()
        .or(mirror.fallback_channel.as_deref())
        .unwrap_or(DEFAULT_FALLBACK_CHANNEL);
    let generator = DiffGenerator::new()
        .heads_only(opts.heads_only || mirror.heads_only)
        .include_additively(opts.additive || mirror.additive)
        .skip_dependencies(opts.skip_deps || mirror.skip_dependencies)
        .includer(includer)
        .fallback_channel(fallback);

    let out = generator.run(&old, &new).map_err(|e| match e {
        err @ DiffError::Validation(_) => anyhow::Error::new(err).context(
            "The pruned catalog is not a valid upgrade graph; \
             adjust the minVersion/maxVersion bounds in the mirror config",
        ),
        other => anyhow::Error::new(other).context("Failed to compute catalog diff"),
    })?;

    let doc = out.to_declcfg();
    match &opts.output {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let path = dir.join(INDEX_FILE);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            doc.write_json(BufWriter::new(file))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), packages = doc.packages.len(), bundles = doc.bundles.len(), "catalog written");
        }
        None => doc
            .write_json(io::stdout().lock())
            .context("Failed to write catalog to stdout")?,
    }
    Ok(())
}
