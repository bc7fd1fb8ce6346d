//! Catalog diff generator.
//!
//! Decides which bundles of a catalog must be mirrored. The passes run in
//! order over an owned [`Selection`] of `(package, channel, entry)` names:
//!
//! 1. [`select`] applies the inclusion filter to the new catalog.
//! 2. [`heads`] collapses channels to their heads in heads-only mode.
//! 3. [`select::subtract_unchanged`] drops entries already mirrored identically.
//! 4. [`deps`] pulls in providers of required packages and APIs.
//! 5. [`materialize`] builds the output model and repairs default channels.

mod deps;
mod heads;
mod materialize;
mod select;

use crate::include::DiffIncluder;
use crate::model::{Model, ModelError};
use catdiff_schema::include::IncludeError;
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info};

/// Channel name suggested in default-channel errors when none is configured.
pub const DEFAULT_FALLBACK_CHANNEL: &str = "stable";

/// Errors returned by [`DiffGenerator::run`].
#[derive(Error, Debug)]
pub enum DiffError {
    /// The include configuration is malformed.
    #[error(transparent)]
    Include(#[from] IncludeError),

    /// A named package is not in the catalog.
    #[error("package {0:?} not found in catalog")]
    UnknownPackage(String),

    /// A named channel is not in its package.
    #[error("package {package:?}: channel {channel:?} not found")]
    UnknownChannel {
        /// Owning package.
        package: String,
        /// Missing channel.
        channel: String,
    },

    /// A pinned version is not in the named channel, or in no channel at all
    /// when pinned package-wide.
    #[error("package {package:?}: version {version} not found in {}", channel.as_ref().map_or("any channel".to_string(), |c| format!("channel {c:?}")))]
    UnknownVersion {
        /// Owning package.
        package: String,
        /// Channel, if the pin was channel-scoped.
        channel: Option<String>,
        /// Missing version.
        version: Version,
    },

    /// A pinned or bounding bundle is not in the package.
    #[error("package {package:?}: bundle {bundle:?} not found")]
    UnknownBundle {
        /// Owning package.
        package: String,
        /// Missing bundle.
        bundle: String,
    },

    /// A named package's filters matched no entry at all.
    #[error("package {0:?}: no bundles match the include filter; adjust the min/max version bounds")]
    NothingSelected(String),

    /// The configured default channel did not survive pruning.
    #[error("package {package:?}: default channel {channel:?} from the include config was not retained")]
    DefaultChannelNotRetained {
        /// The package.
        package: String,
        /// Configured default channel.
        channel: String,
    },

    /// Several retained channels share the highest priority.
    #[error("package {package:?}: channels {} tie for the highest priority {priority}; set defaultChannel in the include config", channels.join(", "))]
    PriorityTie {
        /// The package.
        package: String,
        /// Tied channels.
        channels: Vec<String>,
        /// Their priority.
        priority: i32,
    },

    /// The default channel was pruned and nothing decides a new one.
    #[error("package {package:?}: default channel {original:?} was pruned and none of the remaining channels ({}) has a priority; set defaultChannel (for example {fallback:?}) in the include config", channels.join(", "))]
    NoDefaultChannel {
        /// The package.
        package: String,
        /// Original default channel.
        original: String,
        /// Retained channels.
        channels: Vec<String>,
        /// Suggested channel name.
        fallback: String,
    },

    /// Dependency resolution visited more bundles than the catalog holds.
    #[error("dependency resolution exceeded {0} iterations; catalog properties are inconsistent")]
    IterationBound(usize),

    /// The output failed structural validation.
    #[error(transparent)]
    Validation(#[from] ModelError),
}

/// Selected entry names for one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ChannelSelection {
    pub(crate) entries: BTreeSet<String>,
    /// The inclusion filter narrowed this channel to specific versions.
    pub(crate) explicit: bool,
}

/// Working set of the generator: package -> channel -> entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Selection {
    pub(crate) packages: BTreeMap<String, BTreeMap<String, ChannelSelection>>,
}

impl Selection {
    /// Adds an entry, returning true if it was not selected before.
    pub(crate) fn insert(&mut self, package: &str, channel: &str, entry: &str) -> bool {
        self.packages
            .entry(package.to_string())
            .or_default()
            .entry(channel.to_string())
            .or_default()
            .entries
            .insert(entry.to_string())
    }

    pub(crate) fn channel(&self, package: &str, channel: &str) -> Option<&ChannelSelection> {
        self.packages.get(package).and_then(|p| p.get(channel))
    }

    /// Bundle names selected in any channel of `package`.
    pub(crate) fn bundles_of(&self, package: &str) -> BTreeSet<&str> {
        self.packages
            .get(package)
            .into_iter()
            .flat_map(|chs| chs.values())
            .flat_map(|ch| ch.entries.iter().map(String::as_str))
            .collect()
    }

    /// Every selected `(package, bundle)` pair.
    pub(crate) fn bundle_keys(&self) -> BTreeSet<(String, String)> {
        self.packages
            .iter()
            .flat_map(|(pkg, chs)| {
                chs.values()
                    .flat_map(move |ch| ch.entries.iter().map(move |e| (pkg.clone(), e.clone())))
            })
            .collect()
    }

    /// Unions `other` into this selection.
    pub(crate) fn merge(&mut self, other: Selection) {
        for (pkg, chs) in other.packages {
            let ours = self.packages.entry(pkg).or_default();
            for (ch, sel) in chs {
                let entry = ours.entry(ch).or_default();
                entry.entries.extend(sel.entries);
                entry.explicit |= sel.explicit;
            }
        }
    }

    /// Drops channels with no entries and packages with no channels.
    pub(crate) fn prune_empty(&mut self) {
        for chs in self.packages.values_mut() {
            chs.retain(|_, ch| !ch.entries.is_empty());
        }
        self.packages.retain(|_, chs| !chs.is_empty());
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.packages
            .values()
            .flat_map(|chs| chs.values())
            .map(|ch| ch.entries.len())
            .sum()
    }
}

/// Computes the reduced catalog to mirror.
#[derive(Debug, Clone)]
pub struct DiffGenerator {
    /// Keep only channel heads, plus dependencies and explicit inclusions.
    pub heads_only: bool,
    /// In heads-only mode, union explicitly requested entries with the heads
    /// of the whole catalog instead of only the named packages.
    pub include_additively: bool,
    /// Do not resolve `olm.package.required` and `olm.gvk.required`.
    pub skip_dependencies: bool,
    /// Packages, channels and versions to keep.
    pub includer: DiffIncluder,
    /// Channel name suggested when a default channel cannot be chosen.
    pub fallback_channel: String,
}

impl Default for DiffGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffGenerator {
    /// A generator that keeps every changed bundle and resolves dependencies.
    pub fn new() -> Self {
        Self {
            heads_only: false,
            include_additively: false,
            skip_dependencies: false,
            includer: DiffIncluder::default(),
            fallback_channel: DEFAULT_FALLBACK_CHANNEL.to_string(),
        }
    }

    /// Sets heads-only mode.
    pub fn heads_only(mut self, on: bool) -> Self {
        self.heads_only = on;
        self
    }

    /// Sets additive inclusion.
    pub fn include_additively(mut self, on: bool) -> Self {
        self.include_additively = on;
        self
    }

    /// Disables dependency resolution.
    pub fn skip_dependencies(mut self, on: bool) -> Self {
        self.skip_dependencies = on;
        self
    }

    /// Sets the inclusion filter.
    pub fn includer(mut self, includer: DiffIncluder) -> Self {
        self.includer = includer;
        self
    }

    /// Sets the channel name suggested in default-channel errors.
    pub fn fallback_channel(mut self, name: &str) -> Self {
        self.fallback_channel = name.to_string();
        self
    }

    /// Computes what must be mirrored from `new`, given that `old` was
    /// mirrored before. Pass an empty `old` to mirror from scratch.
    ///
    /// Neither input is modified.
    ///
    /// # Errors
    ///
    /// Returns a [`DiffError`] when the inclusion filter names something the
    /// catalog lacks, a default channel cannot be chosen, or the result fails
    /// validation.
    pub fn run(&self, old: &Model, new: &Model) -> Result<Model, DiffError> {
        let mut selection = select::filter(&self.includer, new)?;
        debug!(entries = selection.entry_count(), "selected by include filter");

        if self.heads_only {
            heads::reduce(&mut selection, new);
            if self.include_additively && !self.includer.is_empty() {
                let mut catalog_heads = select::filter(&DiffIncluder::default(), new)?;
                heads::reduce(&mut catalog_heads, new);
                selection.merge(catalog_heads);
            }
            debug!(entries = selection.entry_count(), "reduced to heads");
        }

        if !old.is_empty() {
            select::subtract_unchanged(&mut selection, old, new);
            debug!(entries = selection.entry_count(), "after diff against old catalog");
        }

        if !self.skip_dependencies {
            deps::close(&mut selection, old, new)?;
            debug!(entries = selection.entry_count(), "after dependency closure");
        }

        let out = materialize::build(&selection, new, &self.includer, &self.fallback_channel)?;
        info!(
            packages = out.packages.len(),
            bundles = out.bundle_count(),
            "diff complete"
        );
        Ok(out)
    }
}
