//! Inclusion filter applied by the diff generator.
//!
//! Built from the user's [`IncludeConfig`]: version bounds become a
//! [`VersionRange`], bundle-name bounds are kept by name and resolved against
//! the catalog when entries are selected.

use crate::model::{Channel, Package};
use catdiff_schema::include::{Bound, Bounds, IncludeConfig, IncludeError};
use catdiff_schema::range::{self, VersionRange};
use semver::Version;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Narrows a channel's entries.
///
/// Explicit versions and bundle names are unioned with whatever the range
/// and bundle bounds admit. An empty filter admits every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Exact versions to keep.
    pub versions: Vec<Version>,
    /// Exact bundle names to keep.
    pub bundles: Vec<String>,
    /// Versions to keep.
    pub range: Option<VersionRange>,
    /// Lowest bundle to keep, by name.
    pub min_bundle: Option<String>,
    /// Highest bundle to keep, by name.
    pub max_bundle: Option<String>,
}

/// Entries admitted by an [`EntryFilter`], with the pins that matched.
#[derive(Debug, Clone, Default)]
pub struct FilterMatch {
    /// Admitted entry names.
    pub entries: BTreeSet<String>,
    /// Pinned versions that matched an entry.
    pub versions: BTreeSet<Version>,
    /// Pinned bundle names that matched an entry.
    pub bundles: BTreeSet<String>,
}

/// Why a filter could not be applied to a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBound(pub String);

impl EntryFilter {
    /// Converts parsed include bounds.
    pub fn from_bounds(bounds: Bounds) -> Self {
        let mut filter = Self {
            versions: bounds.versions,
            ..Self::default()
        };
        let min = match bounds.min {
            Some(Bound::Version(v)) => Some(v),
            Some(Bound::Bundle(b)) => {
                filter.min_bundle = Some(b);
                None
            }
            None => None,
        };
        let max = match bounds.max {
            Some(Bound::Version(v)) => Some(v),
            Some(Bound::Bundle(b)) => {
                filter.max_bundle = Some(b);
                None
            }
            None => None,
        };
        filter.range = VersionRange::between(min.as_ref(), max.as_ref());
        filter
    }

    /// Returns true if the filter admits everything.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
            && self.bundles.is_empty()
            && self.range.is_none()
            && self.min_bundle.is_none()
            && self.max_bundle.is_none()
    }

    fn is_bounded(&self) -> bool {
        self.range.is_some() || self.min_bundle.is_some() || self.max_bundle.is_some()
    }

    /// Applies the filter to one channel of `pkg`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownBound`] naming a `minBundle`/`maxBundle` that is not
    /// in the package.
    pub fn apply(&self, pkg: &Package, channel: &Channel) -> Result<FilterMatch, UnknownBound> {
        let resolve = |name: &Option<String>| -> Result<Option<Version>, UnknownBound> {
            name.as_ref()
                .map(|n| {
                    pkg.bundle(n)
                        .map(|b| b.version.clone())
                        .ok_or_else(|| UnknownBound(n.clone()))
                })
                .transpose()
        };
        let min = resolve(&self.min_bundle)?;
        let max = resolve(&self.max_bundle)?;

        let mut out = FilterMatch::default();
        for name in channel.entries.keys() {
            let Some(bundle) = pkg.bundle(name) else {
                continue;
            };
            let v = &bundle.version;
            if self.is_empty() {
                out.entries.insert(name.clone());
                continue;
            }

            let mut keep = false;
            if self.versions.contains(v) {
                out.versions.insert(v.clone());
                keep = true;
            }
            if self.bundles.contains(name) {
                out.bundles.insert(name.clone());
                keep = true;
            }
            if self.is_bounded()
                && self.range.as_ref().is_none_or(|r| r.matches(v))
                && min
                    .as_ref()
                    .is_none_or(|m| range::compare(v, m) != Ordering::Less)
                && max
                    .as_ref()
                    .is_none_or(|m| range::compare(v, m) != Ordering::Greater)
            {
                keep = true;
            }
            if keep {
                out.entries.insert(name.clone());
            }
        }
        Ok(out)
    }
}

/// A channel named by the inclusion filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffIncludeChannel {
    /// Channel name.
    pub name: String,
    /// Entry filter for this channel.
    pub filter: EntryFilter,
}

/// A package named by the inclusion filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffIncludePackage {
    /// Package name.
    pub name: String,
    /// Named channels; empty means every channel.
    pub channels: Vec<DiffIncludeChannel>,
    /// Filter for channels that carry none of their own.
    pub all_channels: EntryFilter,
    /// Default channel to force on the output package.
    pub default_channel: Option<String>,
}

/// The full inclusion filter. Empty means the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffIncluder {
    /// Named packages.
    pub packages: Vec<DiffIncludePackage>,
}

impl DiffIncluder {
    /// Validates and converts a user include configuration.
    ///
    /// # Errors
    ///
    /// Returns an [`IncludeError`] for unnamed or duplicate packages and
    /// channels, or malformed bounds.
    pub fn from_config(cfg: &IncludeConfig) -> Result<Self, IncludeError> {
        cfg.validate()?;
        let mut packages = Vec::with_capacity(cfg.packages.len());
        for pkg in &cfg.packages {
            let all_channels = pkg
                .bundle
                .bounds()
                .map_err(|source| IncludeError::Package {
                    package: pkg.name.clone(),
                    source,
                })?;
            let mut channels = Vec::with_capacity(pkg.channels.len());
            for ch in &pkg.channels {
                let bounds = ch.bundle.bounds().map_err(|source| IncludeError::Channel {
                    package: pkg.name.clone(),
                    channel: ch.name.clone(),
                    source,
                })?;
                channels.push(DiffIncludeChannel {
                    name: ch.name.clone(),
                    filter: EntryFilter::from_bounds(bounds),
                });
            }
            packages.push(DiffIncludePackage {
                name: pkg.name.clone(),
                channels,
                all_channels: EntryFilter::from_bounds(all_channels),
                default_channel: pkg.default_channel.clone(),
            });
        }
        Ok(Self { packages })
    }

    /// Returns true if no package is named.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Looks up a named package.
    pub fn package(&self, name: &str) -> Option<&DiffIncludePackage> {
        self.packages.iter().find(|p| p.name == name)
    }
}
