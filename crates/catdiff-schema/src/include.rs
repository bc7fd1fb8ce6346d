//! User-facing include configuration.
//!
//! This is the `packages` list of a mirror configuration: which packages to
//! keep, optionally narrowed to channels and version bounds.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Errors found while validating an [`IncludeConfig`].
#[derive(thiserror::Error, Debug)]
pub enum IncludeError {
    /// A package entry has an empty name.
    #[error("package {0} requires a name")]
    UnnamedPackage(usize),

    /// A channel entry has an empty name.
    #[error("package {package}: channel {index} requires a name")]
    UnnamedChannel {
        /// Owning package.
        package: String,
        /// Position of the channel in the list.
        index: usize,
    },

    /// The same package appears twice.
    #[error("package {0} is listed more than once")]
    DuplicatePackage(String),

    /// The same channel appears twice within a package.
    #[error("package {package}: channel {channel} is listed more than once")]
    DuplicateChannel {
        /// Owning package.
        package: String,
        /// Repeated channel.
        channel: String,
    },

    /// Package-wide bounds are invalid.
    #[error("package {package}: {source}")]
    Package {
        /// Offending package.
        package: String,
        /// What is wrong with its bounds.
        #[source]
        source: BoundsError,
    },

    /// Channel bounds are invalid.
    #[error("package {package}: channel {channel}: {source}")]
    Channel {
        /// Owning package.
        package: String,
        /// Offending channel.
        channel: String,
        /// What is wrong with its bounds.
        #[source]
        source: BoundsError,
    },
}

/// Problems with a single set of version or bundle bounds.
#[derive(thiserror::Error, Debug)]
pub enum BoundsError {
    /// Two fields that cannot be combined were both set.
    #[error("{0} and {1} are mutually exclusive")]
    MutuallyExclusive(&'static str, &'static str),

    /// A version string is not valid semver.
    #[error("invalid {field} {value:?}: {source}")]
    InvalidVersion {
        /// Field name as written in the config.
        field: &'static str,
        /// The rejected text.
        value: String,
        /// Parser error.
        #[source]
        source: semver::Error,
    },

    /// `minVersion` is greater than `maxVersion`.
    #[error("minVersion {min} is greater than maxVersion {max}")]
    Inverted {
        /// Lower bound.
        min: Version,
        /// Upper bound.
        max: Version,
    },
}

/// Version pins and bounds shared by packages and channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeBundle {
    /// Exact versions to keep.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<String>,
    /// Lowest version to keep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    /// Highest version to keep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version: Option<String>,
    /// Lowest bundle to keep, by name. Use when the bundle's version is not meaningful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_bundle: Option<String>,
    /// Highest bundle to keep, by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bundle: Option<String>,
}

/// One end of a bounded selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    /// A semver version.
    Version(Version),
    /// A bundle name, resolved to its version against a catalog.
    Bundle(String),
}

/// Parsed form of an [`IncludeBundle`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bounds {
    /// Exact versions.
    pub versions: Vec<Version>,
    /// Lower bound, inclusive.
    pub min: Option<Bound>,
    /// Upper bound, inclusive.
    pub max: Option<Bound>,
}

impl Bounds {
    /// Returns true if nothing narrows the selection.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty() && self.min.is_none() && self.max.is_none()
    }
}

fn parse_version(field: &'static str, value: &str) -> Result<Version, BoundsError> {
    Version::parse(value).map_err(|source| BoundsError::InvalidVersion {
        field,
        value: value.to_string(),
        source,
    })
}

impl IncludeBundle {
    /// Returns true if no pin or bound is set.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
            && self.min_version.is_none()
            && self.max_version.is_none()
            && self.min_bundle.is_none()
            && self.max_bundle.is_none()
    }

    /// Parses pins and bounds.
    ///
    /// # Errors
    ///
    /// Returns a [`BoundsError`] for conflicting fields, unparsable versions,
    /// or a minimum above the maximum.
    pub fn bounds(&self) -> Result<Bounds, BoundsError> {
        if self.min_version.is_some() && self.min_bundle.is_some() {
            return Err(BoundsError::MutuallyExclusive("minVersion", "minBundle"));
        }
        if self.max_version.is_some() && self.max_bundle.is_some() {
            return Err(BoundsError::MutuallyExclusive("maxVersion", "maxBundle"));
        }

        let versions = self
            .versions
            .iter()
            .map(|v| parse_version("version", v))
            .collect::<Result<Vec<_>, _>>()?;
        let min_version = self
            .min_version
            .as_deref()
            .map(|v| parse_version("minVersion", v))
            .transpose()?;
        let max_version = self
            .max_version
            .as_deref()
            .map(|v| parse_version("maxVersion", v))
            .transpose()?;
        if let (Some(min), Some(max)) = (&min_version, &max_version) {
            if min > max {
                return Err(BoundsError::Inverted {
                    min: min.clone(),
                    max: max.clone(),
                });
            }
        }

        Ok(Bounds {
            versions,
            min: min_version
                .map(Bound::Version)
                .or_else(|| self.min_bundle.clone().map(Bound::Bundle)),
            max: max_version
                .map(Bound::Version)
                .or_else(|| self.max_bundle.clone().map(Bound::Bundle)),
        })
    }
}

/// A channel to keep within an [`IncludePackage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeChannel {
    /// Channel name.
    pub name: String,
    /// Pins and bounds for this channel.
    #[serde(flatten)]
    pub bundle: IncludeBundle,
}

/// A package to keep.
///
/// The whole package is kept when neither channels nor bounds are given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludePackage {
    /// Package name.
    pub name: String,
    /// Channels to keep; empty means every channel.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<IncludeChannel>,
    /// Default channel to set on the output package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,
    /// Pins and bounds applied to every channel when none are named.
    #[serde(flatten)]
    pub bundle: IncludeBundle,
}

/// The packages to keep from a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeConfig {
    /// Packages to keep; empty means the whole catalog.
    #[serde(default)]
    pub packages: Vec<IncludePackage>,
}

impl IncludeConfig {
    /// Returns true if no package is named.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Checks names and bounds.
    ///
    /// # Errors
    ///
    /// Returns the first [`IncludeError`] found, in document order.
    pub fn validate(&self) -> Result<(), IncludeError> {
        let mut seen = BTreeSet::new();
        for (idx, pkg) in self.packages.iter().enumerate() {
            if pkg.name.is_empty() {
                return Err(IncludeError::UnnamedPackage(idx));
            }
            if !seen.insert(pkg.name.as_str()) {
                return Err(IncludeError::DuplicatePackage(pkg.name.clone()));
            }
            pkg.bundle
                .bounds()
                .map_err(|source| IncludeError::Package {
                    package: pkg.name.clone(),
                    source,
                })?;

            let mut seen_channels = BTreeSet::new();
            for (ch_idx, ch) in pkg.channels.iter().enumerate() {
                if ch.name.is_empty() {
                    return Err(IncludeError::UnnamedChannel {
                        package: pkg.name.clone(),
                        index: ch_idx,
                    });
                }
                if !seen_channels.insert(ch.name.as_str()) {
                    return Err(IncludeError::DuplicateChannel {
                        package: pkg.name.clone(),
                        channel: ch.name.clone(),
                    });
                }
                ch.bundle
                    .bounds()
                    .map_err(|source| IncludeError::Channel {
                        package: pkg.name.clone(),
                        channel: ch.name.clone(),
                        source,
                    })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r"
packages:
  - name: etcd
    defaultChannel: stable
    channels:
      - name: stable
        minVersion: 0.9.2
        maxVersion: 0.9.3
  - name: foo
    minBundle: foo.v0.1.0
  - name: bar
    versions: [0.1.0, 0.2.0]
";

    #[test]
    fn test_parse_yaml() {
        let cfg: IncludeConfig = serde_yaml::from_str(YAML).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.packages.len(), 3);
        assert_eq!(cfg.packages[0].default_channel.as_deref(), Some("stable"));

        let bounds = cfg.packages[0].channels[0].bundle.bounds().unwrap();
        assert_eq!(
            bounds.min,
            Some(Bound::Version(Version::new(0, 9, 2)))
        );
        assert_eq!(
            bounds.max,
            Some(Bound::Version(Version::new(0, 9, 3)))
        );

        let foo = cfg.packages[1].bundle.bounds().unwrap();
        assert_eq!(foo.min, Some(Bound::Bundle("foo.v0.1.0".into())));
        assert_eq!(cfg.packages[2].bundle.bounds().unwrap().versions.len(), 2);
    }

    #[test]
    fn test_unnamed_package() {
        let cfg = IncludeConfig {
            packages: vec![IncludePackage::default()],
        };
        assert!(matches!(
            cfg.validate(),
            Err(IncludeError::UnnamedPackage(0))
        ));
    }

    #[test]
    fn test_unnamed_channel() {
        let cfg = IncludeConfig {
            packages: vec![IncludePackage {
                name: "foo".into(),
                channels: vec![IncludeChannel::default()],
                ..Default::default()
            }],
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.to_string(), "package foo: channel 0 requires a name");
    }

    #[test]
    fn test_min_version_and_bundle_exclusive() {
        let bundle = IncludeBundle {
            min_version: Some("0.1.0".into()),
            min_bundle: Some("foo.v0.1.0".into()),
            ..Default::default()
        };
        assert!(matches!(
            bundle.bounds(),
            Err(BoundsError::MutuallyExclusive("minVersion", "minBundle"))
        ));
    }

    #[test]
    fn test_inverted_bounds() {
        let bundle = IncludeBundle {
            min_version: Some("0.3.0".into()),
            max_version: Some("0.2.0".into()),
            ..Default::default()
        };
        assert!(matches!(bundle.bounds(), Err(BoundsError::Inverted { .. })));
    }

    #[test]
    fn test_invalid_version() {
        let cfg = IncludeConfig {
            packages: vec![IncludePackage {
                name: "foo".into(),
                bundle: IncludeBundle {
                    versions: vec!["1.0".into()],
                    ..Default::default()
                },
                ..Default::default()
            }],
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().starts_with("package foo: invalid version \"1.0\""));
    }

    #[test]
    fn test_duplicate_channel() {
        let ch = IncludeChannel {
            name: "stable".into(),
            ..Default::default()
        };
        let cfg = IncludeConfig {
            packages: vec![IncludePackage {
                name: "foo".into(),
                channels: vec![ch.clone(), ch],
                ..Default::default()
            }],
        };
        assert!(matches!(
            cfg.validate(),
            Err(IncludeError::DuplicateChannel { .. })
        ));
    }
}
