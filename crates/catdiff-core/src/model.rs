//! In-memory catalog model.
//!
//! Packages own their channels and bundles, each keyed by name, so lookups
//! during selection never chase references into the caller's document.
//! Conversion from a [`DeclarativeConfig`] checks the same invariants the
//! operator tooling does; [`Model::validate`] checks the upgrade graph.

use catdiff_schema::declcfg::{self, DeclarativeConfig, Icon, RelatedImage};
use catdiff_schema::property::{
    Gvk, Properties, Property, PropertyError, compare_properties,
};
use catdiff_schema::range::{RangeError, VersionRange};
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors raised while building or validating a [`Model`].
#[derive(Error, Debug)]
pub enum ModelError {
    /// A package blob has an empty name.
    #[error("config contains package with no name")]
    UnnamedPackage,

    /// Two package blobs share a name.
    #[error("duplicate package {0:?}")]
    DuplicatePackage(String),

    /// A channel names a package that was never declared.
    #[error("unknown package {package:?} for channel {channel:?}")]
    UnknownChannelPackage {
        /// Package named by the channel.
        package: String,
        /// The channel.
        channel: String,
    },

    /// A channel blob has an empty name.
    #[error("package {0:?} contains channel with no name")]
    UnnamedChannel(String),

    /// Two channel blobs share a name within a package.
    #[error("package {package:?} has duplicate channel {channel:?}")]
    DuplicateChannel {
        /// Owning package.
        package: String,
        /// Repeated channel.
        channel: String,
    },

    /// A channel lists the same bundle twice.
    #[error("invalid package {package:?}, channel {channel:?}: duplicate entry {entry:?}")]
    DuplicateEntry {
        /// Owning package.
        package: String,
        /// The channel.
        channel: String,
        /// Repeated bundle name.
        entry: String,
    },

    /// A bundle blob has no package.
    #[error("package name must be set for bundle {0:?}")]
    BundleWithoutPackage(String),

    /// A bundle names a package that was never declared.
    #[error("unknown package {package:?} for bundle {bundle:?}")]
    UnknownBundlePackage {
        /// Package named by the bundle.
        package: String,
        /// The bundle.
        bundle: String,
    },

    /// Two bundle blobs share a name within a package.
    #[error("package {package:?} has duplicate bundle {bundle:?}")]
    DuplicateBundle {
        /// Owning package.
        package: String,
        /// Repeated bundle.
        bundle: String,
    },

    /// A bundle property has the wrong shape.
    #[error("parse properties for bundle {bundle:?}: {source}")]
    Properties {
        /// The bundle.
        bundle: String,
        /// Decoding error.
        #[source]
        source: PropertyError,
    },

    /// A bundle does not carry exactly one `olm.package` property.
    #[error("package {package:?} bundle {bundle:?} must have exactly 1 \"olm.package\" property, found {found}")]
    PackageProperty {
        /// Owning package.
        package: String,
        /// The bundle.
        bundle: String,
        /// How many were found.
        found: usize,
    },

    /// The `olm.package` property names a different package.
    #[error("package {package:?} does not match \"olm.package\" property {found:?}")]
    PackageMismatch {
        /// Owning package.
        package: String,
        /// Package named by the property.
        found: String,
    },

    /// The bundle version is not semver.
    #[error("error parsing bundle {bundle:?} version {version:?}: {source}")]
    Version {
        /// The bundle.
        bundle: String,
        /// Rejected version text.
        version: String,
        /// Parser error.
        #[source]
        source: semver::Error,
    },

    /// An `olm.package.required` range does not parse.
    #[error("bundle {bundle:?}: invalid versionRange for required package {required:?}: {source}")]
    RequiredRange {
        /// The bundle.
        bundle: String,
        /// Required package.
        required: String,
        /// Parser error.
        #[source]
        source: RangeError,
    },

    /// A bundle is not listed by any channel.
    #[error("package {package:?}, bundle {bundle:?} not found in any channel entries")]
    OrphanBundle {
        /// Owning package.
        package: String,
        /// The bundle.
        bundle: String,
    },

    /// Channel entries reference bundles that have no blob.
    #[error("no olm.bundle blobs found in package {package:?} for olm.channel entries {missing:?}")]
    MissingBundles {
        /// Owning package.
        package: String,
        /// Entry names without a bundle.
        missing: Vec<String>,
    },

    /// A package has no channels.
    #[error("invalid package {0:?}: package must contain at least one channel")]
    NoChannels(String),

    /// A package has no default channel.
    #[error("invalid package {0:?}: default channel must be set")]
    NoDefaultChannel(String),

    /// A package's default channel does not exist.
    #[error("invalid package {package:?}: default channel {channel:?} not found in channels list")]
    UnknownDefaultChannel {
        /// The package.
        package: String,
        /// Missing channel.
        channel: String,
    },

    /// A channel has no entries.
    #[error("invalid channel {channel:?} in package {package:?}: channel must contain at least one bundle")]
    EmptyChannel {
        /// Owning package.
        package: String,
        /// The channel.
        channel: String,
    },

    /// More than one entry is never replaced or skipped.
    #[error("invalid channel {channel:?} in package {package:?}: multiple channel heads found in graph: {}", heads.join(", "))]
    MultipleHeads {
        /// Owning package.
        package: String,
        /// The channel.
        channel: String,
        /// The competing heads.
        heads: Vec<String>,
    },

    /// Every entry is replaced or skipped by another.
    #[error("invalid channel {channel:?} in package {package:?}: no channel head found in graph")]
    NoHead {
        /// Owning package.
        package: String,
        /// The channel.
        channel: String,
    },

    /// Following `replaces` returns to an entry already visited.
    #[error("invalid channel {channel:?} in package {package:?}: detected cycle in replaces chain of upgrade graph: {}", chain.join(" -> "))]
    ReplacesCycle {
        /// Owning package.
        package: String,
        /// The channel.
        channel: String,
        /// The cycle, starting and ending at the same entry.
        chain: Vec<String>,
    },
}

/// A package requirement of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredPackage {
    /// Required package name.
    pub package: String,
    /// Versions that satisfy the requirement.
    pub range: VersionRange,
}

/// A mirrorable operator version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Bundle name.
    pub name: String,
    /// Owning package.
    pub package: String,
    /// Bundle image reference.
    pub image: String,
    /// Version from the `olm.package` property.
    pub version: Version,
    /// All properties, in canonical order.
    pub properties: Vec<Property>,
    /// Operand and auxiliary images.
    pub related_images: Vec<RelatedImage>,
    /// APIs this bundle provides.
    pub provided_gvks: Vec<Gvk>,
    /// APIs this bundle requires.
    pub required_gvks: Vec<Gvk>,
    /// Packages this bundle requires.
    pub required_packages: Vec<RequiredPackage>,
}

impl Bundle {
    /// Returns true if `other` would be mirrored identically.
    pub fn same_content(&self, other: &Bundle) -> bool {
        if self.name != other.name
            || self.image != other.image
            || self.properties != other.properties
        {
            return false;
        }
        let mut mine = self.related_images.clone();
        let mut theirs = other.related_images.clone();
        mine.sort();
        theirs.sort();
        mine == theirs
    }

    /// Returns true if this bundle provides `gvk`.
    pub fn provides(&self, gvk: &Gvk) -> bool {
        self.provided_gvks.contains(gvk)
    }
}

/// A bundle's position in one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Bundle name.
    pub name: String,
    /// Immediate upgrade predecessor.
    pub replaces: Option<String>,
    /// Predecessors this entry may upgrade from directly.
    pub skips: Vec<String>,
    /// Range of predecessor versions this entry may upgrade from directly.
    pub skip_range: Option<String>,
}

/// A named update track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    /// Channel name.
    pub name: String,
    /// Channel properties.
    pub properties: Vec<Property>,
    /// Entries keyed by bundle name.
    pub entries: BTreeMap<String, Entry>,
}

impl Channel {
    /// The `olm.channel.priority` value, if any.
    pub fn priority(&self) -> Option<i32> {
        Properties::parse(&self.properties)
            .ok()
            .and_then(|props| props.channel_priorities.iter().map(|p| p.priority).max())
    }

    /// Entries not named as the `replaces` target of any other entry.
    ///
    /// A channel made of disconnected chains has several heads.
    pub fn heads(&self) -> BTreeSet<&str> {
        let replaced: BTreeSet<&str> = self
            .entries
            .values()
            .filter_map(|e| e.replaces.as_deref())
            .collect();
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|name| !replaced.contains(name))
            .collect()
    }

    /// The single entry no other entry replaces or skips.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NoHead`] or [`ModelError::MultipleHeads`].
    pub fn head(&self, package: &str) -> Result<&Entry, ModelError> {
        let incoming: BTreeSet<&str> = self
            .entries
            .values()
            .flat_map(|e| e.replaces.iter().chain(e.skips.iter()))
            .map(String::as_str)
            .collect();
        let heads: Vec<&Entry> = self
            .entries
            .values()
            .filter(|e| !incoming.contains(e.name.as_str()))
            .collect();
        match heads.as_slice() {
            [head] => Ok(head),
            [] => Err(ModelError::NoHead {
                package: package.to_string(),
                channel: self.name.clone(),
            }),
            _ => Err(ModelError::MultipleHeads {
                package: package.to_string(),
                channel: self.name.clone(),
                heads: heads.iter().map(|e| e.name.clone()).collect(),
            }),
        }
    }

    /// Entries whose `replaces` is `name`.
    pub fn successors<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries
            .values()
            .filter(move |e| e.replaces.as_deref() == Some(name))
    }

    fn check_replaces_cycle(&self, package: &str) -> Result<(), ModelError> {
        for start in self.entries.keys() {
            let mut chain = vec![start.clone()];
            let mut seen = BTreeSet::from([start.as_str()]);
            let mut current = start.as_str();
            while let Some(next) = self
                .entries
                .get(current)
                .and_then(|e| e.replaces.as_deref())
            {
                if !self.entries.contains_key(next) {
                    break;
                }
                chain.push(next.to_string());
                if !seen.insert(next) {
                    let from = chain.iter().position(|n| n == next).unwrap_or(0);
                    return Err(ModelError::ReplacesCycle {
                        package: package.to_string(),
                        channel: self.name.clone(),
                        chain: chain[from..].to_vec(),
                    });
                }
                current = next;
            }
        }
        Ok(())
    }
}

/// A named operator product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    /// Package name.
    pub name: String,
    /// Channel used when a subscription names none.
    pub default_channel: String,
    /// Free-form description.
    pub description: String,
    /// Optional icon.
    pub icon: Option<Icon>,
    /// Channels keyed by name.
    pub channels: BTreeMap<String, Channel>,
    /// Bundles keyed by name.
    pub bundles: BTreeMap<String, Bundle>,
}

impl Package {
    /// Looks up a bundle by name.
    pub fn bundle(&self, name: &str) -> Option<&Bundle> {
        self.bundles.get(name)
    }

    /// Channels listing `bundle`, in name order.
    pub fn channels_with(&self, bundle: &str) -> impl Iterator<Item = &Channel> {
        self.channels
            .values()
            .filter(move |ch| ch.entries.contains_key(bundle))
    }
}

/// A whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    /// Packages keyed by name.
    pub packages: BTreeMap<String, Package>,
}

impl Model {
    /// Returns true if the model has no packages.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Total number of bundles across all packages.
    pub fn bundle_count(&self) -> usize {
        self.packages.values().map(|p| p.bundles.len()).sum()
    }

    /// Looks up a bundle by package and name.
    pub fn bundle(&self, package: &str, name: &str) -> Option<&Bundle> {
        self.packages.get(package).and_then(|p| p.bundle(name))
    }

    /// Builds a model from a catalog document without validating the
    /// upgrade graph.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] for unnamed, duplicate or dangling objects and
    /// for malformed bundle properties.
    pub fn from_declcfg(cfg: &DeclarativeConfig) -> Result<Self, ModelError> {
        let mut packages: BTreeMap<String, Package> = BTreeMap::new();
        for p in &cfg.packages {
            if p.name.is_empty() {
                return Err(ModelError::UnnamedPackage);
            }
            if packages.contains_key(&p.name) {
                return Err(ModelError::DuplicatePackage(p.name.clone()));
            }
            packages.insert(
                p.name.clone(),
                Package {
                    name: p.name.clone(),
                    default_channel: p.default_channel.clone(),
                    description: p.description.clone(),
                    icon: p.icon.clone(),
                    ..Default::default()
                },
            );
        }

        for c in &cfg.channels {
            let Some(pkg) = packages.get_mut(&c.package) else {
                return Err(ModelError::UnknownChannelPackage {
                    package: c.package.clone(),
                    channel: c.name.clone(),
                });
            };
            if c.name.is_empty() {
                return Err(ModelError::UnnamedChannel(c.package.clone()));
            }
            if pkg.channels.contains_key(&c.name) {
                return Err(ModelError::DuplicateChannel {
                    package: c.package.clone(),
                    channel: c.name.clone(),
                });
            }

            let mut entries = BTreeMap::new();
            for e in &c.entries {
                if entries.contains_key(&e.name) {
                    return Err(ModelError::DuplicateEntry {
                        package: c.package.clone(),
                        channel: c.name.clone(),
                        entry: e.name.clone(),
                    });
                }
                entries.insert(
                    e.name.clone(),
                    Entry {
                        name: e.name.clone(),
                        replaces: non_empty(&e.replaces),
                        skips: e.skips.clone(),
                        skip_range: non_empty(&e.skip_range),
                    },
                );
            }
            let mut properties = c.properties.clone();
            properties.sort_by(compare_properties);
            pkg.channels.insert(
                c.name.clone(),
                Channel {
                    name: c.name.clone(),
                    properties,
                    entries,
                },
            );
        }

        for b in &cfg.bundles {
            if b.package.is_empty() {
                return Err(ModelError::BundleWithoutPackage(b.name.clone()));
            }
            let Some(pkg) = packages.get_mut(&b.package) else {
                return Err(ModelError::UnknownBundlePackage {
                    package: b.package.clone(),
                    bundle: b.name.clone(),
                });
            };
            if pkg.bundles.contains_key(&b.name) {
                return Err(ModelError::DuplicateBundle {
                    package: b.package.clone(),
                    bundle: b.name.clone(),
                });
            }
            if pkg.channels_with(&b.name).next().is_none() {
                return Err(ModelError::OrphanBundle {
                    package: b.package.clone(),
                    bundle: b.name.clone(),
                });
            }
            let bundle = convert_bundle(b)?;
            pkg.bundles.insert(b.name.clone(), bundle);
        }

        for pkg in packages.values() {
            let missing: BTreeSet<&String> = pkg
                .channels
                .values()
                .flat_map(|ch| ch.entries.keys())
                .filter(|name| !pkg.bundles.contains_key(*name))
                .collect();
            if !missing.is_empty() {
                return Err(ModelError::MissingBundles {
                    package: pkg.name.clone(),
                    missing: missing.into_iter().cloned().collect(),
                });
            }
        }

        Ok(Self { packages })
    }

    /// Converts back to a catalog document, sorted by name throughout.
    pub fn to_declcfg(&self) -> DeclarativeConfig {
        let mut cfg = DeclarativeConfig::default();
        for pkg in self.packages.values() {
            cfg.packages.push(declcfg::Package {
                schema: declcfg::SCHEMA_PACKAGE.to_string(),
                name: pkg.name.clone(),
                default_channel: pkg.default_channel.clone(),
                description: pkg.description.clone(),
                icon: pkg.icon.clone(),
            });
            for ch in pkg.channels.values() {
                cfg.channels.push(declcfg::Channel {
                    schema: declcfg::SCHEMA_CHANNEL.to_string(),
                    package: pkg.name.clone(),
                    name: ch.name.clone(),
                    entries: ch
                        .entries
                        .values()
                        .map(|e| declcfg::ChannelEntry {
                            name: e.name.clone(),
                            replaces: e.replaces.clone().unwrap_or_default(),
                            skips: e.skips.clone(),
                            skip_range: e.skip_range.clone().unwrap_or_default(),
                        })
                        .collect(),
                    properties: ch.properties.clone(),
                });
            }
            for b in pkg.bundles.values() {
                cfg.bundles.push(declcfg::Bundle {
                    schema: declcfg::SCHEMA_BUNDLE.to_string(),
                    package: pkg.name.clone(),
                    name: b.name.clone(),
                    image: b.image.clone(),
                    properties: b.properties.clone(),
                    related_images: b.related_images.clone(),
                });
            }
        }
        cfg
    }

    /// Checks every package and channel: a default channel that exists,
    /// non-empty channels whose entries all have bundles, exactly one head,
    /// and no cycle along `replaces`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ModelError`] found, in name order.
    pub fn validate(&self) -> Result<(), ModelError> {
        for pkg in self.packages.values() {
            if pkg.channels.is_empty() {
                return Err(ModelError::NoChannels(pkg.name.clone()));
            }
            if pkg.default_channel.is_empty() {
                return Err(ModelError::NoDefaultChannel(pkg.name.clone()));
            }
            if !pkg.channels.contains_key(&pkg.default_channel) {
                return Err(ModelError::UnknownDefaultChannel {
                    package: pkg.name.clone(),
                    channel: pkg.default_channel.clone(),
                });
            }
            for ch in pkg.channels.values() {
                if ch.entries.is_empty() {
                    return Err(ModelError::EmptyChannel {
                        package: pkg.name.clone(),
                        channel: ch.name.clone(),
                    });
                }
                let missing: Vec<String> = ch
                    .entries
                    .keys()
                    .filter(|name| !pkg.bundles.contains_key(*name))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    return Err(ModelError::MissingBundles {
                        package: pkg.name.clone(),
                        missing,
                    });
                }
                ch.check_replaces_cycle(&pkg.name)?;
                ch.head(&pkg.name)?;
            }
            if let Some(orphan) = pkg
                .bundles
                .keys()
                .find(|name| pkg.channels_with(name).next().is_none())
            {
                return Err(ModelError::OrphanBundle {
                    package: pkg.name.clone(),
                    bundle: orphan.clone(),
                });
            }
        }
        Ok(())
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn convert_bundle(b: &declcfg::Bundle) -> Result<Bundle, ModelError> {
    let props = Properties::parse(&b.properties).map_err(|source| ModelError::Properties {
        bundle: b.name.clone(),
        source,
    })?;

    let [pkg_prop] = props.packages.as_slice() else {
        return Err(ModelError::PackageProperty {
            package: b.package.clone(),
            bundle: b.name.clone(),
            found: props.packages.len(),
        });
    };
    if pkg_prop.package_name != b.package {
        return Err(ModelError::PackageMismatch {
            package: b.package.clone(),
            found: pkg_prop.package_name.clone(),
        });
    }
    let version = Version::parse(&pkg_prop.version).map_err(|source| ModelError::Version {
        bundle: b.name.clone(),
        version: pkg_prop.version.clone(),
        source,
    })?;

    let required_packages = props
        .packages_required
        .iter()
        .map(|req| {
            VersionRange::parse(&req.version_range)
                .map(|range| RequiredPackage {
                    package: req.package_name.clone(),
                    range,
                })
                .map_err(|source| ModelError::RequiredRange {
                    bundle: b.name.clone(),
                    required: req.package_name.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut properties = b.properties.clone();
    properties.sort_by(compare_properties);

    Ok(Bundle {
        name: b.name.clone(),
        package: b.package.clone(),
        image: b.image.clone(),
        version,
        properties,
        related_images: b.related_images.clone(),
        provided_gvks: props.gvks,
        required_gvks: props.gvks_required,
        required_packages,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use catdiff_schema::declcfg::{Bundle as DcBundle, Channel as DcChannel, ChannelEntry};

    pub(crate) fn dc_package(name: &str, default_channel: &str) -> declcfg::Package {
        declcfg::Package {
            schema: declcfg::SCHEMA_PACKAGE.into(),
            name: name.into(),
            default_channel: default_channel.into(),
            description: String::new(),
            icon: None,
        }
    }

    pub(crate) fn dc_entry(name: &str, replaces: &str, skips: &[&str]) -> ChannelEntry {
        ChannelEntry {
            name: name.into(),
            replaces: replaces.into(),
            skips: skips.iter().map(ToString::to_string).collect(),
            skip_range: String::new(),
        }
    }

    pub(crate) fn dc_channel(package: &str, name: &str, entries: Vec<ChannelEntry>) -> DcChannel {
        DcChannel {
            schema: declcfg::SCHEMA_CHANNEL.into(),
            package: package.into(),
            name: name.into(),
            entries,
            properties: vec![],
        }
    }

    pub(crate) fn dc_bundle(package: &str, version: &str, extra: Vec<Property>) -> DcBundle {
        let mut properties = vec![Property::package(package, version)];
        properties.extend(extra);
        DcBundle {
            schema: declcfg::SCHEMA_BUNDLE.into(),
            package: package.into(),
            name: format!("{package}.v{version}"),
            image: format!("reg/{package}-bundle:v{version}"),
            properties,
            related_images: vec![],
        }
    }

    fn simple_catalog() -> DeclarativeConfig {
        DeclarativeConfig {
            packages: vec![dc_package("foo", "stable")],
            channels: vec![dc_channel(
                "foo",
                "stable",
                vec![
                    dc_entry("foo.v0.1.0", "", &[]),
                    dc_entry("foo.v0.2.0", "foo.v0.1.0", &[]),
                ],
            )],
            bundles: vec![
                dc_bundle("foo", "0.1.0", vec![]),
                dc_bundle(
                    "foo",
                    "0.2.0",
                    vec![Property::package_required("etcd", ">=0.9.0")],
                ),
            ],
            others: vec![],
        }
    }

    #[test]
    fn test_convert_and_back() {
        let cfg = simple_catalog();
        let model = Model::from_declcfg(&cfg).unwrap();
        model.validate().unwrap();

        let foo = &model.packages["foo"];
        let b = foo.bundle("foo.v0.2.0").unwrap();
        assert_eq!(b.version, Version::new(0, 2, 0));
        assert_eq!(b.required_packages[0].package, "etcd");
        assert_eq!(model.bundle_count(), 2);

        let back = model.to_declcfg();
        assert_eq!(back.channels[0].entries, cfg.channels[0].entries);
        assert_eq!(back.bundles.len(), 2);
    }

    #[test]
    fn test_duplicate_package() {
        let mut cfg = simple_catalog();
        cfg.packages.push(dc_package("foo", "stable"));
        let err = Model::from_declcfg(&cfg).unwrap_err();
        assert_eq!(err.to_string(), "duplicate package \"foo\"");
    }

    #[test]
    fn test_unknown_channel_package() {
        let mut cfg = simple_catalog();
        cfg.channels[0].package = "bar".into();
        assert!(matches!(
            Model::from_declcfg(&cfg),
            Err(ModelError::UnknownChannelPackage { .. })
        ));
    }

    #[test]
    fn test_duplicate_entry() {
        let mut cfg = simple_catalog();
        cfg.channels[0]
            .entries
            .push(dc_entry("foo.v0.1.0", "", &[]));
        assert!(matches!(
            Model::from_declcfg(&cfg),
            Err(ModelError::DuplicateEntry { .. })
        ));
    }

    #[test]
    fn test_bundle_needs_one_package_property() {
        let mut cfg = simple_catalog();
        cfg.bundles[0]
            .properties
            .push(Property::package("foo", "0.1.1"));
        let err = Model::from_declcfg(&cfg).unwrap_err();
        assert!(err.to_string().contains("must have exactly 1"));
    }

    #[test]
    fn test_package_mismatch() {
        let mut cfg = simple_catalog();
        cfg.bundles[0].properties = vec![Property::package("bar", "0.1.0")];
        assert!(matches!(
            Model::from_declcfg(&cfg),
            Err(ModelError::PackageMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_version() {
        let mut cfg = simple_catalog();
        cfg.bundles[0].properties = vec![Property::package("foo", "0.1")];
        assert!(matches!(
            Model::from_declcfg(&cfg),
            Err(ModelError::Version { .. })
        ));
    }

    #[test]
    fn test_bad_required_range() {
        let mut cfg = simple_catalog();
        cfg.bundles[1].properties = vec![
            Property::package("foo", "0.2.0"),
            Property::package_required("etcd", ">=zero"),
        ];
        assert!(matches!(
            Model::from_declcfg(&cfg),
            Err(ModelError::RequiredRange { .. })
        ));
    }

    #[test]
    fn test_orphan_bundle() {
        let mut cfg = simple_catalog();
        cfg.bundles.push(dc_bundle("foo", "0.3.0", vec![]));
        assert!(matches!(
            Model::from_declcfg(&cfg),
            Err(ModelError::OrphanBundle { .. })
        ));
    }

    #[test]
    fn test_entry_without_bundle() {
        let mut cfg = simple_catalog();
        cfg.bundles.pop();
        let err = Model::from_declcfg(&cfg).unwrap_err();
        assert!(err.to_string().contains("foo.v0.2.0"));
    }

    #[test]
    fn test_heads_replaces_only() {
        let mut cfg = simple_catalog();
        cfg.channels[0].entries = vec![
            dc_entry("foo.v0.1.0", "", &[]),
            dc_entry("foo.v0.2.0", "", &["foo.v0.1.0"]),
        ];
        let model = Model::from_declcfg(&cfg).unwrap();
        let ch = &model.packages["foo"].channels["stable"];
        assert_eq!(
            ch.heads().into_iter().collect::<Vec<_>>(),
            vec!["foo.v0.1.0", "foo.v0.2.0"]
        );
        // Skips count as incoming edges for the single graph head.
        assert_eq!(ch.head("foo").unwrap().name, "foo.v0.2.0");
    }

    #[test]
    fn test_validate_multiple_heads() {
        let mut cfg = simple_catalog();
        cfg.channels[0].entries = vec![
            dc_entry("foo.v0.1.0", "", &[]),
            dc_entry("foo.v0.2.0", "", &[]),
        ];
        let model = Model::from_declcfg(&cfg).unwrap();
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("multiple channel heads found in graph"));
    }

    #[test]
    fn test_validate_replaces_cycle() {
        let mut cfg = simple_catalog();
        cfg.channels[0].entries = vec![
            dc_entry("foo.v0.1.0", "foo.v0.2.0", &[]),
            dc_entry("foo.v0.2.0", "foo.v0.1.0", &[]),
        ];
        let model = Model::from_declcfg(&cfg).unwrap();
        assert!(matches!(
            model.validate(),
            Err(ModelError::ReplacesCycle { .. })
        ));
    }

    #[test]
    fn test_validate_default_channel() {
        let mut cfg = simple_catalog();
        cfg.packages[0].default_channel = "fast".into();
        let model = Model::from_declcfg(&cfg).unwrap();
        assert!(matches!(
            model.validate(),
            Err(ModelError::UnknownDefaultChannel { .. })
        ));
    }

    #[test]
    fn test_channel_priority() {
        let mut cfg = simple_catalog();
        cfg.channels[0].properties = vec![Property::channel_priority("stable", 3)];
        let model = Model::from_declcfg(&cfg).unwrap();
        assert_eq!(model.packages["foo"].channels["stable"].priority(), Some(3));
    }
}
