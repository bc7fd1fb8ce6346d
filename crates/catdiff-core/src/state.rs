//! Include-config bookkeeping across mirror runs.
//!
//! After a heads-only mirror the catalog is summarized as an
//! [`IncludeConfig`] whose `minVersion` bounds record where each channel
//! started, so the next run can pick up from the same place.

use crate::model::{Channel, Model, ModelError, Package};
use catdiff_schema::include::{IncludeBundle, IncludeChannel, IncludeConfig, IncludeError, IncludePackage};
use catdiff_schema::range;
use semver::Version;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors from [`update_include_config`].
#[derive(Error, Debug)]
pub enum StateError {
    /// The previous include config is malformed.
    #[error("previous include config: {0}")]
    Include(#[from] IncludeError),

    /// A channel has no single head to start from.
    #[error(transparent)]
    Model(#[from] ModelError),
}

fn versions(pkg: &Package, ch: &Channel) -> Vec<Version> {
    let mut out: Vec<Version> = ch
        .entries
        .keys()
        .filter_map(|name| pkg.bundle(name))
        .map(|b| b.version.clone())
        .collect();
    out.sort_by(range::compare);
    out
}

fn starting_at(version: &Version) -> IncludeBundle {
    IncludeBundle {
        min_version: Some(version.to_string()),
        ..Default::default()
    }
}

/// Records the lowest version of every channel as its `minVersion`.
pub fn include_config_from_catalog(model: &Model) -> IncludeConfig {
    let packages = model
        .packages
        .values()
        .map(|pkg| IncludePackage {
            name: pkg.name.clone(),
            channels: pkg
                .channels
                .values()
                .filter_map(|ch| {
                    versions(pkg, ch).first().map(|lowest| IncludeChannel {
                        name: ch.name.clone(),
                        bundle: starting_at(lowest),
                    })
                })
                .collect(),
            ..Default::default()
        })
        .collect();
    IncludeConfig { packages }
}

fn head_bundle(pkg: &Package, ch: &Channel) -> Result<IncludeBundle, ModelError> {
    let head = ch.head(&pkg.name)?;
    let bundle = pkg
        .bundle(&head.name)
        .ok_or_else(|| ModelError::MissingBundles {
            package: pkg.name.clone(),
            missing: vec![head.name.clone()],
        })?;
    Ok(starting_at(&bundle.version))
}

/// Moves a recorded `minVersion` forward when its bundle left the channel.
fn advance(pkg: &Package, ch: &Channel, previous: &IncludeBundle) -> IncludeBundle {
    let Some(min) = previous
        .min_version
        .as_deref()
        .and_then(|v| Version::parse(v).ok())
    else {
        return previous.clone();
    };
    let available = versions(pkg, ch);
    if available
        .iter()
        .any(|v| range::compare(v, &min) == Ordering::Equal)
    {
        return previous.clone();
    }

    let next = available
        .iter()
        .find(|v| range::compare(v, &min) == Ordering::Greater);
    debug!(package = %pkg.name, channel = %ch.name, from = %min, to = ?next.map(ToString::to_string), "starting version advanced");
    IncludeBundle {
        min_version: next.map(ToString::to_string),
        ..previous.clone()
    }
}

/// Refreshes a previous include config against the current catalog.
///
/// Packages and channels the previous config did not know start at the
/// channel head. Known channels keep their `minVersion` while it exists,
/// otherwise it moves to the next higher version, or is cleared when no
/// higher version remains. Packages and channels gone from the catalog are
/// dropped.
///
/// # Errors
///
/// Returns a [`StateError`] when the previous config is malformed or a new
/// channel does not have exactly one head.
pub fn update_include_config(
    model: &Model,
    previous: &IncludeConfig,
) -> Result<IncludeConfig, StateError> {
    previous.validate()?;
    let known: BTreeMap<&str, &IncludePackage> = previous
        .packages
        .iter()
        .map(|p| (p.name.as_str(), p))
        .collect();

    let mut packages = Vec::with_capacity(model.packages.len());
    for pkg in model.packages.values() {
        let prev_channels: BTreeMap<&str, &IncludeBundle> = known
            .get(pkg.name.as_str())
            .map(|p| {
                p.channels
                    .iter()
                    .map(|c| (c.name.as_str(), &c.bundle))
                    .collect()
            })
            .unwrap_or_default();

        let mut channels = Vec::with_capacity(pkg.channels.len());
        for ch in pkg.channels.values() {
            let bundle = match prev_channels.get(ch.name.as_str()) {
                Some(prev) => advance(pkg, ch, prev),
                None => head_bundle(pkg, ch)?,
            };
            channels.push(IncludeChannel {
                name: ch.name.clone(),
                bundle,
            });
        }
        packages.push(IncludePackage {
            name: pkg.name.clone(),
            channels,
            ..Default::default()
        });
    }
    Ok(IncludeConfig { packages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{dc_bundle, dc_channel, dc_entry, dc_package};
    use catdiff_schema::DeclarativeConfig;

    fn catalog(versions: &[&str]) -> Model {
        let mut entries = Vec::new();
        let mut prev = String::new();
        for v in versions {
            let name = format!("foo.v{v}");
            entries.push(dc_entry(&name, &prev, &[]));
            prev = name;
        }
        let cfg = DeclarativeConfig {
            packages: vec![dc_package("foo", "stable"), dc_package("bar", "stable")],
            channels: vec![
                dc_channel("foo", "stable", entries),
                dc_channel("bar", "stable", vec![dc_entry("bar.v1.0.0", "", &[])]),
            ],
            bundles: versions
                .iter()
                .map(|v| dc_bundle("foo", v, vec![]))
                .chain([dc_bundle("bar", "1.0.0", vec![])])
                .collect(),
            others: vec![],
        };
        Model::from_declcfg(&cfg).unwrap()
    }

    fn foo_min(cfg: &IncludeConfig) -> Option<&str> {
        cfg.packages
            .iter()
            .find(|p| p.name == "foo")
            .and_then(|p| p.channels[0].bundle.min_version.as_deref())
    }

    fn previous(min: &str) -> IncludeConfig {
        IncludeConfig {
            packages: vec![IncludePackage {
                name: "foo".into(),
                channels: vec![IncludeChannel {
                    name: "stable".into(),
                    bundle: IncludeBundle {
                        min_version: Some(min.into()),
                        ..Default::default()
                    },
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_from_catalog_records_lowest() {
        let cfg = include_config_from_catalog(&catalog(&["0.2.0", "0.10.0", "0.3.0"]));
        let names: Vec<_> = cfg.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["bar", "foo"]);
        assert_eq!(foo_min(&cfg), Some("0.2.0"));
    }

    #[test]
    fn test_update_keeps_existing_version() {
        let cfg = update_include_config(&catalog(&["0.1.0", "0.2.0"]), &previous("0.1.0")).unwrap();
        assert_eq!(foo_min(&cfg), Some("0.1.0"));
    }

    #[test]
    fn test_update_new_package_starts_at_head() {
        let cfg = update_include_config(&catalog(&["0.1.0", "0.2.0"]), &previous("0.1.0")).unwrap();
        let bar = &cfg.packages[0];
        assert_eq!(bar.name, "bar");
        assert_eq!(bar.channels[0].bundle.min_version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_update_advances_vanished_version() {
        let cfg = update_include_config(&catalog(&["0.2.0", "0.3.0"]), &previous("0.1.0")).unwrap();
        assert_eq!(foo_min(&cfg), Some("0.2.0"));
    }

    #[test]
    fn test_update_clears_when_nothing_higher() {
        let cfg = update_include_config(&catalog(&["0.2.0", "0.3.0"]), &previous("0.4.0")).unwrap();
        assert_eq!(foo_min(&cfg), None);
    }

    #[test]
    fn test_update_rejects_malformed_previous() {
        let err = update_include_config(&catalog(&["0.1.0"]), &previous("one")).unwrap_err();
        assert!(matches!(err, StateError::Include(_)));
    }
}
