//! Initial candidate selection.

use super::{ChannelSelection, DiffError, Selection};
use crate::include::{DiffIncludePackage, DiffIncluder, EntryFilter, FilterMatch, UnknownBound};
use crate::model::{Channel, Model, Package};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

type ChannelMap = BTreeMap<String, ChannelSelection>;

/// Applies the inclusion filter to `new`.
///
/// With no named packages every entry of every channel is selected.
/// Otherwise only named packages are considered, and named channels or
/// version filters narrow them further.
pub(super) fn filter(includer: &DiffIncluder, new: &Model) -> Result<Selection, DiffError> {
    let mut selection = Selection::default();

    if includer.is_empty() {
        for pkg in new.packages.values() {
            let chs = selection.packages.entry(pkg.name.clone()).or_default();
            for ch in pkg.channels.values() {
                chs.insert(ch.name.clone(), everything(ch));
            }
        }
        return Ok(selection);
    }

    for inc in &includer.packages {
        let pkg = new
            .packages
            .get(&inc.name)
            .ok_or_else(|| DiffError::UnknownPackage(inc.name.clone()))?;
        let chs = if inc.channels.is_empty() {
            filter_all_channels(pkg, inc)?
        } else {
            filter_named_channels(pkg, inc)?
        };

        if chs.values().all(|ch| ch.entries.is_empty()) {
            return Err(DiffError::NothingSelected(pkg.name.clone()));
        }
        debug!(package = %pkg.name, channels = chs.len(), "package included");
        selection.packages.insert(pkg.name.clone(), chs);
    }
    selection.prune_empty();
    Ok(selection)
}

fn everything(ch: &Channel) -> ChannelSelection {
    ChannelSelection {
        entries: ch.entries.keys().cloned().collect(),
        explicit: false,
    }
}

fn apply(
    filter: &EntryFilter,
    pkg: &Package,
    ch: &Channel,
) -> Result<FilterMatch, DiffError> {
    filter
        .apply(pkg, ch)
        .map_err(|UnknownBound(bundle)| DiffError::UnknownBundle {
            package: pkg.name.clone(),
            bundle,
        })
}

/// Pins that matched nothing are an error; `channel` scopes the message.
fn check_pins(
    filter: &EntryFilter,
    pkg: &Package,
    channel: Option<&str>,
    versions: &BTreeSet<semver::Version>,
    bundles: &BTreeSet<String>,
) -> Result<(), DiffError> {
    if let Some(v) = filter.versions.iter().find(|v| !versions.contains(*v)) {
        return Err(DiffError::UnknownVersion {
            package: pkg.name.clone(),
            channel: channel.map(ToString::to_string),
            version: v.clone(),
        });
    }
    if let Some(b) = filter.bundles.iter().find(|b| !bundles.contains(*b)) {
        return Err(DiffError::UnknownBundle {
            package: pkg.name.clone(),
            bundle: b.clone(),
        });
    }
    Ok(())
}

fn filter_all_channels(pkg: &Package, inc: &DiffIncludePackage) -> Result<ChannelMap, DiffError> {
    let mut chs = ChannelMap::new();
    if inc.all_channels.is_empty() {
        for ch in pkg.channels.values() {
            chs.insert(ch.name.clone(), everything(ch));
        }
        return Ok(chs);
    }

    // A package-wide pin only has to exist in one channel; channels
    // without any match are dropped.
    let mut versions = BTreeSet::new();
    let mut bundles = BTreeSet::new();
    for ch in pkg.channels.values() {
        let matched = apply(&inc.all_channels, pkg, ch)?;
        versions.extend(matched.versions);
        bundles.extend(matched.bundles);
        if matched.entries.is_empty() {
            debug!(package = %pkg.name, channel = %ch.name, "no entries match package filter");
            continue;
        }
        chs.insert(
            ch.name.clone(),
            ChannelSelection {
                entries: matched.entries,
                explicit: true,
            },
        );
    }
    check_pins(&inc.all_channels, pkg, None, &versions, &bundles)?;
    Ok(chs)
}

fn filter_named_channels(pkg: &Package, inc: &DiffIncludePackage) -> Result<ChannelMap, DiffError> {
    let mut chs = ChannelMap::new();
    for inc_ch in &inc.channels {
        let ch = pkg
            .channels
            .get(&inc_ch.name)
            .ok_or_else(|| DiffError::UnknownChannel {
                package: pkg.name.clone(),
                channel: inc_ch.name.clone(),
            })?;
        let filter = if inc_ch.filter.is_empty() {
            &inc.all_channels
        } else {
            &inc_ch.filter
        };
        if filter.is_empty() {
            chs.insert(ch.name.clone(), everything(ch));
            continue;
        }
        let matched = apply(filter, pkg, ch)?;
        check_pins(
            filter,
            pkg,
            Some(&ch.name),
            &matched.versions,
            &matched.bundles,
        )?;
        chs.insert(
            ch.name.clone(),
            ChannelSelection {
                entries: matched.entries,
                explicit: true,
            },
        );
    }
    Ok(chs)
}

/// Removes entries whose bundle and upgrade edges are identical in `old`.
///
/// Channel properties are not compared; the output always carries the new
/// catalog's channel properties.
pub(super) fn subtract_unchanged(selection: &mut Selection, old: &Model, new: &Model) {
    for (pkg_name, chs) in &mut selection.packages {
        let (Some(new_pkg), Some(old_pkg)) = (new.packages.get(pkg_name), old.packages.get(pkg_name))
        else {
            continue;
        };
        for (ch_name, sel) in chs.iter_mut() {
            let (Some(new_ch), Some(old_ch)) =
                (new_pkg.channels.get(ch_name), old_pkg.channels.get(ch_name))
            else {
                continue;
            };
            sel.entries.retain(|name| {
                let unchanged = new_ch.entries.get(name) == old_ch.entries.get(name)
                    && match (new_pkg.bundle(name), old_pkg.bundle(name)) {
                        (Some(n), Some(o)) => n.same_content(o),
                        _ => false,
                    };
                if unchanged {
                    debug!(package = %pkg_name, channel = %ch_name, bundle = %name, "unchanged since last mirror");
                }
                !unchanged
            });
        }
    }
    selection.prune_empty();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{dc_bundle, dc_channel, dc_entry, dc_package};
    use catdiff_schema::DeclarativeConfig;

    fn model(versions: &[&str]) -> Model {
        let mut entries = Vec::new();
        let mut prev = String::new();
        for v in versions {
            let name = format!("foo.v{v}");
            entries.push(dc_entry(&name, &prev, &[]));
            prev = name;
        }
        let cfg = DeclarativeConfig {
            packages: vec![dc_package("foo", "stable")],
            channels: vec![dc_channel("foo", "stable", entries)],
            bundles: versions.iter().map(|v| dc_bundle("foo", v, vec![])).collect(),
            others: vec![],
        };
        Model::from_declcfg(&cfg).unwrap()
    }

    #[test]
    fn test_unfiltered_selects_everything() {
        let sel = filter(&DiffIncluder::default(), &model(&["0.1.0", "0.2.0"])).unwrap();
        let ch = sel.channel("foo", "stable").unwrap();
        assert_eq!(ch.entries.len(), 2);
        assert!(!ch.explicit);
    }

    #[test]
    fn test_subtract_identical() {
        let old = model(&["0.1.0"]);
        let new = model(&["0.1.0", "0.2.0"]);
        let mut sel = filter(&DiffIncluder::default(), &new).unwrap();
        subtract_unchanged(&mut sel, &old, &new);
        let ch = sel.channel("foo", "stable").unwrap();
        assert_eq!(ch.entries.iter().collect::<Vec<_>>(), vec!["foo.v0.2.0"]);
    }

    #[test]
    fn test_subtract_everything_leaves_nothing() {
        let m = model(&["0.1.0", "0.2.0"]);
        let mut sel = filter(&DiffIncluder::default(), &m).unwrap();
        subtract_unchanged(&mut sel, &m, &m);
        assert!(sel.packages.is_empty());
    }

    #[test]
    fn test_priority_change_alone_is_not_a_diff() {
        let old = model(&["0.1.0", "0.2.0"]);
        let mut cfg = old.to_declcfg();
        cfg.channels[0]
            .properties
            .push(catdiff_schema::Property::channel_priority("stable", 2));
        let new = Model::from_declcfg(&cfg).unwrap();
        let mut sel = filter(&DiffIncluder::default(), &new).unwrap();
        subtract_unchanged(&mut sel, &old, &new);
        assert!(sel.packages.is_empty());
    }

    #[test]
    fn test_unknown_package() {
        let includer = DiffIncluder {
            packages: vec![DiffIncludePackage {
                name: "bar".into(),
                ..Default::default()
            }],
        };
        assert!(matches!(
            filter(&includer, &model(&["0.1.0"])),
            Err(DiffError::UnknownPackage(p)) if p == "bar"
        ));
    }
}
