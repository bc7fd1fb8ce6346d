//! Output model construction and default-channel repair.

use super::{DiffError, Selection};
use crate::include::DiffIncluder;
use crate::model::{Channel, Model, Package};
use std::collections::BTreeMap;
use tracing::info;

/// Builds a fresh model holding only the selected entries of `new`.
///
/// Entries and bundles are copied as they are; channels left empty and
/// packages left without channels are dropped. The result is validated
/// before it is returned.
pub(super) fn build(
    selection: &Selection,
    new: &Model,
    includer: &DiffIncluder,
    fallback: &str,
) -> Result<Model, DiffError> {
    let mut out = Model::default();

    for (pkg_name, chs) in &selection.packages {
        let Some(src) = new.packages.get(pkg_name) else {
            continue;
        };
        let mut pkg = Package {
            name: src.name.clone(),
            default_channel: String::new(),
            description: src.description.clone(),
            icon: src.icon.clone(),
            channels: BTreeMap::new(),
            bundles: BTreeMap::new(),
        };

        for (ch_name, sel) in chs {
            let Some(src_ch) = src.channels.get(ch_name) else {
                continue;
            };
            let entries: BTreeMap<_, _> = sel
                .entries
                .iter()
                .filter_map(|name| src_ch.entries.get(name))
                .map(|e| (e.name.clone(), e.clone()))
                .collect();
            if entries.is_empty() {
                continue;
            }
            for name in entries.keys() {
                if let Some(b) = src.bundle(name) {
                    pkg.bundles.insert(name.clone(), b.clone());
                }
            }
            pkg.channels.insert(
                ch_name.clone(),
                Channel {
                    name: src_ch.name.clone(),
                    properties: src_ch.properties.clone(),
                    entries,
                },
            );
        }
        if pkg.channels.is_empty() {
            continue;
        }

        let forced = includer
            .package(pkg_name)
            .and_then(|p| p.default_channel.as_deref());
        pkg.default_channel = default_channel(&pkg, &src.default_channel, forced, fallback)?;
        out.packages.insert(pkg.name.clone(), pkg);
    }

    out.validate()?;
    Ok(out)
}

/// Picks the output default channel.
///
/// Order: configured override, original default, the only channel left,
/// then the highest `olm.channel.priority`.
fn default_channel(
    pkg: &Package,
    original: &str,
    forced: Option<&str>,
    fallback: &str,
) -> Result<String, DiffError> {
    if let Some(name) = forced {
        if pkg.channels.contains_key(name) {
            return Ok(name.to_string());
        }
        return Err(DiffError::DefaultChannelNotRetained {
            package: pkg.name.clone(),
            channel: name.to_string(),
        });
    }
    if pkg.channels.contains_key(original) {
        return Ok(original.to_string());
    }

    let names: Vec<String> = pkg.channels.keys().cloned().collect();
    if let [only] = names.as_slice() {
        info!(package = %pkg.name, from = %original, to = %only, "default channel repaired");
        return Ok(only.clone());
    }

    let prioritized: Vec<(&str, i32)> = pkg
        .channels
        .values()
        .filter_map(|ch| ch.priority().map(|p| (ch.name.as_str(), p)))
        .collect();
    let Some(top) = prioritized.iter().map(|(_, p)| *p).max() else {
        return Err(DiffError::NoDefaultChannel {
            package: pkg.name.clone(),
            original: original.to_string(),
            channels: names,
            fallback: fallback.to_string(),
        });
    };
    let winners: Vec<&str> = prioritized
        .iter()
        .filter(|(_, p)| *p == top)
        .map(|(name, _)| *name)
        .collect();
    match winners.as_slice() {
        [winner] => {
            info!(package = %pkg.name, from = %original, to = %winner, priority = top, "default channel repaired by priority");
            Ok((*winner).to_string())
        }
        _ => Err(DiffError::PriorityTie {
            package: pkg.name.clone(),
            channels: winners.iter().map(ToString::to_string).collect(),
            priority: top,
        }),
    }
}
