//! Heads-only reduction.

use super::Selection;
use super::deps::upgrade_path;
use crate::model::Model;
use std::collections::BTreeSet;
use tracing::debug;

/// Collapses each selected channel to the heads of the full channel.
///
/// Entries the inclusion filter requested explicitly act as floors: each
/// keeps itself and the replaces chain above it up to the channel head.
/// Entries are never rewritten, so `replaces` and `skips` may still name
/// bundles that end up excluded.
pub(super) fn reduce(selection: &mut Selection, new: &Model) {
    for (pkg_name, chs) in &mut selection.packages {
        let Some(pkg) = new.packages.get(pkg_name) else {
            continue;
        };
        for (ch_name, sel) in chs.iter_mut() {
            let Some(ch) = pkg.channels.get(ch_name) else {
                continue;
            };
            if sel.explicit {
                let requested = std::mem::take(&mut sel.entries);
                sel.entries = requested
                    .iter()
                    .flat_map(|floor| upgrade_path(pkg, ch, floor, None))
                    .collect::<BTreeSet<_>>();
            } else {
                let heads = ch.heads();
                sel.entries.retain(|e| heads.contains(e.as_str()));
            }
            debug!(package = %pkg_name, channel = %ch_name, kept = sel.entries.len(), "heads");
        }
    }
    selection.prune_empty();
}
