//! Dependency closure.
//!
//! A worklist of selected bundles whose requirements still need checking.
//! Each `(package, bundle)` pair is queued at most once, so the loop is
//! bounded by the catalog's bundle count.

use super::{DiffError, Selection};
use crate::model::{Bundle, Channel, Model, Package, RequiredPackage};
use catdiff_schema::property::Gvk;
use catdiff_schema::range;
use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
enum Requirement<'a> {
    Package(&'a RequiredPackage),
    Api(&'a Gvk),
}

impl Requirement<'_> {
    fn satisfied_by(&self, bundle: &Bundle) -> bool {
        match self {
            Requirement::Package(req) => {
                bundle.package == req.package && req.range.matches(&bundle.version)
            }
            Requirement::Api(gvk) => bundle.provides(gvk),
        }
    }
}

impl fmt::Display for Requirement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Package(req) => write!(f, "package {} {}", req.package, req.range),
            Requirement::Api(gvk) => write!(f, "api {gvk}"),
        }
    }
}

fn requirements(bundle: &Bundle) -> impl Iterator<Item = Requirement<'_>> {
    bundle
        .required_packages
        .iter()
        .map(Requirement::Package)
        .chain(bundle.required_gvks.iter().map(Requirement::Api))
}

/// Expands `selection` until every requirement of a selected bundle is met
/// by a selected bundle, by a bundle mirrored before (present in `old`), or
/// by a selected head that skips straight past the required version.
pub(super) fn close(selection: &mut Selection, old: &Model, new: &Model) -> Result<(), DiffError> {
    let bound = new.bundle_count();
    let mut queued = selection.bundle_keys();
    let mut queue: VecDeque<(String, String)> = queued.iter().cloned().collect();
    let mut processed = 0usize;

    while let Some((pkg_name, bundle_name)) = queue.pop_front() {
        processed += 1;
        if processed > bound {
            return Err(DiffError::IterationBound(bound));
        }
        let Some(bundle) = new.bundle(&pkg_name, &bundle_name) else {
            continue;
        };

        for req in requirements(bundle) {
            if is_selected(selection, new, req) {
                continue;
            }
            if mirrored_before(old, req) {
                debug!(bundle = %bundle.name, requirement = %req, "satisfied by previous mirror");
                continue;
            }

            let providers: Vec<&Package> = match req {
                Requirement::Package(r) => new.packages.get(&r.package).into_iter().collect(),
                Requirement::Api(_) => new
                    .packages
                    .values()
                    .filter(|p| p.bundles.values().any(|b| req.satisfied_by(b)))
                    .collect(),
            };
            if providers.is_empty() {
                warn!(bundle = %bundle.name, requirement = %req, "no provider in catalog");
                continue;
            }

            for pkg in providers {
                let Some((ch, floor)) = pick_floor(pkg, req) else {
                    warn!(bundle = %bundle.name, requirement = %req, package = %pkg.name, "no version satisfies requirement");
                    continue;
                };
                if covered_by_skip(selection, pkg, ch, req) {
                    debug!(bundle = %bundle.name, requirement = %req, channel = %ch.name, "skipped by selected head");
                    continue;
                }

                let selected = selection.channel(&pkg.name, &ch.name).map(|s| &s.entries);
                let path = upgrade_path(pkg, ch, &floor.name, selected);
                for name in path {
                    if selection.insert(&pkg.name, &ch.name, &name) {
                        debug!(package = %pkg.name, channel = %ch.name, bundle = %name, requirement = %req, "pulled in as dependency");
                    }
                    let key = (pkg.name.clone(), name);
                    if queued.insert(key.clone()) {
                        queue.push_back(key);
                    }
                }
            }
        }
    }
    Ok(())
}

fn is_selected(selection: &Selection, new: &Model, req: Requirement<'_>) -> bool {
    let satisfied = |pkg: &str| {
        selection
            .bundles_of(pkg)
            .into_iter()
            .filter_map(|b| new.bundle(pkg, b))
            .any(|b| req.satisfied_by(b))
    };
    match req {
        Requirement::Package(r) => satisfied(&r.package),
        Requirement::Api(_) => selection.packages.keys().any(|pkg| satisfied(pkg)),
    }
}

fn mirrored_before(old: &Model, req: Requirement<'_>) -> bool {
    match req {
        Requirement::Package(r) => old
            .packages
            .get(&r.package)
            .is_some_and(|p| p.bundles.values().any(|b| req.satisfied_by(b))),
        Requirement::Api(_) => old
            .packages
            .values()
            .flat_map(|p| p.bundles.values())
            .any(|b| req.satisfied_by(b)),
    }
}

fn by_version(a: &&Bundle, b: &&Bundle) -> Ordering {
    range::compare(&a.version, &b.version).then_with(|| a.name.cmp(&b.name))
}

/// The highest satisfying bundle, preferring the default channel.
fn pick_floor<'a>(pkg: &'a Package, req: Requirement<'_>) -> Option<(&'a Channel, &'a Bundle)> {
    let best_in = |ch: &'a Channel| {
        ch.entries
            .keys()
            .filter_map(|name| pkg.bundle(name))
            .filter(|b| req.satisfied_by(b))
            .max_by(by_version)
    };
    if let Some(default) = pkg.channels.get(&pkg.default_channel) {
        if let Some(b) = best_in(default) {
            return Some((default, b));
        }
    }
    pkg.channels
        .values()
        .find_map(|ch| best_in(ch).map(|b| (ch, b)))
}

/// True when the requirement pins one version and a selected head of the
/// channel lists that version's bundle (or the bare version) in `skips`.
fn covered_by_skip(selection: &Selection, pkg: &Package, ch: &Channel, req: Requirement<'_>) -> bool {
    let Requirement::Package(r) = req else {
        return false;
    };
    let Some(target) = r.range.exact_version() else {
        return false;
    };
    let Some(selected) = selection.channel(&pkg.name, &ch.name) else {
        return false;
    };

    let target_names: BTreeSet<&str> = ch
        .entries
        .keys()
        .filter(|name| {
            pkg.bundle(name)
                .is_some_and(|b| range::compare(&b.version, target) == Ordering::Equal)
        })
        .map(String::as_str)
        .collect();
    let target_text = target.to_string();

    let heads = ch.heads();
    selected
        .entries
        .iter()
        .filter(|name| heads.contains(name.as_str()))
        .filter_map(|name| ch.entries.get(name))
        .any(|head| {
            head.skips
                .iter()
                .any(|s| target_names.contains(s.as_str()) || *s == target_text)
        })
}

/// Entries from `floor` up the replaces chain, stopping before the first
/// entry already selected or after the channel head. Where several
/// entries replace the same one, the highest version is followed.
pub(super) fn upgrade_path(
    pkg: &Package,
    ch: &Channel,
    floor: &str,
    selected: Option<&BTreeSet<String>>,
) -> Vec<String> {
    let mut path = Vec::new();
    let mut visited = BTreeSet::new();
    let mut current = floor.to_string();
    loop {
        if !visited.insert(current.clone()) || selected.is_some_and(|s| s.contains(&current)) {
            break;
        }
        path.push(current.clone());
        let next = ch
            .successors(&current)
            .filter_map(|e| pkg.bundle(&e.name))
            .max_by(by_version);
        match next {
            Some(b) => current = b.name.clone(),
            None => break,
        }
    }
    path
}
