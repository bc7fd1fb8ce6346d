//! Images referenced by a catalog.

use crate::model::Model;
use std::collections::BTreeSet;

/// An image to mirror and the bundle that references it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageRef {
    /// Owning bundle.
    pub bundle: String,
    /// Related image name, or empty for the bundle image itself.
    pub name: String,
    /// Image reference.
    pub image: String,
}

/// Every bundle image and related image in `model`, sorted and without
/// duplicates. Empty references are skipped.
pub fn related_images(model: &Model) -> Vec<ImageRef> {
    let mut out = BTreeSet::new();
    for bundle in model.packages.values().flat_map(|p| p.bundles.values()) {
        if !bundle.image.is_empty() {
            out.insert(ImageRef {
                bundle: bundle.name.clone(),
                name: String::new(),
                image: bundle.image.clone(),
            });
        }
        for related in &bundle.related_images {
            if related.image.is_empty() {
                continue;
            }
            out.insert(ImageRef {
                bundle: bundle.name.clone(),
                name: related.name.clone(),
                image: related.image.clone(),
            });
        }
    }
    out.into_iter().collect()
}
