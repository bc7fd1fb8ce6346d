//! Images command

use anyhow::Result;
use catdiff_core::related_images;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use std::path::Path;

use super::load_model;

/// Print every image a catalog references
pub fn images(path: &Path) -> Result<()> {
    let model = load_model(path)?;
    let refs = related_images(&model);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Bundle", "Name", "Image"]);
    for r in &refs {
        table.add_row(vec![r.bundle.as_str(), r.name.as_str(), r.image.as_str()]);
    }

    println!("{table}");
    println!("{} images", refs.len());
    Ok(())
}
