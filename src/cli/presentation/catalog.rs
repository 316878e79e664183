//! Live catalog tree output.

use crate::catalog::{LiveCatalog, ObjectKind};
use crate::error::ApiError;
use crate::types::{ObjectId, ROOT_ID};

pub fn format_catalog_tree(catalog: &dyn LiveCatalog) -> Result<String, ApiError> {
    let mut lines = vec!["\\".to_string()];
    render_children(catalog, ROOT_ID, 1, &mut lines)?;
    if lines.len() == 1 {
        lines.push("  (empty)".to_string());
    }
    Ok(lines.join("\n"))
}

fn render_children(
    catalog: &dyn LiveCatalog,
    parent: ObjectId,
    depth: usize,
    lines: &mut Vec<String>,
) -> Result<(), ApiError> {
    for child in catalog.children(parent)? {
        let name = catalog.name(child)?.unwrap_or_default();
        let indent = "  ".repeat(depth);
        match catalog.kind(child)? {
            Some(ObjectKind::Container) => {
                lines.push(format!("{}{}\\  #{}", indent, name, child));
                render_children(catalog, child, depth + 1, lines)?;
            }
            Some(ObjectKind::Script) => lines.push(format!("{}{}  #{}", indent, name, child)),
            None => {}
        }
    }
    Ok(())
}
