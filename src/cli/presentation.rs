//! CLI presentation: text and json formatters per command family.

mod catalog;
mod pass;
mod tracked;

pub use catalog::format_catalog_tree;
pub use pass::{format_pass_outcome, format_status, state_label};
pub use tracked::format_tracked_list;

use crate::error::ApiError;

fn to_json(value: &serde_json::Value) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::StateError(format!("Failed to render JSON: {}", e)))
}
