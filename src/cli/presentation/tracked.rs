//! Tracked list output.

use crate::error::ApiError;
use crate::tracked::{render_tracked, TrackedFile};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;

pub fn format_tracked_list(files: &[TrackedFile], format: &str) -> Result<String, ApiError> {
    if format == "json" {
        return render_tracked(files).map(|s| s.trim_end().to_string());
    }
    if files.is_empty() {
        return Ok("No tracked files.".to_string());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Filename", "Location", "Name", "Object", "Flags"]);
    for file in files {
        let flags: Vec<String> = file
            .flags()
            .iter()
            .filter(|(_, flag)| flag.is_set())
            .map(|(name, flag)| match flag.detail_text() {
                Some(detail) => format!("{}={}", name, detail),
                None => name.to_string(),
            })
            .collect();
        let object = if file.is_bound() {
            format!("#{}", file.live_object_id)
        } else {
            "-".to_string()
        };
        table.add_row(vec![
            file.filename.clone(),
            file.location.clone(),
            file.name.clone(),
            object,
            flags.join(", "),
        ]);
    }
    Ok(table.to_string())
}
