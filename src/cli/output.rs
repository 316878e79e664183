//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::InstanceDisabled(name) => {
            format!("Instance '{}' is disabled; enable it in the configuration first", name)
        }
        ApiError::AutoloadExists(path) => format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        ),
        other => other.to_string(),
    }
}
