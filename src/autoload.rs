//! Host autoload helper file
//!
//! The host runtime evaluates one autoload file before every script. These
//! helpers read it and write it, refusing to replace existing content
//! unless explicitly asked.

use crate::error::ApiError;
use crate::tracked::write_atomic;
use std::fs;
use std::path::Path;
use tracing::info;

/// Default file name inside the host script directory.
pub const AUTOLOAD_FILE: &str = "__autoload.php";

/// Current content, `None` when the file does not exist.
pub fn read_autoload(path: &Path) -> Result<Option<String>, ApiError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn write_autoload(path: &Path, content: &str, overwrite: bool) -> Result<(), ApiError> {
    if path.exists() && !overwrite {
        return Err(ApiError::AutoloadExists(path.to_path_buf()));
    }
    write_atomic(path, content.as_bytes())?;
    info!(path = %path.display(), bytes = content.len(), "Autoload file written");
    Ok(())
}
