//! Tracked-File-List Store
//!
//! The persisted, ordered record of per-file reconciliation state. It is
//! a human-diffable artifact: pretty-printed JSON, sorted by
//! `(location\name, filename, liveObjectID)`, rewritten atomically after
//! every pass.

use crate::error::ApiError;
use crate::manifest::FileDescriptor;
use crate::types::{Flag, ObjectId, UNBOUND};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the tracked list inside the instance data directory.
pub const TRACKED_FILE_LIST: &str = "tracked_files.json";

/// Persisted reconciliation record binding a filename to a live object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub filename: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "requiredKeywords", default)]
    pub required_keywords: BTreeSet<String>,
    #[serde(rename = "liveObjectID", default)]
    pub live_object_id: ObjectId,

    #[serde(default)]
    pub added: Flag,
    #[serde(default)]
    pub removed: Flag,
    #[serde(default)]
    pub lost: Flag,
    #[serde(default)]
    pub moved: Flag,
    #[serde(default)]
    pub orphan: Flag,
    #[serde(default)]
    pub missing: Flag,
    #[serde(default)]
    pub modified: Flag,
    #[serde(default)]
    pub renamed: Flag,
    #[serde(default)]
    pub outdated: Flag,
    #[serde(default)]
    pub unknown: Flag,
}

impl TrackedFile {
    /// New unbound record with every flag absent.
    pub fn new(filename: &str, name: &str, location: &str) -> Self {
        Self {
            filename: filename.to_string(),
            name: name.to_string(),
            location: location.to_string(),
            required_keywords: BTreeSet::new(),
            live_object_id: UNBOUND,
            added: Flag::Absent,
            removed: Flag::Absent,
            lost: Flag::Absent,
            moved: Flag::Absent,
            orphan: Flag::Absent,
            missing: Flag::Absent,
            modified: Flag::Absent,
            renamed: Flag::Absent,
            outdated: Flag::Absent,
            unknown: Flag::Absent,
        }
    }

    pub fn from_descriptor(descriptor: &FileDescriptor) -> Self {
        let mut file = Self::new(&descriptor.filename, &descriptor.name, &descriptor.location);
        file.required_keywords = descriptor.required_keywords.clone();
        file
    }

    pub fn is_bound(&self) -> bool {
        self.live_object_id != UNBOUND
    }

    /// All flags with their names, in a fixed order.
    pub fn flags(&self) -> [(&'static str, &Flag); 10] {
        [
            ("added", &self.added),
            ("removed", &self.removed),
            ("lost", &self.lost),
            ("moved", &self.moved),
            ("orphan", &self.orphan),
            ("missing", &self.missing),
            ("modified", &self.modified),
            ("renamed", &self.renamed),
            ("outdated", &self.outdated),
            ("unknown", &self.unknown),
        ]
    }

    /// Names of the flags currently set.
    pub fn set_flags(&self) -> Vec<&'static str> {
        self.flags()
            .iter()
            .filter(|(_, flag)| flag.is_set())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Key used to order the persisted list.
    pub fn sort_key(&self) -> (String, &str, ObjectId) {
        (
            format!("{}\\{}", self.location, self.name),
            self.filename.as_str(),
            self.live_object_id,
        )
    }
}

/// Order by `(location\name, filename, liveObjectID)`.
pub fn compare_tracked(a: &TrackedFile, b: &TrackedFile) -> Ordering {
    a.sort_key().cmp(&b.sort_key())
}

/// Sort a tracked list into its persisted order.
pub fn sort_tracked(files: &mut [TrackedFile]) {
    files.sort_by(compare_tracked);
}

/// Render a tracked list exactly as it is persisted.
pub fn render_tracked(files: &[TrackedFile]) -> Result<String, ApiError> {
    let mut sorted = files.to_vec();
    sort_tracked(&mut sorted);
    let mut text = serde_json::to_string_pretty(&sorted)
        .map_err(|e| ApiError::StateError(format!("Failed to serialize tracked list: {}", e)))?;
    text.push('\n');
    Ok(text)
}

/// JSON file store for the tracked list
pub struct TrackedFileStore {
    path: PathBuf,
}

impl TrackedFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located in an instance data directory.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(TRACKED_FILE_LIST))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the tracked list. A missing file is an empty list.
    pub fn load(&self) -> Result<Vec<TrackedFile>, ApiError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::StateError(format!(
                "Failed to parse tracked list {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Save the tracked list atomically (temporary file, then rename).
    pub fn save(&self, files: &[TrackedFile]) -> Result<(), ApiError> {
        let text = render_tracked(files)?;
        write_atomic(&self.path, text.as_bytes())
    }

    /// Remove entries by filename (explicit user action). Returns the
    /// number of removed entries.
    pub fn forget(&self, filenames: &[String]) -> Result<usize, ApiError> {
        let mut files = self.load()?;
        let before = files.len();
        files.retain(|f| !filenames.contains(&f.filename));
        let removed = before - files.len();
        if removed > 0 {
            self.save(&files)?;
        }
        Ok(removed)
    }
}

/// Write via a sibling temporary file and rename over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ApiError::IoError(e)
    })
}
