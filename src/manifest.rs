//! Manifest Store
//!
//! Reads the versioned `dictionary.json` manifest and the raw script blobs
//! under `files/` of a materialized snapshot. Nothing is cached: a snapshot
//! directory may be replaced wholesale by the synchronizer between passes.

use crate::error::ManifestError;
use crate::types::Digest;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Fixed manifest file name at the snapshot root.
pub const MANIFEST_FILE: &str = "dictionary.json";

/// Directory holding the script blobs, relative to the snapshot root.
pub const FILES_DIR: &str = "files";

/// Versioned description of the expected files of one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,

    #[serde(rename = "tstamp", default)]
    pub timestamp: i64,

    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

/// One expected file: its unique filename, object name and logical location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub filename: String,
    pub name: String,

    #[serde(default)]
    pub location: String,

    #[serde(rename = "requires", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_keywords: BTreeSet<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "version must be a string or an integer, got {}",
            other
        ))),
    }
}

impl Manifest {
    /// Look up a file descriptor by filename.
    pub fn get(&self, filename: &str) -> Option<&FileDescriptor> {
        self.files.iter().find(|f| f.filename == filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.get(filename).is_some()
    }

    pub fn filenames(&self) -> BTreeSet<&str> {
        self.files.iter().map(|f| f.filename.as_str()).collect()
    }
}

/// Path of the manifest file for a snapshot root.
pub fn manifest_path(snapshot_root: &Path) -> PathBuf {
    snapshot_root.join(MANIFEST_FILE)
}

/// Read and parse the manifest of a snapshot.
///
/// A missing file is `NotFound`; malformed JSON or a duplicate filename is
/// `Parse`. No partial manifest is ever returned.
pub fn load_manifest(snapshot_root: &Path) -> Result<Manifest, ManifestError> {
    let path = manifest_path(snapshot_root);
    if !path.is_file() {
        return Err(ManifestError::NotFound(path));
    }

    let bytes = fs::read(&path)?;
    let manifest: Manifest =
        serde_json::from_slice(&bytes).map_err(|e| ManifestError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;

    let mut seen = HashSet::new();
    for file in &manifest.files {
        if file.filename.is_empty() {
            return Err(ManifestError::Parse {
                path,
                message: "file entry with empty filename".to_string(),
            });
        }
        if !seen.insert(file.filename.as_str()) {
            return Err(ManifestError::Parse {
                path,
                message: format!("duplicate filename '{}'", file.filename),
            });
        }
    }

    Ok(manifest)
}

/// Resolve `files/<filename>` under a snapshot root.
///
/// Returns `None` for filenames that would escape the `files/` directory.
pub fn blob_path(snapshot_root: &Path, filename: &str) -> Option<PathBuf> {
    let relative = Path::new(filename);
    let confined = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !confined || relative.as_os_str().is_empty() {
        return None;
    }
    Some(snapshot_root.join(FILES_DIR).join(relative))
}

/// Read the raw content of one file of a snapshot.
pub fn load_file_content(snapshot_root: &Path, filename: &str) -> Result<Vec<u8>, ManifestError> {
    let path = blob_path(snapshot_root, filename)
        .ok_or_else(|| ManifestError::NotFound(snapshot_root.join(FILES_DIR).join(filename)))?;
    match fs::read(&path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ManifestError::NotFound(path)),
        Err(e) if e.kind() == std::io::ErrorKind::IsADirectory => {
            Err(ManifestError::NotFound(path))
        }
        Err(e) => Err(ManifestError::IoError(e)),
    }
}

/// BLAKE3 digest of a blob.
pub fn content_digest(bytes: &[u8]) -> Digest {
    *blake3::hash(bytes).as_bytes()
}

/// A loaded snapshot: its root directory and parsed manifest.
#[derive(Debug, Clone)]
pub struct SnapshotView {
    root: PathBuf,
    manifest: Manifest,
}

impl SnapshotView {
    /// Load the manifest of the snapshot rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let root = root.into();
        let manifest = load_manifest(&root)?;
        Ok(Self { root, manifest })
    }

    pub fn from_parts(root: impl Into<PathBuf>, manifest: Manifest) -> Self {
        Self {
            root: root.into(),
            manifest,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn content(&self, filename: &str) -> Result<Vec<u8>, ManifestError> {
        load_file_content(&self.root, filename)
    }

    /// Digest of a file's content, `None` when it is unreadable.
    pub fn digest(&self, filename: &str) -> Option<Digest> {
        self.content(filename).ok().map(|bytes| content_digest(&bytes))
    }
}

/// Filenames present in both manifests whose content differs between the
/// two snapshots. A file readable on only one side counts as changed.
pub fn changed_files(top: &SnapshotView, current: &SnapshotView) -> BTreeSet<String> {
    let mut changed = BTreeSet::new();
    for file in &current.manifest().files {
        if !top.manifest().contains(&file.filename) {
            continue;
        }
        let top_digest = top.digest(&file.filename);
        let current_digest = current.digest(&file.filename);
        let same = matches!((top_digest, current_digest), (Some(a), Some(b)) if a == b);
        if !same && (top_digest.is_some() || current_digest.is_some()) {
            changed.insert(file.filename.clone());
        }
    }
    changed
}
