//! Snapshot Synchronizer
//!
//! Materializes the `top` (branch tip) and `current` (adopted revision)
//! snapshots of an instance on disk. Two sources are supported: a git
//! remote and a plain directory (a local tree or an extracted archive).

pub mod directory;
pub mod git;
pub mod layout;

pub use directory::DirectorySync;
pub use git::{build_git_url, GitCredentials, GitSync};
pub use layout::SnapshotLayout;

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// The three per-instance snapshot directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Top,
    Current,
    /// Local workspace holding exported live contents; never synced.
    Changed,
}

impl SnapshotKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            SnapshotKind::Top => "top",
            SnapshotKind::Current => "current",
            SnapshotKind::Changed => "changed",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Which revision a snapshot should hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// Tip of the configured branch.
    Branch,
    /// A previously adopted revision.
    Revision(String),
}

impl VersionSelector {
    /// Pin to `adopted` when present, otherwise follow the branch.
    pub fn pinned_or_branch(adopted: Option<&str>) -> Self {
        match adopted {
            Some(revision) if !revision.is_empty() => {
                VersionSelector::Revision(revision.to_string())
            }
            _ => VersionSelector::Branch,
        }
    }
}

/// Result of a successful sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: SnapshotKind,
    /// Revision now materialized (commit hash or manifest version).
    pub revision: String,
}

/// Snapshot source collaborator
pub trait SnapshotSync {
    /// Bring the snapshot of `kind` to the selected revision.
    fn sync(&self, kind: SnapshotKind, selector: &VersionSelector) -> Result<SyncReport, SyncError>;

    /// Human-readable source identity, without credentials.
    fn describe(&self) -> String;
}

pub(crate) fn reject_changed(kind: SnapshotKind) -> Result<(), SyncError> {
    if kind == SnapshotKind::Changed {
        return Err(SyncError::NotConfigured(
            "the changed snapshot is a local workspace".to_string(),
        ));
    }
    Ok(())
}

/// Remove a directory tree, children before parents.
///
/// The first failure aborts the walk and is returned; a missing path is
/// not an error.
pub fn remove_dir_recursive(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    if !path.is_dir() {
        return fs::remove_file(path);
    }
    for entry in WalkDir::new(path).contents_first(true).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Copy a directory tree, skipping version control metadata.
pub fn copy_tree(from: &Path, to: &Path) -> std::io::Result<u64> {
    let mut copied = 0;
    fs::create_dir_all(to)?;
    let walker = WalkDir::new(from)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = match entry.path().strip_prefix(from) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative,
            _ => continue,
        };
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_dir_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tree");
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/file"), "x").unwrap();
        fs::write(root.join("top"), "y").unwrap();

        remove_dir_recursive(&root).unwrap();
        assert!(!root.exists());
        remove_dir_recursive(&root).unwrap();
    }

    #[test]
    fn test_copy_tree_skips_git_dir() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("from");
        fs::create_dir_all(from.join(".git")).unwrap();
        fs::create_dir_all(from.join("files")).unwrap();
        fs::write(from.join(".git/HEAD"), "ref").unwrap();
        fs::write(from.join("files/a.php"), "a").unwrap();

        let to = temp_dir.path().join("to");
        assert_eq!(copy_tree(&from, &to).unwrap(), 1);
        assert!(to.join("files/a.php").is_file());
        assert!(!to.join(".git").exists());
    }

    #[test]
    fn test_selector_from_adopted_revision() {
        assert_eq!(VersionSelector::pinned_or_branch(None), VersionSelector::Branch);
        assert_eq!(VersionSelector::pinned_or_branch(Some("")), VersionSelector::Branch);
        assert_eq!(
            VersionSelector::pinned_or_branch(Some("abc")),
            VersionSelector::Revision("abc".to_string())
        );
    }
}
