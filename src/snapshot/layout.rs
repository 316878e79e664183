//! On-disk layout of the snapshots of one instance.

use super::SnapshotKind;
use crate::manifest::FILES_DIR;
use std::fs;
use std::path::{Path, PathBuf};

/// `<snapshot_root>/<instance>/{top,current,changed}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLayout {
    base: PathBuf,
}

impl SnapshotLayout {
    pub fn new(snapshot_root: impl AsRef<Path>, instance: &str) -> Self {
        Self {
            base: snapshot_root.as_ref().join(instance),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn dir(&self, kind: SnapshotKind) -> PathBuf {
        self.base.join(kind.dir_name())
    }

    pub fn top(&self) -> PathBuf {
        self.dir(SnapshotKind::Top)
    }

    pub fn current(&self) -> PathBuf {
        self.dir(SnapshotKind::Current)
    }

    pub fn changed(&self) -> PathBuf {
        self.dir(SnapshotKind::Changed)
    }

    /// Blob directory of a snapshot.
    pub fn files_dir(&self, kind: SnapshotKind) -> PathBuf {
        self.dir(kind).join(FILES_DIR)
    }

    /// Create the instance base directory.
    pub fn ensure(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.base)
    }
}
