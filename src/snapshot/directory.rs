//! Directory-backed snapshot synchronization.
//!
//! The source is a directory laid out like a snapshot (`dictionary.json`
//! plus `files/`). Its manifest version is the revision. Only the version
//! the source currently carries can be materialized; an older pinned
//! revision is served only while the existing snapshot still holds it.

use super::{
    copy_tree, reject_changed, remove_dir_recursive, SnapshotKind, SnapshotLayout, SnapshotSync,
    SyncReport, VersionSelector,
};
use crate::error::{ManifestError, SyncError};
use crate::manifest::load_manifest;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Snapshot sync from a local directory
pub struct DirectorySync {
    source: PathBuf,
    layout: SnapshotLayout,
}

impl DirectorySync {
    pub fn new(source: impl Into<PathBuf>, layout: SnapshotLayout) -> Self {
        Self {
            source: source.into(),
            layout,
        }
    }

    fn existing_version(path: &Path) -> Option<String> {
        load_manifest(path).ok().map(|m| m.version)
    }

    /// Replace `target` with a fresh copy of the source.
    fn materialize(&self, target: &Path) -> Result<(), SyncError> {
        let staging = target.with_extension("incoming");
        remove_dir_recursive(&staging)?;
        let copied = copy_tree(&self.source, &staging)?;
        remove_dir_recursive(target)?;
        fs::rename(&staging, target)?;
        debug!(target = %target.display(), files = copied, "Copied source tree");
        Ok(())
    }
}

impl SnapshotSync for DirectorySync {
    fn sync(
        &self,
        kind: SnapshotKind,
        selector: &VersionSelector,
    ) -> Result<SyncReport, SyncError> {
        reject_changed(kind)?;
        if !self.source.is_dir() {
            return Err(SyncError::NotConfigured(format!(
                "source directory {} does not exist",
                self.source.display()
            )));
        }
        self.layout.ensure()?;
        let target = self.layout.dir(kind);

        let source_version = match load_manifest(&self.source) {
            Ok(manifest) => manifest.version,
            Err(ManifestError::NotFound(path)) => {
                return Err(SyncError::NotConfigured(format!(
                    "source has no manifest at {}",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let revision = match selector {
            VersionSelector::Branch => {
                self.materialize(&target)?;
                source_version
            }
            VersionSelector::Revision(pinned) => {
                if Self::existing_version(&target).as_deref() == Some(pinned.as_str()) {
                    debug!(snapshot = %kind, revision = %pinned, "Pinned revision already present");
                } else if &source_version == pinned {
                    self.materialize(&target)?;
                } else {
                    return Err(SyncError::RevisionUnavailable(pinned.clone()));
                }
                pinned.clone()
            }
        };

        info!(snapshot = %kind, revision = %revision, "Snapshot synced");
        Ok(SyncReport { kind, revision })
    }

    fn describe(&self) -> String {
        self.source.display().to_string()
    }
}
