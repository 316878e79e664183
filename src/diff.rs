//! Advisory diff artifacts
//!
//! Exports the content of every bound live script into the `changed`
//! workspace and records `diff -ruN` between each snapshot and that
//! workspace. The output is informational only; any tool failure degrades
//! to an empty artifact.

use crate::catalog::{LiveCatalog, ObjectKind};
use crate::error::ApiError;
use crate::manifest::blob_path;
use crate::snapshot::{remove_dir_recursive, SnapshotKind, SnapshotLayout};
use crate::tracked::{write_atomic, TrackedFile};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

pub const DIFF_CURRENT_FILE: &str = "diff_current.txt";
pub const DIFF_TOP_FILE: &str = "diff_top.txt";

/// Paths of the written artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffArtifacts {
    pub current: PathBuf,
    pub top: PathBuf,
}

impl DiffArtifacts {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            current: data_dir.join(DIFF_CURRENT_FILE),
            top: data_dir.join(DIFF_TOP_FILE),
        }
    }

    pub fn path(&self, against: SnapshotKind) -> Option<&Path> {
        match against {
            SnapshotKind::Current => Some(&self.current),
            SnapshotKind::Top => Some(&self.top),
            SnapshotKind::Changed => None,
        }
    }
}

/// Write live contents of bound scripts to `changed/files/<filename>`.
pub fn export_live(
    catalog: &dyn LiveCatalog,
    files: &[TrackedFile],
    layout: &SnapshotLayout,
) -> Result<usize, ApiError> {
    let changed = layout.changed();
    remove_dir_recursive(&changed)?;
    fs::create_dir_all(layout.files_dir(SnapshotKind::Changed))?;

    let mut exported = 0;
    for file in files.iter().filter(|f| f.is_bound()) {
        let id = file.live_object_id;
        if catalog.kind(id)? != Some(ObjectKind::Script) {
            continue;
        }
        let Some(target) = blob_path(&changed, &file.filename) else {
            continue;
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = match catalog.content(id) {
            Ok(content) => content,
            Err(e) => {
                debug!(
                    filename = %file.filename,
                    id,
                    error = %e,
                    "Live content unavailable, not exported"
                );
                continue;
            }
        };
        fs::write(&target, content)?;
        exported += 1;
    }
    debug!(exported, "Exported live contents");
    Ok(exported)
}

/// Raw `diff -ruN` output; empty on any failure other than "differences".
pub fn run_diff(left: &Path, right: &Path) -> String {
    let output = Command::new("diff").arg("-ruN").arg(left).arg(right).output();
    match output {
        Ok(output) if matches!(output.status.code(), Some(0) | Some(1)) => {
            String::from_utf8_lossy(&output.stdout).into_owned()
        }
        Ok(output) => {
            warn!(
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "diff failed, writing empty artifact"
            );
            String::new()
        }
        Err(e) => {
            warn!(error = %e, "diff unavailable, writing empty artifact");
            String::new()
        }
    }
}

/// Export live contents and write both artifacts into `data_dir`.
pub fn write_artifacts(
    catalog: &dyn LiveCatalog,
    files: &[TrackedFile],
    layout: &SnapshotLayout,
    data_dir: &Path,
) -> Result<DiffArtifacts, ApiError> {
    export_live(catalog, files, layout)?;
    let artifacts = DiffArtifacts::in_dir(data_dir);
    let changed = layout.files_dir(SnapshotKind::Changed);

    for kind in [SnapshotKind::Current, SnapshotKind::Top] {
        let text = run_diff(&layout.files_dir(kind), &changed);
        if let Some(path) = artifacts.path(kind) {
            write_atomic(path, text.as_bytes())?;
        }
    }
    Ok(artifacts)
}
