//! Adjustment Executor
//!
//! Brings live objects in line with the current snapshot for the items the
//! reconciler flagged. Each item is handled on its own: a failing sub-step
//! aborts that item, records why, leaves its flags as they were, and the
//! executor moves on. Host mutations are never rolled back.

use crate::catalog::{LiveCatalog, ObjectKind};
use crate::error::{CatalogError, ManifestError};
use crate::location::{LocationResolver, ResolutionFailure};
use crate::manifest::SnapshotView;
use crate::reconcile::MessageTrail;
use crate::tracked::TrackedFile;
use crate::types::ObjectId;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Highest numeric suffix tried when de-duplicating a sibling name.
pub const MAX_NAME_SUFFIX: u32 = 99;

/// Line prefixes owned by the deployment annotation.
pub const ANNOTATION_PREFIXES: [&str; 5] =
    ["Deployment:", "Source:", "Filename:", "Location:", "Name:"];

/// Reason a single item could not be adjusted
#[derive(Debug, Error)]
pub enum AdjustFailure {
    #[error("current content unavailable: {0}")]
    Content(#[from] ManifestError),

    #[error("location unresolvable: {0}")]
    Location(#[from] ResolutionFailure),

    #[error("no free name for '{name}' after {attempts} attempts")]
    NameConflict { name: String, attempts: u32 },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Identity written into each object's info annotation.
#[derive(Debug, Clone, Default)]
pub struct AdjustOptions {
    /// Instance name, the `Deployment:` line.
    pub deployment: String,
    /// Repository URL or source directory, the `Source:` line.
    pub source: String,
    /// Also re-parent and rename items flagged moved, orphan or renamed.
    pub relocate: bool,
}

/// Summary of one adjustment run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AdjustReport {
    pub created: usize,
    pub updated: usize,
    pub relocated: usize,
    pub failed: usize,
    pub messages: MessageTrail,
}

impl AdjustReport {
    fn push(&mut self, filename: &str, message: impl Into<String>) {
        self.messages
            .entry(filename.to_string())
            .or_default()
            .push(message.into());
    }

    fn fail(&mut self, filename: &str, step: &str, failure: AdjustFailure) {
        warn!(filename, step, error = %failure, "Adjustment step failed");
        self.failed += 1;
        self.push(filename, format!("{} failed: {}", step, failure));
    }
}

/// Build the annotation block for a tracked file.
pub fn annotation_lines(options: &AdjustOptions, file: &TrackedFile) -> Vec<String> {
    vec![
        format!("Deployment: {}", options.deployment),
        format!("Source: {}", options.source),
        format!("Filename: {}", file.filename),
        format!("Location: {}", file.location),
        format!("Name: {}", file.name),
    ]
}

/// Replace the annotation lines of an info text, keeping all other lines.
pub fn refresh_info(existing: &str, annotation: &[String]) -> String {
    let mut lines: Vec<&str> = existing
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !ANNOTATION_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        })
        .collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let mut out: Vec<&str> = lines;
    out.extend(annotation.iter().map(String::as_str));
    out.join("\n")
}

/// The adjustment executor
pub struct Adjuster<'a> {
    catalog: &'a dyn LiveCatalog,
    options: AdjustOptions,
}

impl<'a> Adjuster<'a> {
    pub fn new(catalog: &'a dyn LiveCatalog, options: AdjustOptions) -> Self {
        Self { catalog, options }
    }

    /// Create or update every flagged item, clearing flags in place on
    /// success.
    pub fn adjust(&self, current: &SnapshotView, files: &mut [TrackedFile]) -> AdjustReport {
        let mut report = AdjustReport::default();

        for file in files.iter_mut() {
            if file.removed.is_set() {
                continue;
            }
            if file.missing.is_set() {
                match self.create(current, file) {
                    Ok(id) => {
                        report.created += 1;
                        report.push(&file.filename, format!("created live object #{}", id));
                    }
                    Err(failure) => report.fail(&file.filename, "create", failure),
                }
            } else if file.modified.is_set() && file.is_bound() {
                match self.update(current, file) {
                    Ok(()) => {
                        report.updated += 1;
                        report.push(&file.filename, "content updated");
                    }
                    Err(failure) => report.fail(&file.filename, "update", failure),
                }
            }

            if self.options.relocate && file.is_bound() && needs_relocation(file) {
                match self.relocate(file) {
                    Ok(()) => {
                        report.relocated += 1;
                        report.push(&file.filename, "relocated");
                    }
                    Err(failure) => report.fail(&file.filename, "relocate", failure),
                }
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            relocated = report.relocated,
            failed = report.failed,
            "Adjustment finished"
        );
        report
    }

    fn create(
        &self,
        current: &SnapshotView,
        file: &mut TrackedFile,
    ) -> Result<ObjectId, AdjustFailure> {
        let blob = current.content(&file.filename)?;
        let parent = LocationResolver::new(self.catalog)
            .resolve(&file.location, true)?
            .parent();
        let name = self.free_name(parent, &file.name, None)?;
        let id = self.catalog.create_object(ObjectKind::Script)?;
        self.catalog.set_content(id, &blob)?;
        self.catalog.set_parent(id, parent)?;
        self.catalog.set_name(id, &name)?;
        file.live_object_id = id;
        file.missing.clear();
        self.annotate(id, file)?;
        debug!(filename = %file.filename, id, parent, name = %name, "Created live object");
        Ok(id)
    }

    fn update(&self, current: &SnapshotView, file: &mut TrackedFile) -> Result<(), AdjustFailure> {
        let blob = current.content(&file.filename)?;
        let id = file.live_object_id;
        if self.catalog.kind(id)? != Some(ObjectKind::Script) {
            return Err(CatalogError::NotAScript(id).into());
        }
        self.catalog.set_content(id, &blob)?;
        file.modified.clear();
        self.annotate(id, file)?;
        debug!(filename = %file.filename, id, "Updated live object content");
        Ok(())
    }

    fn relocate(&self, file: &mut TrackedFile) -> Result<(), AdjustFailure> {
        let id = file.live_object_id;
        let parent = LocationResolver::new(self.catalog)
            .resolve(&file.location, true)?
            .parent();
        if self.catalog.parent(id)? != Some(parent) {
            self.catalog.set_parent(id, parent)?;
        }
        if self.catalog.name(id)?.as_deref() != Some(file.name.as_str()) {
            let name = self.free_name(parent, &file.name, Some(id))?;
            self.catalog.set_name(id, &name)?;
        }
        file.moved.clear();
        file.orphan.clear();
        file.renamed.clear();
        self.annotate(id, file)?;
        debug!(filename = %file.filename, id, parent, "Relocated live object");
        Ok(())
    }

    fn annotate(&self, id: ObjectId, file: &TrackedFile) -> Result<(), CatalogError> {
        let existing = self.catalog.info(id)?;
        let refreshed = refresh_info(&existing, &annotation_lines(&self.options, file));
        if refreshed != existing {
            self.catalog.set_info(id, &refreshed)?;
        }
        Ok(())
    }

    /// First of `name`, `name (1)`, `name (2)` not used by a sibling other
    /// than `own`.
    fn free_name(
        &self,
        parent: ObjectId,
        name: &str,
        own: Option<ObjectId>,
    ) -> Result<String, AdjustFailure> {
        let mut taken = Vec::new();
        for child in self.catalog.children(parent)? {
            if Some(child) == own {
                continue;
            }
            if let Some(sibling) = self.catalog.name(child)? {
                taken.push(sibling);
            }
        }

        if !taken.iter().any(|t| t == name) {
            return Ok(name.to_string());
        }
        for suffix in 1..=MAX_NAME_SUFFIX {
            let candidate = format!("{} ({})", name, suffix);
            if !taken.contains(&candidate) {
                return Ok(candidate);
            }
        }
        Err(AdjustFailure::NameConflict {
            name: name.to_string(),
            attempts: MAX_NAME_SUFFIX,
        })
    }
}

fn needs_relocation(file: &TrackedFile) -> bool {
    [&file.moved, &file.orphan, &file.renamed]
        .iter()
        .any(|flag| flag.is_set())
}
