//! Check and adjustment passes of one deployment instance.
//!
//! A pass holds the instance lock throughout. Structural failures (sync,
//! manifest) abort the pass, persist `Faulty` and leave the tracked list
//! untouched; per-item problems only show up as flags and messages.

use crate::adjust::{AdjustOptions, AdjustReport, Adjuster};
use crate::catalog::LiveCatalog;
use crate::diff;
use crate::error::ApiError;
use crate::keywords::KeywordResolver;
use crate::lock::InstanceLock;
use crate::manifest::SnapshotView;
use crate::reconcile::{derive_state, AggregateState, FlagCounts, MessageTrail, Reconciler};
use crate::snapshot::{SnapshotKind, SnapshotLayout, SnapshotSync, VersionSelector};
use crate::tracked::{write_atomic, TrackedFile, TrackedFileStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

pub const STATE_FILE: &str = "state.json";

/// Persisted per-instance status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    /// Adopted revision; `current` is pinned to it.
    #[serde(default)]
    pub commit: Option<String>,

    #[serde(default)]
    pub state: AggregateState,

    /// Unix seconds of the last completed check
    #[serde(default)]
    pub last_check: Option<i64>,

    /// Unix seconds of the last completed adjustment
    #[serde(default)]
    pub last_adjustment: Option<i64>,

    #[serde(default)]
    pub top_version: Option<String>,

    #[serde(default)]
    pub current_version: Option<String>,

    /// Reason of the last structural failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

/// JSON store for `state.json`
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<InstanceState, ApiError> {
        if !self.path.exists() {
            return Ok(InstanceState::default());
        }
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::StateError(format!(
                "Failed to parse state file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub fn save(&self, state: &InstanceState) -> Result<(), ApiError> {
        let mut text = serde_json::to_string_pretty(state)
            .map_err(|e| ApiError::StateError(format!("Failed to serialize state: {}", e)))?;
        text.push('\n');
        write_atomic(&self.path, text.as_bytes())
    }
}

/// Summary of a completed pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassSummary {
    pub state: AggregateState,
    pub files: usize,
    pub counts: FlagCounts,
    /// Revision materialized in `current`
    pub revision: String,
    pub messages: MessageTrail,
    pub adjustment: Option<AdjustReport>,
}

/// Result of a check or adjustment request
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    Completed(PassSummary),
    /// Lock contended or instance disabled; nothing changed.
    Skipped { reason: String },
}

/// One deployment instance and its collaborators
pub struct Instance<'a> {
    name: String,
    source_label: String,
    layout: SnapshotLayout,
    data_dir: PathBuf,
    lock_timeout: Duration,
    disabled: bool,
    sync: &'a dyn SnapshotSync,
    catalog: &'a dyn LiveCatalog,
    keywords: Option<&'a dyn KeywordResolver>,
}

impl<'a> Instance<'a> {
    pub fn new(
        name: &str,
        layout: SnapshotLayout,
        data_dir: impl Into<PathBuf>,
        sync: &'a dyn SnapshotSync,
        catalog: &'a dyn LiveCatalog,
    ) -> Self {
        Self {
            name: name.to_string(),
            source_label: sync.describe(),
            layout,
            data_dir: data_dir.into(),
            lock_timeout: Duration::from_millis(5000),
            disabled: false,
            sync,
            catalog,
            keywords: None,
        }
    }

    pub fn with_keywords(mut self, resolver: &'a dyn KeywordResolver) -> Self {
        self.keywords = Some(resolver);
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &SnapshotLayout {
        &self.layout
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn tracked_store(&self) -> TrackedFileStore {
        TrackedFileStore::in_dir(&self.data_dir)
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::in_dir(&self.data_dir)
    }

    pub fn diff_artifacts(&self) -> diff::DiffArtifacts {
        diff::DiffArtifacts::in_dir(&self.data_dir)
    }

    fn lock(&self) -> Result<Option<InstanceLock>, ApiError> {
        let lock = InstanceLock::acquire(&self.data_dir, self.lock_timeout)?;
        if lock.is_none() {
            warn!(
                instance = %self.name,
                timeout_ms = self.lock_timeout.as_millis() as u64,
                "Instance is locked, skipping pass"
            );
        }
        Ok(lock)
    }

    /// Refresh snapshots, reconcile and persist the classified list.
    pub fn perform_check(&self) -> Result<PassOutcome, ApiError> {
        if self.disabled {
            info!(instance = %self.name, "Instance disabled, skipping check");
            return Ok(PassOutcome::Skipped {
                reason: "instance is disabled".to_string(),
            });
        }
        let Some(_lock) = self.lock()? else {
            return Ok(skipped_locked());
        };

        let store = self.state_store();
        let mut state = store.load()?;
        let pinned = VersionSelector::pinned_or_branch(state.commit.as_deref());

        match self.run_check(&mut state, &pinned) {
            Ok(summary) => {
                store.save(&state)?;
                self.write_diffs();
                info!(
                    instance = %self.name,
                    state = %summary.state,
                    files = summary.files,
                    "Check completed"
                );
                Ok(PassOutcome::Completed(summary))
            }
            Err(e) => Err(self.record_fault(&store, state, e)),
        }
    }

    fn run_check(
        &self,
        state: &mut InstanceState,
        pinned: &VersionSelector,
    ) -> Result<PassSummary, ApiError> {
        let (top, current, revision) = self.refresh(pinned)?;
        let previous = self.tracked_store().load()?;
        let outcome = self.reconciler().reconcile(&top, &current, &previous)?;

        self.tracked_store().save(&outcome.files)?;

        if state.commit.is_none() {
            state.commit = Some(revision.clone());
        }
        state.state = outcome.state();
        state.last_check = Some(Utc::now().timestamp());
        state.top_version = Some(top.manifest().version.clone());
        state.current_version = Some(current.manifest().version.clone());
        state.fault = None;

        Ok(PassSummary {
            state: state.state,
            files: outcome.files.len(),
            counts: outcome.counts(),
            revision,
            messages: outcome.messages,
            adjustment: None,
        })
    }

    /// Move `current` to the branch tip, reconcile, create or update live
    /// objects and adopt the new revision.
    pub fn perform_adjustment(&self, relocate: bool) -> Result<PassOutcome, ApiError> {
        if self.disabled {
            return Err(ApiError::InstanceDisabled(self.name.clone()));
        }
        let Some(_lock) = self.lock()? else {
            return Ok(skipped_locked());
        };

        let store = self.state_store();
        let mut state = store.load()?;

        match self.run_adjustment(&mut state, relocate) {
            Ok(summary) => {
                store.save(&state)?;
                self.write_diffs();
                info!(
                    instance = %self.name,
                    state = %summary.state,
                    revision = %summary.revision,
                    "Adjustment completed"
                );
                Ok(PassOutcome::Completed(summary))
            }
            Err(e) => Err(self.record_fault(&store, state, e)),
        }
    }

    fn run_adjustment(
        &self,
        state: &mut InstanceState,
        relocate: bool,
    ) -> Result<PassSummary, ApiError> {
        let (top, current, revision) = self.refresh(&VersionSelector::Branch)?;
        let previous = self.tracked_store().load()?;
        let outcome = self.reconciler().reconcile(&top, &current, &previous)?;

        let mut files = outcome.files;
        let options = AdjustOptions {
            deployment: self.name.clone(),
            source: self.source_label.clone(),
            relocate,
        };
        let report = Adjuster::new(self.catalog, options).adjust(&current, &mut files);

        // Classify the adjusted objects the same way the next check will.
        let settled = self.reconciler().reconcile(&top, &current, &files)?;
        let files = settled.files;
        self.tracked_store().save(&files)?;

        let now = Utc::now().timestamp();
        state.commit = Some(revision.clone());
        state.state = derive_state(&files);
        state.last_check = Some(now);
        state.last_adjustment = Some(now);
        state.top_version = Some(top.manifest().version.clone());
        state.current_version = Some(current.manifest().version.clone());
        state.fault = None;

        let mut messages = settled.messages;
        for (filename, lines) in &report.messages {
            messages
                .entry(filename.clone())
                .or_default()
                .extend(lines.iter().cloned());
        }

        Ok(PassSummary {
            state: state.state,
            files: files.len(),
            counts: FlagCounts::count(&files),
            revision,
            messages,
            adjustment: Some(report),
        })
    }

    /// Sync `top` to the branch tip and `current` to `selector`, then load
    /// both manifests.
    fn refresh(
        &self,
        selector: &VersionSelector,
    ) -> Result<(SnapshotView, SnapshotView, String), ApiError> {
        self.sync.sync(SnapshotKind::Top, &VersionSelector::Branch)?;
        let current = self.sync.sync(SnapshotKind::Current, selector)?;
        let top_view = SnapshotView::open(self.layout.top())?;
        let current_view = SnapshotView::open(self.layout.current())?;
        Ok((top_view, current_view, current.revision))
    }

    fn reconciler(&self) -> Reconciler<'a> {
        let reconciler = Reconciler::new(self.catalog);
        match self.keywords {
            Some(resolver) => reconciler.with_keywords(resolver),
            None => reconciler,
        }
    }

    fn write_diffs(&self) {
        let files = match self.tracked_store().load() {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Cannot reload tracked list for diffs");
                return;
            }
        };
        if let Err(e) = diff::write_artifacts(self.catalog, &files, &self.layout, &self.data_dir) {
            warn!(error = %e, "Diff artifacts not written");
        }
    }

    fn record_fault(
        &self,
        store: &StateStore,
        mut state: InstanceState,
        err: ApiError,
    ) -> ApiError {
        error!(instance = %self.name, error = %err, "Pass failed");
        state.state = AggregateState::Faulty;
        state.fault = Some(err.to_string());
        if let Err(save_err) = store.save(&state) {
            error!(error = %save_err, "Failed to persist faulty state");
        }
        err
    }

    /// Explicitly drop tracked entries and re-derive the state.
    pub fn forget(&self, filenames: &[String]) -> Result<ForgetOutcome, ApiError> {
        forget_tracked(&self.data_dir, self.lock_timeout, filenames)
    }

    pub fn tracked_files(&self) -> Result<Vec<TrackedFile>, ApiError> {
        self.tracked_store().load()
    }

    pub fn state(&self) -> Result<InstanceState, ApiError> {
        self.state_store().load()
    }
}

/// Result of a forget request
#[derive(Debug, Clone, PartialEq)]
pub enum ForgetOutcome {
    Forgotten { removed: usize, summary: PassSummary },
    Skipped { reason: String },
}

/// Drop entries from the tracked list of the instance stored in `data_dir`.
///
/// Needs neither a source nor the live catalog, only the instance lock.
pub fn forget_tracked(
    data_dir: &Path,
    lock_timeout: Duration,
    filenames: &[String],
) -> Result<ForgetOutcome, ApiError> {
    let Some(_lock) = InstanceLock::acquire(data_dir, lock_timeout)? else {
        warn!(data_dir = %data_dir.display(), "Instance is locked, skipping forget");
        return Ok(ForgetOutcome::Skipped {
            reason: "instance is locked by another pass".to_string(),
        });
    };
    let tracked = TrackedFileStore::in_dir(data_dir);
    let removed = tracked.forget(filenames)?;
    if removed == 0 {
        return Err(ApiError::TrackedFileNotFound(filenames.join(", ")));
    }

    let files = tracked.load()?;
    let store = StateStore::in_dir(data_dir);
    let mut state = store.load()?;
    if state.state != AggregateState::Faulty {
        state.state = derive_state(&files);
    }
    store.save(&state)?;
    info!(data_dir = %data_dir.display(), removed, "Forgot tracked entries");

    Ok(ForgetOutcome::Forgotten {
        removed,
        summary: PassSummary {
            state: state.state,
            files: files.len(),
            counts: FlagCounts::count(&files),
            revision: state.commit.clone().unwrap_or_default(),
            messages: MessageTrail::new(),
            adjustment: None,
        },
    })
}

fn skipped_locked() -> PassOutcome {
    PassOutcome::Skipped {
        reason: "instance is locked by another pass".to_string(),
    }
}
