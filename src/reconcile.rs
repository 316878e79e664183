//! File-State Reconciler
//!
//! Compares the top and current snapshots, the previously tracked list and
//! the live catalog, and classifies every filename into a fresh
//! `TrackedFile`. Flags are evaluated independently; one file can be both
//! `outdated` and `modified`. The result is deterministic for identical
//! inputs, so re-running without external changes reproduces the persisted
//! list byte for byte.
//!
//! Passes, joined on filename:
//! 1. files of the current manifest (binding, content, name, outdated)
//! 2. previously bound files gone from the current manifest (`removed`)
//! 3. files only visible at the top of the branch (`added`)
//! 4. topology of every bound object (`missing`, `orphan`, `moved`)
//! 5. required keywords, when a resolver is configured (`unknown`)

pub mod state;

pub use state::{derive_state, AggregateState, FlagCounts};

use crate::catalog::LiveCatalog;
use crate::error::CatalogError;
use crate::keywords::KeywordResolver;
use crate::location::{LocationResolver, ResolutionFailure};
use crate::manifest::{changed_files, SnapshotView};
use crate::tracked::{sort_tracked, TrackedFile};
use crate::types::{Flag, ObjectId, UNBOUND};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Human-readable reasons per filename, for audit only.
pub type MessageTrail = BTreeMap<String, Vec<String>>;

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub files: Vec<TrackedFile>,
    pub messages: MessageTrail,
}

impl ReconcileOutcome {
    pub fn state(&self) -> AggregateState {
        derive_state(&self.files)
    }

    pub fn counts(&self) -> FlagCounts {
        FlagCounts::count(&self.files)
    }
}

#[derive(Default)]
struct Trail {
    messages: MessageTrail,
}

impl Trail {
    fn push(&mut self, filename: &str, message: impl Into<String>) {
        let message = message.into();
        debug!(filename, "{}", message);
        self.messages
            .entry(filename.to_string())
            .or_default()
            .push(message);
    }
}

/// Outcome of comparing a bound object's content with a blob.
enum ContentCheck {
    Equal,
    Differs,
    Vanished,
}

/// The reconciliation engine
pub struct Reconciler<'a> {
    catalog: &'a dyn LiveCatalog,
    keywords: Option<&'a dyn KeywordResolver>,
}

impl<'a> Reconciler<'a> {
    pub fn new(catalog: &'a dyn LiveCatalog) -> Self {
        Self {
            catalog,
            keywords: None,
        }
    }

    /// Enable the keyword validation pass.
    pub fn with_keywords(mut self, resolver: &'a dyn KeywordResolver) -> Self {
        self.keywords = Some(resolver);
        self
    }

    /// Run all passes and return the new, sorted tracked list.
    ///
    /// Only catalog storage failures are returned as errors; everything
    /// about individual files is expressed through flags and messages.
    pub fn reconcile(
        &self,
        top: &SnapshotView,
        current: &SnapshotView,
        previous: &[TrackedFile],
    ) -> Result<ReconcileOutcome, CatalogError> {
        let changed = changed_files(top, current);
        let previous_by_name: HashMap<&str, &TrackedFile> = previous
            .iter()
            .map(|f| (f.filename.as_str(), f))
            .collect();

        let mut result: BTreeMap<String, TrackedFile> = BTreeMap::new();
        let mut trail = Trail::default();

        self.pass_current(top, current, &previous_by_name, &changed, &mut result, &mut trail)?;
        self.pass_removed(previous, &mut result, &mut trail);
        self.pass_added(top, &mut result, &mut trail);
        self.pass_topology(&mut result, &mut trail)?;
        if let Some(resolver) = self.keywords {
            self.pass_keywords(resolver, &mut result, &mut trail);
        }

        let mut files: Vec<TrackedFile> = result.into_values().collect();
        sort_tracked(&mut files);

        let outcome = ReconcileOutcome {
            files,
            messages: trail.messages,
        };
        let counts = outcome.counts();
        info!(
            files = outcome.files.len(),
            changed = changed.len(),
            added = counts.added,
            removed = counts.removed,
            missing = counts.missing,
            modified = counts.modified,
            outdated = counts.outdated,
            state = %outcome.state(),
            "Reconciliation finished"
        );
        Ok(outcome)
    }

    fn pass_current(
        &self,
        top: &SnapshotView,
        current: &SnapshotView,
        previous: &HashMap<&str, &TrackedFile>,
        changed: &BTreeSet<String>,
        result: &mut BTreeMap<String, TrackedFile>,
        trail: &mut Trail,
    ) -> Result<(), CatalogError> {
        for descriptor in &current.manifest().files {
            let filename = descriptor.filename.as_str();
            let prior = previous.get(filename).copied();

            let mut file = TrackedFile::from_descriptor(descriptor);
            if let Some(top_entry) = top.manifest().get(filename) {
                file.required_keywords = top_entry.required_keywords.clone();
            }

            let mut id = prior.map(|p| p.live_object_id).unwrap_or(UNBOUND);
            if id != UNBOUND && !self.catalog.exists(id)? {
                trail.push(filename, format!("live object #{} no longer exists", id));
                id = UNBOUND;
                file.missing = Flag::Present;
            }
            file.live_object_id = id;

            let blob = match current.content(filename) {
                Ok(blob) => Some(blob),
                Err(e) => {
                    trail.push(filename, format!("content unreadable: {}", e));
                    None
                }
            };

            match blob {
                None if !file.is_bound() => {
                    file.lost = match prior {
                        Some(p) if p.lost.is_set() => p.lost.clone(),
                        _ => Flag::Present,
                    };
                    file.missing = Flag::Present;
                }
                None => {
                    file.lost = Flag::detail(format!(
                        "no content in revision {}",
                        current.manifest().version
                    ));
                    self.check_name(&mut file, trail)?;
                    self.check_outdated(&mut file, changed, trail);
                }
                Some(_) if !file.is_bound() => {
                    file.missing = Flag::Present;
                    trail.push(filename, "no live object deployed");
                }
                Some(blob) => {
                    match self.check_content(id, &blob)? {
                        ContentCheck::Equal => {}
                        ContentCheck::Differs => {
                            file.modified = Flag::Present;
                            trail.push(filename, format!("live object #{} was modified", id));
                        }
                        ContentCheck::Vanished => {
                            file.live_object_id = UNBOUND;
                            file.missing = Flag::Present;
                            trail.push(filename, format!("live object #{} vanished", id));
                        }
                    }
                    if file.is_bound() {
                        self.check_name(&mut file, trail)?;
                        self.check_outdated(&mut file, changed, trail);
                    }
                }
            }

            result.insert(file.filename.clone(), file);
        }
        Ok(())
    }

    fn check_content(&self, id: ObjectId, blob: &[u8]) -> Result<ContentCheck, CatalogError> {
        match self.catalog.content_equals(id, blob) {
            Ok(true) => Ok(ContentCheck::Equal),
            Ok(false) => Ok(ContentCheck::Differs),
            Err(CatalogError::NotAScript(_)) => Ok(ContentCheck::Differs),
            Err(CatalogError::ObjectNotFound(_)) => Ok(ContentCheck::Vanished),
            Err(e) => Err(e),
        }
    }

    fn check_name(&self, file: &mut TrackedFile, trail: &mut Trail) -> Result<(), CatalogError> {
        if let Some(live_name) = self.catalog.name(file.live_object_id)? {
            if live_name != file.name {
                trail.push(
                    &file.filename,
                    format!("live object is named '{}' instead of '{}'", live_name, file.name),
                );
                file.renamed = Flag::Detail(live_name);
            }
        }
        Ok(())
    }

    fn check_outdated(
        &self,
        file: &mut TrackedFile,
        changed: &BTreeSet<String>,
        trail: &mut Trail,
    ) {
        if changed.contains(&file.filename) {
            file.outdated = Flag::Present;
            trail.push(&file.filename, "newer content available upstream");
        }
    }

    fn pass_removed(
        &self,
        previous: &[TrackedFile],
        result: &mut BTreeMap<String, TrackedFile>,
        trail: &mut Trail,
    ) {
        for prior in previous {
            if result.contains_key(&prior.filename) {
                continue;
            }
            // Unbound entries are only kept once they were already removed.
            if !prior.is_bound() && !prior.removed.is_set() {
                continue;
            }
            let mut file = TrackedFile::new(&prior.filename, &prior.name, &prior.location);
            file.required_keywords = prior.required_keywords.clone();
            file.live_object_id = prior.live_object_id;
            file.removed = Flag::Present;
            if !file.is_bound() {
                file.missing = Flag::Present;
            }
            trail.push(&file.filename, "no longer part of the current revision");
            result.insert(file.filename.clone(), file);
        }
    }

    fn pass_added(
        &self,
        top: &SnapshotView,
        result: &mut BTreeMap<String, TrackedFile>,
        trail: &mut Trail,
    ) {
        for descriptor in &top.manifest().files {
            if result.contains_key(&descriptor.filename) {
                continue;
            }
            let mut file = TrackedFile::from_descriptor(descriptor);
            file.added = Flag::Present;
            trail.push(&file.filename, "new upstream, not yet adopted");
            result.insert(file.filename.clone(), file);
        }
    }

    fn pass_topology(
        &self,
        result: &mut BTreeMap<String, TrackedFile>,
        trail: &mut Trail,
    ) -> Result<(), CatalogError> {
        let resolver = LocationResolver::new(self.catalog);
        for file in result.values_mut() {
            if !file.is_bound() {
                continue;
            }
            let id = file.live_object_id;
            if !self.catalog.exists(id)? {
                file.live_object_id = UNBOUND;
                file.missing = Flag::Present;
                trail.push(&file.filename, format!("live object #{} no longer exists", id));
                continue;
            }

            match resolver.resolve(&file.location, false) {
                Ok(resolved) => {
                    let actual = self.catalog.parent(id)?;
                    if actual != Some(resolved.parent()) {
                        let path = resolver.full_path(id)?;
                        let message = format!(
                            "live object sits in '{}' instead of '{}'",
                            path, file.location
                        );
                        trail.push(&file.filename, message);
                        file.moved = if path.is_empty() {
                            Flag::Present
                        } else {
                            Flag::Detail(path)
                        };
                    }
                }
                Err(ResolutionFailure::Catalog(e)) => return Err(e),
                Err(failure) => {
                    file.orphan = Flag::Present;
                    trail.push(&file.filename, format!("location unresolvable: {}", failure));
                }
            }
        }
        Ok(())
    }

    fn pass_keywords(
        &self,
        resolver: &dyn KeywordResolver,
        result: &mut BTreeMap<String, TrackedFile>,
        trail: &mut Trail,
    ) {
        for file in result.values_mut() {
            if !file.is_bound() {
                continue;
            }
            let failed: Vec<&str> = file
                .required_keywords
                .iter()
                .filter(|keyword| resolver.resolve(keyword).is_none())
                .map(String::as_str)
                .collect();
            if failed.is_empty() {
                file.unknown.clear();
            } else {
                let list = failed.join(", ");
                trail.push(&file.filename, format!("unresolved keywords: {}", list));
                file.unknown = Flag::Detail(list);
            }
        }
    }
}
