//! Aggregate state derivation over a tracked list.

use crate::tracked::TrackedFile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Single status summarizing the whole tracked list.
///
/// Numeric codes are stable; they are what the host status variable shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AggregateState {
    #[default]
    Unknown,
    Synced,
    Unclear,
    Modified,
    Updateable,
    Faulty,
}

impl AggregateState {
    pub fn code(self) -> u8 {
        match self {
            AggregateState::Unknown => 0,
            AggregateState::Synced => 1,
            AggregateState::Unclear => 2,
            AggregateState::Modified => 3,
            AggregateState::Updateable => 4,
            AggregateState::Faulty => 255,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AggregateState::Unknown => "unknown",
            AggregateState::Synced => "synced",
            AggregateState::Unclear => "unclear",
            AggregateState::Modified => "local modified",
            AggregateState::Updateable => "updateable",
            AggregateState::Faulty => "faulty",
        }
    }
}

impl fmt::Display for AggregateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-flag counts over a tracked list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagCounts {
    pub added: usize,
    pub removed: usize,
    pub lost: usize,
    pub moved: usize,
    pub orphan: usize,
    pub missing: usize,
    pub modified: usize,
    pub renamed: usize,
    pub outdated: usize,
    pub unknown: usize,
}

impl FlagCounts {
    pub fn count(files: &[TrackedFile]) -> Self {
        let mut counts = FlagCounts::default();
        for file in files {
            counts.added += file.added.is_set() as usize;
            counts.removed += file.removed.is_set() as usize;
            counts.lost += file.lost.is_set() as usize;
            counts.moved += file.moved.is_set() as usize;
            counts.orphan += file.orphan.is_set() as usize;
            counts.missing += file.missing.is_set() as usize;
            counts.modified += file.modified.is_set() as usize;
            counts.renamed += file.renamed.is_set() as usize;
            counts.outdated += file.outdated.is_set() as usize;
            counts.unknown += file.unknown.is_set() as usize;
        }
        counts
    }

    /// Derive the aggregate state. Check order is significant: unclear
    /// conditions dominate local modification, which dominates updates.
    pub fn state(&self) -> AggregateState {
        if self.lost + self.missing + self.moved + self.renamed + self.orphan + self.unknown > 0 {
            AggregateState::Unclear
        } else if self.modified > 0 {
            AggregateState::Modified
        } else if self.added + self.removed + self.outdated > 0 {
            AggregateState::Updateable
        } else {
            AggregateState::Synced
        }
    }
}

/// Derive the aggregate state of a tracked list.
pub fn derive_state(files: &[TrackedFile]) -> AggregateState {
    FlagCounts::count(files).state()
}
