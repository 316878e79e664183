//! Location Resolver
//!
//! Maps a logical location such as `Scripts\Helpers` onto the chain of
//! container objects in the live catalog. Segments are matched by exact
//! name under the current parent; when two sibling containers share a name
//! the first one found wins, which is a known limitation rather than a
//! guarantee.

use crate::catalog::{LiveCatalog, ObjectKind};
use crate::error::CatalogError;
use crate::types::{ObjectId, ROOT_ID};
use thiserror::Error;

/// Separator used when rendering locations.
pub const LOCATION_SEPARATOR: char = '\\';

/// Resolution failure
#[derive(Debug, Error)]
pub enum ResolutionFailure {
    #[error("No container named '{segment}' below #{parent}")]
    MissingSegment { segment: String, parent: ObjectId },

    #[error("Failed to create container '{segment}': {source}")]
    CreateFailed {
        segment: String,
        #[source]
        source: CatalogError,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Resolved container chain, immediate parent first.
///
/// An empty chain means the location is the catalog root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub chain: Vec<ObjectId>,
}

impl ResolvedLocation {
    /// The container a script at this location is parented under.
    pub fn parent(&self) -> ObjectId {
        self.chain.first().copied().unwrap_or(ROOT_ID)
    }
}

/// Split a location into its non-empty segments. Both `\` and `/` separate.
pub fn split_location(location: &str) -> Vec<&str> {
    location
        .split(['\\', '/'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Canonical rendering of a location (segments joined with `\`).
pub fn normalize_location(location: &str) -> String {
    split_location(location).join(&LOCATION_SEPARATOR.to_string())
}

/// Location resolver over a live catalog
pub struct LocationResolver<'a> {
    catalog: &'a dyn LiveCatalog,
}

impl<'a> LocationResolver<'a> {
    pub fn new(catalog: &'a dyn LiveCatalog) -> Self {
        Self { catalog }
    }

    /// Find a child container of `parent` by exact name.
    fn find_container(
        &self,
        parent: ObjectId,
        name: &str,
    ) -> Result<Option<ObjectId>, CatalogError> {
        for child in self.catalog.children(parent)? {
            if self.catalog.kind(child)? != Some(ObjectKind::Container) {
                continue;
            }
            if self.catalog.name(child)?.as_deref() == Some(name) {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Walk `location` from the root.
    ///
    /// On a missing segment this fails immediately unless `create_missing`
    /// is set, in which case the container is created and the walk goes on.
    /// Nothing is returned for a partially resolved path.
    pub fn resolve(
        &self,
        location: &str,
        create_missing: bool,
    ) -> Result<ResolvedLocation, ResolutionFailure> {
        let mut current = ROOT_ID;
        let mut chain = Vec::new();

        for segment in split_location(location) {
            let next = match self.find_container(current, segment)? {
                Some(id) => id,
                None if create_missing => self.create_container(current, segment)?,
                None => {
                    return Err(ResolutionFailure::MissingSegment {
                        segment: segment.to_string(),
                        parent: current,
                    })
                }
            };
            chain.push(next);
            current = next;
        }

        chain.reverse();
        Ok(ResolvedLocation { chain })
    }

    fn create_container(
        &self,
        parent: ObjectId,
        segment: &str,
    ) -> Result<ObjectId, ResolutionFailure> {
        let wrap = |source| ResolutionFailure::CreateFailed {
            segment: segment.to_string(),
            source,
        };
        let id = self
            .catalog
            .create_object(ObjectKind::Container)
            .map_err(wrap)?;
        self.catalog.set_name(id, segment).map_err(wrap)?;
        self.catalog.set_parent(id, parent).map_err(wrap)?;
        tracing::debug!(container = id, parent, segment, "Created location container");
        Ok(id)
    }

    /// Render the container chain above `id` as a location string.
    pub fn full_path(&self, id: ObjectId) -> Result<String, CatalogError> {
        let mut segments = Vec::new();
        let mut cursor = self.catalog.parent(id)?;
        while let Some(ancestor) = cursor {
            if ancestor == ROOT_ID {
                break;
            }
            segments.push(self.catalog.name(ancestor)?.unwrap_or_default());
            cursor = self.catalog.parent(ancestor)?;
        }
        segments.reverse();
        Ok(segments.join(&LOCATION_SEPARATOR.to_string()))
    }
}
