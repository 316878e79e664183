//! Live Catalog
//!
//! Accessors for the host-managed object catalog holding deployed scripts
//! and their containers. The reconciler only ever holds weak references
//! (object IDs) into it and tolerates objects disappearing at any time.

pub mod memory;
pub mod persistence;

pub use memory::MemoryCatalog;
pub use persistence::SledCatalog;

use crate::error::CatalogError;
use crate::types::{ObjectId, ROOT_ID};
use serde::{Deserialize, Serialize};

/// Object kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Container,
    Script,
}

/// LiveObject: one host catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub name: String,
    pub parent: ObjectId,
    pub content: Vec<u8>,
    pub info: String,
}

impl LiveObject {
    pub fn new(id: ObjectId, kind: ObjectKind) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
            parent: ROOT_ID,
            content: Vec::new(),
            info: String::new(),
        }
    }
}

/// Live catalog interface
///
/// The root (`ROOT_ID`) always exists, has no parent and an empty name.
pub trait LiveCatalog {
    fn exists(&self, id: ObjectId) -> Result<bool, CatalogError>;
    fn kind(&self, id: ObjectId) -> Result<Option<ObjectKind>, CatalogError>;
    fn name(&self, id: ObjectId) -> Result<Option<String>, CatalogError>;
    fn parent(&self, id: ObjectId) -> Result<Option<ObjectId>, CatalogError>;
    fn children(&self, id: ObjectId) -> Result<Vec<ObjectId>, CatalogError>;
    fn content(&self, id: ObjectId) -> Result<Vec<u8>, CatalogError>;
    fn info(&self, id: ObjectId) -> Result<String, CatalogError>;

    fn create_object(&self, kind: ObjectKind) -> Result<ObjectId, CatalogError>;
    fn delete_object(&self, id: ObjectId) -> Result<(), CatalogError>;
    fn set_content(&self, id: ObjectId, content: &[u8]) -> Result<(), CatalogError>;
    fn set_name(&self, id: ObjectId, name: &str) -> Result<(), CatalogError>;
    fn set_parent(&self, id: ObjectId, parent: ObjectId) -> Result<(), CatalogError>;
    fn set_info(&self, id: ObjectId, info: &str) -> Result<(), CatalogError>;

    /// All objects except the root, ordered by ID.
    fn list(&self) -> Result<Vec<LiveObject>, CatalogError>;

    /// Byte-for-byte comparison of a live object's content with a blob.
    fn content_equals(&self, id: ObjectId, bytes: &[u8]) -> Result<bool, CatalogError> {
        Ok(self.content(id)? == bytes)
    }

    /// Create a named container under `parent`.
    fn add_container(&self, parent: ObjectId, name: &str) -> Result<ObjectId, CatalogError> {
        let id = self.create_object(ObjectKind::Container)?;
        self.set_name(id, name)?;
        self.set_parent(id, parent)?;
        Ok(id)
    }

    /// Create a named script with content under `parent`.
    fn add_script(
        &self,
        parent: ObjectId,
        name: &str,
        content: &[u8],
    ) -> Result<ObjectId, CatalogError> {
        let id = self.create_object(ObjectKind::Script)?;
        self.set_content(id, content)?;
        self.set_name(id, name)?;
        self.set_parent(id, parent)?;
        Ok(id)
    }
}

/// Parent validation shared by the catalog implementations.
pub(crate) fn check_parent(
    catalog: &dyn LiveCatalog,
    id: ObjectId,
    parent: ObjectId,
) -> Result<(), CatalogError> {
    if parent == id {
        return Err(CatalogError::Storage(format!(
            "object #{} cannot be its own parent",
            id
        )));
    }
    if parent != ROOT_ID && catalog.kind(parent)? != Some(ObjectKind::Container) {
        return Err(CatalogError::NotAContainer(parent));
    }
    let mut cursor = catalog.parent(parent)?;
    while let Some(ancestor) = cursor {
        if ancestor == id {
            return Err(CatalogError::Storage(format!(
                "moving #{} under #{} would create a cycle",
                id, parent
            )));
        }
        cursor = catalog.parent(ancestor)?;
    }
    Ok(())
}
