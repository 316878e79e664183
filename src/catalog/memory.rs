//! In-memory catalog, used by tests and dry runs.

use crate::catalog::{check_parent, LiveCatalog, LiveObject, ObjectKind};
use crate::error::CatalogError;
use crate::types::{ObjectId, ROOT_ID};
use parking_lot::RwLock;
use std::collections::BTreeMap;

struct Inner {
    objects: BTreeMap<ObjectId, LiveObject>,
    next_id: ObjectId,
}

/// Catalog held entirely in memory
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::with_first_id(10000)
    }

    /// Start allocating IDs at `first_id` (must be nonzero).
    pub fn with_first_id(first_id: ObjectId) -> Self {
        Self {
            inner: RwLock::new(Inner {
                objects: BTreeMap::new(),
                next_id: first_id.max(1),
            }),
        }
    }

    fn with_object<T>(
        &self,
        id: ObjectId,
        f: impl FnOnce(&mut LiveObject) -> T,
    ) -> Result<T, CatalogError> {
        let mut inner = self.inner.write();
        let object = inner
            .objects
            .get_mut(&id)
            .ok_or(CatalogError::ObjectNotFound(id))?;
        Ok(f(object))
    }
}

impl LiveCatalog for MemoryCatalog {
    fn exists(&self, id: ObjectId) -> Result<bool, CatalogError> {
        Ok(id == ROOT_ID || self.inner.read().objects.contains_key(&id))
    }

    fn kind(&self, id: ObjectId) -> Result<Option<ObjectKind>, CatalogError> {
        if id == ROOT_ID {
            return Ok(Some(ObjectKind::Container));
        }
        Ok(self.inner.read().objects.get(&id).map(|o| o.kind))
    }

    fn name(&self, id: ObjectId) -> Result<Option<String>, CatalogError> {
        if id == ROOT_ID {
            return Ok(Some(String::new()));
        }
        Ok(self.inner.read().objects.get(&id).map(|o| o.name.clone()))
    }

    fn parent(&self, id: ObjectId) -> Result<Option<ObjectId>, CatalogError> {
        Ok(self.inner.read().objects.get(&id).map(|o| o.parent))
    }

    fn children(&self, id: ObjectId) -> Result<Vec<ObjectId>, CatalogError> {
        Ok(self
            .inner
            .read()
            .objects
            .values()
            .filter(|o| o.parent == id)
            .map(|o| o.id)
            .collect())
    }

    fn content(&self, id: ObjectId) -> Result<Vec<u8>, CatalogError> {
        let inner = self.inner.read();
        let object = inner
            .objects
            .get(&id)
            .ok_or(CatalogError::ObjectNotFound(id))?;
        if object.kind != ObjectKind::Script {
            return Err(CatalogError::NotAScript(id));
        }
        Ok(object.content.clone())
    }

    fn info(&self, id: ObjectId) -> Result<String, CatalogError> {
        self.with_object(id, |o| o.info.clone())
    }

    fn create_object(&self, kind: ObjectKind) -> Result<ObjectId, CatalogError> {
        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.objects.insert(id, LiveObject::new(id, kind));
        Ok(id)
    }

    fn delete_object(&self, id: ObjectId) -> Result<(), CatalogError> {
        if !self.children(id)?.is_empty() {
            return Err(CatalogError::Storage(format!(
                "object #{} still has children",
                id
            )));
        }
        self.inner
            .write()
            .objects
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::ObjectNotFound(id))
    }

    fn set_content(&self, id: ObjectId, content: &[u8]) -> Result<(), CatalogError> {
        let kind = self.kind(id)?.ok_or(CatalogError::ObjectNotFound(id))?;
        if kind != ObjectKind::Script {
            return Err(CatalogError::NotAScript(id));
        }
        self.with_object(id, |o| o.content = content.to_vec())
    }

    fn set_name(&self, id: ObjectId, name: &str) -> Result<(), CatalogError> {
        self.with_object(id, |o| o.name = name.to_string())
    }

    fn set_parent(&self, id: ObjectId, parent: ObjectId) -> Result<(), CatalogError> {
        if !self.exists(id)? || id == ROOT_ID {
            return Err(CatalogError::ObjectNotFound(id));
        }
        check_parent(self, id, parent)?;
        self.with_object(id, |o| o.parent = parent)
    }

    fn set_info(&self, id: ObjectId, info: &str) -> Result<(), CatalogError> {
        self.with_object(id, |o| o.info = info.to_string())
    }

    fn list(&self) -> Result<Vec<LiveObject>, CatalogError> {
        Ok(self.inner.read().objects.values().cloned().collect())
    }
}
