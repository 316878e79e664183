//! Persistence layer for the live catalog
//!
//! Stands in for the host object catalog when running outside the host:
//! objects are bincode records in a sled tree keyed by big-endian ID.

use crate::catalog::{check_parent, LiveCatalog, LiveObject, ObjectKind};
use crate::error::CatalogError;
use crate::types::{ObjectId, ROOT_ID};
use bincode;
use sled;
use std::path::Path;

const OBJECTS_TREE: &str = "objects";

/// IDs are allocated above this floor so they never collide with `ROOT_ID`.
const ID_FLOOR: u64 = 10000;

/// Sled-based implementation of LiveCatalog
pub struct SledCatalog {
    db: sled::Db,
    objects: sled::Tree,
}

fn storage_error(context: &str, e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Storage(format!("{}: {}", context, e))
}

impl SledCatalog {
    /// Open (or create) a catalog database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let db = sled::open(path).map_err(|e| storage_error("Failed to open sled database", e))?;
        Self::from_db(db)
    }

    /// Use an already open database
    pub fn from_db(db: sled::Db) -> Result<Self, CatalogError> {
        let objects = db
            .open_tree(OBJECTS_TREE)
            .map_err(|e| storage_error("Failed to open objects tree", e))?;
        Ok(Self { db, objects })
    }

    fn get(&self, id: ObjectId) -> Result<Option<LiveObject>, CatalogError> {
        match self
            .objects
            .get(id.to_be_bytes())
            .map_err(|e| storage_error("Failed to get object", e))?
        {
            Some(value) => {
                let object: LiveObject = bincode::deserialize(&value)
                    .map_err(|e| storage_error("Failed to deserialize object", e))?;
                Ok(Some(object))
            }
            None => Ok(None),
        }
    }

    fn put(&self, object: &LiveObject) -> Result<(), CatalogError> {
        let value = bincode::serialize(object)
            .map_err(|e| storage_error("Failed to serialize object", e))?;
        self.objects
            .insert(object.id.to_be_bytes(), value)
            .map_err(|e| storage_error("Failed to put object", e))?;
        Ok(())
    }

    fn update(
        &self,
        id: ObjectId,
        f: impl FnOnce(&mut LiveObject),
    ) -> Result<(), CatalogError> {
        let mut object = self.get(id)?.ok_or(CatalogError::ObjectNotFound(id))?;
        f(&mut object);
        self.put(&object)
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), CatalogError> {
        self.db
            .flush()
            .map_err(|e| storage_error("Failed to flush database", e))?;
        Ok(())
    }
}

impl LiveCatalog for SledCatalog {
    fn exists(&self, id: ObjectId) -> Result<bool, CatalogError> {
        if id == ROOT_ID {
            return Ok(true);
        }
        self.objects
            .contains_key(id.to_be_bytes())
            .map_err(|e| storage_error("Failed to check object existence", e))
    }

    fn kind(&self, id: ObjectId) -> Result<Option<ObjectKind>, CatalogError> {
        if id == ROOT_ID {
            return Ok(Some(ObjectKind::Container));
        }
        Ok(self.get(id)?.map(|o| o.kind))
    }

    fn name(&self, id: ObjectId) -> Result<Option<String>, CatalogError> {
        if id == ROOT_ID {
            return Ok(Some(String::new()));
        }
        Ok(self.get(id)?.map(|o| o.name))
    }

    fn parent(&self, id: ObjectId) -> Result<Option<ObjectId>, CatalogError> {
        if id == ROOT_ID {
            return Ok(None);
        }
        Ok(self.get(id)?.map(|o| o.parent))
    }

    fn children(&self, id: ObjectId) -> Result<Vec<ObjectId>, CatalogError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|o| o.parent == id)
            .map(|o| o.id)
            .collect())
    }

    fn content(&self, id: ObjectId) -> Result<Vec<u8>, CatalogError> {
        let object = self.get(id)?.ok_or(CatalogError::ObjectNotFound(id))?;
        if object.kind != ObjectKind::Script {
            return Err(CatalogError::NotAScript(id));
        }
        Ok(object.content)
    }

    fn info(&self, id: ObjectId) -> Result<String, CatalogError> {
        Ok(self.get(id)?.ok_or(CatalogError::ObjectNotFound(id))?.info)
    }

    fn create_object(&self, kind: ObjectKind) -> Result<ObjectId, CatalogError> {
        let id = self
            .db
            .generate_id()
            .map_err(|e| storage_error("Failed to allocate object id", e))?
            + ID_FLOOR;
        self.put(&LiveObject::new(id, kind))?;
        Ok(id)
    }

    fn delete_object(&self, id: ObjectId) -> Result<(), CatalogError> {
        if !self.exists(id)? || id == ROOT_ID {
            return Err(CatalogError::ObjectNotFound(id));
        }
        if !self.children(id)?.is_empty() {
            return Err(CatalogError::Storage(format!(
                "object #{} still has children",
                id
            )));
        }
        self.objects
            .remove(id.to_be_bytes())
            .map_err(|e| storage_error("Failed to delete object", e))?;
        Ok(())
    }

    fn set_content(&self, id: ObjectId, content: &[u8]) -> Result<(), CatalogError> {
        let mut object = self.get(id)?.ok_or(CatalogError::ObjectNotFound(id))?;
        if object.kind != ObjectKind::Script {
            return Err(CatalogError::NotAScript(id));
        }
        object.content = content.to_vec();
        self.put(&object)
    }

    fn set_name(&self, id: ObjectId, name: &str) -> Result<(), CatalogError> {
        self.update(id, |o| o.name = name.to_string())
    }

    fn set_parent(&self, id: ObjectId, parent: ObjectId) -> Result<(), CatalogError> {
        if id == ROOT_ID {
            return Err(CatalogError::ObjectNotFound(id));
        }
        check_parent(self, id, parent)?;
        self.update(id, |o| o.parent = parent)
    }

    fn set_info(&self, id: ObjectId, info: &str) -> Result<(), CatalogError> {
        self.update(id, |o| o.info = info.to_string())
    }

    fn list(&self) -> Result<Vec<LiveObject>, CatalogError> {
        let mut objects = Vec::new();
        for item in self.objects.iter() {
            let (_, value) = item.map_err(|e| storage_error("Failed to iterate catalog", e))?;
            let object: LiveObject = bincode::deserialize(&value)
                .map_err(|e| storage_error("Failed to deserialize object", e))?;
            objects.push(object);
        }
        Ok(objects)
    }
}
