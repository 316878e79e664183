//! Keyword resolution for the `requires` entries of a manifest.
//!
//! Scripts may depend on installation-specific constants (the ID of a
//! helper script, an instance, a literal value). The reconciler asks an
//! injected `KeywordResolver` whether each required keyword maps to
//! something on this installation.

use crate::catalog::{LiveCatalog, ObjectKind};
use crate::types::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value a keyword resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordValue {
    Object(ObjectId),
    Text(String),
}

/// Strategy mapping a keyword to an installation-specific value
pub trait KeywordResolver {
    fn resolve(&self, keyword: &str) -> Option<KeywordValue>;
}

/// Keyword tables from configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Keywords naming a script object
    #[serde(default)]
    pub scripts: BTreeMap<String, ObjectId>,

    /// Keywords naming any catalog object
    #[serde(default)]
    pub objects: BTreeMap<String, ObjectId>,

    /// Keywords with a literal value
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl KeywordConfig {
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.objects.is_empty() && self.values.is_empty()
    }
}

fn upper_keys<V: Clone>(map: &BTreeMap<String, V>) -> BTreeMap<String, V> {
    map.iter()
        .map(|(k, v)| (k.to_uppercase(), v.clone()))
        .collect()
}

/// Resolver backed by the configured keyword tables
///
/// Keys compare case-insensitively. Script and object entries only resolve
/// while the referenced object exists (and, for scripts, is a script).
pub struct MapKeywordResolver<'a> {
    scripts: BTreeMap<String, ObjectId>,
    objects: BTreeMap<String, ObjectId>,
    values: BTreeMap<String, String>,
    catalog: &'a dyn LiveCatalog,
}

impl<'a> MapKeywordResolver<'a> {
    pub fn new(config: &KeywordConfig, catalog: &'a dyn LiveCatalog) -> Self {
        Self {
            scripts: upper_keys(&config.scripts),
            objects: upper_keys(&config.objects),
            values: upper_keys(&config.values),
            catalog,
        }
    }
}

impl KeywordResolver for MapKeywordResolver<'_> {
    fn resolve(&self, keyword: &str) -> Option<KeywordValue> {
        let key = keyword.to_uppercase();
        if let Some(&id) = self.scripts.get(&key) {
            return match self.catalog.kind(id) {
                Ok(Some(ObjectKind::Script)) => Some(KeywordValue::Object(id)),
                _ => None,
            };
        }
        if let Some(&id) = self.objects.get(&key) {
            return match self.catalog.exists(id) {
                Ok(true) => Some(KeywordValue::Object(id)),
                _ => None,
            };
        }
        self.values.get(&key).cloned().map(KeywordValue::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::types::ROOT_ID;

    #[test]
    fn test_map_resolver() {
        let catalog = MemoryCatalog::new();
        let helper = catalog.add_script(ROOT_ID, "Helper", b"").unwrap();
        let folder = catalog.add_container(ROOT_ID, "Folder").unwrap();

        let mut config = KeywordConfig::default();
        config.scripts.insert("helper_global".to_string(), helper);
        config.scripts.insert("NOT_A_SCRIPT".to_string(), folder);
        config.objects.insert("FOLDER".to_string(), folder);
        config.objects.insert("GONE".to_string(), 4711);
        config.values.insert("Mode".to_string(), "prod".to_string());

        let resolver = MapKeywordResolver::new(&config, &catalog);
        assert_eq!(
            resolver.resolve("HELPER_GLOBAL"),
            Some(KeywordValue::Object(helper))
        );
        assert_eq!(resolver.resolve("not_a_script"), None);
        assert_eq!(resolver.resolve("folder"), Some(KeywordValue::Object(folder)));
        assert_eq!(resolver.resolve("GONE"), None);
        assert_eq!(
            resolver.resolve("MODE"),
            Some(KeywordValue::Text("prod".to_string()))
        );
        assert_eq!(resolver.resolve("UNDEFINED"), None);
    }
}
