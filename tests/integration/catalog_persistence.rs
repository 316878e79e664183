//! The sled-backed catalog keeps objects across reopen

use scriptdeploy::catalog::{LiveCatalog, ObjectKind, SledCatalog};
use scriptdeploy::location::LocationResolver;
use scriptdeploy::types::ROOT_ID;
use tempfile::TempDir;

#[test]
fn test_objects_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("catalog");

    let (container, script) = {
        let catalog = SledCatalog::new(&path).unwrap();
        let container = catalog.add_container(ROOT_ID, "Scripts").unwrap();
        let script = catalog.add_script(container, "A", b"<?php // a").unwrap();
        catalog.set_info(script, "Deployment: test").unwrap();
        catalog.flush().unwrap();
        (container, script)
    };

    let catalog = SledCatalog::new(&path).unwrap();
    assert_eq!(catalog.kind(script).unwrap(), Some(ObjectKind::Script));
    assert_eq!(catalog.parent(script).unwrap(), Some(container));
    assert_eq!(catalog.content(script).unwrap(), b"<?php // a");
    assert_eq!(catalog.info(script).unwrap(), "Deployment: test");
    assert_eq!(catalog.children(container).unwrap(), vec![script]);

    let next = catalog.create_object(ObjectKind::Script).unwrap();
    assert!(next > script);
}

#[test]
fn test_resolver_creates_chain_once() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = SledCatalog::new(temp_dir.path().join("catalog")).unwrap();
    let resolver = LocationResolver::new(&catalog);

    let first = resolver.resolve("Scripts\\Helpers", true).unwrap();
    let second = resolver.resolve("Scripts/Helpers", false).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.chain.len(), 2);
    assert_eq!(resolver.full_path(first.parent()).unwrap(), "Scripts");
}
