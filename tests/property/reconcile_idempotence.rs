//! Repeating a pass over unchanged inputs changes nothing

use proptest::prelude::*;
use scriptdeploy::catalog::{LiveCatalog, MemoryCatalog};
use scriptdeploy::location::LocationResolver;
use scriptdeploy::manifest::{SnapshotView, FILES_DIR, MANIFEST_FILE};
use scriptdeploy::reconcile::Reconciler;
use scriptdeploy::tracked::render_tracked;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_snapshot(root: &Path, version: &str, files: &BTreeMap<String, (String, String)>) {
    fs::create_dir_all(root.join(FILES_DIR)).unwrap();
    let entries: Vec<serde_json::Value> = files
        .iter()
        .map(|(filename, (name, _))| {
            serde_json::json!({"filename": filename, "name": name, "location": "Scripts"})
        })
        .collect();
    let manifest = serde_json::json!({"version": version, "files": entries});
    fs::write(root.join(MANIFEST_FILE), manifest.to_string()).unwrap();
    for (filename, (_, content)) in files {
        fs::write(root.join(FILES_DIR).join(filename), content).unwrap();
    }
}

fn snapshot_files() -> impl Strategy<Value = BTreeMap<String, (String, String)>> {
    prop::collection::btree_map("[a-e]\\.php", ("[A-E]", "[a-z]{0,8}"), 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn second_pass_is_byte_identical(
        current_files in snapshot_files(),
        top_files in snapshot_files(),
        deployed in any::<bool>(),
    ) {
        let temp = TempDir::new().unwrap();
        let current_root = temp.path().join("current");
        let top_root = temp.path().join("top");
        write_snapshot(&current_root, "1", &current_files);
        write_snapshot(&top_root, "2", &top_files);
        let current = SnapshotView::open(&current_root).unwrap();
        let top = SnapshotView::open(&top_root).unwrap();

        let catalog = MemoryCatalog::new();
        let reconciler = Reconciler::new(&catalog);
        let mut previous = reconciler.reconcile(&top, &current, &[]).unwrap().files;

        if deployed {
            let parent = LocationResolver::new(&catalog)
                .resolve("Scripts", true)
                .unwrap()
                .parent();
            for file in previous.iter_mut() {
                if let Some((name, content)) = current_files.get(&file.filename) {
                    file.live_object_id =
                        catalog.add_script(parent, name, content.as_bytes()).unwrap();
                }
            }
        }

        let first = reconciler.reconcile(&top, &current, &previous).unwrap();
        let second = reconciler.reconcile(&top, &current, &first.files).unwrap();
        prop_assert_eq!(
            render_tracked(&first.files).unwrap(),
            render_tracked(&second.files).unwrap()
        );
        prop_assert_eq!(first.state(), second.state());
    }
}
