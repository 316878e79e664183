//! Live scripts moved or renamed by hand are flagged and put back on request

use scriptdeploy::catalog::{LiveCatalog, SledCatalog};
use scriptdeploy::cli::{Commands, RunContext};
use scriptdeploy::tracked::TrackedFileStore;
use scriptdeploy::types::ROOT_ID;
use serde_json::Value;

use crate::integration::DeployWorkspace;

fn run(context: &RunContext, command: Commands) -> Value {
    serde_json::from_str(&context.execute(&command).unwrap()).unwrap()
}

#[test]
fn test_moved_and_renamed_script_is_relocated() {
    let ws = DeployWorkspace::new();
    ws.publish("1", &[("a.php", "A", "Scripts", "<?php // a")]);
    let context = RunContext::from_config(ws.root().to_path_buf(), ws.config()).unwrap();
    run(
        &context,
        Commands::Adjust {
            relocate: false,
            format: "json".to_string(),
        },
    );

    let id = TrackedFileStore::in_dir(&ws.data_dir()).load().unwrap()[0].live_object_id;
    {
        let catalog = SledCatalog::new(ws.root().join("catalog")).unwrap();
        let elsewhere = catalog.add_container(ROOT_ID, "Elsewhere").unwrap();
        catalog.set_parent(id, elsewhere).unwrap();
        catalog.set_name(id, "Renamed A").unwrap();
        catalog.flush().unwrap();
    }

    let checked = run(
        &context,
        Commands::Check {
            format: "json".to_string(),
        },
    );
    assert_eq!(checked["counts"]["moved"], 1);
    assert_eq!(checked["counts"]["renamed"], 1);

    let plain = run(
        &context,
        Commands::Adjust {
            relocate: false,
            format: "json".to_string(),
        },
    );
    assert_eq!(plain["adjustment"]["relocated"], 0);
    assert_eq!(plain["counts"]["moved"], 1);

    let relocated = run(
        &context,
        Commands::Adjust {
            relocate: true,
            format: "json".to_string(),
        },
    );
    assert_eq!(relocated["adjustment"]["relocated"], 1);

    let checked = run(
        &context,
        Commands::Check {
            format: "json".to_string(),
        },
    );
    assert_eq!(checked["state"], "synced");

    let catalog = SledCatalog::new(ws.root().join("catalog")).unwrap();
    assert_eq!(catalog.name(id).unwrap().as_deref(), Some("A"));
}
