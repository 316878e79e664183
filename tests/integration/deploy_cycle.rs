//! End-to-end check and adjustment passes through the CLI route table

use scriptdeploy::cli::{CatalogCommands, Commands, DiffTarget, RunContext};
use scriptdeploy::tracked::TrackedFileStore;
use serde_json::Value;

use crate::integration::DeployWorkspace;

fn run(context: &RunContext, command: Commands) -> Value {
    let output = context.execute(&command).unwrap();
    serde_json::from_str(&output).unwrap()
}

fn check() -> Commands {
    Commands::Check {
        format: "json".to_string(),
    }
}

fn adjust(relocate: bool) -> Commands {
    Commands::Adjust {
        relocate,
        format: "json".to_string(),
    }
}

#[test]
fn test_first_check_reports_missing_scripts() {
    let ws = DeployWorkspace::new();
    ws.publish(
        "1",
        &[
            ("a.php", "A", "Scripts", "<?php // a"),
            ("b.php", "B", "Scripts\\Helpers", "<?php // b"),
        ],
    );
    let context = RunContext::from_config(ws.root().to_path_buf(), ws.config()).unwrap();

    let value = run(&context, check());
    assert_eq!(value["status"], "completed");
    assert_eq!(value["state"], "unclear");
    assert_eq!(value["files"], 2);
    assert_eq!(value["counts"]["missing"], 2);
    assert_eq!(value["revision"], "1");

    let files = TrackedFileStore::in_dir(&ws.data_dir()).load().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| !f.is_bound()));
}

#[test]
fn test_adjust_deploys_and_second_check_is_synced() {
    let ws = DeployWorkspace::new();
    ws.publish(
        "1",
        &[
            ("a.php", "A", "Scripts", "<?php // a"),
            ("b.php", "B", "Scripts\\Helpers", "<?php // b"),
        ],
    );
    let context = RunContext::from_config(ws.root().to_path_buf(), ws.config()).unwrap();

    let adjusted = run(&context, adjust(false));
    assert_eq!(adjusted["state"], "synced");
    assert_eq!(adjusted["adjustment"]["created"], 2);
    assert_eq!(adjusted["adjustment"]["failed"], 0);

    let checked = run(&context, check());
    assert_eq!(checked["state"], "synced");

    let tree = context
        .execute(&Commands::Catalog {
            command: CatalogCommands::Tree,
        })
        .unwrap();
    assert!(tree.contains("Scripts\\"));
    assert!(tree.contains("Helpers\\"));
    assert!(tree.contains("    A  #"));
    assert!(tree.contains("      B  #"));
}

#[test]
fn test_new_upstream_version_becomes_updateable_until_adjusted() {
    let ws = DeployWorkspace::new();
    ws.publish("1", &[("a.php", "A", "Scripts", "v1")]);
    let context = RunContext::from_config(ws.root().to_path_buf(), ws.config()).unwrap();
    run(&context, adjust(false));

    ws.publish(
        "2",
        &[("a.php", "A", "Scripts", "v2"), ("c.php", "C", "Scripts", "c")],
    );
    let checked = run(&context, check());
    assert_eq!(checked["state"], "updateable");
    assert_eq!(checked["revision"], "1");
    assert_eq!(checked["counts"]["outdated"], 1);
    assert_eq!(checked["counts"]["added"], 1);

    let adjusted = run(&context, adjust(false));
    assert_eq!(adjusted["revision"], "2");
    assert_eq!(adjusted["state"], "synced");
    assert_eq!(adjusted["adjustment"]["updated"], 1);
    assert_eq!(adjusted["adjustment"]["created"], 1);
}

#[test]
fn test_status_and_list_read_persisted_state() {
    let ws = DeployWorkspace::new();
    ws.publish("1", &[("a.php", "A", "Scripts", "v1")]);
    let context = RunContext::from_config(ws.root().to_path_buf(), ws.config()).unwrap();
    run(&context, check());

    let status = run(
        &context,
        Commands::Status {
            format: "json".to_string(),
        },
    );
    assert_eq!(status["instance"], "test");
    assert_eq!(status["state"], "unclear");
    assert_eq!(status["commit"], "1");
    assert_eq!(status["files"], 1);

    let listed = context
        .execute(&Commands::List {
            flagged: true,
            format: "json".to_string(),
        })
        .unwrap();
    let files: Vec<Value> = serde_json::from_str(&listed).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["filename"], "a.php");
    assert_eq!(files[0]["missing"], true);
}

#[test]
fn test_forget_drops_removed_entry() {
    let ws = DeployWorkspace::new();
    ws.publish("1", &[("a.php", "A", "Scripts", "v1")]);
    let context = RunContext::from_config(ws.root().to_path_buf(), ws.config()).unwrap();
    run(&context, adjust(false));

    ws.publish("2", &[]);
    let adjusted = run(&context, adjust(false));
    assert_eq!(adjusted["counts"]["removed"], 1);

    let output = context
        .execute(&Commands::Forget {
            filenames: vec!["a.php".to_string(), "ghost.php".to_string()],
            yes: true,
        })
        .unwrap();
    assert_eq!(output, "Forgot 1 file(s); 0 tracked file(s) remain");

    let err = context
        .execute(&Commands::Forget {
            filenames: vec!["a.php".to_string()],
            yes: true,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        scriptdeploy::error::ApiError::TrackedFileNotFound(_)
    ));
}

#[test]
fn test_diff_reports_live_edits() {
    let ws = DeployWorkspace::new();
    ws.publish("1", &[("a.php", "A", "Scripts", "original\n")]);
    let context = RunContext::from_config(ws.root().to_path_buf(), ws.config()).unwrap();

    let before = context
        .execute(&Commands::Diff {
            against: DiffTarget::Current,
        })
        .unwrap();
    assert!(before.contains("run `scriptdeploy check` first"));

    run(&context, adjust(false));
    let files = TrackedFileStore::in_dir(&ws.data_dir()).load().unwrap();
    let id = files[0].live_object_id;
    {
        use scriptdeploy::catalog::{LiveCatalog, SledCatalog};
        let catalog = SledCatalog::new(ws.root().join("catalog")).unwrap();
        catalog.set_content(id, b"edited live\n").unwrap();
        catalog.flush().unwrap();
    }

    let checked = run(&context, check());
    assert_eq!(checked["state"], "modified");
    assert_eq!(checked["counts"]["modified"], 1);

    let diff = context
        .execute(&Commands::Diff {
            against: DiffTarget::Current,
        })
        .unwrap();
    if !diff.starts_with("No differences") {
        assert!(diff.contains("edited live"));
    }
}

#[test]
fn test_disabled_instance_refuses_adjustment() {
    let ws = DeployWorkspace::new();
    ws.publish("1", &[("a.php", "A", "Scripts", "v1")]);
    let mut config = ws.config();
    config.instance.disabled = true;
    let context = RunContext::from_config(ws.root().to_path_buf(), config).unwrap();

    let checked = run(&context, check());
    assert_eq!(checked["status"], "skipped");

    let err = context.execute(&adjust(false)).unwrap_err();
    assert!(scriptdeploy::cli::map_error(&err).contains("disabled"));
}

#[test]
fn test_missing_source_directory_is_rejected() {
    let ws = DeployWorkspace::new();
    let mut config = ws.config();
    config.source.directory = None;
    let context = RunContext::from_config(ws.root().to_path_buf(), config).unwrap();

    assert!(context.execute(&check()).is_err());
}
