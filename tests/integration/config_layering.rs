//! Configuration layering: defaults, global file, workspace files, environment

use scriptdeploy::config::{ConfigLoader, SourceKind};
use scriptdeploy::error::ApiError;
use std::fs;
use tempfile::TempDir;

use crate::integration::with_xdg_env;

#[test]
fn test_defaults_without_any_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = test_dir.path().join("ws");
    fs::create_dir_all(&workspace).unwrap();

    let config = with_xdg_env(&test_dir, || ConfigLoader::load(&workspace).unwrap());
    assert_eq!(config.instance.name, "default");
    assert_eq!(config.source.kind, SourceKind::Git);
    assert_eq!(config.check.time, "03:00:00");
    assert_eq!(config.check.lock_timeout_ms, 5000);
    assert!(matches!(config.ensure_valid(), Err(ApiError::ConfigError(_))));
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = test_dir.path().join("ws");
    fs::create_dir_all(workspace.join("config")).unwrap();
    fs::write(
        workspace.join("config").join("config.toml"),
        "[instance]\nname = \"shop\"\n\n[source]\nurl = \"https://git.example.com/scripts.git\"\n",
    )
    .unwrap();

    let config = with_xdg_env(&test_dir, || {
        let global = test_dir.path().join("config-home").join("scriptdeploy");
        fs::create_dir_all(&global).unwrap();
        fs::write(
            global.join("config.toml"),
            "[instance]\nname = \"global\"\n\n[check]\ntime = \"04:30:00\"\n",
        )
        .unwrap();
        ConfigLoader::load(&workspace).unwrap()
    });

    assert_eq!(config.instance.name, "shop");
    assert_eq!(config.check.time, "04:30:00");
    assert_eq!(
        config.source.url.as_deref(),
        Some("https://git.example.com/scripts.git")
    );
    assert!(config.ensure_valid().is_ok());
}

#[test]
fn test_environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    let workspace = test_dir.path().join("ws");
    fs::create_dir_all(workspace.join("config")).unwrap();
    fs::write(
        workspace.join("config").join("config.toml"),
        "[source]\nurl = \"https://git.example.com/scripts.git\"\nbranch = \"main\"\n",
    )
    .unwrap();

    let config = with_xdg_env(&test_dir, || {
        std::env::set_var("SCRIPTDEPLOY__SOURCE__BRANCH", "release");
        let result = ConfigLoader::load(&workspace);
        std::env::remove_var("SCRIPTDEPLOY__SOURCE__BRANCH");
        result.unwrap()
    });
    assert_eq!(config.source.branch, "release");
}

#[test]
fn test_invalid_check_time_fails_validation() {
    let test_dir = TempDir::new().unwrap();
    let file = test_dir.path().join("deploy.toml");
    fs::write(
        &file,
        "[source]\nkind = \"directory\"\ndirectory = \"src\"\n\n[check]\ntime = \"25:99\"\n",
    )
    .unwrap();

    let config = with_xdg_env(&test_dir, || ConfigLoader::load_from_file(&file).unwrap());
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().starts_with("Check:"));
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let test_dir = TempDir::new().unwrap();
    let result = ConfigLoader::load_from_file(&test_dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ApiError::ConfigError(_))));
}
