//! Shared test utilities for integration tests
//!
//! Centralized setup for XDG directories and published source trees.

use scriptdeploy::config::{DeployConfig, SourceKind};
use scriptdeploy::manifest::{FILES_DIR, MANIFEST_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes XDG and SCRIPTDEPLOY environment access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

const CAPTURED_VARS: [&str; 3] = ["HOME", "XDG_CONFIG_HOME", "XDG_DATA_HOME"];

/// Environment variable state to restore after test
struct EnvState(Vec<(&'static str, Option<String>)>);

impl EnvState {
    fn capture() -> Self {
        Self(
            CAPTURED_VARS
                .iter()
                .map(|var| (*var, std::env::var(var).ok()))
                .collect(),
        )
    }

    fn restore(self) {
        for (var, value) in self.0 {
            match value {
                Some(orig) => std::env::set_var(var, orig),
                None => std::env::remove_var(var),
            }
        }
    }
}

/// Run `f` with HOME, XDG_CONFIG_HOME and XDG_DATA_HOME inside `test_dir`.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_config_home = test_dir.path().join("config-home");
    let test_data_home = test_dir.path().join("data");
    let test_home = test_dir.path().join("home");
    fs::create_dir_all(&test_config_home).unwrap();
    fs::create_dir_all(&test_data_home).unwrap();
    fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", &test_config_home);
    std::env::set_var("XDG_DATA_HOME", &test_data_home);

    let result = f();

    env_state.restore();

    result
}

/// One published file: (filename, name, location, content)
pub type Published<'a> = (&'a str, &'a str, &'a str, &'a str);

/// Write a source tree (`dictionary.json` plus `files/`) at `root`,
/// replacing whatever was there.
pub fn publish(root: &Path, version: &str, files: &[Published<'_>]) {
    let _ = fs::remove_dir_all(root);
    fs::create_dir_all(root.join(FILES_DIR)).unwrap();
    let entries: Vec<serde_json::Value> = files
        .iter()
        .map(|(filename, name, location, _)| {
            serde_json::json!({"filename": filename, "name": name, "location": location})
        })
        .collect();
    let manifest = serde_json::json!({"version": version, "tstamp": 1700000000, "files": entries});
    fs::write(root.join(MANIFEST_FILE), manifest.to_string()).unwrap();
    for (filename, _, _, content) in files {
        fs::write(root.join(FILES_DIR).join(filename), content).unwrap();
    }
}

/// Test workspace with a directory source and all storage inside a temp dir
pub struct DeployWorkspace {
    pub temp: TempDir,
}

impl DeployWorkspace {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn source(&self) -> PathBuf {
        self.root().join("source")
    }

    pub fn publish(&self, version: &str, files: &[Published<'_>]) {
        publish(&self.source(), version, files);
    }

    pub fn config(&self) -> DeployConfig {
        let mut config = DeployConfig::default();
        config.instance.name = "test".to_string();
        config.source.kind = SourceKind::Directory;
        config.source.directory = Some(self.source());
        config.storage.snapshot_root = Some(self.root().join("snapshots"));
        config.storage.data_dir = Some(self.root().join("instances"));
        config.storage.catalog_path = Some(self.root().join("catalog"));
        config.check.lock_timeout_ms = 200;
        config
    }

    /// Write the configuration as TOML and return its path.
    pub fn write_config_file(&self) -> PathBuf {
        let path = self.root().join("scriptdeploy.toml");
        let mut config = self.config();
        config.logging.enabled = false;
        fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        path
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root().join("instances").join("test")
    }
}
