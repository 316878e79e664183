//! Configuration System
//!
//! Layered configuration: built-in defaults, the global file under
//! `$XDG_CONFIG_HOME/scriptdeploy/`, workspace files under `config/`, and
//! `SCRIPTDEPLOY__*` environment variables, in increasing precedence.

use crate::error::ApiError;
use crate::keywords::KeywordConfig;
use crate::logging::LoggingConfig;
use crate::schedule::parse_check_time;
use crate::snapshot::GitCredentials;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod merge;
pub mod paths;
mod sources;

pub use merge::merge_policy::{ENV_PREFIX, ENV_SEPARATOR};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub instance: InstanceConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub check: CheckConfig,

    #[serde(default)]
    pub keywords: KeywordConfig,

    #[serde(default)]
    pub autoload: AutoloadConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deployment instance identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Name used for the lock, the snapshot layout and object annotations
    #[serde(default = "default_instance_name")]
    pub name: String,

    /// Disabled instances skip checks and refuse adjustments
    #[serde(default)]
    pub disabled: bool,
}

fn default_instance_name() -> String {
    "default".to_string()
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            name: default_instance_name(),
            disabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Git,
    Directory,
}

/// Where snapshots come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    /// Remote repository URL (git)
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Local or extracted-archive tree (directory)
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_branch() -> String {
    "main".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            url: None,
            branch: default_branch(),
            user: None,
            token: None,
            password: None,
            port: None,
            directory: None,
        }
    }
}

impl SourceConfig {
    pub fn credentials(&self) -> GitCredentials {
        GitCredentials {
            user: self.user.clone(),
            token: self.token.clone(),
            password: self.password.clone(),
            port: self.port,
        }
    }

    /// The `Source:` annotation value, never carrying credentials.
    pub fn label(&self) -> String {
        match self.kind {
            SourceKind::Git => self.url.clone().unwrap_or_default(),
            SourceKind::Directory => self
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            SourceKind::Git => {
                if self.url.as_deref().map_or(true, str::is_empty) {
                    return Err("source.url is required for a git source".to_string());
                }
                if self.branch.trim().is_empty() {
                    return Err("source.branch cannot be empty".to_string());
                }
            }
            SourceKind::Directory => {
                if self.directory.is_none() {
                    return Err("source.directory is required for a directory source".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Storage paths; unset entries default below the XDG data directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub snapshot_root: Option<PathBuf>,

    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

/// Fully resolved storage locations of one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStorage {
    pub snapshot_root: PathBuf,
    /// Instance data directory: tracked list, state, lock, diffs
    pub data_dir: PathBuf,
    pub catalog_path: PathBuf,
}

impl StorageConfig {
    /// Resolve against the workspace root; defaults live under
    /// `<data home>/scriptdeploy`.
    pub fn resolve(
        &self,
        workspace_root: &Path,
        instance: &str,
    ) -> Result<ResolvedStorage, ApiError> {
        let absolute = |path: &PathBuf| {
            if path.is_absolute() {
                path.clone()
            } else {
                workspace_root.join(path)
            }
        };
        let base = paths::app_data_dir()?;

        Ok(ResolvedStorage {
            snapshot_root: self
                .snapshot_root
                .as_ref()
                .map(absolute)
                .unwrap_or_else(|| base.join("snapshots")),
            data_dir: self
                .data_dir
                .as_ref()
                .map(absolute)
                .unwrap_or_else(|| base.join("instances"))
                .join(instance),
            catalog_path: self
                .catalog_path
                .as_ref()
                .map(absolute)
                .unwrap_or_else(|| base.join("catalog")),
        })
    }
}

/// Check scheduling and locking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Daily check time, `HH:MM:SS`
    #[serde(default = "default_check_time")]
    pub time: String,

    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_check_time() -> String {
    "03:00:00".to_string()
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            time: default_check_time(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl CheckConfig {
    pub fn lock_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if parse_check_time(&self.time).is_none() {
            return Err(format!("check.time '{}' is not HH:MM:SS", self.time));
        }
        if self.lock_timeout_ms == 0 {
            return Err("check.lock_timeout_ms must be positive".to_string());
        }
        Ok(())
    }
}

/// Host autoload helper file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoloadConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Instance(String),
    Source(String),
    Check(String),
    Keywords(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Instance(msg) => write!(f, "Instance: {}", msg),
            ValidationError::Source(msg) => write!(f, "Source: {}", msg),
            ValidationError::Check(msg) => write!(f, "Check: {}", msg),
            ValidationError::Keywords(msg) => write!(f, "Keywords: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DeployConfig {
    /// Validate everything a check or adjustment needs
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let name = self.instance.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::Instance("name cannot be empty".to_string()));
        } else if name.contains(['/', '\\']) || name == "." || name == ".." {
            errors.push(ValidationError::Instance(format!(
                "name '{}' must be usable as a directory name",
                name
            )));
        }

        if let Err(e) = self.source.validate() {
            errors.push(ValidationError::Source(e));
        }
        if let Err(e) = self.check.validate() {
            errors.push(ValidationError::Check(e));
        }

        for (keyword, id) in self.keywords.scripts.iter().chain(&self.keywords.objects) {
            if *id == crate::types::ROOT_ID {
                errors.push(ValidationError::Keywords(format!(
                    "'{}' cannot refer to the catalog root",
                    keyword
                )));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all problems into one `ApiError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })
    }
}

/// Builds `DeployConfig` from the source layers
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with full layering for a workspace.
    pub fn load(workspace_root: &Path) -> Result<DeployConfig, ApiError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = merge::merge_policy::add_environment(builder);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load a single file on top of the defaults, plus environment overrides.
    pub fn load_from_file(path: &Path) -> Result<DeployConfig, ApiError> {
        if !path.is_file() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path));
        let builder = merge::merge_policy::add_environment(builder);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Location of the global config file.
    pub fn xdg_config_path() -> Option<PathBuf> {
        sources::global_file::global_config_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Serializes tests touching XDG_CONFIG_HOME
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn with_config_home<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let original = std::env::var_os("XDG_CONFIG_HOME");
        std::env::set_var("XDG_CONFIG_HOME", dir);
        let result = f();
        match original {
            Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
        result
    }

    #[test]
    fn test_default_config() {
        let config = DeployConfig::default();
        assert_eq!(config.instance.name, "default");
        assert_eq!(config.source.branch, "main");
        assert_eq!(config.check.lock_timeout_ms, 5000);
        assert!(config.keywords.is_empty());
    }

    #[test]
    fn test_default_git_source_needs_url() {
        let errors = DeployConfig::default().validate().unwrap_err();
        assert!(matches!(errors.as_slice(), [ValidationError::Source(_)]));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = DeployConfig::default();
        config.instance.name = "a/b".to_string();
        config.check.time = "noon".to_string();
        config.source.url = Some("https://example.org/x.git".to_string());
        config.keywords.scripts.insert("HELPER".to_string(), 0);

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("deploy.toml");
        std::fs::write(
            &config_file,
            r#"
[instance]
name = "lab"

[source]
kind = "directory"
directory = "/srv/scripts"

[check]
time = "04:15:00"

[keywords.scripts]
HELPER = 12345

[keywords.values]
MODE = "prod"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&config_file).unwrap();
        assert_eq!(config.instance.name, "lab");
        assert_eq!(config.source.kind, SourceKind::Directory);
        assert_eq!(config.source.branch, "main");
        assert_eq!(config.check.time, "04:15:00");
        assert!(config.keywords.values.values().any(|v| v == "prod"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_workspace_config_overrides_global_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_home = temp_dir.path().join("xdg");
        let global_dir = config_home.join(paths::APP_DIR);
        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            "[instance]\nname = \"global\"\n\n[source]\nbranch = \"stable\"\n",
        )
        .unwrap();

        let workspace = temp_dir.path().join("ws");
        std::fs::create_dir_all(workspace.join("config")).unwrap();
        std::fs::write(
            workspace.join("config").join("config.toml"),
            "[instance]\nname = \"workspace\"\n",
        )
        .unwrap();

        let config = with_config_home(&config_home, || ConfigLoader::load(&workspace)).unwrap();
        assert_eq!(config.instance.name, "workspace");
        assert_eq!(config.source.branch, "stable");
    }

    #[test]
    fn test_xdg_config_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = with_config_home(temp_dir.path(), ConfigLoader::xdg_config_path);
        assert_eq!(
            path,
            Some(temp_dir.path().join("scriptdeploy").join("config.toml"))
        );
    }

    #[test]
    fn test_storage_resolves_relative_paths_against_workspace() {
        let storage = StorageConfig {
            snapshot_root: Some(PathBuf::from("snapshots")),
            data_dir: Some(PathBuf::from("/var/lib/deploy")),
            catalog_path: Some(PathBuf::from("catalog")),
        };
        let resolved = storage.resolve(Path::new("/ws"), "lab").unwrap();
        assert_eq!(resolved.snapshot_root, PathBuf::from("/ws/snapshots"));
        assert_eq!(resolved.data_dir, PathBuf::from("/var/lib/deploy/lab"));
        assert_eq!(resolved.catalog_path, PathBuf::from("/ws/catalog"));
    }
}
