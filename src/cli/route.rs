//! CLI route: single dispatch table from parsed commands to domain services.

use crate::autoload::{read_autoload, write_autoload};
use crate::catalog::SledCatalog;
use crate::cli::parse::{AutoloadCommands, CatalogCommands, Commands, DiffTarget};
use crate::cli::presentation::{
    format_catalog_tree, format_pass_outcome, format_status, format_tracked_list,
};
use crate::config::{ConfigLoader, DeployConfig, ResolvedStorage, SourceKind};
use crate::error::{ApiError, SyncError};
use crate::instance::{forget_tracked, ForgetOutcome, Instance, PassOutcome, StateStore};
use crate::keywords::MapKeywordResolver;
use crate::reconcile::FlagCounts;
use crate::schedule::{next_check, parse_check_time, until_next_check};
use crate::snapshot::{DirectorySync, GitSync, SnapshotKind, SnapshotLayout, SnapshotSync};
use crate::tracked::TrackedFileStore;
use chrono::Local;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::cli::command_name;

/// Runtime context for CLI execution: workspace, loaded config and
/// resolved storage paths.
pub struct RunContext {
    workspace_root: PathBuf,
    config: DeployConfig,
    storage: ResolvedStorage,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let workspace_root = dunce::canonicalize(&workspace_root).unwrap_or(workspace_root);
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::from_config(workspace_root, config)
    }

    /// Create run context from an already loaded configuration.
    pub fn from_config(workspace_root: PathBuf, config: DeployConfig) -> Result<Self, ApiError> {
        let storage = config
            .storage
            .resolve(&workspace_root, &config.instance.name)?;
        std::fs::create_dir_all(&storage.data_dir)?;
        Ok(Self {
            workspace_root,
            config,
            storage,
        })
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn storage(&self) -> &ResolvedStorage {
        &self.storage
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let name = command_name(command);
        info!(command = %name, workspace = %self.workspace_root.display(), "Executing command");
        let result = self.execute_inner(command);
        if let Err(ref e) = result {
            error!(command = %name, error = %e, "Command failed");
        }
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Check { format } => {
                let outcome = self.with_instance(|instance| instance.perform_check())?;
                format_pass_outcome(&outcome, format)
            }
            Commands::Adjust { relocate, format } => {
                let outcome =
                    self.with_instance(|instance| instance.perform_adjustment(*relocate))?;
                format_pass_outcome(&outcome, format)
            }
            Commands::Status { format } => self.handle_status(format),
            Commands::List { flagged, format } => {
                let mut files = TrackedFileStore::in_dir(&self.storage.data_dir).load()?;
                if *flagged {
                    files.retain(|f| !f.set_flags().is_empty());
                }
                format_tracked_list(&files, format)
            }
            Commands::Forget { filenames, yes } => self.handle_forget(filenames, *yes),
            Commands::Diff { against } => self.handle_diff(*against),
            Commands::Autoload { command } => self.handle_autoload(command),
            Commands::Daemon { run_now } => self.handle_daemon(*run_now),
            Commands::Catalog { command } => match command {
                CatalogCommands::Tree => format_catalog_tree(&self.open_catalog()?),
            },
        }
    }

    fn open_catalog(&self) -> Result<SledCatalog, ApiError> {
        if let Some(parent) = self.storage.catalog_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(SledCatalog::new(&self.storage.catalog_path)?)
    }

    fn layout(&self) -> SnapshotLayout {
        SnapshotLayout::new(&self.storage.snapshot_root, &self.config.instance.name)
    }

    fn build_sync(&self) -> Result<Box<dyn SnapshotSync>, ApiError> {
        let source = &self.config.source;
        let layout = self.layout();
        match source.kind {
            SourceKind::Git => {
                let url = source.url.as_deref().ok_or_else(|| {
                    SyncError::NotConfigured("source.url is not set".to_string())
                })?;
                Ok(Box::new(GitSync::new(
                    url,
                    &source.credentials(),
                    &source.branch,
                    layout,
                )))
            }
            SourceKind::Directory => {
                let directory = source.directory.as_ref().ok_or_else(|| {
                    SyncError::NotConfigured("source.directory is not set".to_string())
                })?;
                Ok(Box::new(DirectorySync::new(self.absolute(directory), layout)))
            }
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    /// Build the instance with all collaborators and run `f` on it.
    fn with_instance<T>(
        &self,
        f: impl FnOnce(&Instance<'_>) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        self.config.ensure_valid()?;
        let sync = self.build_sync()?;
        let catalog = self.open_catalog()?;
        let resolver = MapKeywordResolver::new(&self.config.keywords, &catalog);

        let mut instance = Instance::new(
            &self.config.instance.name,
            self.layout(),
            &self.storage.data_dir,
            sync.as_ref(),
            &catalog,
        )
        .with_lock_timeout(self.config.check.lock_timeout())
        .with_source_label(self.config.source.label())
        .disabled(self.config.instance.disabled);
        if !self.config.keywords.is_empty() {
            instance = instance.with_keywords(&resolver);
        }
        let result = f(&instance);
        catalog.flush()?;
        result
    }

    fn handle_status(&self, format: &str) -> Result<String, ApiError> {
        let state = StateStore::in_dir(&self.storage.data_dir).load()?;
        let files = TrackedFileStore::in_dir(&self.storage.data_dir).load()?;
        let counts = FlagCounts::count(&files);
        format_status(
            &self.config.instance.name,
            &state,
            &counts,
            files.len(),
            format,
        )
    }

    fn handle_forget(&self, filenames: &[String], yes: bool) -> Result<String, ApiError> {
        if !yes {
            use dialoguer::Confirm;
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Forget {} tracked file(s): {}?",
                    filenames.len(),
                    filenames.join(", ")
                ))
                .interact()
                .map_err(|e| ApiError::ConfigError(format!("Failed to get user input: {}", e)))?;

            if !confirmed {
                return Ok("Forget cancelled".to_string());
            }
        }

        let outcome = forget_tracked(
            &self.storage.data_dir,
            self.config.check.lock_timeout(),
            filenames,
        )?;
        match outcome {
            ForgetOutcome::Forgotten { removed, summary } => Ok(format!(
                "Forgot {} file(s); {} tracked file(s) remain",
                removed, summary.files
            )),
            ForgetOutcome::Skipped { reason } => Ok(format!("Skipped: {}", reason)),
        }
    }

    fn handle_diff(&self, against: DiffTarget) -> Result<String, ApiError> {
        let artifacts = crate::diff::DiffArtifacts::in_dir(&self.storage.data_dir);
        let kind = match against {
            DiffTarget::Current => SnapshotKind::Current,
            DiffTarget::Top => SnapshotKind::Top,
        };
        let Some(path) = artifacts.path(kind) else {
            return Ok(String::new());
        };
        match std::fs::read_to_string(path) {
            Ok(text) if text.is_empty() => Ok("No differences recorded.".to_string()),
            Ok(text) => Ok(text.trim_end().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok("No diff recorded yet; run `scriptdeploy check` first.".to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn handle_autoload(&self, command: &AutoloadCommands) -> Result<String, ApiError> {
        let path = self
            .config
            .autoload
            .path
            .as_deref()
            .map(|p| self.absolute(p))
            .ok_or_else(|| ApiError::ConfigError("autoload.path is not configured".to_string()))?;

        match command {
            AutoloadCommands::Read => Ok(read_autoload(&path)?
                .unwrap_or_else(|| format!("{} does not exist", path.display()))),
            AutoloadCommands::Write { from, force } => {
                let content = if from.as_os_str() == "-" {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                } else {
                    std::fs::read_to_string(from)?
                };
                write_autoload(&path, &content, *force)?;
                Ok(format!("Wrote {} ({} bytes)", path.display(), content.len()))
            }
        }
    }

    fn handle_daemon(&self, run_now: bool) -> Result<String, ApiError> {
        self.config.ensure_valid()?;
        let at = parse_check_time(&self.config.check.time).ok_or_else(|| {
            ApiError::ConfigError(format!("Invalid check.time '{}'", self.config.check.time))
        })?;

        if run_now {
            self.daemon_pass();
        }
        loop {
            let now = Local::now().naive_local();
            info!(next_check = %next_check(now, at), "Waiting for next scheduled check");
            std::thread::sleep(until_next_check(now, at));
            self.daemon_pass();
        }
    }

    fn daemon_pass(&self) {
        match self.with_instance(|instance| instance.perform_check()) {
            Ok(PassOutcome::Completed(summary)) => {
                info!(state = %summary.state, files = summary.files, "Scheduled check completed")
            }
            Ok(PassOutcome::Skipped { reason }) => {
                info!(reason = %reason, "Scheduled check skipped")
            }
            Err(e) => error!(error = %e, "Scheduled check failed"),
        }
    }
}
