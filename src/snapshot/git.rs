//! Git-backed snapshot synchronization.

use super::{
    reject_changed, remove_dir_recursive, SnapshotKind, SnapshotLayout, SnapshotSync, SyncReport,
    VersionSelector,
};
use crate::error::SyncError;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

/// Credentials spliced into the remote URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitCredentials {
    pub user: Option<String>,
    pub token: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Build the remote URL passed to `git clone`.
///
/// For `http(s)://` the user and either the token (verbatim) or the
/// percent-encoded password are inserted as userinfo. For `ssh://` with a
/// port the user and port are spliced around the host. Other URLs are
/// returned unchanged.
pub fn build_git_url(url: &str, credentials: &GitCredentials) -> String {
    let user = non_empty(&credentials.user);
    let auth = user.map(|user| {
        let mut auth = urlencoding::encode(user).into_owned();
        if let Some(token) = non_empty(&credentials.token) {
            auth.push(':');
            auth.push_str(token);
        } else if let Some(password) = non_empty(&credentials.password) {
            auth.push(':');
            auth.push_str(&urlencoding::encode(password));
        }
        auth
    });

    for scheme in ["https://", "http://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return match &auth {
                Some(auth) => format!("{}{}@{}", scheme, auth, rest),
                None => url.to_string(),
            };
        }
    }

    if let (Some(rest), Some(port)) = (url.strip_prefix("ssh://"), credentials.port) {
        let (server, path) = match rest.find('/') {
            Some(pos) => rest.split_at(pos),
            None => (rest, ""),
        };
        let mut out = String::from("ssh://");
        if let Some(user) = user {
            out.push_str(&urlencoding::encode(user));
            out.push('@');
        }
        out.push_str(server);
        out.push(':');
        out.push_str(&port.to_string());
        out.push_str(path);
        return out;
    }

    url.to_string()
}

/// Remove userinfo from a URL for logging.
fn redact(url: &str) -> String {
    match (url.find("://"), url.find('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}

/// Snapshot sync from a git remote
pub struct GitSync {
    remote: String,
    branch: String,
    layout: SnapshotLayout,
}

impl GitSync {
    pub fn new(
        url: &str,
        credentials: &GitCredentials,
        branch: &str,
        layout: SnapshotLayout,
    ) -> Self {
        Self {
            remote: build_git_url(url, credentials),
            branch: branch.to_string(),
            layout,
        }
    }

    fn git(&self, dir: &Path, args: &[&str]) -> Result<String, SyncError> {
        let command = format!("git {}", args.first().copied().unwrap_or_default());
        debug!(dir = %dir.display(), command = %command, "Running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| SyncError::CommandFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::CommandFailed {
                command,
                message: redact(stderr.trim()),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn is_working_copy(&self, path: &Path) -> bool {
        path.is_dir() && self.git(path, &["rev-parse", "--is-inside-work-tree"]).is_ok()
    }

    fn clone_or_fetch(&self, path: &Path) -> Result<(), SyncError> {
        if path.exists() && !self.is_working_copy(path) {
            warn!(path = %path.display(), "Snapshot is not a working copy, removing it");
            remove_dir_recursive(path)?;
        }

        if path.exists() {
            self.git(path, &["fetch", "--prune", "origin"])?;
            return Ok(());
        }

        let parent = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)?;
        let target = path.to_string_lossy();
        info!(remote = %redact(&self.remote), path = %path.display(), "Cloning repository");
        self.git(
            parent,
            &["clone", "--branch", &self.branch, &self.remote, target.as_ref()],
        )?;
        Ok(())
    }
}

impl SnapshotSync for GitSync {
    fn sync(
        &self,
        kind: SnapshotKind,
        selector: &VersionSelector,
    ) -> Result<SyncReport, SyncError> {
        reject_changed(kind)?;
        self.layout.ensure()?;
        let path = self.layout.dir(kind);
        self.clone_or_fetch(&path)?;

        match selector {
            VersionSelector::Branch => {
                let upstream = format!("origin/{}", self.branch);
                self.git(&path, &["checkout", "--force", "-B", &self.branch, &upstream])?;
            }
            VersionSelector::Revision(revision) => {
                self.git(&path, &["checkout", "--force", "--detach", revision])
                    .map_err(|_| SyncError::RevisionUnavailable(revision.clone()))?;
            }
        }

        let revision = self.git(&path, &["rev-parse", "HEAD"])?;
        info!(snapshot = %kind, revision = %revision, "Snapshot synced");
        Ok(SyncReport { kind, revision })
    }

    fn describe(&self) -> String {
        format!("{} ({})", redact(&self.remote), self.branch)
    }
}
