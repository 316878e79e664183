//! Per-instance advisory lock.
//!
//! A check or adjustment holds an exclusive OS file lock on `<data_dir>/LOCK`
//! for its whole duration. Acquisition retries with backoff until the
//! configured timeout; a timeout is not an error, the caller skips its pass.

use crate::error::LockError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

pub const LOCK_FILE: &str = "LOCK";

const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_millis(250);

/// Held instance lock; released on drop.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Try to lock `<dir>/LOCK` within `timeout`.
    ///
    /// Returns `Ok(None)` when another holder kept the lock for the whole
    /// wait.
    pub fn acquire(dir: &Path, timeout: Duration) -> Result<Option<Self>, LockError> {
        let path = dir.join(LOCK_FILE);
        let io_err = |source| LockError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(dir).map_err(io_err)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;

        let deadline = Instant::now() + timeout;
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(path = %path.display(), "Instance lock acquired");
                    return Ok(Some(Self {
                        file,
                        path: path.clone(),
                    }));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if is_contended(&e) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    thread::sleep(backoff.min(deadline - now));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(io_err(e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!(path = %self.path.display(), "Instance lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let held = InstanceLock::acquire(temp_dir.path(), Duration::from_millis(50))
            .unwrap()
            .unwrap();
        let contended = InstanceLock::acquire(temp_dir.path(), Duration::from_millis(30)).unwrap();
        assert!(contended.is_none());

        drop(held);
        let again = InstanceLock::acquire(temp_dir.path(), Duration::from_millis(30)).unwrap();
        assert!(again.is_some());
    }
}
