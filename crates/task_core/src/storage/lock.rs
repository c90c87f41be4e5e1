use crate::error::AppError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const LOCK_RETRY_INTERVAL_MS: u64 = 50;

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    // Windows reports sharing/lock violations as raw OS errors 32 and 33.
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Exclusive advisory lock held for the lifetime of the guard.
///
/// A guard built with [`StoreLock::unlocked`] holds nothing; backends without
/// a shared resource hand those out.
#[derive(Debug)]
pub struct StoreLock {
    held: Option<(File, PathBuf)>,
}

impl StoreLock {
    /// Lock `path`, creating it if needed, retrying until `timeout_ms` elapses.
    pub fn acquire(path: &Path, timeout_ms: u64) -> Result<Self, AppError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;

        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let retry_interval = Duration::from_millis(LOCK_RETRY_INTERVAL_MS);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "acquired store lock");
                    return Ok(Self {
                        held: Some((file, path.to_path_buf())),
                    });
                }
                Err(err) if is_lock_contended(&err) => {
                    if start.elapsed() >= timeout {
                        return Err(AppError::lock_timeout(format!(
                            "timed out after {timeout_ms}ms waiting for {}",
                            path.display()
                        )));
                    }
                    std::thread::sleep(retry_interval);
                }
                Err(err) => {
                    return Err(AppError::io(format!("{}: {}", path.display(), err)));
                }
            }
        }
    }

    pub fn unlocked() -> Self {
        Self { held: None }
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.held.as_ref().map(|(_, path)| path.as_path())
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some((file, path)) = self.held.take() {
            let _ = FileExt::unlock(&file);
            tracing::debug!(path = %path.display(), "released store lock");
        }
    }
}
