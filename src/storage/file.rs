use async_trait::async_trait;
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::{LocalStorage, StorageError};

const LOCK_FILE: &str = ".lock";
const PROBE_KEY: &str = "__probe__";

/// Directory-backed storage: one `<key>.json` file per key.
///
/// The directory is locked for the lifetime of the value so a second client
/// for the same session cannot interleave queue writes. A directory that
/// cannot be created or locked yields an unavailable storage rather than an
/// error; callers then run without durability.
pub struct FileStorage {
    directory: PathBuf,
    _lock_guard: Option<RwLockWriteGuard<'static, File>>,
    unavailable_reason: Option<String>,
}

impl FileStorage {
    pub fn open(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();

        match Self::acquire_lock(&directory) {
            Ok(guard) => {
                info!(directory = ?directory, "Opened offline storage");
                Self {
                    directory,
                    _lock_guard: Some(guard),
                    unavailable_reason: None,
                }
            }
            Err(reason) => {
                warn!(directory = ?directory, reason = %reason, "Offline storage unavailable");
                Self {
                    directory,
                    _lock_guard: None,
                    unavailable_reason: Some(reason),
                }
            }
        }
    }

    fn acquire_lock(directory: &Path) -> Result<RwLockWriteGuard<'static, File>, String> {
        std::fs::create_dir_all(directory)
            .map_err(|e| format!("cannot create {}: {e}", directory.display()))?;

        let lock_file = File::create(directory.join(LOCK_FILE))
            .map_err(|e| format!("cannot create lock file: {e}"))?;
        // The guard must outlive every borrow of the lock, so the lock itself is leaked
        let lock = Box::leak(Box::new(RwLock::new(lock_file)));
        lock.try_write()
            .map_err(|_| "another client holds the offline storage lock".to_string())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.json", key))
    }

    fn check_available(&self) -> Result<(), StorageError> {
        match &self.unavailable_reason {
            Some(reason) => Err(StorageError::Unavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("directory", &self.directory)
            .field("locked", &self._lock_guard.is_some())
            .field("unavailable_reason", &self.unavailable_reason)
            .finish()
    }
}

#[async_trait]
impl LocalStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;

        match fs::read_to_string(self.key_path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;

        // Write to temporary file first, then rename (atomic operation)
        let path = self.key_path(key);
        let temp_file = format!("{}.tmp", path.display());
        fs::write(&temp_file, value).await?;
        fs::rename(&temp_file, &path).await?;

        debug!(key = %key, bytes = value.len(), "Stored offline value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;

        match fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_available(&self) -> bool {
        if self.unavailable_reason.is_some() {
            return false;
        }
        self.set(PROBE_KEY, PROBE_KEY).await.is_ok() && self.remove(PROBE_KEY).await.is_ok()
    }
}
