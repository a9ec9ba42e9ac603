use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{LocalStorage, StorageError};

/// In-process storage, used for tests and sessions without a writable disk.
/// Availability can be switched off to simulate a full or blocked store.
#[derive(Debug)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    available: AtomicBool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Raw value under `key`, regardless of availability
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable {
                reason: "memory storage switched off".to_string(),
            })
        }
    }

    fn lock_poisoned() -> StorageError {
        StorageError::Unavailable {
            reason: "memory storage lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        let entries = self.entries.lock().map_err(|_| Self::lock_poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut entries = self.entries.lock().map_err(|_| Self::lock_poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut entries = self.entries.lock().map_err(|_| Self::lock_poisoned())?;
        entries.remove(key);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_switched_off_storage_rejects_everything() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").await.unwrap();
        storage.set_available(false);

        assert!(!storage.is_available().await);
        assert!(matches!(storage.get("k").await, Err(StorageError::Unavailable { .. })));
        assert!(matches!(storage.set("k", "w").await, Err(StorageError::Unavailable { .. })));
        assert_eq!(storage.peek("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_available_again_after_switching_back_on() {
        let storage = MemoryStorage::new();
        storage.set_available(false);
        assert!(!tokio_test::block_on(storage.is_available()));

        storage.set_available(true);
        tokio_test::assert_ok!(tokio_test::block_on(storage.set("k", "v")));
        assert_eq!(storage.peek("k").as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_remove() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").await.unwrap();
        storage.remove("k").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), None);
    }
}
