//! Local key/value persistence for offline operation
//!
//! The offline queue, the last sync timestamp and the mirrored delivery list
//! live under the stable keys below so that a restarted client can recover
//! updates it has not yet synchronised.
//!
//! | key                       | contents                                   |
//! |---------------------------|--------------------------------------------|
//! | `dlvery_pending_updates`  | JSON array of pending updates, oldest first |
//! | `dlvery_last_sync`        | RFC 3339 timestamp of the last full sync    |
//! | `dlvery_deliveries`       | JSON array of the mirrored delivery records |
//! | `dlvery_pending_updates.corrupt` | raw queue value that failed to restore |

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

pub const PENDING_UPDATES_KEY: &str = "dlvery_pending_updates";
pub const LAST_SYNC_KEY: &str = "dlvery_last_sync";
pub const DELIVERIES_KEY: &str = "dlvery_deliveries";
/// Backup of a queue value that could not be fully restored
pub const CORRUPT_PENDING_UPDATES_KEY: &str = "dlvery_pending_updates.corrupt";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("local storage is unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key/value storage that survives restarts
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Probe whether writes currently succeed
    async fn is_available(&self) -> bool;
}

/// Read and deserialize a JSON value stored under `key`
pub async fn load_json<T: DeserializeOwned>(
    storage: &dyn LocalStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize `value` as JSON under `key`
pub async fn save_json<T: Serialize + ?Sized>(
    storage: &dyn LocalStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    storage.set(key, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_helpers_round_trip() {
        let storage = MemoryStorage::new();
        save_json(&storage, DELIVERIES_KEY, &vec![1, 2, 3]).await.unwrap();

        let loaded: Option<Vec<u32>> = load_json(&storage, DELIVERIES_KEY).await.unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        let missing: Option<Vec<u32>> = load_json(&storage, LAST_SYNC_KEY).await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_corrupt_value_is_a_serialization_error() {
        let storage = MemoryStorage::new();
        storage.set(PENDING_UPDATES_KEY, "{not json").await.unwrap();

        let result: Result<Option<Vec<u32>>, _> = load_json(&storage, PENDING_UPDATES_KEY).await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }
}
