// In-memory delivery store - seeded records, a connectivity switch and a patch log

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{DeliveryStore, StatusPatch, StoreError};
use crate::types::{DeliveryId, DeliveryRecord};

#[derive(Debug)]
pub struct InMemoryDeliveryStore {
    records: Mutex<BTreeMap<DeliveryId, DeliveryRecord>>,
    online: AtomicBool,
    rejected_ids: Mutex<HashSet<DeliveryId>>,
    patch_log: Mutex<Vec<(DeliveryId, StatusPatch)>>,
}

impl Default for InMemoryDeliveryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            online: AtomicBool::new(true),
            rejected_ids: Mutex::new(HashSet::new()),
            patch_log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = DeliveryRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    pub fn insert(&self, record: DeliveryRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(record.id.clone(), record);
        }
    }

    pub fn get(&self, id: &DeliveryId) -> Option<DeliveryRecord> {
        self.records.lock().ok().and_then(|records| records.get(id).cloned())
    }

    /// Simulate losing or regaining connectivity
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Make every patch for `id` fail with a 403 rejection
    pub fn reject(&self, id: impl Into<DeliveryId>) {
        if let Ok(mut rejected) = self.rejected_ids.lock() {
            rejected.insert(id.into());
        }
    }

    /// Patches accepted so far, in the order the store applied them
    pub fn patch_log(&self) -> Vec<(DeliveryId, StatusPatch)> {
        self.patch_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::NetworkUnavailable("store is offline".to_string()))
        }
    }

    fn lock_poisoned() -> StoreError {
        StoreError::InvalidResponse("in-memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn list(&self) -> Result<Vec<DeliveryRecord>, StoreError> {
        self.check_online()?;
        let records = self.records.lock().map_err(|_| Self::lock_poisoned())?;
        Ok(records.values().cloned().collect())
    }

    async fn get_by_agent(&self, agent: &str) -> Result<Vec<DeliveryRecord>, StoreError> {
        self.check_online()?;
        let records = self.records.lock().map_err(|_| Self::lock_poisoned())?;
        Ok(records
            .values()
            .filter(|record| record.agent.trim().eq_ignore_ascii_case(agent.trim()))
            .cloned()
            .collect())
    }

    async fn patch_status(
        &self,
        id: &DeliveryId,
        patch: &StatusPatch,
    ) -> Result<Option<DeliveryRecord>, StoreError> {
        self.check_online()?;

        let is_rejected = self
            .rejected_ids
            .lock()
            .map_err(|_| Self::lock_poisoned())?
            .contains(id);
        if is_rejected {
            return Err(StoreError::Rejected {
                status: 403,
                message: format!("update for delivery {} refused", id),
            });
        }

        let mut records = self.records.lock().map_err(|_| Self::lock_poisoned())?;
        let record = records.get_mut(id).ok_or_else(|| StoreError::Rejected {
            status: 404,
            message: format!("delivery {} not found", id),
        })?;

        record.status = patch.status;
        record.notes = patch.notes.clone();
        if !patch.signature.is_empty() {
            record.signature = Some(patch.signature.clone());
        }
        let updated = record.clone();
        drop(records);

        self.patch_log
            .lock()
            .map_err(|_| Self::lock_poisoned())?
            .push((id.clone(), patch.clone()));

        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::DeliveryStatus;
    use chrono::NaiveDate;

    fn seeded() -> InMemoryDeliveryStore {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        InMemoryDeliveryStore::with_records([
            DeliveryRecord::assigned(1, "SKU-1", 1, "aravind@example.com", date),
            DeliveryRecord::assigned(2, "SKU-2", 4, "kavya@example.com", date),
        ])
    }

    fn patch(status: DeliveryStatus, signature: &str) -> StatusPatch {
        StatusPatch {
            status,
            notes: "note".to_string(),
            signature: signature.to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_by_agent_filters() {
        let store = seeded();
        let mine = store.get_by_agent("Aravind@example.com").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, DeliveryId::from(1));
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_patch_applies_and_logs() {
        let store = seeded();
        let record = store
            .patch_status(&DeliveryId::from(1), &patch(DeliveryStatus::Delivered, "data:image/png;base64,AAAA"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.status, DeliveryStatus::Delivered);
        assert_eq!(record.signature.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(store.patch_log().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_and_rejected() {
        let store = seeded();
        store.set_online(false);
        let err = store.list().await.unwrap_err();
        assert!(err.is_transient());

        store.set_online(true);
        store.reject(2u64);
        let err = store
            .patch_status(&DeliveryId::from(2), &patch(DeliveryStatus::Damaged, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 403, .. }));

        let err = store
            .patch_status(&DeliveryId::from(77), &patch(DeliveryStatus::Damaged, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 404, .. }));
        assert!(store.patch_log().is_empty());
    }
}
