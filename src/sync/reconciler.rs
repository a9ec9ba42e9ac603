use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use std::cmp::{Ordering, Reverse};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    is_stale_at, AgentView, Durability, FlushReport, OfflineQueue, PendingUpdate, SubmitOutcome,
    SyncConfig, SyncReport,
};
use crate::lifecycle::{apply_update, StatusUpdate};
use crate::storage::{
    load_json, save_json, LocalStorage, StorageError, CORRUPT_PENDING_UPDATES_KEY, DELIVERIES_KEY,
    LAST_SYNC_KEY, PENDING_UPDATES_KEY,
};
use crate::store::{DeliveryStore, StatusPatch, StoreError};
use crate::types::{AgentContext, DayBucket, DeliveryId, DeliveryRecord};

/// Owns the offline queue and the local mirror for one agent session.
///
/// All methods take `&mut self`: the session drives one operation at a time,
/// and per-delivery ordering falls out of the single FIFO.
pub struct SyncReconciler {
    store: Arc<dyn DeliveryStore>,
    storage: Arc<dyn LocalStorage>,
    config: SyncConfig,
    queue: OfflineQueue,
    deliveries: Vec<DeliveryRecord>,
    last_sync: Option<DateTime<Utc>>,
    durability: Durability,
}

impl SyncReconciler {
    /// Restore queue, mirror and last sync time from `storage`.
    ///
    /// Never fails: unavailable storage opens in degraded mode and an
    /// unreadable key starts empty.
    pub async fn open(
        store: Arc<dyn DeliveryStore>,
        storage: Arc<dyn LocalStorage>,
        config: SyncConfig,
    ) -> Self {
        let mut reconciler = Self {
            store,
            storage,
            config,
            queue: OfflineQueue::new(),
            deliveries: Vec::new(),
            last_sync: None,
            durability: Durability::Durable,
        };

        if !reconciler.storage.is_available().await {
            reconciler.degrade("local storage unavailable at startup");
            return reconciler;
        }

        reconciler.queue = reconciler.restore_queue().await;
        reconciler.deliveries = reconciler.restore(DELIVERIES_KEY).await.unwrap_or_default();
        reconciler.last_sync = reconciler.restore_last_sync().await;

        info!(
            queue_len = reconciler.queue.len(),
            deliveries = reconciler.deliveries.len(),
            last_sync = ?reconciler.last_sync,
            "Offline state restored"
        );
        reconciler
    }

    async fn restore<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        match load_json(self.storage.as_ref(), key).await {
            Ok(value) => value,
            Err(StorageError::Unavailable { reason }) => {
                self.degrade(&reason);
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable offline state");
                None
            }
        }
    }

    /// Restore the queue entry by entry, so one damaged entry never costs the
    /// rest. The raw value is copied to [`CORRUPT_PENDING_UPDATES_KEY`] before
    /// the next save can overwrite it.
    async fn restore_queue(&mut self) -> OfflineQueue {
        let raw = match self.storage.get(PENDING_UPDATES_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return OfflineQueue::new(),
            Err(StorageError::Unavailable { reason }) => {
                self.degrade(&reason);
                return OfflineQueue::new();
            }
            Err(e) => {
                warn!(key = PENDING_UPDATES_KEY, error = %e, "Could not read offline queue");
                return OfflineQueue::new();
            }
        };

        let mut queue = OfflineQueue::new();
        let mut skipped = 0;
        match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(entries) => {
                for (position, entry) in entries.into_iter().enumerate() {
                    match serde_json::from_value::<PendingUpdate>(entry) {
                        Ok(pending) => queue.push(pending),
                        Err(e) => {
                            skipped += 1;
                            warn!(position, error = %e, "Skipping unreadable queued update");
                        }
                    }
                }
            }
            Err(e) => {
                skipped += 1;
                warn!(key = PENDING_UPDATES_KEY, error = %e, "Offline queue is not a JSON array");
            }
        }

        if skipped > 0 {
            if let Err(e) = self.storage.set(CORRUPT_PENDING_UPDATES_KEY, &raw).await {
                warn!(key = CORRUPT_PENDING_UPDATES_KEY, error = %e, "Could not back up unreadable queue");
            }
            warn!(
                restored = queue.len(),
                skipped,
                backup = CORRUPT_PENDING_UPDATES_KEY,
                "Offline queue partially restored"
            );
        }
        queue
    }

    async fn restore_last_sync(&mut self) -> Option<DateTime<Utc>> {
        let raw = match self.storage.get(LAST_SYNC_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = LAST_SYNC_KEY, error = %e, "Could not read last sync time");
                return None;
            }
        };

        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(timestamp) => Some(timestamp.with_timezone(&Utc)),
            Err(e) => {
                warn!(key = LAST_SYNC_KEY, error = %e, "Discarding unreadable last sync time");
                None
            }
        }
    }

    /// Send `update` to the store, or queue it when the store is unreachable.
    ///
    /// A store rejection is returned as an error and nothing is queued.
    /// Storage failures never fail the call; they show up as
    /// [`Durability::Degraded`] in the outcome.
    pub async fn submit(&mut self, update: StatusUpdate) -> Result<SubmitOutcome, StoreError> {
        let id = update.delivery_id().clone();

        if self.queue.contains_delivery(&id) {
            debug!(delivery_id = %id, "Earlier update still queued, queueing behind it");
            return Ok(self.enqueue(update).await);
        }

        let patch = StatusPatch::from(&update);
        match self.store.patch_status(&id, &patch).await {
            Ok(returned) => {
                info!(delivery_id = %id, status = %update.status(), "Status update confirmed");
                let record = match returned {
                    Some(record) => {
                        self.merge_confirmed(record.clone());
                        Some(record)
                    }
                    None => self.apply_locally(&update),
                };
                self.persist_deliveries().await;
                Ok(SubmitOutcome::Confirmed {
                    record,
                    durability: self.durability,
                })
            }
            Err(e) if e.is_transient() => {
                warn!(delivery_id = %id, error = %e, "Store unreachable, update queued");
                Ok(self.enqueue(update).await)
            }
            Err(e) => {
                warn!(delivery_id = %id, error = %e, "Status update rejected by store");
                Err(e)
            }
        }
    }

    /// Apply `update` to the mirrored record, if there is one
    fn apply_locally(&mut self, update: &StatusUpdate) -> Option<DeliveryRecord> {
        let record = self
            .deliveries
            .iter_mut()
            .find(|record| &record.id == update.delivery_id())?;
        if let Err(e) = apply_update(record, update) {
            warn!(delivery_id = %record.id, error = %e, "Update not reflected locally");
        }
        Some(record.clone())
    }

    async fn enqueue(&mut self, update: StatusUpdate) -> SubmitOutcome {
        self.apply_locally(&update);

        let pending = PendingUpdate::new(update);
        self.queue.push(pending.clone());
        self.persist_queue().await;
        self.persist_deliveries().await;

        info!(
            delivery_id = %pending.delivery_id(),
            status = %pending.update.status(),
            queue_len = self.queue.len(),
            "Update pending sync"
        );

        SubmitOutcome::Queued {
            pending,
            queue_len: self.queue.len(),
            durability: self.durability,
        }
    }

    /// Resend queued updates oldest first.
    ///
    /// An entry leaves the queue only once the store confirmed or rejected
    /// it; the first transient failure stops the walk.
    pub async fn flush(&mut self) -> FlushReport {
        let mut applied = Vec::new();
        let mut rejected = Vec::new();
        let mut interrupted = None;

        while let Some(pending) = self.queue.front().cloned() {
            let patch = StatusPatch::from(&pending.update);
            match self.store.patch_status(pending.delivery_id(), &patch).await {
                Ok(returned) => {
                    self.queue.pop_front();
                    self.persist_queue().await;
                    // without a returned record the mirror already shows the
                    // update, applied when it was queued
                    if let Some(record) = returned {
                        self.merge_confirmed(record);
                    }
                    applied.push(pending);
                }
                Err(e) if e.is_transient() => {
                    debug!(delivery_id = %pending.delivery_id(), error = %e, "Flush interrupted");
                    interrupted = Some(e);
                    break;
                }
                Err(e) => {
                    warn!(
                        delivery_id = %pending.delivery_id(),
                        error = %e,
                        "Dropping queued update rejected by store"
                    );
                    self.queue.pop_front();
                    self.persist_queue().await;
                    rejected.push((pending, e));
                }
            }
        }

        if !applied.is_empty() || !rejected.is_empty() {
            self.persist_deliveries().await;
        }

        info!(
            applied = applied.len(),
            rejected = rejected.len(),
            queue_len = self.queue.len(),
            "Offline queue flushed"
        );

        FlushReport {
            applied,
            rejected,
            remaining: self.queue.len(),
            interrupted,
            durability: self.durability,
        }
    }

    /// Replace the mirror with the agent's records from the store, replay
    /// still-queued updates on top and record the sync time
    pub async fn refresh(&mut self, ctx: &AgentContext) -> Result<usize, StoreError> {
        let mut records = self.store.get_by_agent(&ctx.agent).await?;

        for pending in self.queue.iter() {
            if let Some(record) = records
                .iter_mut()
                .find(|record| &record.id == pending.delivery_id())
            {
                if let Err(e) = apply_update(record, &pending.update) {
                    warn!(delivery_id = %record.id, error = %e, "Queued update not replayed");
                }
            }
        }

        let count = records.len();
        self.deliveries = records;
        let now = Utc::now();
        self.last_sync = Some(now);

        self.persist_deliveries().await;
        self.persist_last_sync(now).await;

        info!(agent = %ctx.agent, deliveries = count, "Deliveries refreshed");
        Ok(count)
    }

    /// Flush, then refresh when the queue drained
    pub async fn sync(&mut self, ctx: &AgentContext) -> SyncReport {
        let flush = self.flush().await;
        if !flush.drained() {
            return SyncReport {
                flush,
                refreshed: None,
                refresh_error: None,
            };
        }

        match self.refresh(ctx).await {
            Ok(count) => SyncReport {
                flush,
                refreshed: Some(count),
                refresh_error: None,
            },
            Err(e) => {
                warn!(agent = %ctx.agent, error = %e, "Refresh after flush failed");
                SyncReport {
                    flush,
                    refreshed: None,
                    refresh_error: Some(e),
                }
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        is_stale_at(self.last_sync, now, self.config.stale_after)
    }

    /// The agent's records split by day, each tab ordered by priority then id
    pub fn agent_view(&self, ctx: &AgentContext, today: NaiveDate) -> AgentView {
        let mut view = AgentView::default();
        for record in self.deliveries.iter().filter(|record| ctx.owns(record)) {
            match record.bucket(today) {
                DayBucket::Today => view.today.push(record.clone()),
                DayBucket::Past => view.past.push(record.clone()),
            }
        }

        view.today.sort_by(display_order);
        view.past.sort_by(display_order);
        view
    }

    pub fn deliveries(&self) -> &[DeliveryRecord] {
        &self.deliveries
    }

    pub fn record(&self, id: &DeliveryId) -> Option<&DeliveryRecord> {
        self.deliveries.iter().find(|record| &record.id == id)
    }

    pub fn pending(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn durability(&self) -> Durability {
        self.durability
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Overwrite the mirrored record with the store's copy, then replay any
    /// updates for it that are still queued
    fn merge_confirmed(&mut self, mut record: DeliveryRecord) {
        let id = record.id.clone();
        for pending in self.queue.for_delivery(&id) {
            if let Err(e) = apply_update(&mut record, &pending.update) {
                warn!(delivery_id = %record.id, error = %e, "Queued update not replayed");
            }
        }

        match self.deliveries.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record,
            None => self.deliveries.push(record),
        }
    }

    async fn persist_queue(&mut self) {
        if self.durability.is_degraded() {
            return;
        }
        if let Err(e) = save_json(self.storage.as_ref(), PENDING_UPDATES_KEY, &self.queue).await {
            self.degrade(&e.to_string());
        }
    }

    async fn persist_deliveries(&mut self) {
        if self.durability.is_degraded() {
            return;
        }
        if let Err(e) = save_json(self.storage.as_ref(), DELIVERIES_KEY, &self.deliveries).await {
            self.degrade(&e.to_string());
        }
    }

    async fn persist_last_sync(&mut self, timestamp: DateTime<Utc>) {
        if self.durability.is_degraded() {
            return;
        }
        if let Err(e) = self.storage.set(LAST_SYNC_KEY, &timestamp.to_rfc3339()).await {
            self.degrade(&e.to_string());
        }
    }

    /// Switch to in-memory operation for the rest of the session
    fn degrade(&mut self, reason: &str) {
        if self.durability.is_degraded() {
            return;
        }
        self.durability = Durability::Degraded;
        warn!(
            reason = %reason,
            queue_len = self.queue.len(),
            "Durability degraded: pending updates will not survive a restart"
        );
    }
}

impl std::fmt::Debug for SyncReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncReconciler")
            .field("queue_len", &self.queue.len())
            .field("deliveries", &self.deliveries.len())
            .field("last_sync", &self.last_sync)
            .field("durability", &self.durability)
            .finish()
    }
}

/// Emergency first, then perishable, then normal; numeric ids in numeric order
fn display_order(a: &DeliveryRecord, b: &DeliveryRecord) -> Ordering {
    Reverse(a.priority)
        .cmp(&Reverse(b.priority))
        .then_with(|| compare_ids(&a.id, &b.id))
}

fn compare_ids(a: &DeliveryId, b: &DeliveryId) -> Ordering {
    match (a.as_str().parse::<u64>(), b.as_str().parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
