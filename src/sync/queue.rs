use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::lifecycle::StatusUpdate;
use crate::types::DeliveryId;

/// A status update accepted locally but not yet confirmed by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpdate {
    pub update_id: Uuid,
    #[serde(flatten)]
    pub update: StatusUpdate,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingUpdate {
    pub fn new(update: StatusUpdate) -> Self {
        Self {
            update_id: Uuid::new_v4(),
            update,
            enqueued_at: Utc::now(),
        }
    }

    pub fn delivery_id(&self) -> &DeliveryId {
        self.update.delivery_id()
    }
}

/// FIFO of pending updates. Entries leave only from the front, so per-id
/// submit order is the order the store sees them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfflineQueue {
    entries: VecDeque<PendingUpdate>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pending: PendingUpdate) {
        self.entries.push_back(pending);
    }

    pub fn front(&self) -> Option<&PendingUpdate> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<PendingUpdate> {
        self.entries.pop_front()
    }

    pub fn contains_delivery(&self, id: &DeliveryId) -> bool {
        self.entries.iter().any(|pending| pending.delivery_id() == id)
    }

    /// Queued updates for one delivery, oldest first
    pub fn for_delivery<'a>(&'a self, id: &'a DeliveryId) -> impl Iterator<Item = &'a PendingUpdate> + 'a {
        self.entries
            .iter()
            .filter(move |pending| pending.delivery_id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingUpdate> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::DeliveryStatus;

    fn pending(id: u64, status: DeliveryStatus) -> PendingUpdate {
        PendingUpdate::new(StatusUpdate::new(DeliveryId::from(id), status, "", None).unwrap())
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = OfflineQueue::new();
        queue.push(pending(3, DeliveryStatus::InProgress));
        queue.push(pending(4, DeliveryStatus::Damaged));
        queue.push(pending(3, DeliveryStatus::DoorLocked));

        assert_eq!(queue.len(), 3);
        let for_three: Vec<_> = queue
            .for_delivery(&DeliveryId::from(3))
            .map(|p| p.update.status())
            .collect();
        assert_eq!(for_three, vec![DeliveryStatus::InProgress, DeliveryStatus::DoorLocked]);

        assert_eq!(queue.pop_front().unwrap().delivery_id(), &DeliveryId::from(3));
        assert_eq!(queue.front().unwrap().delivery_id(), &DeliveryId::from(4));
        assert!(queue.contains_delivery(&DeliveryId::from(3)));
        assert!(!queue.contains_delivery(&DeliveryId::from(5)));
    }

    #[test]
    fn test_persisted_shape_is_flat() {
        let mut queue = OfflineQueue::new();
        queue.push(pending(3, DeliveryStatus::Damaged));

        let json = serde_json::to_value(&queue).unwrap();
        let entry = &json[0];
        assert_eq!(entry["deliveryId"], "3");
        assert_eq!(entry["status"], "damaged");
        assert!(entry["updateId"].is_string());
        assert!(entry["enqueuedAt"].is_string());

        let restored: OfflineQueue = serde_json::from_value(json).unwrap();
        assert_eq!(restored, queue);
    }
}
