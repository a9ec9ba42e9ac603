// Status update workflow - one agent editing one delivery
//
// Combines the signature pad, the lifecycle rules and the reconciler the way
// the status update view does: pick a status, add notes, sign when
// delivering, submit. Dropping the session before submit discards the draft.

use thiserror::Error;
use tracing::{info, warn};

use crate::lifecycle::{apply_status, offered_transitions, DeliveryStatus, LifecycleError};
use crate::signature::{SignatureError, SignaturePad};
use crate::store::StoreError;
use crate::sync::{SubmitOutcome, SyncReconciler};
use crate::types::{DeliveryId, DeliveryRecord};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("delivery {0} is not in the local list")]
    NotFound(DeliveryId),
}

#[derive(Debug)]
pub struct StatusUpdateSession {
    delivery_id: DeliveryId,
    current_status: DeliveryStatus,
    selected: DeliveryStatus,
    notes: String,
    pad: SignaturePad,
}

impl StatusUpdateSession {
    /// Start editing `record`, showing its stored signature on the pad if it has one
    pub fn open(record: &DeliveryRecord, mut pad: SignaturePad) -> Self {
        if let Some(existing) = record.signature.as_deref() {
            if let Err(e) = pad.load_existing(existing) {
                warn!(delivery_id = %record.id, error = %e, "Stored signature could not be shown");
            }
        }

        Self {
            delivery_id: record.id.clone(),
            current_status: record.status,
            selected: record.status,
            notes: record.notes.clone(),
            pad,
        }
    }

    pub fn delivery_id(&self) -> &DeliveryId {
        &self.delivery_id
    }

    /// Statuses the view offers for this record
    pub fn offered(&self) -> &'static [DeliveryStatus] {
        offered_transitions(self.current_status)
    }

    pub fn select_status(&mut self, status: DeliveryStatus) {
        self.selected = status;
    }

    pub fn selected(&self) -> DeliveryStatus {
        self.selected
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn requires_signature(&self) -> bool {
        self.selected.requires_signature()
    }

    pub fn pad(&self) -> &SignaturePad {
        &self.pad
    }

    pub fn pad_mut(&mut self) -> &mut SignaturePad {
        &mut self.pad
    }

    /// Validate the draft against the mirrored record and hand it to the reconciler.
    ///
    /// Delivering needs a non-empty pad that renders; other statuses never
    /// touch the pad, so a broken canvas only blocks `delivered`.
    pub async fn submit(mut self, reconciler: &mut SyncReconciler) -> Result<SubmitOutcome, WorkflowError> {
        let mut record = reconciler
            .record(&self.delivery_id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(self.delivery_id.clone()))?;

        let signature = if self.requires_signature() {
            if self.pad.is_empty() {
                return Err(LifecycleError::MissingSignature.into());
            }
            Some(self.pad.end()?)
        } else {
            None
        };

        let update = apply_status(&mut record, self.selected, self.notes, signature.as_deref())?;
        let outcome = reconciler.submit(update).await?;

        info!(
            delivery_id = %self.delivery_id,
            status = %self.selected,
            pending_sync = outcome.is_pending_sync(),
            "Status update submitted"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{Point, UnavailableSurface};
    use crate::storage::MemoryStorage;
    use crate::store::InMemoryDeliveryStore;
    use crate::sync::SyncConfig;
    use crate::types::AgentContext;
    use chrono::NaiveDate;
    use std::sync::Arc;

    const AGENT: &str = "aravind@example.com";

    async fn setup(status: DeliveryStatus) -> (Arc<InMemoryDeliveryStore>, SyncReconciler) {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let store = Arc::new(InMemoryDeliveryStore::with_records([
            DeliveryRecord::assigned(2, "SKU-2", 1, AGENT, date).with_status(status),
        ]));
        let mut reconciler =
            SyncReconciler::open(store.clone(), Arc::new(MemoryStorage::new()), SyncConfig::default()).await;
        reconciler.refresh(&AgentContext::new(AGENT)).await.unwrap();
        (store, reconciler)
    }

    fn sign(pad: &mut SignaturePad) {
        pad.begin(Point::new(20.0, 40.0));
        pad.extend(Point::new(120.0, 90.0));
        pad.extend(Point::new(200.0, 60.0));
    }

    #[tokio::test]
    async fn test_delivered_without_drawing_is_rejected() {
        let (store, mut reconciler) = setup(DeliveryStatus::InProgress).await;
        let record = reconciler.record(&DeliveryId::from(2)).unwrap().clone();

        let mut session = StatusUpdateSession::open(&record, SignaturePad::new());
        session.select_status(DeliveryStatus::Delivered);
        session.set_notes("left at door");

        let err = session.submit(&mut reconciler).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Lifecycle(LifecycleError::MissingSignature)));
        assert!(store.patch_log().is_empty());
        assert_eq!(
            reconciler.record(&DeliveryId::from(2)).unwrap().status,
            DeliveryStatus::InProgress
        );
    }

    #[tokio::test]
    async fn test_signed_delivery_is_confirmed() {
        let (store, mut reconciler) = setup(DeliveryStatus::InProgress).await;
        let record = reconciler.record(&DeliveryId::from(2)).unwrap().clone();

        let mut session = StatusUpdateSession::open(&record, SignaturePad::new());
        session.select_status(DeliveryStatus::Delivered);
        session.set_notes("left at door");
        sign(session.pad_mut());

        let outcome = session.submit(&mut reconciler).await.unwrap();
        let SubmitOutcome::Confirmed { record: Some(record), .. } = outcome else {
            panic!("expected a confirmed update");
        };
        assert_eq!(record.status, DeliveryStatus::Delivered);
        assert!(record.signature.unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(store.patch_log().len(), 1);
    }

    #[tokio::test]
    async fn test_broken_canvas_blocks_only_delivered() {
        let (_store, mut reconciler) = setup(DeliveryStatus::InProgress).await;
        let record = reconciler.record(&DeliveryId::from(2)).unwrap().clone();

        let mut session =
            StatusUpdateSession::open(&record, SignaturePad::with_surface(Box::new(UnavailableSurface)));
        session.select_status(DeliveryStatus::Delivered);
        sign(session.pad_mut());
        let err = session.submit(&mut reconciler).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Signature(SignatureError::RenderingUnavailable)));

        let mut session =
            StatusUpdateSession::open(&record, SignaturePad::with_surface(Box::new(UnavailableSurface)));
        session.select_status(DeliveryStatus::DoorLocked);
        let outcome = session.submit(&mut reconciler).await.unwrap();
        assert!(!outcome.is_pending_sync());
    }

    #[tokio::test]
    async fn test_delivered_record_offers_nothing_and_refuses_changes() {
        let (_store, mut reconciler) = setup(DeliveryStatus::Delivered).await;
        let record = reconciler.record(&DeliveryId::from(2)).unwrap().clone();

        let mut session = StatusUpdateSession::open(&record, SignaturePad::new());
        assert!(session.offered().is_empty());

        session.select_status(DeliveryStatus::Damaged);
        let err = session.submit(&mut reconciler).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Lifecycle(LifecycleError::AlreadyDelivered { .. })
        ));
    }

    #[tokio::test]
    async fn test_offline_submit_is_pending_sync() {
        let (store, mut reconciler) = setup(DeliveryStatus::InProgress).await;
        store.set_online(false);
        let record = reconciler.record(&DeliveryId::from(2)).unwrap().clone();

        let mut session = StatusUpdateSession::open(&record, SignaturePad::new());
        session.select_status(DeliveryStatus::Damaged);
        session.set_notes("box crushed");

        let outcome = session.submit(&mut reconciler).await.unwrap();
        assert!(outcome.is_pending_sync());
        assert_eq!(
            reconciler.record(&DeliveryId::from(2)).unwrap().status,
            DeliveryStatus::Damaged
        );
    }

    #[test]
    fn test_open_with_unreadable_signature_keeps_empty_pad() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut record = DeliveryRecord::assigned(2, "SKU-2", 1, AGENT, date);
        record.signature = Some("not-an-image".to_string());

        let session = StatusUpdateSession::open(&record, SignaturePad::new());
        assert!(session.pad().is_empty());
    }
}
