use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::DeliveryStatus;
use crate::types::{DeliveryId, DeliveryRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("a customer signature is required to mark a delivery as delivered")]
    MissingSignature,
    #[error("delivery {id} is already delivered and cannot move to {target}")]
    AlreadyDelivered { id: DeliveryId, target: DeliveryStatus },
    #[error("unknown delivery status: {value:?}")]
    UnknownStatus { value: String },
}

/// Non-empty encoded proof-of-delivery image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Blank input is no signature at all
    pub fn new(encoded: impl Into<String>) -> Option<Self> {
        let encoded = encoded.into();
        if encoded.trim().is_empty() {
            None
        } else {
            Some(Self(encoded))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A validated status change, ready to be submitted to the offline queue.
///
/// `signature` is present exactly when `status` is `delivered`; both the
/// constructor and deserialization enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StatusUpdateRepr")]
pub struct StatusUpdate {
    delivery_id: DeliveryId,
    status: DeliveryStatus,
    notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<Signature>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdateRepr {
    delivery_id: DeliveryId,
    status: DeliveryStatus,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    signature: Option<String>,
}

impl TryFrom<StatusUpdateRepr> for StatusUpdate {
    type Error = LifecycleError;

    fn try_from(repr: StatusUpdateRepr) -> Result<Self, Self::Error> {
        StatusUpdate::new(
            repr.delivery_id,
            repr.status,
            repr.notes,
            repr.signature.as_deref(),
        )
    }
}

impl StatusUpdate {
    /// Enforce the per-status required fields.
    /// A signature handed in for a non-delivered status is dropped.
    pub fn new(
        delivery_id: DeliveryId,
        status: DeliveryStatus,
        notes: impl Into<String>,
        signature: Option<&str>,
    ) -> Result<Self, LifecycleError> {
        let signature = if status.requires_signature() {
            Some(signature.and_then(Signature::new).ok_or(LifecycleError::MissingSignature)?)
        } else {
            None
        };

        Ok(Self {
            delivery_id,
            status,
            notes: notes.into(),
            signature,
        })
    }

    pub fn delivery_id(&self) -> &DeliveryId {
        &self.delivery_id
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }
}

/// Whether the lifecycle allows moving a record from `from` to `to`.
///
/// `delivered` is final: only re-applying `delivered` (signature re-capture or
/// a replayed update) is accepted. Every other status may move anywhere.
pub fn can_transition(from: DeliveryStatus, to: DeliveryStatus) -> bool {
    !from.is_terminal() || to == from
}

/// Statuses an agent view offers for a record in `status`, in display order
pub fn offered_transitions(status: DeliveryStatus) -> &'static [DeliveryStatus] {
    const REVISIT: &[DeliveryStatus] = &[
        DeliveryStatus::Delivered,
        DeliveryStatus::DoorLocked,
        DeliveryStatus::Damaged,
        DeliveryStatus::InProgress,
    ];

    if status.is_terminal() {
        &[]
    } else {
        REVISIT
    }
}

/// Validate and apply a status change to `record`.
///
/// On success the record's `status` and `notes` are overwritten (and
/// `signature` when delivering) and the validated update is returned for
/// submission. On failure the record is left untouched.
pub fn apply_status(
    record: &mut DeliveryRecord,
    target: DeliveryStatus,
    notes: impl Into<String>,
    signature: Option<&str>,
) -> Result<StatusUpdate, LifecycleError> {
    let update = StatusUpdate::new(record.id.clone(), target, notes, signature)?;
    apply_update(record, &update)?;
    Ok(update)
}

/// Apply an already validated update, e.g. when replaying queued updates onto
/// a freshly fetched record.
pub fn apply_update(record: &mut DeliveryRecord, update: &StatusUpdate) -> Result<(), LifecycleError> {
    if !can_transition(record.status, update.status) {
        tracing::warn!(
            delivery_id = %record.id,
            from = %record.status,
            to = %update.status,
            "Rejected transition out of delivered"
        );
        return Err(LifecycleError::AlreadyDelivered {
            id: record.id.clone(),
            target: update.status,
        });
    }

    let previous = record.status;
    record.status = update.status;
    record.notes = update.notes.clone();
    if let Some(signature) = &update.signature {
        record.signature = Some(signature.as_str().to_string());
    }

    tracing::info!(
        delivery_id = %record.id,
        from = %previous,
        to = %record.status,
        signed = update.signature.is_some(),
        "Delivery status applied"
    );

    Ok(())
}
