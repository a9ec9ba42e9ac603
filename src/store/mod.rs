// Delivery Store Client - the backend collaborator contract
//
// Only list/get-by-agent/patch-status are needed by the core. Record creation
// and deletion belong to the assignment workflow and are not modelled here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::lifecycle::{DeliveryStatus, StatusUpdate};
use crate::types::{DeliveryId, DeliveryRecord};

pub mod http;
pub mod memory;

pub use http::HttpDeliveryStore;
pub use memory::InMemoryDeliveryStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transport failure, timeout or a transient server status. Queued and retried.
    #[error("delivery store unreachable: {0}")]
    NetworkUnavailable(String),

    /// The store refused this update (unknown record, permission denied, ...).
    /// Terminal for the update; it is never retried.
    #[error("delivery store rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// A failed response whose body could not be read
    #[error("invalid response from delivery store: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Whether the failure should leave the update queued for a later retry.
    ///
    /// A successful PATCH is never reported as `InvalidResponse`, so this
    /// only covers reads; resending is safe because updates are idempotent.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::NetworkUnavailable(_) | StoreError::InvalidResponse(_) => true,
            StoreError::Rejected { .. } => false,
        }
    }
}

/// Body of the status PATCH request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPatch {
    pub status: DeliveryStatus,
    pub notes: String,
    /// Empty when the status carries no signature
    pub signature: String,
}

impl From<&StatusUpdate> for StatusPatch {
    fn from(update: &StatusUpdate) -> Self {
        Self {
            status: update.status(),
            notes: update.notes().to_string(),
            signature: update
                .signature()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Backend holding the authoritative delivery records
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Every delivery known to the store
    async fn list(&self) -> Result<Vec<DeliveryRecord>, StoreError>;

    /// Deliveries assigned to `agent`
    async fn get_by_agent(&self, agent: &str) -> Result<Vec<DeliveryRecord>, StoreError>;

    /// Overwrite status, notes and signature of one delivery; idempotent.
    ///
    /// Any success status confirms the update. The updated record comes back
    /// when the response body carries one, `None` otherwise.
    async fn patch_status(
        &self,
        id: &DeliveryId,
        patch: &StatusPatch,
    ) -> Result<Option<DeliveryRecord>, StoreError>;
}
