// Offline Queue & Sync Reconciler
//
// Every status update goes to the store straight away when possible and
// otherwise waits in a durable FIFO until the next flush. The mirror of the
// agent's deliveries always reflects accepted updates, confirmed or not.

pub mod queue;
pub mod reconciler;

use chrono::{DateTime, Duration, Utc};

use crate::store::StoreError;
use crate::types::DeliveryRecord;

pub use queue::{OfflineQueue, PendingUpdate};
pub use reconciler::SyncReconciler;

/// Default age after which the mirror counts as stale
pub const DEFAULT_STALE_AFTER_MINUTES: i64 = 60;

/// Whether accepted updates currently survive a restart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    Durable,
    /// Local storage failed; the queue lives in memory for the rest of the session
    Degraded,
}

impl Durability {
    pub fn is_degraded(self) -> bool {
        self == Durability::Degraded
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub stale_after: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::minutes(DEFAULT_STALE_AFTER_MINUTES),
        }
    }
}

impl SyncConfig {
    /// Threshold from a configured minute count. Negative or out-of-range
    /// values fall back to the default.
    pub fn with_stale_after_minutes(minutes: i64) -> Self {
        match Duration::try_minutes(minutes) {
            Some(stale_after) if minutes >= 0 => Self { stale_after },
            _ => {
                tracing::warn!(minutes, "Ignoring unusable stale threshold, using default");
                Self::default()
            }
        }
    }
}

/// Result of a successful `submit`
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The store applied the update. `record` is the store's copy when it
    /// sent one back, otherwise the mirrored record with the update applied.
    Confirmed {
        record: Option<DeliveryRecord>,
        durability: Durability,
    },
    /// Accepted locally, pending sync
    Queued {
        pending: PendingUpdate,
        queue_len: usize,
        durability: Durability,
    },
}

impl SubmitOutcome {
    pub fn durability(&self) -> Durability {
        match self {
            SubmitOutcome::Confirmed { durability, .. } | SubmitOutcome::Queued { durability, .. } => {
                *durability
            }
        }
    }

    pub fn is_pending_sync(&self) -> bool {
        matches!(self, SubmitOutcome::Queued { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    /// Entries the store confirmed, in queue order
    pub applied: Vec<PendingUpdate>,
    /// Entries the store refused; they were dropped from the queue
    pub rejected: Vec<(PendingUpdate, StoreError)>,
    /// Entries still queued after the flush
    pub remaining: usize,
    /// Transient failure that stopped the walk, if any
    pub interrupted: Option<StoreError>,
    pub durability: Durability,
}

impl FlushReport {
    pub fn drained(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub flush: FlushReport,
    /// Records fetched by the refresh, when it ran and succeeded
    pub refreshed: Option<usize>,
    pub refresh_error: Option<StoreError>,
}

/// The agent's mirror split into the two tabs of the agent view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentView {
    pub today: Vec<DeliveryRecord>,
    pub past: Vec<DeliveryRecord>,
}

/// True when there never was a full sync, or when more than `threshold` has
/// passed since the last one
pub fn is_stale_at(last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>, threshold: Duration) -> bool {
    match last_sync {
        None => true,
        Some(last_sync) => now.signed_duration_since(last_sync) > threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staleness_threshold() {
        let now = Utc::now();
        let hour = Duration::minutes(60);

        assert!(is_stale_at(None, now, hour));
        assert!(!is_stale_at(Some(now - Duration::minutes(59)), now, hour));
        assert!(!is_stale_at(Some(now - Duration::minutes(60)), now, hour));
        assert!(is_stale_at(Some(now - Duration::minutes(61)), now, hour));
    }

    #[test]
    fn test_default_threshold_is_one_hour() {
        assert_eq!(SyncConfig::default().stale_after, Duration::hours(1));
        assert_eq!(SyncConfig::with_stale_after_minutes(5).stale_after, Duration::minutes(5));
        assert_eq!(SyncConfig::with_stale_after_minutes(-1), SyncConfig::default());
        assert_eq!(SyncConfig::with_stale_after_minutes(i64::MAX), SyncConfig::default());
    }
}
