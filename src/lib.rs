// dlvery Library - Last-mile delivery lifecycle with offline reconciliation
// This exposes the core components for testing and integration

pub mod priority;
pub mod types;
pub mod lifecycle;
pub mod signature;
pub mod storage;
pub mod store;
pub mod sync;
pub mod workflow;
pub mod telemetry;
pub mod config;
pub mod cli;

// Re-export key types for easy access
pub use priority::Priority;
pub use types::{AgentContext, DayBucket, DeliveryId, DeliveryRecord};
pub use lifecycle::{
    apply_status, apply_update, offered_transitions, DeliveryStatus, LifecycleError, Signature,
    StatusUpdate,
};
pub use signature::{
    ImageSurface, Point, RasterSurface, SignatureError, SignaturePad, UnavailableSurface,
};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
pub use store::{
    DeliveryStore, HttpDeliveryStore, InMemoryDeliveryStore, StatusPatch, StoreError,
};
pub use sync::{
    is_stale_at, AgentView, Durability, FlushReport, PendingUpdate, SubmitOutcome, SyncConfig,
    SyncReconciler, SyncReport,
};
pub use workflow::{StatusUpdateSession, WorkflowError};
pub use telemetry::{init_telemetry, shutdown_telemetry, generate_correlation_id, create_sync_span};
pub use config::{DlveryConfig, config};
