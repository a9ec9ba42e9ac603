// Delivery Lifecycle Module - single authority over status transitions
//
// Pure transition logic over a record it is handed: no I/O, no authorization.
// Persistence of the resulting update is the offline queue's concern.

pub mod status;
pub mod state_machine;

pub use status::DeliveryStatus;
pub use state_machine::{
    apply_status, apply_update, can_transition, offered_transitions, LifecycleError, Signature,
    StatusUpdate,
};
