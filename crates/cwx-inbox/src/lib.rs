//! Sequential notification/message processing for the clinical
//! workstation inbox.
//!
//! A backlog of heterogeneous notification items is drained one item at a
//! time. Actionable items dispatch through registered handlers after
//! moving the shared patient context (self-initiated, exempt from the
//! engine's reentrancy guard); informational items are presented for a
//! per-item or session-wide (skip-all / delete-all) resolution. A change
//! to the patient context that the queue did not initiate invalidates the
//! session.

pub mod error;
pub mod processor;
pub mod session;

pub use error::{InboxError, Result};
pub use processor::{
    InboxProcessor, ItemAction, ItemHandler, ItemStore, ProcessorStatus, QueueState,
};
pub use session::{BulkAction, SessionSummary};
