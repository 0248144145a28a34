//! Shared-context synchronization for the clinical workstation.
//!
//! Many independent UI components observe and propose changes to a small
//! set of session-wide "current subject" slots (patient, encounter,
//! participant, signed-in user). This crate provides the two-phase
//! propose/veto/commit engine those components negotiate through, the
//! session-scoped registry of named contexts, the resource-backed
//! specialization that resolves subjects from logical ids, and the flat
//! key/value handoff used for cross-process interop.

pub mod engine;
pub mod error;
pub mod handoff;
pub mod observer;
pub mod registry;
pub mod resource;

pub use engine::{ChangeOutcome, ContextHandle, ObserverHandle, SharedContext, SubscriptionId};
pub use error::{ContextError, Result};
pub use observer::{
    ChangeRequest, ContextObserver, FanoutPhase, ObserverFault, Proposal, Vote, priority,
};
pub use registry::{ContextRegistry, names};
pub use resource::{FetchError, ResourceContext, ResourceFetcher};
