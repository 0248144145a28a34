//! Observer-side surface of the negotiation protocol.

use std::fmt;

use cwx_model::Subject;

/// Subscription priority bands.
///
/// Lower values are notified first. Domain-specific UI refreshers subscribe
/// in the [`UI`] band; domain-agnostic infrastructure (recently-used list
/// trackers, launch-context mirrors) subscribes in the [`INFRASTRUCTURE`]
/// band so it observes commits last.
pub mod priority {
    pub const UI: i32 = 10;
    pub const INFRASTRUCTURE: i32 = 100;
}

/// How a change was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeRequest {
    /// Suppress interactive confirmation during the propose phase.
    pub silent: bool,
    /// The requester is the orchestrator currently driving a multi-step
    /// flow on this context; exempts the call from the reentrancy guard.
    pub self_initiated: bool,
}

impl ChangeRequest {
    pub const INTERACTIVE: Self = Self {
        silent: false,
        self_initiated: false,
    };
    pub const SILENT: Self = Self {
        silent: true,
        self_initiated: false,
    };
    pub const SELF_INITIATED: Self = Self {
        silent: true,
        self_initiated: true,
    };
}

/// View of an in-flight change handed to observers during propose and
/// commit fan-out.
#[derive(Debug, Clone, Copy)]
pub struct Proposal<'a> {
    pub subject: &'a Subject,
    pub silent: bool,
    pub self_initiated: bool,
}

/// Observer answer to a propose notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vote {
    Accept,
    /// Decline with a human-readable reason shown to the requester.
    Veto(String),
}

/// A subscriber to one shared context.
///
/// `pending` may block on user confirmation when the proposal is not
/// silent; no other operation on the same context proceeds until it
/// returns. `canceled` is never broadcast by the engine; it is a
/// bookkeeping hook an orchestrator may invoke on itself when abandoning a
/// multi-step flow it initiated.
pub trait ContextObserver {
    /// Stable label used in fault logs.
    fn label(&self) -> &str;

    fn pending(&mut self, proposal: &Proposal<'_>) -> Vote {
        let _ = proposal;
        Vote::Accept
    }

    fn committed(&mut self, proposal: &Proposal<'_>) {
        let _ = proposal;
    }

    fn canceled(&mut self) {}
}

/// Fan-out phase in which an observer fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutPhase {
    Propose,
    Commit,
}

impl fmt::Display for FanoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanoutPhase::Propose => f.write_str("propose"),
            FanoutPhase::Commit => f.write_str("commit"),
        }
    }
}

/// Report of a caught observer panic, surfaced through the fault hook.
#[derive(Debug, Clone)]
pub struct ObserverFault {
    pub context: String,
    pub observer: String,
    pub phase: FanoutPhase,
    pub detail: String,
}

pub type FaultHook = Box<dyn Fn(&ObserverFault)>;
