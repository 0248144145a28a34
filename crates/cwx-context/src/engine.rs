//! Two-phase shared-context negotiation.
//!
//! A [`SharedContext`] holds the single current subject of interest for one
//! named slot and fans proposed changes out to its observers: first a
//! propose pass soliciting vetoes in ascending priority order, then, when
//! nobody vetoed, a commit pass over the same snapshot. All calls run on
//! the session's one cooperative thread; interior mutability replaces
//! locking.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use cwx_model::{Subject, SubjectKind};
use tracing::{debug, error, info};

use crate::error::{ContextError, Result};
use crate::observer::{
    ChangeRequest, ContextObserver, FanoutPhase, FaultHook, ObserverFault, Proposal, Vote,
};

/// Shared, reference-counted observer registration.
pub type ObserverHandle = Rc<RefCell<dyn ContextObserver>>;

/// Handle to one registered context; cheap to clone.
pub type ContextHandle = Rc<SharedContext>;

/// Identifies one subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of a change request that reached the negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Accepted,
    /// A subscriber declined; not an error. The message is shown to the
    /// user in the flow that initiated the change.
    Vetoed { message: String },
}

impl ChangeOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self, ChangeOutcome::Accepted)
    }
}

struct Entry {
    id: SubscriptionId,
    priority: i32,
    // Captured at subscription time so fault reporting never has to
    // re-borrow an observer that is mid-callback.
    label: String,
    observer: ObserverHandle,
}

/// One named context slot. Construct through
/// [`ContextRegistry::register`](crate::registry::ContextRegistry::register).
pub struct SharedContext {
    name: String,
    kind: SubjectKind,
    subject: RefCell<Subject>,
    entries: RefCell<Vec<Entry>>,
    next_subscription: Cell<u64>,
    in_flight: Cell<bool>,
    fault_hook: RefCell<Option<FaultHook>>,
}

impl SharedContext {
    pub(crate) fn new(name: impl Into<String>, kind: SubjectKind, initial: Subject) -> Result<ContextHandle> {
        let name = name.into();
        if let Some(actual) = initial.kind()
            && actual != kind
        {
            return Err(ContextError::SubjectKindMismatch {
                name,
                expected: kind,
                actual,
            });
        }
        Ok(Rc::new(Self {
            name,
            kind,
            subject: RefCell::new(initial),
            entries: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
            in_flight: Cell::new(false),
            fault_hook: RefCell::new(None),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SubjectKind {
        self.kind
    }

    /// Current subject, by clone; side-effect free and never blocking.
    pub fn current(&self) -> Subject {
        self.subject.borrow().clone()
    }

    /// Registers an observer at the given priority.
    ///
    /// Lower priority values are notified first. Observers sharing a
    /// priority keep their subscription order; nothing beyond that is
    /// guaranteed for equal priorities.
    pub fn subscribe(&self, observer: ObserverHandle, priority: i32) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        let label = observer.borrow().label().to_string();
        let mut entries = self.entries.borrow_mut();
        let position = entries.partition_point(|entry| entry.priority <= priority);
        entries.insert(
            position,
            Entry {
                id,
                priority,
                label,
                observer,
            },
        );
        id
    }

    /// Removes a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Installs the hook through which caught observer faults are surfaced
    /// to telemetry. Replaces any previous hook.
    pub fn set_fault_hook(&self, hook: FaultHook) {
        *self.fault_hook.borrow_mut() = Some(hook);
    }

    /// Proposes a new subject.
    ///
    /// Requesting the current subject again (by identity) is an accepted
    /// no-op with zero notifications. Otherwise observers vote in priority
    /// order; the first veto halts the fan-out and unvisited observers are
    /// never told anything. With no veto the subject is swapped and every
    /// observer from the propose snapshot receives `committed`.
    ///
    /// A call arriving while another change is in flight on this context
    /// fails with [`ContextError::ReentrantChange`] unless the request is
    /// tagged self-initiated. In a self-initiated nested fan-out the
    /// observer whose callback issued the change is skipped; it already
    /// knows about it and cannot be re-entered.
    pub fn request_change(
        &self,
        subject: Subject,
        request: ChangeRequest,
    ) -> Result<ChangeOutcome> {
        if let Some(actual) = subject.kind()
            && actual != self.kind
        {
            return Err(ContextError::SubjectKindMismatch {
                name: self.name.clone(),
                expected: self.kind,
                actual,
            });
        }
        // Idempotence wins over the reentrancy guard: re-proposing the
        // current subject is a no-op even from inside a fan-out.
        if subject.same_identity(&self.subject.borrow()) {
            return Ok(ChangeOutcome::Accepted);
        }
        if self.in_flight.get() && !request.self_initiated {
            return Err(ContextError::ReentrantChange(self.name.clone()));
        }
        let nested = self.in_flight.replace(true);
        let outcome = self.negotiate(&subject, request);
        if !nested {
            self.in_flight.set(false);
        }
        Ok(outcome)
    }

    fn negotiate(&self, subject: &Subject, request: ChangeRequest) -> ChangeOutcome {
        let proposal = Proposal {
            subject,
            silent: request.silent,
            self_initiated: request.self_initiated,
        };
        // Snapshot so commit fan-out covers exactly the propose fan-out,
        // regardless of (un)subscriptions made from inside callbacks.
        let snapshot: Vec<(String, ObserverHandle)> = self
            .entries
            .borrow()
            .iter()
            .map(|entry| (entry.label.clone(), entry.observer.clone()))
            .collect();
        for (label, observer) in &snapshot {
            if let Vote::Veto(message) = self.call_pending(label, observer, &proposal) {
                info!(
                    context = %self.name,
                    subject = %subject.display_name(),
                    message = %message,
                    "context change vetoed"
                );
                return ChangeOutcome::Vetoed { message };
            }
        }
        *self.subject.borrow_mut() = subject.clone();
        for (label, observer) in &snapshot {
            self.call_committed(label, observer, &proposal);
        }
        debug!(
            context = %self.name,
            subject = %subject.display_name(),
            observers = snapshot.len(),
            "context change committed"
        );
        ChangeOutcome::Accepted
    }

    fn call_pending(
        &self,
        label: &str,
        observer: &ObserverHandle,
        proposal: &Proposal<'_>,
    ) -> Vote {
        // Mid-callback means this observer initiated the nested change
        // being fanned out; it is not re-entered and casts no vote.
        let Ok(mut observer) = observer.try_borrow_mut() else {
            return Vote::Accept;
        };
        match catch_unwind(AssertUnwindSafe(move || observer.pending(proposal))) {
            Ok(vote) => vote,
            Err(payload) => {
                self.report_fault(label, FanoutPhase::Propose, payload.as_ref());
                // A faulty observer must not freeze the desktop; treat the
                // missing vote as a pass-through, not a veto.
                Vote::Accept
            }
        }
    }

    fn call_committed(&self, label: &str, observer: &ObserverHandle, proposal: &Proposal<'_>) {
        let Ok(mut observer) = observer.try_borrow_mut() else {
            return;
        };
        if let Err(payload) = catch_unwind(AssertUnwindSafe(move || observer.committed(proposal))) {
            self.report_fault(label, FanoutPhase::Commit, payload.as_ref());
        }
    }

    fn report_fault(&self, label: &str, phase: FanoutPhase, payload: &(dyn std::any::Any + Send)) {
        let detail = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_string()
        };
        error!(
            context = %self.name,
            observer = %label,
            phase = %phase,
            detail = %detail,
            "context observer fault"
        );
        if let Some(hook) = self.fault_hook.borrow().as_ref() {
            hook(&ObserverFault {
                context: self.name.clone(),
                observer: label.to_string(),
                phase,
                detail,
            });
        }
    }

    /// Drops every subscription; part of registry teardown.
    pub(crate) fn clear_observers(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl std::fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedContext")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("subject", &self.subject.borrow())
            .field("observers", &self.entries.borrow().len())
            .field("in_flight", &self.in_flight.get())
            .finish()
    }
}
