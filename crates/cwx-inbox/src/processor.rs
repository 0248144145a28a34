//! Sequential notification processing.
//!
//! The processor drains a heterogeneous backlog of notification items, one
//! at a time, on the session's cooperative thread. Actionable items with a
//! registered handler move the patient context (self-initiated, silent) and
//! dispatch without prompting; everything else is presented for an
//! interactive choice. The state machine is surfaced as a poll/resolve
//! API: `process` pumps until input is needed, the host then calls
//! `resolve` (or `advance` after viewing a subject) to continue.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use cwx_context::{
    ChangeOutcome, ChangeRequest, ContextObserver, Proposal, ResourceContext, SubscriptionId,
};
use cwx_model::NotificationItem;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{InboxError, Result};
use crate::session::{BulkAction, Session, SessionSummary};

/// Resolution choices offered for a presented item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemAction {
    Skip,
    SkipAll,
    Delete,
    DeleteAll,
    Cancel,
    ViewSubject,
}

impl fmt::Display for ItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ItemAction::Skip => "skip",
            ItemAction::SkipAll => "skip-all",
            ItemAction::Delete => "delete",
            ItemAction::DeleteAll => "delete-all",
            ItemAction::Cancel => "cancel",
            ItemAction::ViewSubject => "view-subject",
        };
        f.write_str(text)
    }
}

/// Externally observable processor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    AwaitingUserAction,
    Paused,
}

/// Result of pumping the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorStatus {
    /// The backlog was drained to the end.
    Completed(SessionSummary),
    /// The session was aborted before the end.
    Canceled(SessionSummary),
    /// An item is presented; the host must call `resolve` with one of the
    /// offered actions.
    AwaitingUser { offered: Vec<ItemAction> },
    /// The user is looking at the associated subject; `advance` resumes.
    Paused,
}

/// Dispatches the follow-up action of an actionable item.
pub trait ItemHandler {
    fn dispatch(&mut self, item: &NotificationItem) -> anyhow::Result<()>;
}

/// External, best-effort delete capability.
pub trait ItemStore {
    fn delete(&mut self, item: &NotificationItem) -> anyhow::Result<()>;
}

/// Watches the patient context for changes the queue did not initiate; an
/// in-progress review of "this subject's notifications" is invalid the
/// moment the subject changes underneath it.
struct ContextWatch {
    invalidated: Rc<Cell<bool>>,
}

impl ContextObserver for ContextWatch {
    fn label(&self) -> &str {
        "inbox-context-watch"
    }

    fn committed(&mut self, proposal: &Proposal<'_>) {
        if !proposal.self_initiated {
            self.invalidated.set(true);
        }
    }

    fn canceled(&mut self) {
        self.invalidated.set(false);
    }
}

/// The notification processing queue.
pub struct InboxProcessor {
    patient: ResourceContext,
    handlers: BTreeMap<String, Box<dyn ItemHandler>>,
    store: Option<Box<dyn ItemStore>>,
    session: Option<Session>,
    invalidated: Rc<Cell<bool>>,
    watch: Rc<RefCell<ContextWatch>>,
    watch_subscription: SubscriptionId,
}

impl InboxProcessor {
    /// Creates a processor bound to the session's patient context.
    pub fn new(patient: ResourceContext) -> Self {
        let invalidated = Rc::new(Cell::new(false));
        let watch = Rc::new(RefCell::new(ContextWatch {
            invalidated: invalidated.clone(),
        }));
        let watch_subscription = patient.subscribe_default(watch.clone());
        Self {
            patient,
            handlers: BTreeMap::new(),
            store: None,
            session: None,
            invalidated,
            watch,
            watch_subscription,
        }
    }

    /// Registers the dispatch handler for an alert type. Replaces any
    /// previous handler for that type.
    pub fn register_handler(&mut self, alert_type: impl Into<String>, handler: Box<dyn ItemHandler>) {
        self.handlers.insert(alert_type.into(), handler);
    }

    /// Installs the delete capability.
    pub fn set_store(&mut self, store: Box<dyn ItemStore>) {
        self.store = Some(store);
    }

    pub fn state(&self) -> QueueState {
        match &self.session {
            None => QueueState::Idle,
            Some(session) if session.paused => QueueState::Paused,
            Some(session) if session.awaiting_user() => QueueState::AwaitingUserAction,
            // Only observable transiently; the pump never returns here.
            Some(_) => QueueState::Idle,
        }
    }

    /// 1-based cursor and total of the active session.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.session
            .as_ref()
            .map(|session| (session.index, session.total))
    }

    /// Starts a new session over `items`, discarding any previous session,
    /// and pumps until the backlog needs input or is exhausted.
    pub fn process(&mut self, items: Vec<NotificationItem>) -> ProcessorStatus {
        self.invalidated.set(false);
        let total = items.len();
        self.session = Some(Session::new(items));
        info!(total, "notification session started");
        self.pump()
    }

    /// Resolves the currently presented item with one of the offered
    /// actions.
    pub fn resolve(&mut self, action: ItemAction) -> Result<ProcessorStatus> {
        if self.session.is_none() {
            return Err(InboxError::NoActiveSession);
        }
        if self.invalidated.get() {
            return Ok(self.cancel_session("patient context changed externally"));
        }
        let session = self.session.as_ref().expect("session checked above");
        if !session.awaiting_user() {
            return Err(InboxError::NotAwaitingAction);
        }
        if !session.offered.contains(&action) {
            return Err(InboxError::UnsupportedAction(action));
        }
        match action {
            ItemAction::Skip => {
                self.finish_current(|summary| summary.skipped += 1);
                Ok(self.pump())
            }
            ItemAction::SkipAll => {
                let session = self.session.as_mut().expect("session checked above");
                session.bulk = Some(BulkAction::SkipAll);
                self.finish_current(|summary| summary.skipped += 1);
                Ok(self.pump())
            }
            ItemAction::Delete => {
                let item = self.take_current();
                self.delete_item(&item);
                Ok(self.pump())
            }
            ItemAction::DeleteAll => {
                let session = self.session.as_mut().expect("session checked above");
                session.bulk = Some(BulkAction::DeleteAll);
                let item = self.take_current();
                self.delete_item(&item);
                Ok(self.pump())
            }
            ItemAction::Cancel => Ok(self.cancel_session("canceled by user")),
            ItemAction::ViewSubject => Ok(self.view_subject()),
        }
    }

    /// Resumes after a `ViewSubject` pause. The viewed item is done; the
    /// drain continues with the next one.
    pub fn advance(&mut self) -> Result<ProcessorStatus> {
        if self.session.is_none() {
            return Err(InboxError::NoActiveSession);
        }
        if self.invalidated.get() {
            return Ok(self.cancel_session("patient context changed externally"));
        }
        let session = self.session.as_mut().expect("session checked above");
        if !session.paused {
            return Err(InboxError::NotPaused);
        }
        session.paused = false;
        self.finish_current(|summary| summary.viewed += 1);
        Ok(self.pump())
    }

    /// Aborts the active session without completing remaining items.
    pub fn cancel(&mut self) -> Result<ProcessorStatus> {
        if self.session.is_none() {
            return Err(InboxError::NoActiveSession);
        }
        Ok(self.cancel_session("canceled by user"))
    }

    fn pump(&mut self) -> ProcessorStatus {
        loop {
            if self.invalidated.get() {
                return self.cancel_session("patient context changed externally");
            }
            let Some(item) = self
                .session
                .as_mut()
                .expect("pump requires an active session")
                .take_next()
            else {
                let session = self.session.take().expect("session present");
                let summary = session.into_summary(false);
                info!(
                    dispatched = summary.dispatched,
                    skipped = summary.skipped,
                    deleted = summary.deleted,
                    "notification session completed"
                );
                return ProcessorStatus::Completed(summary);
            };
            let has_handler = item
                .alert_type()
                .is_some_and(|alert_type| self.handlers.contains_key(alert_type));
            if item.actionable() && has_handler {
                match self.dispatch_item(item) {
                    Ok(()) => continue,
                    Err(status) => return status,
                }
            }
            match self.bulk_resolution(&item) {
                Some(resolved) => {
                    resolved(self.summary_mut());
                    continue;
                }
                None => {
                    let offered = Self::offered_for(&item);
                    debug!(item = %item.ident(), "presenting item");
                    let session = self.session.as_mut().expect("session present");
                    session.present(item, offered.clone());
                    return ProcessorStatus::AwaitingUser { offered };
                }
            }
        }
    }

    /// Handles one actionable item with a registered handler. `Err` carries
    /// the halt status when the subject transition did not go through.
    fn dispatch_item(
        &mut self,
        item: NotificationItem,
    ) -> std::result::Result<(), ProcessorStatus> {
        if let Some(patient_id) = item.patient_id() {
            match self
                .patient
                .request_change_by_id(patient_id, ChangeRequest::SELF_INITIATED)
            {
                Ok(ChangeOutcome::Accepted) => {}
                Ok(ChangeOutcome::Vetoed { message }) => {
                    info!(
                        item = %item.ident(),
                        message = %message,
                        "subject transition vetoed; session awaits cancellation"
                    );
                    return Err(self.halt_unresolved(item));
                }
                Err(error) => {
                    warn!(
                        item = %item.ident(),
                        error = %error,
                        "subject resolution failed; session awaits cancellation"
                    );
                    return Err(self.halt_unresolved(item));
                }
            }
        }
        let alert_type = item.alert_type().expect("actionable items carry a type");
        let handler = self
            .handlers
            .get_mut(alert_type)
            .expect("handler presence checked");
        if let Err(error) = handler.dispatch(&item) {
            // Best-effort: a failed follow-up action is operator-visible
            // but does not stall the drain.
            error!(item = %item.ident(), error = %error, "item dispatch failed");
        }
        self.summary_mut().dispatched += 1;
        Ok(())
    }

    /// An unresolved actionable item parks the session; the only way out is
    /// cancelling the whole drain.
    fn halt_unresolved(&mut self, item: NotificationItem) -> ProcessorStatus {
        let offered = vec![ItemAction::Cancel];
        let session = self.session.as_mut().expect("session present");
        session.present(item, offered.clone());
        ProcessorStatus::AwaitingUser { offered }
    }

    /// Auto-resolution under a latched bulk action, if any.
    fn bulk_resolution(
        &mut self,
        item: &NotificationItem,
    ) -> Option<fn(&mut SessionSummary)> {
        let bulk = self.session.as_ref().expect("session present").bulk?;
        match bulk {
            BulkAction::SkipAll => Some(|summary| summary.skipped += 1),
            BulkAction::DeleteAll if item.deletable() => {
                self.delete_item(item);
                // delete_item already counted it.
                Some(|_| {})
            }
            BulkAction::DeleteAll => Some(|summary| summary.skipped += 1),
        }
    }

    fn offered_for(item: &NotificationItem) -> Vec<ItemAction> {
        let mut offered = vec![ItemAction::Skip, ItemAction::SkipAll];
        if item.deletable() {
            offered.push(ItemAction::Delete);
            offered.push(ItemAction::DeleteAll);
        }
        offered.push(ItemAction::Cancel);
        if item.patient_id().is_some() {
            offered.push(ItemAction::ViewSubject);
        }
        offered
    }

    fn view_subject(&mut self) -> ProcessorStatus {
        let session = self.session.as_ref().expect("session present");
        let item = session.current.as_ref().expect("awaiting user");
        let patient_id = item
            .patient_id()
            .expect("view-subject offered only with a subject")
            .to_string();
        let offered = session.offered.clone();
        match self
            .patient
            .request_change_by_id(&patient_id, ChangeRequest::SELF_INITIATED)
        {
            Ok(ChangeOutcome::Accepted) => {
                let session = self.session.as_mut().expect("session present");
                session.paused = true;
                ProcessorStatus::Paused
            }
            Ok(ChangeOutcome::Vetoed { message }) => {
                info!(patient_id, message = %message, "view-subject vetoed");
                ProcessorStatus::AwaitingUser { offered }
            }
            Err(error) => {
                warn!(patient_id, error = %error, "view-subject resolution failed");
                ProcessorStatus::AwaitingUser { offered }
            }
        }
    }

    fn delete_item(&mut self, item: &NotificationItem) {
        let result = match self.store.as_mut() {
            Some(store) => store.delete(item),
            None => Err(anyhow::anyhow!("no delete capability installed")),
        };
        let summary = self.summary_mut();
        match result {
            Ok(()) => summary.deleted += 1,
            Err(error) => {
                summary.delete_failures += 1;
                warn!(item = %item.ident(), error = %error, "item delete failed");
            }
        }
    }

    fn take_current(&mut self) -> NotificationItem {
        let session = self.session.as_mut().expect("session present");
        session.offered.clear();
        session.current.take().expect("awaiting user")
    }

    fn finish_current<F: FnOnce(&mut SessionSummary)>(&mut self, count: F) {
        let session = self.session.as_mut().expect("session present");
        session.current = None;
        session.offered.clear();
        count(&mut session.summary);
    }

    fn summary_mut(&mut self) -> &mut SessionSummary {
        &mut self.session.as_mut().expect("session present").summary
    }

    fn cancel_session(&mut self, reason: &str) -> ProcessorStatus {
        let session = self.session.take().expect("session present");
        let summary = session.into_summary(true);
        info!(
            reason,
            total = summary.total,
            dispatched = summary.dispatched,
            skipped = summary.skipped,
            "notification session canceled"
        );
        // Own bookkeeping for the abandoned flow; the engine never
        // broadcasts cancellation.
        self.watch.borrow_mut().canceled();
        ProcessorStatus::Canceled(summary)
    }
}

impl Drop for InboxProcessor {
    fn drop(&mut self) {
        self.patient.handle().unsubscribe(self.watch_subscription);
    }
}

impl fmt::Debug for InboxProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboxProcessor")
            .field("state", &self.state())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("progress", &self.progress())
            .finish()
    }
}
