//! Negotiation-engine scenario tests: veto ordering, idempotence,
//! reentrancy, fault isolation, and resource-backed change-by-id.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use cwx_context::{
    ChangeOutcome, ChangeRequest, ContextError, ContextHandle, ContextObserver, ContextRegistry,
    FetchError, Proposal, ResourceContext, ResourceFetcher, Vote, names,
};
use cwx_model::{PatientRef, Subject, SubjectKind};

type EventLog = Rc<RefCell<Vec<String>>>;

/// Observer that records every callback and optionally vetoes.
struct Recorder {
    label: String,
    veto: Option<String>,
    events: EventLog,
}

impl Recorder {
    fn approving(label: &str, events: &EventLog) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            label: label.to_string(),
            veto: None,
            events: events.clone(),
        }))
    }

    fn vetoing(label: &str, message: &str, events: &EventLog) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            label: label.to_string(),
            veto: Some(message.to_string()),
            events: events.clone(),
        }))
    }
}

impl ContextObserver for Recorder {
    fn label(&self) -> &str {
        &self.label
    }

    fn pending(&mut self, _proposal: &Proposal<'_>) -> Vote {
        self.events.borrow_mut().push(format!("{}:pending", self.label));
        match &self.veto {
            Some(message) => Vote::Veto(message.clone()),
            None => Vote::Accept,
        }
    }

    fn committed(&mut self, _proposal: &Proposal<'_>) {
        self.events
            .borrow_mut()
            .push(format!("{}:committed", self.label));
    }
}

fn patient_context() -> ContextHandle {
    let mut registry = ContextRegistry::new();
    registry
        .register(names::PATIENT, SubjectKind::Patient, Subject::None)
        .expect("register patient context")
}

fn patient(id: &str) -> Subject {
    Subject::Patient(PatientRef::new(id))
}

#[test]
fn veto_halts_propose_and_blocks_commit() {
    // Scenario: S1 (priority 1) approves, S2 (priority 2) vetoes "locked".
    let events: EventLog = EventLog::default();
    let context = patient_context();
    context.subscribe(Recorder::approving("s1", &events), 1);
    context.subscribe(Recorder::vetoing("s2", "locked", &events), 2);
    context.subscribe(Recorder::approving("s3", &events), 3);

    let outcome = context
        .request_change(patient("X"), ChangeRequest::INTERACTIVE)
        .unwrap();

    assert_eq!(
        outcome,
        ChangeOutcome::Vetoed {
            message: "locked".to_string()
        }
    );
    // S3 was never asked, nobody saw a commit, the subject is unchanged.
    assert_eq!(*events.borrow(), vec!["s1:pending", "s2:pending"]);
    assert!(context.current().is_none());
}

#[test]
fn commit_fan_out_covers_the_propose_snapshot() {
    let events: EventLog = EventLog::default();
    let context = patient_context();
    context.subscribe(Recorder::approving("s1", &events), 1);
    context.subscribe(Recorder::approving("s2", &events), 2);

    let outcome = context
        .request_change(patient("X"), ChangeRequest::INTERACTIVE)
        .unwrap();

    assert!(outcome.accepted());
    assert_eq!(
        *events.borrow(),
        vec!["s1:pending", "s2:pending", "s1:committed", "s2:committed"]
    );
    assert!(context.current().same_identity(&patient("X")));
}

#[test]
fn earlier_veto_does_not_exclude_observer_from_later_rounds() {
    let events: EventLog = EventLog::default();
    let context = patient_context();
    let gatekeeper = Rc::new(RefCell::new(Recorder {
        label: "gate".to_string(),
        veto: Some("busy".to_string()),
        events: events.clone(),
    }));
    context.subscribe(gatekeeper.clone(), 1);
    context.subscribe(Recorder::approving("s2", &events), 2);

    let first = context
        .request_change(patient("X"), ChangeRequest::INTERACTIVE)
        .unwrap();
    assert!(!first.accepted());

    // The gatekeeper stops objecting; it still gets the commit.
    gatekeeper.borrow_mut().veto = None;
    events.borrow_mut().clear();
    let second = context
        .request_change(patient("X"), ChangeRequest::INTERACTIVE)
        .unwrap();
    assert!(second.accepted());
    assert_eq!(
        *events.borrow(),
        vec!["gate:pending", "s2:pending", "gate:committed", "s2:committed"]
    );
}

#[test]
fn requesting_the_current_subject_is_a_silent_no_op() {
    let events: EventLog = EventLog::default();
    let context = patient_context();
    context.subscribe(Recorder::approving("s1", &events), 1);
    context
        .request_change(patient("X"), ChangeRequest::INTERACTIVE)
        .unwrap();
    events.borrow_mut().clear();

    // Same logical id, different attribute content: identical by identity.
    let same = Subject::Patient(PatientRef {
        id: "X".to_string(),
        name: Some("Jane Doe".to_string()),
        location: None,
    });
    let outcome = context
        .request_change(same, ChangeRequest::INTERACTIVE)
        .unwrap();
    assert!(outcome.accepted());
    assert!(events.borrow().is_empty());
}

#[test]
fn equal_priorities_keep_subscription_order() {
    let events: EventLog = EventLog::default();
    let context = patient_context();
    context.subscribe(Recorder::approving("first", &events), 5);
    context.subscribe(Recorder::approving("second", &events), 5);
    context.subscribe(Recorder::approving("earliest", &events), 1);

    context
        .request_change(patient("X"), ChangeRequest::INTERACTIVE)
        .unwrap();
    assert_eq!(
        events.borrow()[..3],
        ["earliest:pending", "first:pending", "second:pending"]
    );
}

#[test]
fn unsubscribed_observer_is_not_notified() {
    let events: EventLog = EventLog::default();
    let context = patient_context();
    let id = context.subscribe(Recorder::approving("gone", &events), 1);
    context.subscribe(Recorder::approving("stays", &events), 2);
    assert!(context.unsubscribe(id));
    assert!(!context.unsubscribe(id));

    context
        .request_change(patient("X"), ChangeRequest::INTERACTIVE)
        .unwrap();
    assert_eq!(*events.borrow(), vec!["stays:pending", "stays:committed"]);
}

/// Observer that issues a nested change on its own context from `pending`.
struct NestedCaller {
    context: ContextHandle,
    saw_reentrant: Rc<Cell<bool>>,
}

impl ContextObserver for NestedCaller {
    fn label(&self) -> &str {
        "nested-caller"
    }

    fn pending(&mut self, _proposal: &Proposal<'_>) -> Vote {
        let result = self
            .context
            .request_change(patient("inner"), ChangeRequest::INTERACTIVE);
        self.saw_reentrant.set(matches!(
            result,
            Err(ContextError::ReentrantChange(_))
        ));
        Vote::Accept
    }
}

#[test]
fn nested_untagged_change_is_reentrancy_fault() {
    let context = patient_context();
    let saw_reentrant = Rc::new(Cell::new(false));
    context.subscribe(
        Rc::new(RefCell::new(NestedCaller {
            context: context.clone(),
            saw_reentrant: saw_reentrant.clone(),
        })),
        1,
    );

    let outcome = context
        .request_change(patient("outer"), ChangeRequest::INTERACTIVE)
        .unwrap();

    // The inner attempt failed fast; the outer negotiation was unaffected.
    assert!(saw_reentrant.get());
    assert!(outcome.accepted());
    assert!(context.current().same_identity(&patient("outer")));
}

/// Observer that issues a self-initiated nested change from `pending`,
/// recording the result for inspection after the outer call returns.
struct SelfInitiatedMover {
    context: ContextHandle,
    nested_accepted: Rc<Cell<bool>>,
}

impl ContextObserver for SelfInitiatedMover {
    fn label(&self) -> &str {
        "self-initiated-mover"
    }

    fn pending(&mut self, proposal: &Proposal<'_>) -> Vote {
        if !proposal.self_initiated {
            let result = self
                .context
                .request_change(patient("inner"), ChangeRequest::SELF_INITIATED);
            self.nested_accepted
                .set(matches!(result, Ok(ChangeOutcome::Accepted)));
        }
        Vote::Accept
    }
}

#[test]
fn self_initiated_tag_bypasses_the_guard() {
    let context = patient_context();
    let nested_accepted = Rc::new(Cell::new(false));
    context.subscribe(
        Rc::new(RefCell::new(SelfInitiatedMover {
            context: context.clone(),
            nested_accepted: nested_accepted.clone(),
        })),
        1,
    );

    let outcome = context
        .request_change(patient("outer"), ChangeRequest::INTERACTIVE)
        .unwrap();

    // The tagged nested call was not rejected as reentrant, and the outer
    // negotiation still ran to completion.
    assert!(nested_accepted.get());
    assert!(outcome.accepted());
    assert!(context.current().same_identity(&patient("outer")));
}

#[test]
fn self_initiated_initiator_is_skipped_without_fault() {
    let events: EventLog = EventLog::default();
    let context = patient_context();
    let faults: Rc<RefCell<Vec<String>>> = Rc::default();
    let sink = faults.clone();
    context.set_fault_hook(Box::new(move |fault| {
        sink.borrow_mut()
            .push(format!("{}:{}", fault.observer, fault.phase));
    }));
    let nested_accepted = Rc::new(Cell::new(false));
    context.subscribe(
        Rc::new(RefCell::new(SelfInitiatedMover {
            context: context.clone(),
            nested_accepted: nested_accepted.clone(),
        })),
        1,
    );
    context.subscribe(Recorder::approving("rec", &events), 2);

    let outcome = context
        .request_change(patient("outer"), ChangeRequest::INTERACTIVE)
        .unwrap();

    assert!(outcome.accepted());
    assert!(nested_accepted.get());
    // The initiator is skipped in its own nested fan-out; a healthy
    // orchestrator is never reported through the fault hook.
    assert!(faults.borrow().is_empty());
    // The other observer saw the nested change in full, then the outer one.
    assert_eq!(
        *events.borrow(),
        vec![
            "rec:pending",
            "rec:committed",
            "rec:pending",
            "rec:committed"
        ]
    );
    assert!(context.current().same_identity(&patient("outer")));
}

/// Observer that re-proposes the context's current subject, untagged,
/// from inside `pending`.
struct NoOpReproposer {
    context: ContextHandle,
    noop_accepted: Rc<Cell<bool>>,
}

impl ContextObserver for NoOpReproposer {
    fn label(&self) -> &str {
        "noop-reproposer"
    }

    fn pending(&mut self, _proposal: &Proposal<'_>) -> Vote {
        let result = self
            .context
            .request_change(Subject::None, ChangeRequest::INTERACTIVE);
        self.noop_accepted
            .set(matches!(result, Ok(ChangeOutcome::Accepted)));
        Vote::Accept
    }
}

#[test]
fn nested_no_op_proposal_is_not_reentrant() {
    let context = patient_context();
    let noop_accepted = Rc::new(Cell::new(false));
    context.subscribe(
        Rc::new(RefCell::new(NoOpReproposer {
            context: context.clone(),
            noop_accepted: noop_accepted.clone(),
        })),
        1,
    );

    // The subject swap happens after the propose pass, so re-proposing the
    // still-current empty subject mid-flight is idempotent, not reentrant.
    let outcome = context
        .request_change(patient("outer"), ChangeRequest::INTERACTIVE)
        .unwrap();
    assert!(noop_accepted.get());
    assert!(outcome.accepted());
    assert!(context.current().same_identity(&patient("outer")));
}

struct Panicking;

impl ContextObserver for Panicking {
    fn label(&self) -> &str {
        "panicking"
    }

    fn pending(&mut self, _proposal: &Proposal<'_>) -> Vote {
        panic!("refresh widget disposed");
    }
}

#[test]
fn observer_fault_is_isolated_and_surfaced() {
    let events: EventLog = EventLog::default();
    let context = patient_context();
    let faults: Rc<RefCell<Vec<String>>> = Rc::default();
    let sink = faults.clone();
    context.set_fault_hook(Box::new(move |fault| {
        sink.borrow_mut()
            .push(format!("{}:{}:{}", fault.observer, fault.phase, fault.detail));
    }));
    context.subscribe(Rc::new(RefCell::new(Panicking)), 1);
    context.subscribe(Recorder::approving("healthy", &events), 2);

    let outcome = context
        .request_change(patient("X"), ChangeRequest::INTERACTIVE)
        .unwrap();

    // The fault is a pass-through, not a veto: the change lands and the
    // healthy observer sees both phases.
    assert!(outcome.accepted());
    assert_eq!(
        *events.borrow(),
        vec!["healthy:pending", "healthy:committed"]
    );
    assert_eq!(
        *faults.borrow(),
        vec!["panicking:propose:refresh widget disposed"]
    );
}

struct MapFetcher {
    patients: BTreeMap<String, PatientRef>,
    calls: Cell<usize>,
}

impl ResourceFetcher for MapFetcher {
    fn fetch_by_id(&self, kind: SubjectKind, id: &str) -> Result<Subject, FetchError> {
        self.calls.set(self.calls.get() + 1);
        match self.patients.get(id) {
            Some(patient) => Ok(Subject::Patient(patient.clone())),
            None => Err(FetchError::NotFound {
                kind,
                id: id.to_string(),
            }),
        }
    }
}

fn resource_context(patients: &[(&str, &str)]) -> (ResourceContext, Rc<MapFetcher>) {
    let fetcher = Rc::new(MapFetcher {
        patients: patients
            .iter()
            .map(|(id, name)| {
                (
                    (*id).to_string(),
                    PatientRef {
                        id: (*id).to_string(),
                        name: Some((*name).to_string()),
                        location: None,
                    },
                )
            })
            .collect(),
        calls: Cell::new(0),
    });
    (
        ResourceContext::new(patient_context(), fetcher.clone()),
        fetcher,
    )
}

#[test]
fn change_by_id_resolves_and_commits() {
    let events: EventLog = EventLog::default();
    let (context, fetcher) = resource_context(&[("123", "Jane Doe")]);
    context.handle().subscribe(Recorder::approving("s1", &events), 1);

    let outcome = context
        .request_change_by_id("123", ChangeRequest::INTERACTIVE)
        .unwrap();
    assert!(outcome.accepted());
    assert_eq!(fetcher.calls.get(), 1);
    assert!(context.handle().current().same_identity(&patient("123")));
}

#[test]
fn fetch_failure_reaches_no_observer() {
    let events: EventLog = EventLog::default();
    let (context, _fetcher) = resource_context(&[]);
    context.handle().subscribe(Recorder::approving("s1", &events), 1);
    context
        .handle()
        .request_change(patient("old"), ChangeRequest::INTERACTIVE)
        .unwrap();
    events.borrow_mut().clear();

    let err = context
        .request_change_by_id("missing", ChangeRequest::INTERACTIVE)
        .unwrap_err();
    assert!(matches!(err, ContextError::Fetch { .. }));
    assert!(events.borrow().is_empty());
    assert!(context.handle().current().same_identity(&patient("old")));
}

#[test]
fn blank_id_clears_the_selection() {
    let (context, fetcher) = resource_context(&[("123", "Jane Doe")]);
    context
        .request_change_by_id("123", ChangeRequest::INTERACTIVE)
        .unwrap();
    let outcome = context
        .request_change_by_id("  ", ChangeRequest::INTERACTIVE)
        .unwrap();
    assert!(outcome.accepted());
    assert!(context.handle().current().is_none());
    // Clearing never consults the fetcher.
    assert_eq!(fetcher.calls.get(), 1);
}

#[test]
fn kind_mismatch_is_rejected_before_negotiation() {
    let events: EventLog = EventLog::default();
    let context = patient_context();
    context.subscribe(Recorder::approving("s1", &events), 1);
    let err = context
        .request_change(
            Subject::User(cwx_model::UserRef::new("u1")),
            ChangeRequest::INTERACTIVE,
        )
        .unwrap_err();
    assert!(matches!(err, ContextError::SubjectKindMismatch { .. }));
    assert!(events.borrow().is_empty());
}
