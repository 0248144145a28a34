//! Session-scoped context registry.
//!
//! One registry lives for the duration of one UI session and is passed by
//! reference to whatever needs a context handle; it is deliberately not a
//! process global, since independent desktops each own an independent
//! registry.

use cwx_model::{Subject, SubjectKind};
use indexmap::IndexMap;
use tracing::debug;

use crate::engine::{ContextHandle, SharedContext};
use crate::error::{ContextError, Result};

/// Well-known context names.
pub mod names {
    pub const PATIENT: &str = "patient";
    pub const ENCOUNTER: &str = "encounter";
    pub const PARTICIPANT: &str = "participant";
    pub const USER: &str = "user";
}

/// Name → live context table for one UI session.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: IndexMap<String, ContextHandle>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or returns the named context.
    ///
    /// Idempotent by name; fails with [`ContextError::DuplicateName`] only
    /// when the existing context was registered for an incompatible subject
    /// kind.
    pub fn register(
        &mut self,
        name: &str,
        kind: SubjectKind,
        initial: Subject,
    ) -> Result<ContextHandle> {
        if let Some(existing) = self.contexts.get(name) {
            if existing.kind() == kind {
                return Ok(existing.clone());
            }
            return Err(ContextError::DuplicateName {
                name: name.to_string(),
                existing: existing.kind(),
            });
        }
        let handle = SharedContext::new(name, kind, initial)?;
        self.contexts.insert(name.to_string(), handle.clone());
        debug!(context = name, kind = %kind, "context registered");
        Ok(handle)
    }

    /// Registers the four well-known workstation contexts, all empty.
    pub fn register_standard(&mut self) -> Result<()> {
        self.register(names::PATIENT, SubjectKind::Patient, Subject::None)?;
        self.register(names::ENCOUNTER, SubjectKind::Encounter, Subject::None)?;
        self.register(names::PARTICIPANT, SubjectKind::Participant, Subject::None)?;
        self.register(names::USER, SubjectKind::User, Subject::None)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ContextHandle> {
        self.contexts.get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<ContextHandle> {
        self.get(name)
            .ok_or_else(|| ContextError::UnknownContext(name.to_string()))
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Ends the session: drops every subscription on every context, then
    /// the contexts themselves. Outstanding handles survive but no longer
    /// notify anyone.
    pub fn teardown(&mut self) {
        for handle in self.contexts.values() {
            handle.clear_observers();
        }
        self.contexts.clear();
        debug!("context registry torn down");
    }
}
