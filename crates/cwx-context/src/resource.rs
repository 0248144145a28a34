//! Resource-backed context specialization.
//!
//! Patient, encounter and participant subjects live in a remote resource
//! repository and are addressed by logical id. A [`ResourceContext`] wraps
//! a context handle together with an injected [`ResourceFetcher`] so that a
//! change can be proposed from an id alone; an unresolvable id is a
//! validation failure that never reaches any observer.

use std::rc::Rc;

use cwx_model::{Subject, SubjectKind};
use thiserror::Error;
use tracing::debug;

use crate::engine::{ChangeOutcome, ContextHandle, ObserverHandle, SubscriptionId};
use crate::error::{ContextError, Result};
use crate::observer::{ChangeRequest, priority};

/// Failure reported by a [`ResourceFetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{kind} {id:?} not found")]
    NotFound { kind: SubjectKind, id: String },
    #[error("{0}")]
    Backend(String),
}

/// Synchronous lookup of a domain entity by logical id.
///
/// Implementations wrap the resource repository client. Calls block the
/// cooperative thread; the reentrancy guard on the target context ensures
/// no second proposal starts while one is being resolved.
pub trait ResourceFetcher {
    fn fetch_by_id(&self, kind: SubjectKind, id: &str) -> std::result::Result<Subject, FetchError>;
}

/// A context whose subjects are fetched lazily by logical id.
#[derive(Clone)]
pub struct ResourceContext {
    handle: ContextHandle,
    fetcher: Rc<dyn ResourceFetcher>,
}

impl ResourceContext {
    pub fn new(handle: ContextHandle, fetcher: Rc<dyn ResourceFetcher>) -> Self {
        Self { handle, fetcher }
    }

    pub fn handle(&self) -> &ContextHandle {
        &self.handle
    }

    /// Proposes the entity with the given logical id.
    ///
    /// A blank id clears the selection. A fetch failure surfaces as
    /// [`ContextError::Fetch`] with the context unchanged and no observer
    /// invoked.
    pub fn request_change_by_id(&self, id: &str, request: ChangeRequest) -> Result<ChangeOutcome> {
        let id = id.trim();
        if id.is_empty() {
            return self.handle.request_change(Subject::None, request);
        }
        let kind = self.handle.kind();
        let subject = self
            .fetcher
            .fetch_by_id(kind, id)
            .map_err(|source| ContextError::Fetch {
                kind,
                id: id.to_string(),
                source,
            })?;
        debug!(context = self.handle.name(), %kind, id, "resolved subject by id");
        self.handle.request_change(subject, request)
    }

    /// Subscribes in the infrastructure band, the default for
    /// domain-agnostic observers of resource-backed contexts.
    pub fn subscribe_default(&self, observer: ObserverHandle) -> SubscriptionId {
        self.handle.subscribe(observer, priority::INFRASTRUCTURE)
    }
}

impl std::fmt::Debug for ResourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceContext")
            .field("context", &self.handle.name())
            .field("kind", &self.handle.kind())
            .finish()
    }
}
