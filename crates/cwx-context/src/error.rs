use cwx_model::SubjectKind;
use thiserror::Error;

use crate::resource::FetchError;

#[derive(Debug, Error)]
pub enum ContextError {
    /// A second proposal arrived while one was still in flight. Callers may
    /// retry a veto; they must not retry this the same way.
    #[error("a change is already in flight on context {0:?}")]
    ReentrantChange(String),
    #[error("context {name:?} is already registered for {existing} subjects")]
    DuplicateName { name: String, existing: SubjectKind },
    #[error("context {name:?} holds {expected} subjects, got {actual}")]
    SubjectKindMismatch {
        name: String,
        expected: SubjectKind,
        actual: SubjectKind,
    },
    #[error("no context registered under {0:?}")]
    UnknownContext(String),
    #[error("failed to resolve {kind} {id:?}")]
    Fetch {
        kind: SubjectKind,
        id: String,
        #[source]
        source: FetchError,
    },
    #[error("cross-process handoff is not supported for {0} subjects")]
    UnsupportedHandoff(SubjectKind),
    #[error("handoff map is missing required key {0:?}")]
    MalformedHandoff(&'static str),
}

pub type Result<T> = std::result::Result<T, ContextError>;
