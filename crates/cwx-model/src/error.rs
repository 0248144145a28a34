use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unrecognized urgency value: {0:?}")]
    InvalidUrgency(String),
    #[error("malformed {kind} record: {detail}")]
    MalformedRecord { kind: &'static str, detail: String },
    #[error("invalid delivery timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error("invalid sequence id: {0:?}")]
    InvalidSequence(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
