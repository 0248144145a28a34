use thiserror::Error;

use crate::processor::ItemAction;

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("no processing session is active")]
    NoActiveSession,
    #[error("the processor is not awaiting a user action")]
    NotAwaitingAction,
    #[error("the processor is not paused on a viewed subject")]
    NotPaused,
    #[error("action {0} is not offered for the current item")]
    UnsupportedAction(ItemAction),
}

pub type Result<T> = std::result::Result<T, InboxError>;
