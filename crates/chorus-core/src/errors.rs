use thiserror::Error;

use crate::state::SessionPhase;

/// Failures reported by the conferencing SDK facade.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SdkError {
    #[error("session construction failed: {0}")]
    Construction(String),
    #[error("device error: {0}")]
    Device(String),
    #[error("media permission error: {0}")]
    Permission(String),
    #[error("sdk error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Sdk(#[from] SdkError),
    #[error("session is {0}; retry once it settles")]
    Transitioning(SessionPhase),
    #[error("already joined meeting {0}; leave it first")]
    AlreadyJoined(String),
    #[error("invalid join info: {0}")]
    InvalidJoinInfo(String),
    #[error("malformed join info: {0}")]
    Json(#[from] serde_json::Error),
}
