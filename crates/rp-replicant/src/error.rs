use thiserror::Error;

use rp_core::RpError;

#[derive(Debug, Error)]
pub enum ReplicantError {
    /// Structurally invalid request parameters.  Returned immediately by
    /// `request()`; the current action is left untouched.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no replicant model named {0:?} in the model library")]
    UnknownModel(String),

    #[error("model library parse error: {0}")]
    Library(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] RpError),
}

pub type ReplicantResult<T> = Result<T, ReplicantError>;

pub(crate) fn invalid(msg: impl Into<String>) -> ReplicantError {
    ReplicantError::InvalidRequest(msg.into())
}
