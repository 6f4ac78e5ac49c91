use thiserror::Error;

use rp_core::ReplicantId;
use rp_protocol::ProtocolError;
use rp_replicant::ReplicantError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session configuration error: {0}")]
    Config(String),

    #[error("{0} is registered twice")]
    DuplicateReplicant(ReplicantId),

    #[error("no replicant with id {0}")]
    UnknownReplicant(ReplicantId),

    #[error("session has not been started")]
    NotStarted,

    #[error("session was already started")]
    AlreadyStarted,

    #[error("gave up after {max_ticks} ticks")]
    TickCapReached { max_ticks: u64 },

    #[error("backend closed the connection")]
    BackendClosed,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Replicant(#[from] ReplicantError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;
