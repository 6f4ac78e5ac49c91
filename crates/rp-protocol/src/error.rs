use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record is missing its \"$type\" tag")]
    MissingTag,

    #[error("unknown record type {0:?}")]
    UnknownRecord(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
