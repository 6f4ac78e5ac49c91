//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `RpError` as one variant
//! where they need to surface a core failure.

use thiserror::Error;

/// The top-level error type for `rp-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum RpError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0} must be finite")]
    NonFinite(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `rp-core`.
pub type RpResult<T> = Result<T, RpError>;

/// Reject NaN/infinite scalars with a named error.
#[inline]
pub fn ensure_finite(value: f32, what: &'static str) -> RpResult<f32> {
    if value.is_finite() { Ok(value) } else { Err(RpError::NonFinite(what)) }
}
