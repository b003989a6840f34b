use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classification handed to the observability sink alongside the
/// human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Network,
    HttpStatus,
    Parse,
    InvalidEndpoint,
}

/// A failed fetch. Any of these aborts the success path: the target
/// container ends up with the single fallback fragment and nothing else.
///
/// Variants carry plain strings rather than transport error types so this
/// crate stays free of HTTP dependencies.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request transport failed: {message}")]
    Network { message: String },
    #[error("server responded with status {status}")]
    HttpStatus { status: u16 },
    #[error("response body is not a JSON record collection: {message}")]
    Parse { message: String },
    #[error("invalid endpoint name '{name}'")]
    InvalidEndpoint { name: String },
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Network { .. } => FetchErrorKind::Network,
            Self::HttpStatus { .. } => FetchErrorKind::HttpStatus,
            Self::Parse { .. } => FetchErrorKind::Parse,
            Self::InvalidEndpoint { .. } => FetchErrorKind::InvalidEndpoint,
        }
    }
}
