//! Crate-wide error kinds.
//!
//! Component-local recovery handles `Throttled` retries and planner/embedding
//! `UpstreamUnavailable` degradation internally (see [`crate::planner`] and
//! [`crate::retrieval`]); everything else propagates to the request boundary.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("throttled after retries: {0}")]
    Throttled(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("index store unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal error ({id}): {message}")]
    Internal { id: String, message: String },
}

impl Error {
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            id: uuid::Uuid::new_v4().to_string(),
            message: message.into(),
        }
    }

    /// Stable code for the request boundary's user-visible response.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound(_) => "not_found",
            Error::Throttled(_) => "throttled",
            Error::UpstreamUnavailable(_) => "upstream_unavailable",
            Error::ServiceUnavailable(_) => "service_unavailable",
            Error::Internal { .. } => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
