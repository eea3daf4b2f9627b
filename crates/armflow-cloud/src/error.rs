//! Core error types

use thiserror::Error;

/// Errors raised by the provider-neutral core
#[derive(Error, Debug)]
pub enum CloudError {
    /// A child identifier looked like a subscription path but had the wrong shape.
    #[error("subscription id should have 2 segments, got {segment_count}: {raw:?}")]
    MalformedIdentifier { raw: String, segment_count: usize },

    #[error("invalid resource id {raw:?}: {reason}")]
    InvalidId { raw: String, reason: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Access forbidden: {0}")]
    Forbidden(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unexpected state {state:?}, wanted one of {expected:?}")]
    UnexpectedState {
        state: String,
        expected: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn invalid_id(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
