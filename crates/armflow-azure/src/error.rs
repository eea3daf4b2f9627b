//! Azure adapter error types

use armflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("{0} was not found")]
    NotFound(String),

    #[error("access to {0} was forbidden")]
    Forbidden(String),

    #[error("{context}: unexpected status {status}: {body}")]
    Status {
        context: String,
        status: u16,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<AzureError>,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

/// Coarse classification of a failed API call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    NotFound,
    Forbidden,
    Other,
}

impl AzureError {
    pub fn kind(&self) -> ResponseKind {
        match self {
            AzureError::NotFound(_) => ResponseKind::NotFound,
            AzureError::Forbidden(_) => ResponseKind::Forbidden,
            AzureError::Context { source, .. } => source.kind(),
            AzureError::Cloud(CloudError::NotFound(_)) => ResponseKind::NotFound,
            AzureError::Cloud(CloudError::Forbidden(_)) => ResponseKind::Forbidden,
            _ => ResponseKind::Other,
        }
    }

    pub fn was_not_found(&self) -> bool {
        self.kind() == ResponseKind::NotFound
    }

    pub fn was_forbidden(&self) -> bool {
        self.kind() == ResponseKind::Forbidden
    }

    /// Wrap with the operation and resource that failed
    pub fn context(self, context: impl Into<String>) -> Self {
        AzureError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<AzureError> for CloudError {
    fn from(err: AzureError) -> Self {
        match err {
            AzureError::Cloud(inner) => inner,
            other => match other.kind() {
                ResponseKind::NotFound => CloudError::NotFound(other.to_string()),
                ResponseKind::Forbidden => CloudError::Forbidden(other.to_string()),
                ResponseKind::Other => CloudError::Api(other.to_string()),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;
