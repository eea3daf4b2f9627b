//! Per-operation deadlines

use crate::error::CloudError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Deadlines for each CRUD operation of a resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Option<Duration>,
    pub delete: Duration,
}

impl Timeouts {
    /// 30 minute writes, 5 minute reads
    pub const fn long_running() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Some(Duration::from_secs(30 * 60)),
            delete: Duration::from_secs(30 * 60),
        }
    }

    /// Resources without an update operation that settle within five minutes
    pub const fn short_lived() -> Self {
        Self {
            create: Duration::from_secs(5 * 60),
            read: Duration::from_secs(5 * 60),
            update: None,
            delete: Duration::from_secs(5 * 60),
        }
    }
}

/// Run `operation` under a deadline. Dropping the future on expiry aborts the
/// in-flight request.
pub async fn with_timeout<T, E, F>(deadline: Duration, what: &str, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<CloudError>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => Err(CloudError::Timeout(format!(
            "{} did not finish within {:?}",
            what, deadline
        ))
        .into()),
    }
}
