//! Convergence polling
//!
//! A [`StateRefresh`] performs exactly one probe of remote state and reports
//! what it saw. Probes never sleep or retry; [`StateChangeConf`] is the
//! scheduler that calls them on an interval until a target state, an
//! unexpected state or the deadline.

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// State observed by a single probe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefreshState {
    Pending,
    Succeeded,
    Failed,
    Exists,
    NotFound,
    /// Raw provisioning state reported by the resource (e.g. "Updating")
    Provisioning(String),
}

impl RefreshState {
    pub fn as_str(&self) -> &str {
        match self {
            RefreshState::Pending => "pending",
            RefreshState::Succeeded => "succeeded",
            RefreshState::Failed => "failed",
            RefreshState::Exists => "Exists",
            RefreshState::NotFound => "NotFound",
            RefreshState::Provisioning(raw) => raw,
        }
    }

    pub fn provisioning(raw: impl Into<String>) -> Self {
        RefreshState::Provisioning(raw.into())
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one probe.
///
/// `error` is only set together with a terminal failure state; fetch errors
/// that carry no state are returned as `Err` from [`StateRefresh::refresh`].
#[derive(Debug)]
pub struct Refreshed {
    pub state: RefreshState,
    pub error: Option<CloudError>,
}

impl Refreshed {
    pub fn state(state: RefreshState) -> Self {
        Self { state, error: None }
    }

    pub fn failed(error: CloudError) -> Self {
        Self {
            state: RefreshState::Failed,
            error: Some(error),
        }
    }
}

/// A single probe of remote state
#[async_trait]
pub trait StateRefresh: Send + Sync {
    /// Short description used in logs and timeout errors
    fn describe(&self) -> String;

    async fn refresh(&self) -> Result<Refreshed>;
}

/// Polling schedule for a [`StateRefresh`]
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<RefreshState>,
    pub target: Vec<RefreshState>,
    pub timeout: Duration,
    /// Wait before the first probe
    pub delay: Duration,
    pub poll_interval: Duration,
    /// How many consecutive `NotFound` observations are tolerated when `NotFound`
    /// is neither pending nor a target
    pub not_found_checks: u32,
}

impl StateChangeConf {
    pub fn new(pending: Vec<RefreshState>, target: Vec<RefreshState>, timeout: Duration) -> Self {
        Self {
            pending,
            target,
            timeout,
            delay: Duration::ZERO,
            poll_interval: Duration::from_secs(10),
            not_found_checks: 20,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// Probe until a target state is reached
    pub async fn wait_for_state<R>(&self, refresh: &R) -> Result<RefreshState>
    where
        R: StateRefresh + ?Sized,
    {
        let what = refresh.describe();
        match tokio::time::timeout(self.timeout, self.poll(refresh, &what)).await {
            Ok(result) => result,
            Err(_) => Err(CloudError::Timeout(format!(
                "waiting for {} to reach {:?} after {:?}",
                what,
                self.target.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                self.timeout
            ))),
        }
    }

    async fn poll<R>(&self, refresh: &R, what: &str) -> Result<RefreshState>
    where
        R: StateRefresh + ?Sized,
    {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut not_found = 0u32;
        loop {
            let observed = refresh.refresh().await?;
            if let Some(error) = observed.error {
                return Err(error);
            }

            let state = observed.state;
            tracing::debug!("{} reported state {}", what, state);

            if self.target.contains(&state) {
                return Ok(state);
            }

            if self.pending.contains(&state) {
                if state != RefreshState::NotFound {
                    not_found = 0;
                }
            } else if state == RefreshState::NotFound {
                not_found += 1;
                if not_found > self.not_found_checks {
                    return Err(CloudError::NotFound(format!(
                        "{} was not found after {} checks",
                        what, not_found
                    )));
                }
            } else if !self.pending.contains(&state) {
                return Err(CloudError::UnexpectedState {
                    state: state.to_string(),
                    expected: self.target.iter().map(|s| s.to_string()).collect(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
