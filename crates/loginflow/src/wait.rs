//! Wait Mechanisms
//!
//! Every blocking step in the flow goes through [`wait_until`]: poll a
//! [`Condition`] against the driver until it holds or the [`WaitPolicy`]
//! deadline passes. There is no retry beyond the polling itself; a missed
//! deadline is a [`FlowError::Timeout`].

use crate::driver::BrowserDriver;
use crate::error::{FlowError, FlowResult};
use crate::locator::Locator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (40 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 40_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

// =============================================================================
// WAIT POLICY
// =============================================================================

/// Shared timeout contract for every condition wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitPolicy {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitPolicy {
    /// Create a policy with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// Page condition a step can block on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Title contains the substring
    TitleContains(String),
    /// Title equals the string exactly
    TitleIs(String),
    /// Element is attached to the DOM
    Present(Locator),
    /// Element is visible
    Visible(Locator),
    /// Element is visible and enabled
    Clickable(Locator),
    /// More than this many windows are open
    WindowCountAbove(usize),
}

impl Condition {
    /// Evaluate the condition once
    pub async fn check<D: BrowserDriver + ?Sized>(&self, driver: &D) -> FlowResult<bool> {
        Ok(match self {
            Self::TitleContains(s) => driver.title().await?.contains(s.as_str()),
            Self::TitleIs(s) => driver.title().await? == *s,
            Self::Present(l) => driver.probe(l).await?.present,
            Self::Visible(l) => driver.probe(l).await?.is_visible(),
            Self::Clickable(l) => driver.probe(l).await?.is_clickable(),
            Self::WindowCountAbove(n) => driver.window_handles().await?.len() > *n,
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TitleContains(s) => write!(f, "title to contain {s:?}"),
            Self::TitleIs(s) => write!(f, "title to be {s:?}"),
            Self::Present(l) => write!(f, "presence of {l}"),
            Self::Visible(l) => write!(f, "visibility of {l}"),
            Self::Clickable(l) => write!(f, "{l} to be clickable"),
            Self::WindowCountAbove(n) => write!(f, "more than {n} window(s)"),
        }
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of checks performed
    pub polls: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Poll `condition` until it holds or the policy deadline passes
///
/// A transient error (see [`FlowError::is_transient`]) does not end the wait:
/// pages in the middle of a navigation routinely fail element queries. The last
/// such error is appended to the timeout description if the deadline passes.
/// Any other error is returned at once.
pub async fn wait_until<D: BrowserDriver + ?Sized>(
    driver: &D,
    condition: &Condition,
    policy: &WaitPolicy,
) -> FlowResult<WaitResult> {
    let start = Instant::now();
    let deadline = start + policy.timeout();
    let mut polls = 0_u32;
    let mut last_error: Option<FlowError> = None;

    loop {
        polls += 1;
        match condition.check(driver).await {
            Ok(true) => {
                let result = WaitResult {
                    elapsed: start.elapsed(),
                    polls,
                    waited_for: condition.to_string(),
                };
                tracing::debug!(
                    condition = %condition,
                    polls,
                    elapsed_ms = result.elapsed.as_millis(),
                    "wait satisfied"
                );
                return Ok(result);
            }
            Ok(false) => {}
            Err(e) if e.is_transient() => {
                tracing::debug!(condition = %condition, error = %e, "wait check failed");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            let waited_for = match last_error {
                Some(e) => format!("{condition} (last error: {e})"),
                None => condition.to_string(),
            };
            return Err(FlowError::Timeout {
                ms: policy.timeout_ms,
                waited_for,
            });
        }
        tokio::time::sleep(policy.poll_interval().min(deadline - now)).await;
    }
}

// =============================================================================
// TESTS
// =============================================================================
