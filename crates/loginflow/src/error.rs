//! Result and error types for the login flow.

use thiserror::Error;

/// Result type for login-flow operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Broad classification of a failure, used when reporting a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A condition wait exceeded the shared deadline
    Timeout,
    /// An observed value differed from the expected literal
    Assertion,
    /// A stale, missing or non-interactable element
    Interaction,
    /// Browser launch, navigation, I/O, configuration or reporting
    Infrastructure,
}

impl FailureKind {
    /// Short lowercase label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Assertion => "assertion",
            Self::Interaction => "interaction",
            Self::Infrastructure => "infrastructure",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while driving the login flow
#[derive(Debug, Error)]
pub enum FlowError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// A wait condition was not met in time
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the condition
        waited_for: String,
    },

    /// Page title differs from the expected literal
    #[error("Title mismatch. Expected: {expected}, Got: {actual}")]
    TitleMismatch {
        /// Expected title
        expected: String,
        /// Title the browser reported
        actual: String,
    },

    /// Element could not be located or interacted with
    #[error("Interaction with {locator} failed: {message}")]
    ElementInteraction {
        /// Locator of the element
        locator: String,
        /// Error message
        message: String,
    },

    /// New-window selection saw an unexpected number of candidates
    #[error("Expected exactly one new window, found {count}")]
    AmbiguousWindow {
        /// Number of new windows found
        count: usize,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Session-level driver error (closed handle, window query)
    #[error("Browser session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Report writing error
    #[error("Report error: {message}")]
    Report {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl FlowError {
    /// Create an element interaction error
    #[must_use]
    pub fn interaction(locator: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::ElementInteraction {
            locator: locator.to_string(),
            message: message.into(),
        }
    }

    /// Create a session error
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify the error
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::TitleMismatch { .. } => FailureKind::Assertion,
            Self::ElementInteraction { .. } | Self::AmbiguousWindow { .. } => {
                FailureKind::Interaction
            }
            _ => FailureKind::Infrastructure,
        }
    }

    /// Check if this is a wait timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if a wait may poll through this error
    ///
    /// Only element lookups against a page in flux qualify; a closed session,
    /// a transport failure or a malformed payload ends the wait.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ElementInteraction { .. })
    }
}
