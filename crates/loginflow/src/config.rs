//! Suite configuration.
//!
//! Everything a run needs that is not a fixed property of the login flow:
//! the site under test, the wait policy, browser launch options, the
//! new-window policy, credentials and the report directory. Loadable from YAML;
//! every field has a default except the credentials.

use crate::error::{FlowError, FlowResult};
use crate::flow::{NewWindowPolicy, EXPECTED_TITLE, SITE_URL};
use crate::wait::WaitPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default report output directory
pub const DEFAULT_RESULTS_DIR: &str = "allure-results";

/// Site under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    /// Landing page URL
    pub url: String,
    /// Title the landing page must carry
    pub expected_title: String,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            url: SITE_URL.to_string(),
            expected_title: EXPECTED_TITLE.to_string(),
        }
    }
}

/// Test identity supplied to the identity provider
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
    /// One-time passcode
    pub otp: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        otp: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            otp: otp.into(),
        }
    }

    /// Reject empty fields
    pub fn validate(&self) -> FlowResult<()> {
        let missing: Vec<&str> = [
            ("username", &self.username),
            ("password", &self.password),
            ("otp", &self.otp),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FlowError::config(format!(
                "missing credentials: {}",
                missing.join(", ")
            )))
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("otp", &"<redacted>")
            .finish()
    }
}

/// Browser launch options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Run in headless mode
    pub headless: bool,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
    /// Sandbox mode (disable for containers/CI)
    pub sandbox: bool,
    /// Pass `--disable-dev-shm-usage`
    pub disable_dev_shm: bool,
    /// Pass `--disable-gpu`
    pub disable_gpu: bool,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            sandbox: false,
            disable_dev_shm: true,
            disable_gpu: true,
            chromium_path: None,
        }
    }
}

impl BrowserOptions {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set window dimensions
    #[must_use]
    pub const fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Command-line switches not covered by dedicated launcher settings
    #[must_use]
    pub fn extra_args(&self) -> Vec<&'static str> {
        let mut args = Vec::new();
        if self.disable_dev_shm {
            args.push("--disable-dev-shm-usage");
        }
        if self.disable_gpu {
            args.push("--disable-gpu");
        }
        args
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Site under test
    pub site: Site,
    /// Shared wait policy
    pub wait: WaitPolicy,
    /// Browser launch options
    pub browser: BrowserOptions,
    /// Rule for picking the identity-provider window
    pub window_policy: NewWindowPolicy,
    /// Test identity
    pub credentials: Credentials,
    /// Report output directory
    pub results_dir: PathBuf,
    /// Cases run concurrently
    pub jobs: usize,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            site: Site::default(),
            wait: WaitPolicy::default(),
            browser: BrowserOptions::default(),
            window_policy: NewWindowPolicy::default(),
            credentials: Credentials::default(),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            jobs: 1,
        }
    }
}

impl SuiteConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from YAML text
    pub fn from_yaml_str(yaml: &str) -> FlowResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> FlowResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FlowError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Set credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set wait policy
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Set results directory
    #[must_use]
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Set concurrency
    #[must_use]
    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set window policy
    #[must_use]
    pub const fn with_window_policy(mut self, policy: NewWindowPolicy) -> Self {
        self.window_policy = policy;
        self
    }

    /// Check the configuration before a run
    pub fn validate(&self) -> FlowResult<()> {
        if self.site.url.is_empty() {
            return Err(FlowError::config("site url is empty"));
        }
        if self.wait.timeout_ms == 0 {
            return Err(FlowError::config("wait timeout must be positive"));
        }
        if self.jobs == 0 {
            return Err(FlowError::config("jobs must be at least 1"));
        }
        self.credentials.validate()
    }
}
