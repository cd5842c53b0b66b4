//! Loginflow: UI acceptance suite for an identity-provider sign-in
//!
//! Drives a headless browser through six sequential steps (landing page,
//! title check, identity-provider window, username, password, one-time
//! passcode) and records a viewport capture after each one.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌────────────────┐
//! │  TestCase    │    │  Step fns    │    │ BrowserDriver  │
//! │  (prefix N)  │───►│  + wait_until│───►│ Chromium / Mock│
//! └──────────────┘    └──────────────┘    └────────────────┘
//!        │                   │
//!        ▼                   ▼
//! ┌──────────────┐    ┌──────────────┐
//! │ run_suite    │───►│ ReportWriter │  allure-results/
//! └──────────────┘    └──────────────┘
//! ```
//!
//! Every case opens its own [`Session`] and closes it whatever happened.

#![warn(missing_docs)]

#[cfg(feature = "browser")]
pub mod browser;
pub mod cases;
pub mod config;
pub mod driver;
mod error;
pub mod evidence;
pub mod flow;
mod locator;
pub mod report;
pub mod session;
pub mod suite;
pub mod wait;

#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumFactory};
pub use cases::{Severity, TestCase, CASES};
pub use config::{BrowserOptions, Credentials, Site, SuiteConfig};
pub use driver::{
    BrowserDriver, ElementState, MockDriver, MockEffect, MockFactory, MockJournal, MockWindow,
    WindowHandle,
};
pub use error::{FailureKind, FlowError, FlowResult};
pub use evidence::{Attachment, EvidenceLog};
pub use flow::{NewWindowPolicy, PromptOutcome, Step, StepInputs, EXPECTED_TITLE, SITE_URL};
pub use locator::Locator;
pub use report::ReportWriter;
pub use session::{run_in_session, Session, SessionFactory};
pub use suite::{run_case, run_suite, CaseOutcome, CaseStatus, SuiteSummary};
pub use wait::{wait_until, Condition, WaitPolicy};
