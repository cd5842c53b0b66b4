//! The six test cases. Case N runs steps 1..=N against its own session.

use crate::flow::Step;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Report severity of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks everything downstream
    Blocker,
    /// Core functionality
    Critical,
    /// Important but not blocking
    Major,
    /// Minor defect
    Minor,
    /// Cosmetic
    Trivial,
}

impl Severity {
    /// Lowercase label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blocker => "blocker",
            Self::Critical => "critical",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Trivial => "trivial",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

static FLOW: [Step; 6] = Step::ALL;

/// A test case: a named prefix of the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCase {
    /// Function-style name
    pub name: &'static str,
    /// Report title
    pub title: &'static str,
    /// Report description
    pub description: &'static str,
    /// Report severity
    pub severity: Severity,
    /// Number of steps run
    pub depth: usize,
}

impl TestCase {
    /// Steps this case runs, in order
    #[must_use]
    pub fn steps(&self) -> &'static [Step] {
        &FLOW[..self.depth]
    }

    /// Step whose result the case prints
    #[must_use]
    pub fn final_step(&self) -> Step {
        FLOW[self.depth - 1]
    }
}

/// The full collection, in run order
pub const CASES: [TestCase; 6] = [
    TestCase {
        name: "test_open_website",
        title: "Test 1: Open the website",
        description: "Verifies that the website opens successfully.",
        severity: Severity::Blocker,
        depth: 1,
    },
    TestCase {
        name: "test_verify_title",
        title: "Test 2: Verify website title",
        description: "Checks if the website title matches the expected value.",
        severity: Severity::Major,
        depth: 2,
    },
    TestCase {
        name: "test_navigate_to_microsoft_login",
        title: "Test 3: Navigate to Microsoft login page",
        description: "Ensures navigation to the Microsoft login page works.",
        severity: Severity::Blocker,
        depth: 3,
    },
    TestCase {
        name: "test_enter_username",
        title: "Test 4: Enter username",
        description: "Tests entering the username on the Microsoft login page.",
        severity: Severity::Critical,
        depth: 4,
    },
    TestCase {
        name: "test_enter_password",
        title: "Test 5: Enter password",
        description: "Tests entering the password on the Microsoft login page.",
        severity: Severity::Critical,
        depth: 5,
    },
    TestCase {
        name: "test_enter_otp",
        title: "Test 6: Enter and verify OTP",
        description: "Tests entering and verifying the OTP for login.",
        severity: Severity::Critical,
        depth: 6,
    },
];

/// Cases whose name contains `filter` (all cases when `None`)
#[must_use]
pub fn select(filter: Option<&str>) -> Vec<TestCase> {
    CASES
        .iter()
        .filter(|case| filter.map_or(true, |f| case.name.contains(f)))
        .copied()
        .collect()
}
