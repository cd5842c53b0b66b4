//! Suite runner: one session per case, cases optionally concurrent.

use crate::cases::TestCase;
use crate::error::{FailureKind, FlowError, FlowResult};
use crate::evidence::Attachment;
use crate::flow::{Step, StepInputs};
use crate::session::{run_in_session, SessionFactory};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime};

/// Outcome status of a case or step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    /// Every step succeeded
    Passed,
    /// An assertion did not hold
    Failed,
    /// Anything else went wrong (timeout, interaction, infrastructure)
    Broken,
}

impl CaseStatus {
    /// Status a given error maps to
    #[must_use]
    pub const fn from_error(error: &FlowError) -> Self {
        match error.kind() {
            FailureKind::Assertion => Self::Failed,
            _ => Self::Broken,
        }
    }

    /// Lowercase label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Broken => "broken",
        }
    }
}

/// Record of one executed step
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Step that ran
    pub step: Step,
    /// Step status
    pub status: CaseStatus,
    /// Confirmation string or error message
    pub message: String,
    /// Start time
    pub start: SystemTime,
    /// Stop time
    pub stop: SystemTime,
    /// Evidence captured during the step
    pub attachments: Vec<Attachment>,
}

/// Result of running one case
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    /// The case
    pub case: TestCase,
    /// Final status
    pub status: CaseStatus,
    /// Final step result on success, error message otherwise
    pub message: String,
    /// Failure class, if any
    pub failure: Option<FailureKind>,
    /// Executed steps
    pub steps: Vec<StepRecord>,
    /// Start time
    pub start: SystemTime,
    /// Stop time
    pub stop: SystemTime,
}

impl CaseOutcome {
    /// Check if the case passed
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == CaseStatus::Passed
    }

    /// Wall-clock duration
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.stop.duration_since(self.start).unwrap_or_default()
    }
}

/// Run one case in a fresh session
///
/// The session is closed whatever the steps returned. Execution stops at the
/// first failing step.
pub async fn run_case<F>(factory: &F, case: TestCase, inputs: &StepInputs) -> CaseOutcome
where
    F: SessionFactory + ?Sized,
{
    let start = SystemTime::now();
    let mut steps = Vec::with_capacity(case.depth);
    let records = &mut steps;

    tracing::info!(case = case.name, "case started");
    let result: FlowResult<String> = run_in_session(factory, |mut session| async move {
        let mut last = Ok(String::new());
        for step in case.steps() {
            let step_start = SystemTime::now();
            let result = step.run(&mut session, inputs).await;
            let (status, message) = match &result {
                Ok(message) => (CaseStatus::Passed, message.clone()),
                Err(e) => (CaseStatus::from_error(e), e.to_string()),
            };
            records.push(StepRecord {
                step: *step,
                status,
                message,
                start: step_start,
                stop: SystemTime::now(),
                attachments: session.evidence_mut().take(),
            });
            last = result;
            if last.is_err() {
                break;
            }
        }
        (session, last)
    })
    .await;

    let (status, message, failure) = match result {
        Ok(message) => (CaseStatus::Passed, message, None),
        Err(e) => (CaseStatus::from_error(&e), e.to_string(), Some(e.kind())),
    };
    tracing::info!(case = case.name, status = status.as_str(), "case finished");

    CaseOutcome {
        case,
        status,
        message,
        failure,
        steps,
        start,
        stop: SystemTime::now(),
    }
}

/// Outcomes of a suite run, in case order
#[derive(Debug, Clone, Default)]
pub struct SuiteSummary {
    /// Per-case outcomes
    pub outcomes: Vec<CaseOutcome>,
    /// Wall-clock duration
    pub duration: Duration,
}

impl SuiteSummary {
    /// Number of cases
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of passed cases
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(CaseStatus::Passed)
    }

    /// Number of failed cases
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(CaseStatus::Failed)
    }

    /// Number of broken cases
    #[must_use]
    pub fn broken(&self) -> usize {
        self.count(CaseStatus::Broken)
    }

    /// Check if every case passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(CaseOutcome::is_passed)
    }

    /// Outcomes that did not pass
    #[must_use]
    pub fn failures(&self) -> Vec<&CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.is_passed()).collect()
    }

    fn count(&self, status: CaseStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Run cases with up to `jobs` sessions alive at once
///
/// `on_outcome` sees each outcome as it completes; the summary lists them in
/// case order.
pub async fn run_suite<F, C>(
    factory: &F,
    cases: &[TestCase],
    inputs: &StepInputs,
    jobs: usize,
    mut on_outcome: C,
) -> SuiteSummary
where
    F: SessionFactory + ?Sized,
    C: FnMut(&CaseOutcome),
{
    let started = Instant::now();
    let mut indexed: Vec<(usize, CaseOutcome)> = stream::iter(cases.iter().copied().enumerate())
        .map(|(index, case)| async move { (index, run_case(factory, case, inputs).await) })
        .buffer_unordered(jobs.max(1))
        .inspect(|(_, outcome)| on_outcome(outcome))
        .collect()
        .await;
    indexed.sort_by_key(|(index, _)| *index);

    SuiteSummary {
        outcomes: indexed.into_iter().map(|(_, outcome)| outcome).collect(),
        duration: started.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::CASES;
    use crate::config::{Credentials, Site};
    use crate::driver::{MockDriver, MockEffect, MockFactory};
    use crate::flow::{scripted_login_site, NewWindowPolicy};
    use crate::wait::WaitPolicy;

    fn inputs() -> StepInputs {
        StepInputs {
            wait: WaitPolicy::new().with_timeout(60).with_poll_interval(5),
            site: Site::default(),
            credentials: Credentials::new("qa@example.com", "s3cret", "123456"),
            window_policy: NewWindowPolicy::RequireSingle,
        }
    }

    fn scripted_factory() -> MockFactory {
        MockFactory::new(scripted_login_site(&Site::default(), true))
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_from_error() {
            let mismatch = FlowError::TitleMismatch {
                expected: "a".into(),
                actual: "b".into(),
            };
            assert_eq!(CaseStatus::from_error(&mismatch), CaseStatus::Failed);
            let timeout = FlowError::Timeout {
                ms: 1,
                waited_for: "x".into(),
            };
            assert_eq!(CaseStatus::from_error(&timeout), CaseStatus::Broken);
            assert_eq!(CaseStatus::Broken.as_str(), "broken");
        }
    }

    mod run_case_tests {
        use super::*;

        #[tokio::test]
        async fn test_case_runs_exact_prefix() {
            for case in CASES {
                let factory = scripted_factory();
                let outcome = run_case(&factory, case, &inputs()).await;
                assert!(outcome.is_passed(), "{}: {}", case.name, outcome.message);
                let ran: Vec<Step> = outcome.steps.iter().map(|s| s.step).collect();
                assert_eq!(ran, case.steps());
                assert_eq!(factory.journal().count("launch"), 1);
                assert_eq!(factory.journal().count("close"), 1);
            }
        }

        #[tokio::test]
        async fn test_final_message() {
            let outcome = run_case(&scripted_factory(), CASES[5], &inputs()).await;
            assert_eq!(outcome.message, "OTP 123456 entered and verified");
            assert_eq!(outcome.failure, None);
            let last = outcome.steps.last().unwrap();
            assert_eq!(last.attachments.last().unwrap().name, "otp_verified");
        }

        #[tokio::test]
        async fn test_failure_stops_and_still_closes() {
            let factory = MockFactory::new(
                MockDriver::new().on_navigate(MockEffect::SetTitle("Maintenance".into())),
            );
            let outcome = run_case(&factory, CASES[5], &inputs()).await;
            assert_eq!(outcome.status, CaseStatus::Broken);
            assert_eq!(outcome.failure, Some(FailureKind::Timeout));
            assert_eq!(outcome.steps.len(), 1);
            assert_eq!(outcome.steps[0].status, CaseStatus::Broken);
            assert_eq!(factory.journal().count("close"), 1);
        }

        #[tokio::test]
        async fn test_launch_failure() {
            let factory = MockFactory::new(MockDriver::new()).failing("chromium not found");
            let outcome = run_case(&factory, CASES[0], &inputs()).await;
            assert_eq!(outcome.status, CaseStatus::Broken);
            assert!(outcome.message.contains("chromium not found"));
            assert!(outcome.steps.is_empty());
        }
    }

    mod run_suite_tests {
        use super::*;

        #[tokio::test]
        async fn test_sessions_balanced_and_ordered() {
            let factory = scripted_factory();
            let mut seen = 0;
            let summary = run_suite(&factory, &CASES, &inputs(), 3, |_| seen += 1).await;

            assert_eq!(seen, 6);
            assert_eq!(summary.total(), 6);
            assert!(summary.all_passed());
            let names: Vec<&str> = summary.outcomes.iter().map(|o| o.case.name).collect();
            let expected: Vec<&str> = CASES.iter().map(|c| c.name).collect();
            assert_eq!(names, expected);
            assert_eq!(factory.journal().count("launch"), 6);
            assert_eq!(factory.journal().count("close"), 6);
        }

        #[tokio::test]
        async fn test_counts() {
            let factory = MockFactory::new(MockDriver::new());
            let summary = run_suite(&factory, &CASES[..2], &inputs(), 1, |_| {}).await;
            assert_eq!(summary.broken(), 2);
            assert_eq!(summary.passed(), 0);
            assert_eq!(summary.failed(), 0);
            assert_eq!(summary.failures().len(), 2);
            assert!(!summary.all_passed());
        }
    }
}
