//! Allure-compatible result writer.
//!
//! Each case becomes `<uuid>-result.json` in the results directory, with one
//! `<uuid>-attachment.<ext>` file per evidence capture. Any Allure
//! command-line or CI plugin can render the directory as-is.

use crate::error::{FlowError, FlowResult};
use crate::evidence::Attachment;
use crate::suite::{CaseOutcome, CaseStatus, StepRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Default suite label
pub const DEFAULT_SUITE: &str = "login_flow";

/// Name/value label on a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name
    pub name: String,
    /// Label value
    pub value: String,
}

/// Failure details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    /// Error message
    pub message: String,
}

/// Reference to an attachment file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Display name
    pub name: String,
    /// File name inside the results directory
    pub source: String,
    /// Media type
    #[serde(rename = "type")]
    pub media_type: String,
}

/// One step of a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Step title
    pub name: String,
    /// Step status
    pub status: CaseStatus,
    /// Always `finished`
    pub stage: String,
    /// Failure details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    /// Start, epoch millis
    pub start: u64,
    /// Stop, epoch millis
    pub stop: u64,
    /// Evidence
    pub attachments: Vec<AttachmentRef>,
}

/// Result file contents for one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Result identifier
    pub uuid: String,
    /// Stable hash of the full name, links runs of the same case
    pub history_id: String,
    /// Case title
    pub name: String,
    /// Suite-qualified case name
    pub full_name: String,
    /// Case description
    pub description: String,
    /// Case status
    pub status: CaseStatus,
    /// Always `finished`
    pub stage: String,
    /// Failure details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    /// Start, epoch millis
    pub start: u64,
    /// Stop, epoch millis
    pub stop: u64,
    /// Labels (severity, suite)
    pub labels: Vec<Label>,
    /// Executed steps
    pub steps: Vec<StepResult>,
}

/// Writes case outcomes into a results directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    suite: String,
}

impl ReportWriter {
    /// Create the writer, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> FlowResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| FlowError::Report {
            message: format!("cannot create {}: {e}", dir.display()),
        })?;
        Ok(Self {
            dir,
            suite: DEFAULT_SUITE.to_string(),
        })
    }

    /// Set the suite label
    #[must_use]
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = suite.into();
        self
    }

    /// Results directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one case and its attachments; returns the result file path
    pub fn write_case(&self, outcome: &CaseOutcome) -> FlowResult<PathBuf> {
        let uuid = Uuid::new_v4().to_string();
        let full_name = format!("{}.{}", self.suite, outcome.case.name);

        let steps = outcome
            .steps
            .iter()
            .map(|record| self.write_step(record))
            .collect::<FlowResult<Vec<_>>>()?;

        let mut labels = vec![
            Label {
                name: "severity".to_string(),
                value: outcome.case.severity.to_string(),
            },
            Label {
                name: "suite".to_string(),
                value: self.suite.clone(),
            },
        ];
        if let Some(kind) = outcome.failure {
            labels.push(Label {
                name: "tag".to_string(),
                value: kind.as_str().to_string(),
            });
        }

        let result = TestResult {
            uuid: uuid.clone(),
            history_id: history_id(&full_name),
            name: outcome.case.title.to_string(),
            full_name,
            description: outcome.case.description.to_string(),
            status: outcome.status,
            stage: "finished".to_string(),
            status_details: details(outcome.status, &outcome.message),
            start: epoch_millis(outcome.start),
            stop: epoch_millis(outcome.stop),
            labels,
            steps,
        };

        let path = self.dir.join(format!("{uuid}-result.json"));
        std::fs::write(&path, serde_json::to_string_pretty(&result)?)?;
        tracing::debug!(case = outcome.case.name, path = %path.display(), "wrote result");
        Ok(path)
    }

    fn write_step(&self, record: &StepRecord) -> FlowResult<StepResult> {
        let attachments = record
            .attachments
            .iter()
            .map(|a| self.write_attachment(a))
            .collect::<FlowResult<Vec<_>>>()?;
        Ok(StepResult {
            name: record.step.name().to_string(),
            status: record.status,
            stage: "finished".to_string(),
            status_details: details(record.status, &record.message),
            start: epoch_millis(record.start),
            stop: epoch_millis(record.stop),
            attachments,
        })
    }

    fn write_attachment(&self, attachment: &Attachment) -> FlowResult<AttachmentRef> {
        let source = format!("{}-attachment.{}", Uuid::new_v4(), attachment.extension());
        std::fs::write(self.dir.join(&source), &attachment.data)?;
        Ok(AttachmentRef {
            name: attachment.name.clone(),
            source,
            media_type: attachment.media_type.clone(),
        })
    }
}

fn details(status: CaseStatus, message: &str) -> Option<StatusDetails> {
    (status != CaseStatus::Passed).then(|| StatusDetails {
        message: message.to_string(),
    })
}

fn history_id(full_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(full_name.as_bytes());
    let digest = hasher.finalize();
    format!("{digest:x}")
}

fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::CASES;
    use crate::error::FailureKind;
    use crate::flow::Step;
    use std::time::Duration;

    fn outcome(status: CaseStatus, message: &str) -> CaseOutcome {
        let start = UNIX_EPOCH + Duration::from_millis(1_700_000_000_000);
        let stop = start + Duration::from_millis(1500);
        CaseOutcome {
            case: CASES[1],
            status,
            message: message.to_string(),
            failure: (status != CaseStatus::Passed).then_some(FailureKind::Assertion),
            steps: vec![
                StepRecord {
                    step: Step::OpenWebsite,
                    status: CaseStatus::Passed,
                    message: "Website opened successfully".to_string(),
                    start,
                    stop: start + Duration::from_millis(900),
                    attachments: vec![Attachment::png("website_opened", vec![0x89, b'P'])],
                },
                StepRecord {
                    step: Step::VerifyTitle,
                    status,
                    message: message.to_string(),
                    start: start + Duration::from_millis(900),
                    stop,
                    attachments: Vec::new(),
                },
            ],
            start,
            stop,
        }
    }

    fn read_result(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_history_id_is_stable() {
        assert_eq!(history_id("login_flow.a"), history_id("login_flow.a"));
        assert_ne!(history_id("login_flow.a"), history_id("login_flow.b"));
        assert_eq!(history_id("x").len(), 64);
    }

    #[test]
    fn test_epoch_millis() {
        assert_eq!(epoch_millis(UNIX_EPOCH + Duration::from_millis(42)), 42);
    }

    #[test]
    fn test_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/allure-results");
        let writer = ReportWriter::new(&nested).unwrap();
        assert!(writer.dir().is_dir());
    }

    #[test]
    fn test_passed_case() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();
        let path = writer
            .write_case(&outcome(CaseStatus::Passed, "Title verified: T"))
            .unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("-result.json"));

        let json = read_result(&path);
        assert_eq!(json["name"], "Test 2: Verify website title");
        assert_eq!(json["fullName"], "login_flow.test_verify_title");
        assert_eq!(json["status"], "passed");
        assert_eq!(json["stage"], "finished");
        assert_eq!(json["start"], 1_700_000_000_000_u64);
        assert_eq!(json["stop"], 1_700_000_001_500_u64);
        assert!(json.get("statusDetails").is_none());
        assert_eq!(json["labels"][0]["name"], "severity");
        assert_eq!(json["labels"][0]["value"], "major");
        assert_eq!(json["labels"].as_array().unwrap().len(), 2);

        let attachment = &json["steps"][0]["attachments"][0];
        assert_eq!(attachment["name"], "website_opened");
        assert_eq!(attachment["type"], "image/png");
        let source = attachment["source"].as_str().unwrap();
        assert!(source.ends_with("-attachment.png"));
        assert_eq!(std::fs::read(dir.path().join(source)).unwrap(), vec![0x89, b'P']);
    }

    #[test]
    fn test_failed_case_carries_message_and_step_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap().with_suite("staging");
        let message = "Title mismatch. Expected: A, Got: B";
        let path = writer.write_case(&outcome(CaseStatus::Failed, message)).unwrap();

        let json = read_result(&path);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["statusDetails"]["message"], message);
        assert_eq!(json["fullName"], "staging.test_verify_title");
        assert_eq!(json["steps"][0]["status"], "passed");
        assert_eq!(json["steps"][1]["status"], "failed");
        assert_eq!(json["steps"][1]["statusDetails"]["message"], message);
        assert_eq!(json["steps"][1]["name"], "Verify website title");
        assert_eq!(json["labels"][2]["name"], "tag");
        assert_eq!(json["labels"][2]["value"], "assertion");
    }

    #[test]
    fn test_one_file_per_capture() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();
        writer.write_case(&outcome(CaseStatus::Passed, "ok")).unwrap();
        writer.write_case(&outcome(CaseStatus::Passed, "ok")).unwrap();
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 4);
    }
}
