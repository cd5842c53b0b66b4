//! Output formatting and progress reporting

use console::{style, Style, Term};
use loginflow::{CaseOutcome, CaseStatus, SuiteSummary, TestCase};
use std::time::Duration;

/// Progress character for a finished case
#[must_use]
pub fn progress_char(outcome: &CaseOutcome) -> char {
    if outcome.is_passed() {
        '.'
    } else {
        'F'
    }
}

/// One-line case summary: final step result or failure message
#[must_use]
pub fn outcome_line(outcome: &CaseOutcome) -> String {
    format!("{}: {}", outcome.case.name, outcome.message)
}

/// One line of the case listing
#[must_use]
pub fn case_line(case: &TestCase) -> String {
    format!(
        "{:<34} steps 1..={}  {:<8}  {}",
        case.name, case.depth, case.severity, case.title
    )
}

/// Progress reporter for suite execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// Print the progress character of a finished case
    pub fn case_finished(&self, outcome: &CaseOutcome) {
        if self.quiet {
            return;
        }
        let ch = progress_char(outcome);
        let styled = match (self.use_color, outcome.status) {
            (false, _) => ch.to_string(),
            (true, CaseStatus::Passed) => style(ch).green().to_string(),
            (true, _) => style(ch).red().bold().to_string(),
        };
        let _ = self.term.write_str(&styled);
    }

    /// End the progress line
    pub fn finish_progress(&self) {
        if !self.quiet {
            let _ = self.term.write_line("");
        }
    }

    /// Print one line per case that did not pass
    pub fn failures(&self, summary: &SuiteSummary) {
        // Always print failures, even in quiet mode
        for outcome in summary.failures() {
            let line = outcome_line(outcome);
            let line = if self.use_color {
                style(line).red().to_string()
            } else {
                line
            };
            let _ = self.term.write_line(&line);
        }
    }

    /// Print the final step result of each passed case
    pub fn results(&self, summary: &SuiteSummary) {
        if self.quiet {
            return;
        }
        for outcome in summary.outcomes.iter().filter(|o| o.is_passed()) {
            let _ = self.term.write_line(&outcome_line(outcome));
        }
    }

    /// Print the case listing
    pub fn case_list(&self, cases: &[TestCase]) {
        for case in cases {
            let _ = self.term.write_line(&case_line(case));
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print suite summary
    pub fn summary(&self, passed: usize, failed: usize, broken: usize, duration: Duration) {
        if self.quiet && failed + broken == 0 {
            return;
        }

        let total = passed + failed + broken;
        let duration_secs = duration.as_secs_f64();
        let ok = failed + broken == 0;

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();

            let status = if ok {
                passed_style.apply_to("PASSED")
            } else {
                failed_style.apply_to("FAILED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} cases in {:.2}s ({} passed, {} failed, {} broken)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                failed_style.apply_to(failed),
                failed_style.apply_to(broken),
            ));
        } else {
            let status = if ok { "PASSED" } else { "FAILED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} cases in {duration_secs:.2}s ({passed} passed, {failed} failed, {broken} broken)"
            ));
        }
    }
}
