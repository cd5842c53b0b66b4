//! Suite runner: resolves configuration, drives the cases and writes results

use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use loginflow::{
    run_suite, ReportWriter, SessionFactory, StepInputs, SuiteConfig, SuiteSummary, TestCase,
};

/// Build the suite configuration: YAML file first, then command-line overrides
pub fn build_suite_config(args: &RunArgs) -> CliResult<SuiteConfig> {
    let mut suite = match args.config {
        Some(ref path) => SuiteConfig::from_yaml_file(path)?,
        None => SuiteConfig::default(),
    };

    if let Some(ref dir) = args.results_dir {
        suite.results_dir = dir.clone();
    }
    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            return Err(CliError::invalid_argument("--jobs must be at least 1"));
        }
        suite.jobs = jobs;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        suite.wait.timeout_ms = timeout_ms;
    }
    if let Some(policy) = args.window_policy {
        suite.window_policy = policy.into();
    }
    if let Some(ref path) = args.chromium_path {
        suite.browser.chromium_path = Some(path.clone());
    }
    if args.headed {
        suite.browser.headless = false;
    }

    if let Some(ref username) = args.username {
        suite.credentials.username.clone_from(username);
    }
    if let Some(ref password) = args.password {
        suite.credentials.password.clone_from(password);
    }
    if let Some(ref otp) = args.otp {
        suite.credentials.otp.clone_from(otp);
    }

    suite.validate()?;
    Ok(suite)
}

/// Runs the selected cases and reports on them
#[derive(Debug)]
pub struct SuiteRunner {
    config: CliConfig,
    suite: SuiteConfig,
    reporter: ProgressReporter,
}

impl SuiteRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: CliConfig, suite: SuiteConfig) -> Self {
        let reporter =
            ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
        Self {
            config,
            suite,
            reporter,
        }
    }

    /// Suite configuration
    #[must_use]
    pub const fn suite(&self) -> &SuiteConfig {
        &self.suite
    }

    /// Run the cases against sessions from `factory`
    pub async fn run<F>(&self, factory: &F, cases: &[TestCase]) -> CliResult<SuiteSummary>
    where
        F: SessionFactory + ?Sized,
    {
        let writer = ReportWriter::new(&self.suite.results_dir)
            .map_err(|e| CliError::report_generation(e.to_string()))?;
        let inputs = StepInputs::from_config(&self.suite);

        tracing::info!(cases = cases.len(), jobs = self.suite.jobs, "running suite");
        let summary = run_suite(factory, cases, &inputs, self.suite.jobs, |outcome| {
            self.reporter.case_finished(outcome);
        })
        .await;
        self.reporter.finish_progress();

        for outcome in &summary.outcomes {
            writer
                .write_case(outcome)
                .map_err(|e| CliError::report_generation(e.to_string()))?;
        }
        if self.config.verbosity.is_verbose() {
            self.reporter.info(&format!(
                "Wrote {} results to {}",
                summary.total(),
                writer.dir().display()
            ));
        }

        self.reporter.results(&summary);
        self.reporter.failures(&summary);
        self.reporter.summary(
            summary.passed(),
            summary.failed(),
            summary.broken(),
            summary.duration,
        );
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use crate::config::{ColorChoice, Verbosity};
    use clap::Parser;
    use loginflow::flow::scripted_login_site;
    use loginflow::{Credentials, MockDriver, MockEffect, MockFactory, NewWindowPolicy, CASES};
    use std::path::PathBuf;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec![
            "loginflow",
            "run",
            "--username",
            "qa@example.com",
            "--password",
            "pw",
            "--otp",
            "123456",
        ];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            Commands::List(_) => panic!("expected Run command"),
        }
    }

    fn quiet() -> CliConfig {
        CliConfig::new()
            .with_verbosity(Verbosity::Quiet)
            .with_color(ColorChoice::Never)
    }

    mod build_config_tests {
        use super::*;

        #[test]
        fn test_flags_override_defaults() {
            let suite = build_suite_config(&run_args(&[
                "--results-dir",
                "out",
                "-j",
                "2",
                "--timeout-ms",
                "500",
                "--window-policy",
                "first-listed",
                "--headed",
            ]))
            .unwrap();
            assert_eq!(suite.results_dir, PathBuf::from("out"));
            assert_eq!(suite.jobs, 2);
            assert_eq!(suite.wait.timeout_ms, 500);
            assert_eq!(suite.window_policy, NewWindowPolicy::FirstListed);
            assert!(!suite.browser.headless);
            assert_eq!(suite.credentials.otp, "123456");
        }

        #[test]
        fn test_flags_override_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("suite.yaml");
            std::fs::write(
                &path,
                "jobs: 4\ncredentials:\n  username: file-user\n  password: file-pw\n  otp: '000000'\n",
            )
            .unwrap();
            let path = path.to_string_lossy().to_string();
            let suite = build_suite_config(&run_args(&["--config", &path])).unwrap();
            assert_eq!(suite.jobs, 4);
            assert_eq!(suite.credentials.username, "qa@example.com");
            assert_eq!(suite.credentials.otp, "123456");
        }

        #[test]
        fn test_zero_jobs_rejected() {
            let err = build_suite_config(&run_args(&["-j", "0"])).unwrap_err();
            assert!(matches!(err, CliError::InvalidArgument { .. }));
        }
    }

    mod suite_runner_tests {
        use super::*;

        #[tokio::test]
        async fn test_run_writes_one_result_per_case() {
            let dir = tempfile::tempdir().unwrap();
            let suite = SuiteConfig::default()
                .with_credentials(Credentials::new("u", "p", "123456"))
                .with_results_dir(dir.path());
            let factory = MockFactory::new(scripted_login_site(&suite.site, true));
            let runner = SuiteRunner::new(quiet(), suite);

            let summary = runner.run(&factory, &CASES).await.unwrap();
            assert!(summary.all_passed());

            let results = std::fs::read_dir(dir.path())
                .unwrap()
                .filter_map(Result::ok)
                .filter(|e| e.file_name().to_string_lossy().ends_with("-result.json"))
                .count();
            assert_eq!(results, 6);
        }

        #[tokio::test]
        async fn test_failures_are_summarised_not_raised() {
            let dir = tempfile::tempdir().unwrap();
            let suite = SuiteConfig::default()
                .with_wait(loginflow::WaitPolicy::new().with_timeout(30).with_poll_interval(5))
                .with_results_dir(dir.path());
            let factory = MockFactory::new(
                MockDriver::new().on_navigate(MockEffect::SetTitle("Maintenance".into())),
            );
            let runner = SuiteRunner::new(quiet(), suite);

            let summary = runner.run(&factory, &CASES[..1]).await.unwrap();
            assert_eq!(summary.broken(), 1);
            assert!(summary.outcomes[0].message.contains("Timed out"));
        }
    }
}
