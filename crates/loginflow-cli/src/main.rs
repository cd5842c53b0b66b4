//! Loginflow CLI: run the identity-provider sign-in acceptance suite
//!
//! ## Usage
//!
//! ```bash
//! loginflow list                          # Show the six cases
//! loginflow run                           # Run all cases in headless Chromium
//! loginflow run --filter otp -j 2         # Filter cases, two sessions at once
//! loginflow run --driver mock             # Dry run against the scripted site
//! ```

use clap::Parser;
use loginflow::cases;
use loginflow::flow::scripted_login_site;
use loginflow::{MockFactory, TestCase};
use loginflow_cli::{
    build_suite_config, Cli, CliConfig, CliError, CliResult, ColorChoice, Commands, DriverArg,
    ListArgs, ProgressReporter, RunArgs, SuiteRunner, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Build configuration from CLI args
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match cli.command {
        Commands::Run(args) => run_cases(config, &args),
        Commands::List(args) => {
            run_list(&config, &args);
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

fn init_tracing(verbosity: Verbosity) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.log_directive())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_list(config: &CliConfig, args: &ListArgs) {
    let reporter = ProgressReporter::new(config.color.should_color(), false);
    reporter.case_list(&cases::select(args.filter.as_deref()));
}

fn run_cases(config: CliConfig, args: &RunArgs) -> CliResult<()> {
    let selected = cases::select(args.filter.as_deref());
    if selected.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no case matches filter {:?}",
            args.filter.as_deref().unwrap_or_default()
        )));
    }

    let suite = build_suite_config(args)?;
    let runner = SuiteRunner::new(config, suite);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::test_execution(format!("Failed to create runtime: {e}")))?;

    let summary = rt.block_on(async {
        match args.driver {
            DriverArg::Mock => {
                let factory = MockFactory::new(scripted_login_site(&runner.suite().site, true));
                runner.run(&factory, &selected).await
            }
            DriverArg::Chromium => run_chromium(&runner, &selected).await,
        }
    })?;

    if summary.all_passed() {
        Ok(())
    } else {
        Err(CliError::test_execution(format!(
            "{} of {} cases did not pass",
            summary.total() - summary.passed(),
            summary.total()
        )))
    }
}

#[cfg(feature = "browser")]
async fn run_chromium(
    runner: &SuiteRunner,
    cases: &[TestCase],
) -> CliResult<loginflow::SuiteSummary> {
    let factory = loginflow::ChromiumFactory::new(runner.suite().browser.clone());
    runner.run(&factory, cases).await
}

#[cfg(not(feature = "browser"))]
async fn run_chromium(
    _runner: &SuiteRunner,
    _cases: &[TestCase],
) -> CliResult<loginflow::SuiteSummary> {
    Err(CliError::config(
        "built without browser support; rebuild with --features browser or use --driver mock",
    ))
}
