//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Loginflow: run the identity-provider sign-in acceptance suite
#[derive(Parser, Debug)]
#[command(name = "loginflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the test cases
    Run(RunArgs),

    /// List the test cases
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Only run cases whose name contains this substring
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Suite configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for Allure result files
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Number of cases run concurrently
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Browser driver
    #[arg(long, default_value = "chromium")]
    pub driver: DriverArg,

    /// Wait timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// How to pick the identity-provider window
    #[arg(long)]
    pub window_policy: Option<WindowPolicyArg>,

    /// Account name
    #[arg(long, env = "LOGINFLOW_USERNAME")]
    pub username: Option<String>,

    /// Account password
    #[arg(long, env = "LOGINFLOW_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// One-time passcode
    #[arg(long, env = "LOGINFLOW_OTP", hide_env_values = true)]
    pub otp: Option<String>,

    /// Path to the chromium binary
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only list cases whose name contains this substring
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Browser driver selection
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriverArg {
    /// Real Chromium over CDP
    #[default]
    Chromium,
    /// Scripted in-process site (dry run)
    Mock,
}

/// New-window policy argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowPolicyArg {
    /// Exactly one new window must open
    RequireSingle,
    /// First window other than the original
    FirstListed,
}

impl From<WindowPolicyArg> for loginflow::NewWindowPolicy {
    fn from(arg: WindowPolicyArg) -> Self {
        match arg {
            WindowPolicyArg::RequireSingle => Self::RequireSingle,
            WindowPolicyArg::FirstListed => Self::FirstListed,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
