//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pagecov: visit pages in a browser and keep raw V8 coverage per test
#[derive(Parser, Debug)]
#[command(name = "pagecov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit log events as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Visit pages, one test per URL, writing v8-coverage.json for each
    Run(RunArgs),

    /// Print the effective configuration as YAML
    Config(ConfigArgs),
}

/// Settings shared by every command that resolves a configuration
#[derive(Args, Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct SettingsArgs {
    /// YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Page to visit (repeatable)
    #[arg(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Root directory for per-test output
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Per-test timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Number of tests run concurrently
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Extra attempts for a failing test
    #[arg(long)]
    pub retries: Option<u32>,

    /// Project name used in output directory names
    #[arg(long)]
    pub project: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Path to the chromium binary
    #[arg(long)]
    pub chromium_path: Option<String>,

    /// Disable the chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration sources
    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration sources
    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Color argument for CLI
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

impl ColorArg {
    /// Whether styled output should be produced
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::colors_enabled_stderr(),
        }
    }
}
