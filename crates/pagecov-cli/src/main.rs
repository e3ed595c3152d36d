//! pagecov: visit pages and keep per-test V8 coverage
//!
//! ## Usage
//!
//! ```bash
//! pagecov run --url http://127.0.0.1:3000/index.html   # One test per URL
//! pagecov run --config pagecov.yaml -j 4                # Settings from a file
//! pagecov config --config pagecov.yaml                  # Print effective config
//! ```

use clap::Parser;
use pagecov::CoverageState;
use pagecov_cli::{
    default_log_level, run, Cli, CliError, CliResult, ColorArg, Commands, LineReporter, RunConfig,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.color {
        ColorArg::Always => console::set_colors_enabled_stderr(true),
        ColorArg::Never => console::set_colors_enabled_stderr(false),
        ColorArg::Auto => {}
    }
    init_logging(&cli);

    match dispatch(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = default_log_level(cli.verbose, cli.quiet);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.with_ansi(cli.color.should_color()).init();
    }
}

fn dispatch(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Run(args) => run_pages(cli, &RunConfig::resolve(&args.settings)?),
        Commands::Config(args) => {
            print!("{}", RunConfig::resolve(&args.settings)?.to_yaml()?);
            Ok(())
        }
    }
}

fn run_pages(cli: &Cli, config: &RunConfig) -> CliResult<()> {
    let reporter = LineReporter::new(cli.color.should_color(), cli.quiet);
    reporter.info(&format!(
        "Visiting {} page(s), output in {}",
        config.urls.len(),
        config.harness.output_dir.display()
    ));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::config(format!("Failed to create runtime: {e}")))?;
    let outcome = rt.block_on(run(config))?;

    reporter.report(&outcome.results);
    if outcome.coverage == CoverageState::Unsupported {
        reporter.info(&format!(
            "JS coverage unavailable in this browser: {}",
            outcome.unsupported_reason.as_deref().unwrap_or("unknown reason")
        ));
    }

    let failed = outcome.results.failed_count();
    if failed > 0 {
        return Err(CliError::TestsFailed {
            failed,
            total: outcome.results.total(),
        });
    }
    Ok(())
}
