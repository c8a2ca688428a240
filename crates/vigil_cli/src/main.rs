//! Vigil CLI
//!
//! Runs JSON scenarios against the headless site shell and validates
//! `vigil.toml` files.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use vigil_app::logging::filter_for_verbosity;
use vigil_app::{init_logging, run_loaded_scenario, HeadlessRunConfig, HeadlessScenario, VigilConfig};

/// Headless diagnostics for the Vigil site engine
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario and print its report
    Run(RunArgs),

    /// Parse and validate a configuration file
    CheckConfig {
        /// Path to vigil.toml
        #[arg(value_name = "CONFIG", default_value = "vigil.toml")]
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario JSON file
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// Configuration file (defaults apply when missing)
    #[arg(short, long, default_value = "vigil.toml")]
    config: PathBuf,

    /// Also write the report to this relative path
    #[arg(short, long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Logical milliseconds per frame
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

/// Returns `Ok(false)` when a scenario ran but failed
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Run(args) => {
            let config = VigilConfig::load(&args.config)?;
            init_logging(&filter_for_verbosity(
                &config.logging.filter,
                cli.verbose,
                cli.quiet,
            ))?;
            run_scenario_file(&args, &config)
        }
        Command::CheckConfig { path } => {
            init_logging(&filter_for_verbosity("info", cli.verbose, cli.quiet))?;
            check_config(&path)?;
            Ok(true)
        }
    }
}

fn run_scenario_file(args: &RunArgs, config: &VigilConfig) -> Result<bool> {
    let scenario = HeadlessScenario::from_path(&args.scenario)?;
    let runtime_cfg = HeadlessRunConfig {
        tick_ms: args.tick_ms,
        ..HeadlessRunConfig::default()
    };
    tracing::info!(
        scenario = %args.scenario.display(),
        steps = scenario.steps.len(),
        "running scenario"
    );

    let outcome = run_loaded_scenario(&scenario, config, runtime_cfg)?;
    let report = outcome.report();
    report.write_to_writer(&mut io::stdout().lock())?;
    if let Some(path) = &args.report {
        report
            .write_to_path(path)
            .with_context(|| format!("Failed to save report to {}", path.display()))?;
    }
    Ok(!outcome.is_failed())
}

fn check_config(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("{} does not exist", path.display());
    }
    let config = VigilConfig::load(path)?;
    print!("{}", config.to_toml()?);
    tracing::info!(path = %path.display(), "configuration is valid");
    Ok(())
}
