//! # hpkl-cli
//!
//! Dependency resolver and package cache manager for Pkl projects.
//!
//! This is the entry point for the `hpkl` binary. It parses the command line,
//! builds the application configuration once, sets up logging and dispatches
//! to the command handlers.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use hpkl_config::{ConfigLoader, ConfigOverrides};
use hpkl_core::error::{HpklError, HpklResult};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Resolve and cache Pkl project dependencies
#[derive(Parser)]
#[command(name = "hpkl", version, about = "Resolve and cache Pkl project dependencies")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Cache directory (defaults to ~/.pkl/cache)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Project directory to resolve
    #[arg(short = 'w', long, global = true, value_name = "DIR")]
    pub working_dir: Option<Utf8PathBuf>,

    /// Fail when any project in the graph lies outside this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub root_dir: Option<Utf8PathBuf>,

    /// Use plain HTTP for registries and metadata servers
    #[arg(short, long, global = true)]
    pub plain_http: bool,

    /// Project graph document (defaults to <DIR>/PklProject.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub project_graph: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve dependencies and write PklProject.deps.json
    Resolve {
        /// Project directories; defaults to the working directory
        dirs: Vec<Utf8PathBuf>,
    },
    /// Project commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Link packages from the default cache into --cache-dir
    DownloadPackage {
        /// Package URIs, optionally followed by `::` and a module path
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Resolve dependencies and write PklProject.deps.json
    Resolve {
        /// Project directories; defaults to the working directory
        dirs: Vec<Utf8PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("Starting hpkl v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{}", ErrorFormatter::new().format_error(&e));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> HpklResult<()> {
    let overrides = ConfigOverrides {
        cache_dir: cli.cache_dir,
        working_dir: cli.working_dir,
        root_dir: cli.root_dir,
        plain_http: cli.plain_http,
        project_graph: cli.project_graph,
    };
    let config = ConfigLoader::from_env()?.load(overrides)?;

    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| HpklError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(config);
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let directives = [
        "hpkl_cli",
        "hpkl_core",
        "hpkl_config",
        "hpkl_registry",
        "hpkl_resolver",
        "hpkl_cache",
        "hpkl_lockfile",
    ]
    .iter()
    .fold(String::from("warn"), |acc, target| format!("{},{}={}", acc, target, level));

    let filter = EnvFilter::try_from_env("HPKL_LOG").unwrap_or_else(|_| EnvFilter::new(directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("hpkl encountered an unexpected error: {}", panic_info);
        eprintln!("hpkl crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
