//! vgrid CLI - headless host for the vgrid library
//!
//! Drives the viewport renderer and the batch generator the way a GIS host
//! would, without a GIS.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;
use vgrid::logging::{init_logging, LoggingConfig, LoggingGuard};

use commands::config::ConfigCommands;
use commands::generate::GenerateArgs;
use commands::render::RenderArgs;
use commands::resolution::ResolutionArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "vgrid", version = vgrid::VERSION, about = "Discrete global grid cells for a map viewport")]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. vgrid=debug)
    #[arg(long, global = true, default_value = vgrid::logging::DEFAULT_FILTER)]
    log_filter: String,

    /// Also write a daily rolling log file into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render grid cells for a fixed viewport and dump them as GeoJSON
    Render(RenderArgs),

    /// Generate every cell of one resolution (batch) as GeoJSON
    Generate(GenerateArgs),

    /// Show which resolution each family picks at a scale or zoom
    Resolution(ResolutionArgs),

    /// List supported grid families
    Families,

    /// View or modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn init(cli: &Cli) -> Result<LoggingGuard, CliError> {
    let mut config = LoggingConfig::default()
        .with_filter(cli.log_filter.clone())
        .with_ansi(console::user_attended_stderr());
    if let Some(dir) = &cli.log_dir {
        config = config.with_log_dir(dir.clone());
    }
    Ok(init_logging(config)?)
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Resolution(args) => commands::resolution::run(args),
        Commands::Families => commands::families::run(),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn main() {
    let cli = Cli::parse();

    let result = init(&cli).and_then(|guard| {
        let result = run(cli);
        // Flush the file writer before exiting
        drop(guard);
        result
    });

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(e.exit_code());
    }
}
