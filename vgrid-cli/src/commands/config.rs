//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path`
//! for the persisted `vgrid/` settings.

use clap::Subcommand;
use vgrid::config::{config_file_path, ConfigKey, Settings};

use super::common::load_settings;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Key path (e.g., vgrid/max_cells, vgrid/h3/color, h3.min_res)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Key path (e.g., vgrid/max_cells, vgrid/h3/color, h3.min_res)
        key: String,

        /// Value to set (an empty value clears min_res/max_res)
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key),
        ConfigCommands::Set { key, value } => run_set(&key, &value),
        ConfigCommands::List => run_list(),
        ConfigCommands::Path => run_path(),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'vgrid config list' to see available keys.",
            key
        ))
    })
}

/// Get a configuration value.
fn run_get(key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let settings = load_settings();
    let value = config_key.get(&settings);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }

    Ok(())
}

/// Set a configuration value.
fn run_set(key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut settings = load_settings();
    config_key.set(&mut settings, value)?;
    settings.save()?;

    println!("Set {} = {}", config_key.name(), config_key.get(&settings));

    Ok(())
}

/// List all configuration settings.
fn run_list() -> Result<(), CliError> {
    let settings = load_settings();
    print_settings(&settings);
    Ok(())
}

fn print_settings(settings: &Settings) {
    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(settings);
        if value.is_empty() {
            println!("  {} = (not set)", key.key_name());
        } else {
            println!("  {} = {}", key.key_name(), value);
        }
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path()?.display());
    Ok(())
}
