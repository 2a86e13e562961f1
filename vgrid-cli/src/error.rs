//! CLI error type.

use std::fmt;

use vgrid::config::ConfigError;
use vgrid::logging::LoggingError;
use vgrid::VgridError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad or unreadable configuration.
    Config(String),
    /// An argument that clap accepted but the command cannot use.
    InvalidArgument(String),
    /// Failure inside the library.
    Vgrid(VgridError),
    /// Reading or writing an output file.
    Io(std::io::Error),
    /// Installing the log subscriber.
    Logging(LoggingError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Vgrid(e) => write!(f, "{}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Logging(e) => write!(f, "Logging setup failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Vgrid(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Logging(e) => Some(e),
            _ => None,
        }
    }
}

impl From<VgridError> for CliError {
    fn from(e: VgridError) -> Self {
        CliError::Vgrid(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Vgrid(VgridError::Cancelled) => 130,
            CliError::InvalidArgument(_) => 2,
            _ => 1,
        }
    }
}
