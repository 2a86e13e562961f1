//! User settings.
//!
//! [`Settings`] is the read-only snapshot handed to every render and batch
//! run: cell budget, status-bar warning duration and, per family, the
//! enabled flag, stroke style, resolution overrides and antimeridian policy.
//!
//! Settings persist as INI at `~/.config/vgrid/config.ini`:
//!
//! ```ini
//! [general]
//! max_cells = 20000
//! status_warning_secs = 5
//!
//! [h3]
//! enabled = true
//! color = 1f77b4
//! width = 1
//! resolution_offset = 0
//! min_res =
//! max_res =
//! antimeridian = ignore
//! ```
//!
//! Individual keys are addressed as `vgrid/<family>/<option>` through
//! [`ConfigKey`]. A malformed value in the file falls back to its default
//! with a warning; the same value passed to [`ConfigKey::set`] is an error.

mod color;
mod keys;

pub use color::Color;
pub use keys::{ConfigKey, FamilyOption, GENERAL_SECTION};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::enumerate::DEFAULT_MAX_CELLS;
use crate::family::DggsFamily;
use crate::geometry::AntimeridianPolicy;
use crate::resolution::ResolutionPolicy;

/// Default duration of status-bar warnings, in seconds.
pub const DEFAULT_STATUS_WARNING_SECS: u64 = 5;

/// Default stroke width in pixels.
pub const DEFAULT_WIDTH: f64 = 1.0;

/// Errors raised while reading or writing settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The key path names no setting.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// The value does not parse for the key.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue { key: String, value: String, reason: String },

    /// The settings file could not be parsed.
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The settings file could not be read or written.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No per-user configuration directory on this platform.
    #[error("No configuration directory available")]
    NoConfigDir,
}

/// Settings of one family.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilySettings {
    pub enabled: bool,
    pub color: Color,
    pub width: f64,
    /// Added to the policy result before clamping.
    pub resolution_offset: i32,
    pub min_res: Option<u8>,
    pub max_res: Option<u8>,
    pub antimeridian: AntimeridianPolicy,
}

impl FamilySettings {
    /// Defaults for a family: disabled, palette color, descriptor policy.
    pub fn defaults(family: DggsFamily) -> Self {
        Self {
            enabled: false,
            color: default_color(family),
            width: DEFAULT_WIDTH,
            resolution_offset: 0,
            min_res: None,
            max_res: None,
            antimeridian: family.descriptor().antimeridian,
        }
    }

    /// Resolution policy with these overrides applied.
    pub fn policy(&self, family: DggsFamily) -> ResolutionPolicy {
        ResolutionPolicy::new(family)
            .with_offset(self.resolution_offset)
            .with_min(self.min_res)
            .with_max(self.max_res)
    }
}

fn default_color(family: DggsFamily) -> Color {
    const PALETTE: [Color; 8] = [
        Color::rgb(0x1f, 0x77, 0xb4),
        Color::rgb(0xff, 0x7f, 0x0e),
        Color::rgb(0x2c, 0xa0, 0x2c),
        Color::rgb(0xd6, 0x27, 0x28),
        Color::rgb(0x94, 0x67, 0xbd),
        Color::rgb(0x8c, 0x56, 0x4b),
        Color::rgb(0xe3, 0x77, 0xc2),
        Color::rgb(0x17, 0xbe, 0xcf),
    ];
    let index = DggsFamily::ALL.iter().position(|f| *f == family).unwrap_or(0);
    PALETTE[index % PALETTE.len()]
}

/// Snapshot of all settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Cell budget of one enumeration pass.
    pub max_cells: usize,
    /// How long render warnings stay on the status bar.
    pub status_warning_secs: u64,
    /// Families with non-default settings.
    pub families: BTreeMap<DggsFamily, FamilySettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_cells: DEFAULT_MAX_CELLS,
            status_warning_secs: DEFAULT_STATUS_WARNING_SECS,
            families: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Settings of a family, defaults when never set.
    pub fn family(&self, family: DggsFamily) -> FamilySettings {
        self.families
            .get(&family)
            .cloned()
            .unwrap_or_else(|| FamilySettings::defaults(family))
    }

    /// Enable or disable a family.
    pub fn with_enabled(mut self, family: DggsFamily, enabled: bool) -> Self {
        let mut fs = self.family(family);
        fs.enabled = enabled;
        self.families.insert(family, fs);
        self
    }

    /// Set the cell budget.
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells.max(1);
        self
    }

    /// Families switched on.
    pub fn enabled_families(&self) -> Vec<DggsFamily> {
        DggsFamily::ALL
            .into_iter()
            .filter(|f| self.family(*f).enabled)
            .collect()
    }

    /// Load from the default path; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config: no settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from a file.
    ///
    /// Values that fail to parse keep their default and are logged; unknown
    /// keys are ignored with a warning.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(err) => ConfigError::Parse {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
        })?;

        let mut settings = Self::default();
        for (section, properties) in &ini {
            let section = section.unwrap_or(GENERAL_SECTION);
            for (name, value) in properties.iter() {
                let key: ConfigKey = match format!("{}/{}", section, name).parse() {
                    Ok(key) => key,
                    Err(_) => {
                        tracing::warn!(section, key = name, "Config: ignoring unknown key");
                        continue;
                    }
                };
                if let Err(e) = key.set(&mut settings, value) {
                    tracing::warn!(error = %e, "Config: keeping default");
                }
            }
        }
        tracing::debug!(path = %path.display(), "Config: settings loaded");
        Ok(settings)
    }

    /// Save to the default path, creating the directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path()?)
    }

    /// Save every key to a file. Unset optional values are omitted.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section())).set(key.key_name(), value);
            }
        }
        ini.write_to_file(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Config: settings saved");
        Ok(())
    }
}

/// Directory holding the settings file.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("vgrid"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Path of the settings file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.ini"))
}
