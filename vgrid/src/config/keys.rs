//! Flat `vgrid/...` setting keys.
//!
//! | Key                                  | Value                         |
//! |--------------------------------------|-------------------------------|
//! | `vgrid/max_cells`                    | cell budget per pass          |
//! | `vgrid/status_warning_secs`          | status-bar warning duration   |
//! | `vgrid/<family>/enabled`             | `true` / `false`              |
//! | `vgrid/<family>/color`               | `rrggbb` or `rrggbbaa`        |
//! | `vgrid/<family>/width`               | stroke width in pixels        |
//! | `vgrid/<family>/resolution_offset`   | added to the policy result    |
//! | `vgrid/<family>/min_res`             | lower bound, empty for none   |
//! | `vgrid/<family>/max_res`             | upper bound, empty for none   |
//! | `vgrid/<family>/antimeridian`        | `ignore`, `split`, `shift_east` |
//!
//! On disk the family part becomes the INI section (`[h3]`), the global
//! keys live in `[general]`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use super::{ConfigError, Settings};
use crate::family::DggsFamily;
use crate::geometry::AntimeridianPolicy;

/// INI section of the global keys.
pub const GENERAL_SECTION: &str = "general";

/// Per-family options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyOption {
    Enabled,
    Color,
    Width,
    ResolutionOffset,
    MinRes,
    MaxRes,
    Antimeridian,
}

impl FamilyOption {
    pub const ALL: [FamilyOption; 7] = [
        FamilyOption::Enabled,
        FamilyOption::Color,
        FamilyOption::Width,
        FamilyOption::ResolutionOffset,
        FamilyOption::MinRes,
        FamilyOption::MaxRes,
        FamilyOption::Antimeridian,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyOption::Enabled => "enabled",
            FamilyOption::Color => "color",
            FamilyOption::Width => "width",
            FamilyOption::ResolutionOffset => "resolution_offset",
            FamilyOption::MinRes => "min_res",
            FamilyOption::MaxRes => "max_res",
            FamilyOption::Antimeridian => "antimeridian",
        }
    }
}

/// One addressable setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    MaxCells,
    StatusWarningSecs,
    Family(DggsFamily, FamilyOption),
}

impl ConfigKey {
    /// Every key, global ones first, then family by family.
    pub fn all() -> Vec<ConfigKey> {
        let mut keys = vec![ConfigKey::MaxCells, ConfigKey::StatusWarningSecs];
        for family in DggsFamily::ALL {
            keys.extend(FamilyOption::ALL.iter().map(|option| ConfigKey::Family(family, *option)));
        }
        keys
    }

    /// Full key path, e.g. `vgrid/h3/color`.
    pub fn name(&self) -> String {
        match self {
            ConfigKey::Family(family, option) => format!("vgrid/{}/{}", family.key(), option.as_str()),
            _ => format!("vgrid/{}", self.key_name()),
        }
    }

    /// INI section holding the key.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::Family(family, _) => family.key(),
            _ => GENERAL_SECTION,
        }
    }

    /// Key name inside its section.
    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::MaxCells => "max_cells",
            ConfigKey::StatusWarningSecs => "status_warning_secs",
            ConfigKey::Family(_, option) => option.as_str(),
        }
    }

    /// Current value as text; empty when an optional value is unset.
    pub fn get(&self, settings: &Settings) -> String {
        match self {
            ConfigKey::MaxCells => settings.max_cells.to_string(),
            ConfigKey::StatusWarningSecs => settings.status_warning_secs.to_string(),
            ConfigKey::Family(family, option) => {
                let fs = settings.family(*family);
                match option {
                    FamilyOption::Enabled => fs.enabled.to_string(),
                    FamilyOption::Color => fs.color.to_hex(),
                    FamilyOption::Width => fs.width.to_string(),
                    FamilyOption::ResolutionOffset => fs.resolution_offset.to_string(),
                    FamilyOption::MinRes => fs.min_res.map(|r| r.to_string()).unwrap_or_default(),
                    FamilyOption::MaxRes => fs.max_res.map(|r| r.to_string()).unwrap_or_default(),
                    FamilyOption::Antimeridian => fs.antimeridian.to_string(),
                }
            }
        }
    }

    /// Parse `value` and store it.
    ///
    /// # Errors
    ///
    /// `InvalidValue` when the text does not parse for this key; `settings`
    /// is left unchanged.
    pub fn set(&self, settings: &mut Settings, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason,
        };
        match self {
            ConfigKey::MaxCells => {
                let max_cells: usize = value.parse().map_err(|e| invalid(format!("{}", e)))?;
                if max_cells == 0 {
                    return Err(invalid("must be at least 1".to_string()));
                }
                settings.max_cells = max_cells;
            }
            ConfigKey::StatusWarningSecs => {
                settings.status_warning_secs = value.parse().map_err(|e| invalid(format!("{}", e)))?;
            }
            ConfigKey::Family(family, option) => {
                let mut fs = settings.family(*family);
                match option {
                    FamilyOption::Enabled => {
                        fs.enabled = parse_bool(value).ok_or_else(|| invalid("expected true or false".to_string()))?
                    }
                    FamilyOption::Color => fs.color = value.parse().map_err(invalid)?,
                    FamilyOption::Width => {
                        let width: f64 = value.parse().map_err(|e| invalid(format!("{}", e)))?;
                        if !width.is_finite() || width <= 0.0 {
                            return Err(invalid("must be a positive number".to_string()));
                        }
                        fs.width = width;
                    }
                    FamilyOption::ResolutionOffset => {
                        fs.resolution_offset = value.parse().map_err(|e| invalid(format!("{}", e)))?
                    }
                    FamilyOption::MinRes => fs.min_res = parse_optional_res(value).map_err(invalid)?,
                    FamilyOption::MaxRes => fs.max_res = parse_optional_res(value).map_err(invalid)?,
                    FamilyOption::Antimeridian => {
                        fs.antimeridian = value.parse::<AntimeridianPolicy>().map_err(invalid)?
                    }
                }
                settings.families.insert(*family, fs);
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn key_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(?:vgrid/)?(?:([a-z0-9_]+)/)?([a-z_]+)$").ok())
        .as_ref()
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('.', "/");
        let unknown = || ConfigError::UnknownKey(s.to_string());
        let captures = key_pattern()
            .and_then(|pattern| pattern.captures(&normalized))
            .ok_or_else(unknown)?;
        let name = captures.get(2).map(|m| m.as_str()).ok_or_else(unknown)?;

        match captures.get(1).map(|m| m.as_str()) {
            None | Some(GENERAL_SECTION) => match name {
                "max_cells" => Ok(ConfigKey::MaxCells),
                "status_warning_secs" => Ok(ConfigKey::StatusWarningSecs),
                _ => Err(unknown()),
            },
            Some(section) => {
                let family: DggsFamily = section.parse().map_err(|_| unknown())?;
                FamilyOption::ALL
                    .into_iter()
                    .find(|option| option.as_str() == name)
                    .map(|option| ConfigKey::Family(family, option))
                    .ok_or_else(unknown)
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_optional_res(value: &str) -> Result<Option<u8>, String> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<u8>().map(Some).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_paths() {
        assert_eq!("vgrid/max_cells".parse::<ConfigKey>().unwrap(), ConfigKey::MaxCells);
        assert_eq!("max_cells".parse::<ConfigKey>().unwrap(), ConfigKey::MaxCells);
        assert_eq!(
            "vgrid/h3/color".parse::<ConfigKey>().unwrap(),
            ConfigKey::Family(DggsFamily::H3, FamilyOption::Color)
        );
        assert_eq!(
            "dggal_rhealpix.max_res".parse::<ConfigKey>().unwrap(),
            ConfigKey::Family(DggsFamily::DggalRhealpix, FamilyOption::MaxRes)
        );
    }

    #[test]
    fn test_unknown_keys() {
        for bad in ["vgrid/h3/colour", "vgrid/hexbin/color", "vgrid/zoom", "", "vgrid/h3/color/x"] {
            assert!(matches!(bad.parse::<ConfigKey>(), Err(ConfigError::UnknownKey(_))), "{}", bad);
        }
    }

    #[test]
    fn test_names_roundtrip() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), key);
        }
        assert_eq!(ConfigKey::all().len(), 2 + 7 * DggsFamily::ALL.len());
    }

    #[test]
    fn test_set_and_get() {
        let mut settings = Settings::default();
        let key = ConfigKey::Family(DggsFamily::S2, FamilyOption::MinRes);
        key.set(&mut settings, "4").unwrap();
        assert_eq!(key.get(&settings), "4");
        key.set(&mut settings, "").unwrap();
        assert_eq!(key.get(&settings), "");

        let policy = ConfigKey::Family(DggsFamily::S2, FamilyOption::Antimeridian);
        policy.set(&mut settings, "split").unwrap();
        assert_eq!(settings.family(DggsFamily::S2).antimeridian, AntimeridianPolicy::Split);
    }

    #[test]
    fn test_invalid_values_leave_settings_alone() {
        let mut settings = Settings::default();
        let before = settings.clone();
        for (key, value) in [
            ("vgrid/max_cells", "0"),
            ("vgrid/max_cells", "lots"),
            ("vgrid/h3/width", "-1"),
            ("vgrid/h3/enabled", "maybe"),
            ("vgrid/h3/min_res", "300"),
            ("vgrid/h3/antimeridian", "wrap"),
        ] {
            let key: ConfigKey = key.parse().unwrap();
            assert!(matches!(key.set(&mut settings, value), Err(ConfigError::InvalidValue { .. })));
        }
        assert_eq!(settings, before);
    }
}
