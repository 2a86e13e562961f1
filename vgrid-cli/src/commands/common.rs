//! Common types and utilities shared across CLI commands.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use vgrid::config::Settings;
use vgrid::geometry::GeoRect;

use crate::error::CliError;

/// Load settings or fall back to defaults, warning on a broken file.
pub fn load_settings() -> Settings {
    Settings::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Config: using defaults");
        Settings::default()
    })
}

/// Parse `min_lon,min_lat,max_lon,max_lat`.
pub fn parse_extent(s: &str) -> Result<GeoRect, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("'{}' is not a list of numbers: {}", s, e))?;

    match values.as_slice() {
        [min_lon, min_lat, max_lon, max_lat] => {
            GeoRect::new(*min_lon, *min_lat, *max_lon, *max_lat).map_err(|e| e.to_string())
        }
        _ => Err(format!(
            "expected min_lon,min_lat,max_lon,max_lat but got {} values",
            values.len()
        )),
    }
}

/// Open an output target; `None` or `-` writes to stdout.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    match path {
        Some(p) if p != Path::new("-") => Ok(Box::new(BufWriter::new(File::create(p)?))),
        _ => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Whether output goes to stdout, so human-readable text must go to stderr.
pub fn writes_stdout(path: Option<&Path>) -> bool {
    path.map_or(true, |p| p == Path::new("-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extent() {
        let extent = parse_extent("100, 10, 110, 20").unwrap();
        assert_eq!(extent.min_lon, 100.0);
        assert_eq!(extent.max_lat, 20.0);
    }

    #[test]
    fn test_parse_extent_rejects_bad_input() {
        assert!(parse_extent("1,2,3").is_err());
        assert!(parse_extent("a,b,c,d").is_err());
        assert!(parse_extent("10,0,5,1").is_err());
    }

    #[test]
    fn test_stdout_target() {
        assert!(writes_stdout(None));
        assert!(writes_stdout(Some(Path::new("-"))));
        assert!(!writes_stdout(Some(Path::new("out.geojson"))));
    }
}
