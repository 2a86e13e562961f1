//! Resolution command - show the scale → resolution mapping.

use clap::Args;
use vgrid::family::DggsFamily;
use vgrid::resolution::{scale_for_zoom, zoom_from_scale};

use super::common::load_settings;
use crate::error::CliError;

/// Arguments for the resolution command.
#[derive(Debug, Args)]
pub struct ResolutionArgs {
    /// Families to show (defaults to every interactive family)
    #[arg(short, long = "family")]
    pub families: Vec<DggsFamily>,

    /// Map scale denominator
    #[arg(long, conflicts_with = "zoom")]
    pub scale: Option<f64>,

    /// Web Mercator zoom level
    #[arg(short, long)]
    pub zoom: Option<f64>,
}

/// Run the resolution command.
pub fn run(args: ResolutionArgs) -> Result<(), CliError> {
    let scale = match (args.scale, args.zoom) {
        (Some(scale), _) => scale,
        (None, Some(zoom)) => scale_for_zoom(zoom),
        (None, None) => {
            return Err(CliError::InvalidArgument(
                "one of --scale or --zoom is required".to_string(),
            ))
        }
    };
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CliError::InvalidArgument(format!(
            "scale must be positive, got {}",
            scale
        )));
    }

    let families: Vec<DggsFamily> = if args.families.is_empty() {
        DggsFamily::interactive().collect()
    } else {
        args.families
    };
    let settings = load_settings();

    println!("Scale 1:{:.0}  (zoom {:.2})", scale, zoom_from_scale(scale));
    println!();
    println!("{:<18} {:>4}  {:>9}", "Family", "Res", "Range");
    println!("{}", "─".repeat(34));
    for family in families {
        let policy = settings.family(family).policy(family);
        let (min, max) = policy.bounds();
        println!(
            "{:<18} {:>4}  {:>9}",
            family.display_name(),
            policy.resolve(scale),
            format!("{}..={}", min, max)
        );
    }
    Ok(())
}
