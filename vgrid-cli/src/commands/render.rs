//! Render command - headless viewport render.
//!
//! Drives the viewport renderer with a fixed viewport and recording draw
//! handles, then dumps every drawn geometry as a GeoJSON
//! `FeatureCollection` in the viewport CRS.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde_json::json;
use vgrid::batch::polygons_to_geojson;
use vgrid::dggs::AdapterContext;
use vgrid::family::DggsFamily;
use vgrid::geometry::{AntimeridianPolicy, GeoRect};
use vgrid::projection::{BuiltinProjector, CrsId};
use vgrid::render::host::{CountingCanvas, LogStatusBar, RecordingDrawHandle};
use vgrid::render::{RenderReport, Viewport, ViewportRenderer};
use vgrid::resolution::scale_for_zoom;

use super::common::{load_settings, open_output, parse_extent, writes_stdout};
use crate::error::CliError;

/// Arguments for the render command.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Families to draw (repeatable; defaults to the enabled families)
    #[arg(short, long = "family")]
    pub families: Vec<DggsFamily>,

    /// Viewport extent as min_x,min_y,max_x,max_y in the viewport CRS
    #[arg(short, long, value_parser = parse_extent, allow_hyphen_values = true)]
    pub extent: GeoRect,

    /// Viewport CRS (EPSG:4326, EPSG:3857, EPSG:326xx/327xx, EPSG:6933)
    #[arg(long, default_value = "EPSG:4326")]
    pub crs: CrsId,

    /// Map scale denominator
    #[arg(long, conflicts_with = "zoom")]
    pub scale: Option<f64>,

    /// Web Mercator zoom level, converted to a scale
    #[arg(short, long)]
    pub zoom: Option<f64>,

    /// Override every family's antimeridian policy
    #[arg(long)]
    pub antimeridian: Option<AntimeridianPolicy>,

    /// Output GeoJSON file ('-' for stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the render command.
pub fn run(args: RenderArgs) -> Result<(), CliError> {
    let scale = match (args.scale, args.zoom) {
        (Some(scale), _) => scale,
        (None, Some(zoom)) => scale_for_zoom(zoom),
        (None, None) => {
            return Err(CliError::InvalidArgument(
                "one of --scale or --zoom is required".to_string(),
            ))
        }
    };

    let mut settings = load_settings();
    let families = if args.families.is_empty() {
        settings.enabled_families()
    } else {
        args.families.clone()
    };
    if families.is_empty() {
        return Err(CliError::InvalidArgument(
            "no family selected; pass --family or enable one with 'vgrid config set'".to_string(),
        ));
    }
    for family in &families {
        let mut family_settings = settings.family(*family);
        family_settings.enabled = true;
        if let Some(policy) = args.antimeridian {
            family_settings.antimeridian = policy;
        }
        settings.families.insert(*family, family_settings);
    }

    let canvas = CountingCanvas::new();
    let mut renderer = ViewportRenderer::new(
        Arc::new(BuiltinProjector::new()),
        settings,
        Box::new(canvas.clone()),
        Box::new(LogStatusBar),
    );

    let ctx = AdapterContext::default();
    let mut handles: Vec<(DggsFamily, RecordingDrawHandle)> = Vec::new();
    for family in &families {
        let handle = RecordingDrawHandle::new();
        match renderer.attach(*family, &ctx, Box::new(handle.clone())) {
            Ok(()) => handles.push((*family, handle)),
            Err(e) => eprintln!("Skipping {}: {}", family.display_name(), e),
        }
    }

    let viewport = Viewport::new(args.extent, args.crs, scale);
    let to_stdout = writes_stdout(args.output.as_deref());
    let mut reports = Vec::new();
    for (family, _) in &handles {
        let report = renderer.render_family(*family, &viewport)?;
        print_report(*family, &report, to_stdout);
        reports.push(report);
    }

    let mut features = Vec::new();
    for (family, handle) in &handles {
        let log = handle.snapshot();
        let stroke = log.stroke.map(|c| c.to_string());
        for polygon in &log.geometries {
            features.push(json!({
                "type": "Feature",
                "geometry": polygons_to_geojson(std::slice::from_ref(polygon)),
                "properties": {
                    "family": family.key(),
                    "stroke": stroke,
                    "stroke-width": log.width,
                },
            }));
        }
    }
    let collection = json!({
        "type": "FeatureCollection",
        "crs": args.crs.to_string(),
        "features": features,
    });

    let mut out = open_output(args.output.as_deref())?;
    serde_json::to_writer(&mut out, &collection).map_err(vgrid::VgridError::from)?;
    writeln!(out)?;
    out.flush()?;

    renderer.teardown();
    if !to_stdout {
        let drawn: usize = reports.iter().map(|r| r.drawn).sum();
        println!("Wrote {} geometries", drawn);
    }
    Ok(())
}

fn print_report(family: DggsFamily, report: &RenderReport, to_stderr: bool) {
    let line = match report.resolution {
        Some(resolution) => format!(
            "{:<18} r{:<3} cells {:>6}  drawn {:>6}  skipped {:>4}{}{}",
            family.display_name(),
            resolution,
            report.cells,
            report.drawn,
            report.skipped,
            if report.world_fill { "  world" } else { "" },
            if report.truncated { "  truncated" } else { "" },
        ),
        None => format!("{:<18} not drawn at this scale", family.display_name()),
    };
    if to_stderr {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

