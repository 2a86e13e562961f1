//! Generate command - batch grid generation to GeoJSON.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use vgrid::batch::{BatchGenerator, BatchRequest, BatchStage, GeoJsonSink, DEFAULT_BATCH_MAX_CELLS};
use vgrid::dggs::AdapterContext;
use vgrid::enumerate::CancellationToken;
use vgrid::family::DggsFamily;
use vgrid::geometry::{AntimeridianPolicy, GeoRect};

use super::common::{open_output, parse_extent, writes_stdout};
use crate::error::CliError;

/// Arguments for the generate command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Grid family
    pub family: DggsFamily,

    /// Resolution (not clamped; must be inside the family range)
    pub resolution: u8,

    /// WGS84 extent as min_lon,min_lat,max_lon,max_lat (required at high resolutions)
    #[arg(short, long, value_parser = parse_extent, allow_hyphen_values = true)]
    pub extent: Option<GeoRect>,

    /// Antimeridian policy (defaults to the family's)
    #[arg(long)]
    pub antimeridian: Option<AntimeridianPolicy>,

    /// Stop after this many cells
    #[arg(long, default_value_t = DEFAULT_BATCH_MAX_CELLS)]
    pub max_cells: usize,

    /// Skip per-cell metrics
    #[arg(long)]
    pub no_metrics: bool,

    /// Output GeoJSON file ('-' for stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the generate command.
pub fn run(args: GenerateArgs) -> Result<(), CliError> {
    let mut request = BatchRequest::new(args.family, args.resolution)
        .with_max_cells(args.max_cells)
        .with_metrics(!args.no_metrics);
    if let Some(extent) = args.extent {
        request = request.with_extent(extent);
    }
    if let Some(policy) = args.antimeridian {
        request = request.with_antimeridian(policy);
    }
    // Fail before touching the output file
    request.validate()?;

    let to_stdout = writes_stdout(args.output.as_deref());
    let spinner = if to_stdout {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!(
        "Enumerating {} r{}",
        args.family.display_name(),
        args.resolution
    ));

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, stopping...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let progress = spinner.clone();
    let generator = BatchGenerator::new(AdapterContext::default())
        .with_cancel(cancel)
        .with_progress(Box::new(move |stage, done, total| {
            let message = match stage {
                BatchStage::Enumerating => "Enumerating cells".to_string(),
                BatchStage::Measuring => format!("Measuring {} cells", total),
                BatchStage::Writing => format!("Writing {}/{} features", done, total),
            };
            progress.set_message(message);
        }));

    let out = open_output(args.output.as_deref())?;
    let mut sink = GeoJsonSink::new(out);
    let result = generator.generate(&request, &mut sink);
    spinner.finish_and_clear();
    let summary = result?;

    let report = format!(
        "{} r{}: {} features, {} skipped{} in {:.1}s",
        args.family.display_name(),
        args.resolution,
        summary.features,
        summary.skipped,
        if summary.truncated { " (truncated at --max-cells)" } else { "" },
        summary.elapsed.as_secs_f64()
    );
    if to_stdout {
        eprintln!("{}", report);
    } else {
        println!("{}", report);
    }
    Ok(())
}
