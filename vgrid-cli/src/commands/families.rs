//! Families command - list supported grid families.

use vgrid::dggs::registry::available_families;
use vgrid::dggs::AdapterContext;
use vgrid::family::{DggsFamily, StrategyKind};

use crate::error::CliError;

fn strategy_name(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::GeoExtentList => "extent-list",
        StrategyKind::PrefixRefine => "prefix-refine",
        StrategyKind::BfsFromSeed => "bfs",
        StrategyKind::Sampled => "sampled",
        StrategyKind::GzdCarve => "gzd-carve",
    }
}

/// Run the families command.
pub fn run() -> Result<(), CliError> {
    let available = available_families(&AdapterContext::default());

    println!(
        "{:<16} {:<18} {:>7}  {:<14} {:>6}  {:<10} {}",
        "Key", "Name", "Range", "Strategy", "World", "Antimer.", "Status"
    );
    println!("{}", "─".repeat(86));
    for family in DggsFamily::ALL {
        let d = family.descriptor();
        let world = d
            .world_fill_max
            .map_or_else(|| "-".to_string(), |r| format!("≤{}", r));
        let status = match (available.contains(&family), d.interactive) {
            (false, _) => "unavailable",
            (true, false) => "batch only",
            (true, true) => "ok",
        };
        println!(
            "{:<16} {:<18} {:>7}  {:<14} {:>6}  {:<10} {}",
            family.key(),
            family.display_name(),
            format!("{}-{}", d.min_res, d.max_res),
            strategy_name(d.strategy),
            world,
            d.antimeridian.as_str(),
            status
        );
    }
    Ok(())
}
