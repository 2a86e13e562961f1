//! Breadth-first traversal from the cell under the extent center.

use std::collections::{HashSet, VecDeque};

use geo::Contains;

use super::{Emitter, Enumeration, EnumerationContext, Flow};
use crate::dggs::{Cell, CellId, DggsAdapter, NeighborTopology};
use crate::error::VgridError;

/// Result of a BFS pass, keeping the visited set for inspection.
#[derive(Debug, Clone, Default)]
pub struct BfsOutcome {
    /// Emitted cells in breadth order from the seed.
    pub enumeration: Enumeration,
    /// Every cell whose polygon was examined, emitted or not.
    pub visited: HashSet<CellId>,
}

/// Traverse neighbors from the seed, emitting cells that touch the extent.
///
/// When the seed cell contains the whole extent it is the only cell
/// emitted. Cells that do not touch the extent end up in `visited` but
/// their neighbors are not expanded.
pub fn bfs_from_seed<A: DggsAdapter + ?Sized>(
    adapter: &A,
    topology: &dyn NeighborTopology,
    ctx: &EnumerationContext,
) -> Result<BfsOutcome, VgridError> {
    let seed = adapter.cell_at(ctx.extent.center(), ctx.resolution)?;
    let seed_polygon = adapter.cell_polygon(&seed)?;

    let mut emitter = Emitter::new(ctx);
    let mut visited = HashSet::new();

    if seed_polygon.contains(&ctx.extent.to_polygon()) {
        visited.insert(seed.clone());
        emitter.push(Cell {
            id: seed,
            polygon: seed_polygon,
        });
        return Ok(BfsOutcome {
            enumeration: emitter.finish(),
            visited,
        });
    }

    let mut frontier = VecDeque::from([seed]);
    while let Some(cell) = frontier.pop_front() {
        if emitter.should_stop() {
            break;
        }
        if !visited.insert(cell.clone()) {
            continue;
        }
        let polygon = match adapter.cell_polygon(&cell) {
            Ok(polygon) => polygon,
            Err(e) => {
                tracing::debug!(family = %adapter.family(), cell = %cell, error = %e, "BFS: skipping cell");
                emitter.skip();
                continue;
            }
        };
        if !ctx.extent.intersects_polygon(&polygon) {
            continue;
        }
        let neighbors = topology.neighbors(&cell);
        if emitter.push(Cell { id: cell, polygon }) == Flow::Stop {
            break;
        }
        match neighbors {
            Ok(neighbors) => frontier.extend(neighbors.into_iter().filter(|n| !visited.contains(n))),
            Err(e) => {
                tracing::debug!(family = %adapter.family(), error = %e, "BFS: neighbor lookup failed");
            }
        }
    }

    Ok(BfsOutcome {
        enumeration: emitter.finish(),
        visited,
    })
}
