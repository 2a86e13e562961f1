//! Prefix refinement over a textual code hierarchy.
//!
//! Depth-first from the roots, descending only into codes whose polygon
//! touches the extent. Codes are emitted when their resolution reaches the
//! target, so output is in lexicographic order and every code has the same
//! length.

use super::{Emitter, Enumeration, EnumerationContext, Flow};
use crate::dggs::{Cell, CellId, DggsAdapter, PrefixHierarchy};

pub(super) fn run<A: DggsAdapter + ?Sized>(
    adapter: &A,
    hierarchy: &dyn PrefixHierarchy,
    ctx: &EnumerationContext,
) -> Enumeration {
    let mut emitter = Emitter::new(ctx);

    // Stack of pending codes; children pushed in reverse keep preorder.
    let mut stack: Vec<CellId> = hierarchy.roots();
    stack.reverse();

    while let Some(code) = stack.pop() {
        if emitter.should_stop() {
            break;
        }
        let level = match adapter.resolution_of(&code) {
            Ok(level) => level,
            Err(e) => {
                tracing::debug!(family = %adapter.family(), cell = %code, error = %e, "Prefix: bad code");
                emitter.skip();
                continue;
            }
        };
        let polygon = match adapter.cell_polygon(&code) {
            Ok(polygon) => polygon,
            Err(e) => {
                tracing::debug!(family = %adapter.family(), cell = %code, error = %e, "Prefix: skipping cell");
                emitter.skip();
                continue;
            }
        };
        if !ctx.extent.intersects_polygon(&polygon) {
            continue;
        }
        if level >= ctx.resolution {
            if emitter.push(Cell { id: code, polygon }) == Flow::Stop {
                break;
            }
            continue;
        }
        match hierarchy.children(&code) {
            Ok(children) => stack.extend(children.into_iter().rev()),
            Err(e) => {
                tracing::debug!(family = %adapter.family(), cell = %code, error = %e, "Prefix: no children");
                emitter.skip();
            }
        }
    }
    emitter.finish()
}
