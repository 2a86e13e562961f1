//! Geo-extent listing: the library answers "all cells at level R in this
//! rectangle", the kernel resolves polygons and filters.

use super::{Emitter, Enumeration, EnumerationContext, Flow};
use crate::dggs::{DggsAdapter, ExtentLister};
use crate::error::VgridError;

pub(super) fn run<A: DggsAdapter + ?Sized>(
    adapter: &A,
    lister: &dyn ExtentLister,
    ctx: &EnumerationContext,
) -> Result<Enumeration, VgridError> {
    // One extra id tells a full listing apart from one cut at the budget.
    let limit = ctx.max_cells.saturating_add(1);
    let ids = lister.list_cells(ctx.resolution, &ctx.extent, limit)?;

    let mut emitter = Emitter::new(ctx);
    for id in ids {
        if emitter.offer(adapter, id) == Flow::Stop {
            break;
        }
    }
    Ok(emitter.finish())
}
