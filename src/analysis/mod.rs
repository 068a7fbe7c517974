//! Analyses built on the containment join: hotspot ranking, location comparison and trends.

pub mod category;
mod compare;
mod hotspot;
mod trend;

pub use category::Category;
pub use compare::{compare_locations, CompareRequest, Comparison, Location, Ranking, Spread};
pub use hotspot::{
    find_hotspots, Hotspot, HotspotCluster, HotspotReport, HotspotRequest, HotspotSummary, UnitRef,
    DEFAULT_CLUSTER_RADIUS,
};
pub use trend::{trend, Bucket, Direction, Trend, TrendPoint, TrendRequest, TrendStats};

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dispatch::{Outcome, QueryEngine},
    error::QueryResult,
    geom::BoundaryLayer,
    level::AdministrativeLevel,
};

/// Conformed layer holding the unit `code` at `level`, or the outcome explaining why there is none.
fn resolve_unit(engine: &QueryEngine, code: &str, level: Option<&str>) -> QueryResult<Result<Arc<BoundaryLayer>, Outcome>> {
    let canonical = AdministrativeLevel::from_text(level);
    let Some(layer) = engine.boundaries(canonical)? else {
        warn!(level = ?level, code, "unrecognized administrative level");
        return Ok(Err(Outcome::UnrecognizedLevel));
    };
    if layer.find(code).is_none() {
        debug!(level = %canonical, code, "no boundary with this code");
        return Ok(Err(Outcome::NoMatchingBoundary));
    }
    Ok(Ok(layer))
}
