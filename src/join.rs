//! Point-in-polygon containment join between one boundary unit and a point source.

use geo::BoundingRect;
use gridindex::covers;
use tracing::trace;

use crate::{
    cancel::Cancellation,
    error::{QueryError, QueryResult},
    geom::BoundaryPolygon,
    readings::{MetricName, PointReading, PointSource, TimeWindow},
};

/// How many candidate points are tested between cancellation checks.
const CHECK_EVERY: usize = 1024;

/// Rows of a point source contained in one boundary unit, in ascending row order.
#[derive(Debug, Clone)]
pub struct Matched<'a> {
    source: &'a dyn PointSource,
    rows: Vec<usize>,
}

impl<'a> Matched<'a> {
    fn empty(source: &'a dyn PointSource) -> Self { Self { source, rows: Vec::new() } }

    #[inline] pub fn source(&self) -> &'a dyn PointSource { self.source }

    #[inline] pub fn rows(&self) -> &[usize] { &self.rows }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Values of `metric` for each matched row, `None` where missing.
    pub fn values<'m>(&'m self, metric: &'m MetricName) -> impl Iterator<Item = Option<f64>> + 'm {
        self.rows.iter().map(move |&row| self.source.value(row, metric))
    }

    /// Materialize the matched rows as readings of `metric`.
    pub fn readings(&self, metric: &MetricName) -> Vec<PointReading> {
        let columns = self.source.columns();
        self.rows.iter()
            .map(|&row| PointReading {
                location: columns.location(row),
                metric: metric.clone(),
                value: self.source.value(row, metric),
                observed_at: columns.observed_at(row),
            })
            .collect()
    }
}

/// Find every reading inside `window` whose location is covered by `boundary`.
///
/// Points on the boundary itself (including an edge shared with a neighbouring unit)
/// are contained; points inside a hole are not. Both sides must be in the same,
/// specified reference system. `cancel` is polled while scanning candidates; an
/// aborted join returns the error and no partial result.
pub fn find_contained_points<'a>(
    boundary: &BoundaryPolygon<'_>,
    source: &'a dyn PointSource,
    window: &TimeWindow,
    cancel: &Cancellation,
) -> QueryResult<Matched<'a>> {
    if !boundary.crs.is_specified() || boundary.crs != source.crs() {
        return Err(QueryError::GeometryInconsistency(format!(
            "boundary {} is in {} but readings are in {}", boundary.code, boundary.crs, source.crs()
        )));
    }
    cancel.check()?;

    let columns = source.columns();
    let Some(filter) = window.resolve(columns.batches()) else {
        return Ok(Matched::empty(source));
    };
    let Some(rect) = boundary.geometry.bounding_rect() else {
        return Ok(Matched::empty(source));
    };

    let mut rows = Vec::new();
    let mut tested = 0usize;
    for (row, point) in columns.index().candidates(&rect) {
        tested += 1;
        if tested % CHECK_EVERY == 0 {
            cancel.check()?;
        }
        if filter.contains(columns.observed_at(row)) && covers(boundary.geometry, &point) {
            rows.push(row);
        }
    }
    cancel.check()?;
    rows.sort_unstable();

    trace!(code = boundary.code, candidates = tested, matched = rows.len(), "containment join");
    Ok(Matched { source, rows })
}
