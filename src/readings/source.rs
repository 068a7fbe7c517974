use std::fmt;

use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use geo::Point;
use gridindex::PointIndex;

use crate::{geom::Crs, readings::MetricName};

/// Read-only access to a table of geolocated readings with one or more named numeric fields.
pub trait PointSource: Send + Sync + fmt::Debug {
    /// Reference system of every location in the table.
    fn crs(&self) -> Crs;

    /// Numeric fields carried by each row.
    fn metrics(&self) -> &[MetricName];

    /// Columnar locations, timestamps and the spatial index over them.
    fn columns(&self) -> &PointColumns;

    /// Value of `metric` at `row`; `None` when missing or not carried by this source.
    fn value(&self, row: usize, metric: &MetricName) -> Option<f64>;

    #[inline] fn len(&self) -> usize { self.columns().len() }

    #[inline] fn is_empty(&self) -> bool { self.columns().len() == 0 }

    #[inline]
    fn has_metric(&self, metric: &MetricName) -> bool { self.metrics().contains(metric) }
}

/// Location and time columns shared by every point source, plus the R-tree over locations.
#[derive(Debug, Clone)]
pub struct PointColumns {
    locations: Vec<Point<f64>>,
    observed_at: Vec<DateTime<Utc>>,
    batches: Vec<DateTime<Utc>>, // sorted, de-duplicated observation timestamps
    index: PointIndex,
}

impl PointColumns {
    pub fn new(locations: Vec<Point<f64>>, observed_at: Vec<DateTime<Utc>>) -> Result<Self> {
        ensure!(locations.len() == observed_at.len(),
            "[readings] {} locations but {} timestamps", locations.len(), observed_at.len());

        let mut batches = observed_at.clone();
        batches.sort_unstable();
        batches.dedup();

        Ok(Self { index: PointIndex::new(&locations), locations, observed_at, batches })
    }

    #[inline] pub fn len(&self) -> usize { self.locations.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.locations.is_empty() }

    #[inline] pub fn location(&self, row: usize) -> Point<f64> { self.locations[row] }

    #[inline] pub fn observed_at(&self, row: usize) -> DateTime<Utc> { self.observed_at[row] }

    /// Distinct observation timestamps, ascending.
    #[inline] pub fn batches(&self) -> &[DateTime<Utc>] { &self.batches }

    #[inline] pub fn index(&self) -> &PointIndex { &self.index }
}

/// Drop NaN/infinite values so they count as missing.
#[inline]
pub(crate) fn finite(value: Option<f64>) -> Option<f64> { value.filter(|v| v.is_finite()) }
