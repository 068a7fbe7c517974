use std::collections::BTreeSet;

use ahash::AHashMap;
use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use geo::Point;

use crate::{
    geom::Crs,
    readings::{source::finite, MetricName, PointColumns, PointReading, PointSource},
};

/// A point table carrying several metrics per row (one column per metric).
#[derive(Debug, Clone)]
pub struct MetricTable {
    metrics: Vec<MetricName>,
    crs: Crs,
    columns: PointColumns,
    values: Vec<Vec<Option<f64>>>, // values[metric][row]
}

impl MetricTable {
    pub fn new(crs: Crs, columns: PointColumns, metric_columns: Vec<(MetricName, Vec<Option<f64>>)>) -> Result<Self> {
        let mut metrics = Vec::with_capacity(metric_columns.len());
        let mut values = Vec::with_capacity(metric_columns.len());

        for (metric, column) in metric_columns {
            ensure!(column.len() == columns.len(),
                "[readings::table] Column {metric} has {} values for {} points", column.len(), columns.len());
            ensure!(!metrics.contains(&metric), "[readings::table] Duplicate metric column {metric}");
            metrics.push(metric);
            values.push(column.into_iter().map(finite).collect());
        }

        Ok(Self { metrics, crs, columns, values })
    }

    /// Pivot long-format readings into one row per (location, timestamp).
    /// Metrics are ordered by name; cells with no reading are missing.
    pub fn from_readings(crs: Crs, readings: impl IntoIterator<Item = PointReading>) -> Result<Self> {
        let readings = readings.into_iter().collect::<Vec<_>>();
        let metrics = readings.iter().map(|r| r.metric.clone()).collect::<BTreeSet<_>>().into_iter().collect::<Vec<_>>();

        let mut rows: AHashMap<(u64, u64, DateTime<Utc>), usize> = AHashMap::new();
        let mut locations: Vec<Point<f64>> = Vec::new();
        let mut observed_at = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); metrics.len()];

        for reading in readings {
            let key = (reading.location.x().to_bits(), reading.location.y().to_bits(), reading.observed_at);
            let row = *rows.entry(key).or_insert_with(|| {
                locations.push(reading.location);
                observed_at.push(reading.observed_at);
                values.iter_mut().for_each(|column| column.push(None));
                locations.len() - 1
            });
            // Metrics are the sorted set built above, so the search always succeeds.
            if let Ok(col) = metrics.binary_search(&reading.metric) {
                values[col][row] = reading.value;
            }
        }

        Self::new(crs, PointColumns::new(locations, observed_at)?, metrics.into_iter().zip(values).collect())
    }
}

impl PointSource for MetricTable {
    #[inline] fn crs(&self) -> Crs { self.crs }

    #[inline] fn metrics(&self) -> &[MetricName] { &self.metrics }

    #[inline] fn columns(&self) -> &PointColumns { &self.columns }

    #[inline]
    fn value(&self, row: usize, metric: &MetricName) -> Option<f64> {
        let col = self.metrics.iter().position(|m| m == metric)?;
        self.values[col][row]
    }
}
