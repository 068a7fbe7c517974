use anyhow::{bail, ensure, Result};

use crate::{
    geom::Crs,
    readings::{source::finite, MetricName, PointColumns, PointReading, PointSource},
};

/// A point grid carrying a single fixed metric, e.g. the PM2.5 hotspot raster.
#[derive(Debug, Clone)]
pub struct PointGrid {
    metric: [MetricName; 1],
    crs: Crs,
    columns: PointColumns,
    values: Vec<Option<f64>>,
}

impl PointGrid {
    pub fn new(metric: MetricName, crs: Crs, columns: PointColumns, values: Vec<Option<f64>>) -> Result<Self> {
        ensure!(values.len() == columns.len(),
            "[readings::grid] {} values for {} points", values.len(), columns.len());
        Ok(Self {
            metric: [metric],
            crs,
            columns,
            values: values.into_iter().map(finite).collect(),
        })
    }

    /// Build a grid from readings that all share one metric.
    pub fn from_readings(metric: MetricName, crs: Crs, readings: impl IntoIterator<Item = PointReading>) -> Result<Self> {
        let mut locations = Vec::new();
        let mut observed_at = Vec::new();
        let mut values = Vec::new();

        for reading in readings {
            if reading.metric != metric {
                bail!("[readings::grid] Reading for {} in a {} grid", reading.metric, metric);
            }
            locations.push(reading.location);
            observed_at.push(reading.observed_at);
            values.push(reading.value);
        }

        Self::new(metric, crs, PointColumns::new(locations, observed_at)?, values)
    }

    #[inline] pub fn metric(&self) -> &MetricName { &self.metric[0] }
}

impl PointSource for PointGrid {
    #[inline] fn crs(&self) -> Crs { self.crs }

    #[inline] fn metrics(&self) -> &[MetricName] { &self.metric }

    #[inline] fn columns(&self) -> &PointColumns { &self.columns }

    #[inline]
    fn value(&self, row: usize, metric: &MetricName) -> Option<f64> {
        if *metric == self.metric[0] { self.values[row] } else { None }
    }
}
