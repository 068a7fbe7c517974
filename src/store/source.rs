use std::{fmt, sync::Arc};

use crate::{
    error::QueryResult,
    geom::BoundaryLayer,
    readings::PointSource,
    registry::BoundaryDataset,
};

/// The two shapes of reading table a store may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadingSourceKind {
    /// Single-metric (PM2.5) grid of sensor points.
    FixedGrid,
    /// Rows carrying several named metrics.
    MetricTable,
}

impl ReadingSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingSourceKind::FixedGrid => "grid",
            ReadingSourceKind::MetricTable => "table",
        }
    }
}

impl fmt::Display for ReadingSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only access to boundary layers and reading tables.
/// Boundary layers come back exactly as stored (tagged or not); callers conform them.
/// Every I/O or parse failure is reported as `QueryError::DataSourceUnavailable`.
pub trait DataStore: Send + Sync {
    fn boundaries(&self, dataset: &BoundaryDataset) -> QueryResult<BoundaryLayer>;

    fn readings(&self, kind: ReadingSourceKind) -> QueryResult<Arc<dyn PointSource>>;

    /// Whether the store holds a reading source of this kind at all.
    fn has_readings(&self, kind: ReadingSourceKind) -> bool;
}
