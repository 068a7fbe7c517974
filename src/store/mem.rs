use std::sync::Arc;

use ahash::AHashMap;

use crate::{
    error::{QueryError, QueryResult},
    geom::BoundaryLayer,
    readings::{MetricTable, PointGrid, PointSource},
    registry::BoundaryDataset,
    store::{DataStore, ReadingSourceKind},
};

/// Simple in-memory store.
/// Boundary layers are keyed by store-relative source, e.g. "boundaries/district.geojson".
#[derive(Debug, Default, Clone)]
pub struct MemStore {
    boundaries: AHashMap<String, BoundaryLayer>,
    grid: Option<Arc<PointGrid>>,
    table: Option<Arc<MetricTable>>,
}

impl MemStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_boundaries(mut self, source: impl Into<String>, layer: BoundaryLayer) -> Self {
        self.insert_boundaries(source, layer);
        self
    }

    pub fn with_grid(mut self, grid: PointGrid) -> Self {
        self.grid = Some(Arc::new(grid));
        self
    }

    pub fn with_table(mut self, table: MetricTable) -> Self {
        self.table = Some(Arc::new(table));
        self
    }

    pub fn insert_boundaries(&mut self, source: impl Into<String>, layer: BoundaryLayer) {
        self.boundaries.insert(source.into(), layer);
    }
}

impl DataStore for MemStore {
    fn boundaries(&self, dataset: &BoundaryDataset) -> QueryResult<BoundaryLayer> {
        self.boundaries.get(&dataset.source).cloned()
            .ok_or_else(|| QueryError::unavailable(&dataset.source, "missing boundary source"))
    }

    fn readings(&self, kind: ReadingSourceKind) -> QueryResult<Arc<dyn PointSource>> {
        let source: Option<Arc<dyn PointSource>> = match kind {
            ReadingSourceKind::FixedGrid => self.grid.clone().map(|grid| grid as Arc<dyn PointSource>),
            ReadingSourceKind::MetricTable => self.table.clone().map(|table| table as Arc<dyn PointSource>),
        };
        source.ok_or_else(|| QueryError::unavailable(format!("readings/{kind}"), "missing reading source"))
    }

    fn has_readings(&self, kind: ReadingSourceKind) -> bool {
        match kind {
            ReadingSourceKind::FixedGrid => self.grid.is_some(),
            ReadingSourceKind::MetricTable => self.table.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geom::WGS84, level::AdministrativeLevel, readings::{MetricName, PointReading}};
    use chrono::{TimeZone, Utc};
    use geo::{polygon, MultiPolygon};

    #[test]
    fn serves_what_it_holds_and_reports_the_rest_unavailable() {
        let dataset = BoundaryDataset::conventional(AdministrativeLevel::District, WGS84);
        let layer = BoundaryLayer::new(AdministrativeLevel::District, WGS84, [
            ("D01", "Lucknow", MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]])),
        ]);
        let t = Utc.with_ymd_and_hms(2025, 1, 15, 6, 0, 0).unwrap();
        let grid = PointGrid::from_readings(MetricName::pm25(), WGS84, [
            PointReading::new(0.5, 0.2, "pm25", Some(40.0), t),
        ]).unwrap();

        let store = MemStore::new().with_boundaries(&dataset.source, layer).with_grid(grid);
        assert_eq!(store.boundaries(&dataset).unwrap().len(), 1);
        assert_eq!(store.readings(ReadingSourceKind::FixedGrid).unwrap().len(), 1);
        assert!(store.has_readings(ReadingSourceKind::FixedGrid));
        assert!(!store.has_readings(ReadingSourceKind::MetricTable));

        let ward = BoundaryDataset::conventional(AdministrativeLevel::Ward, WGS84);
        assert!(store.boundaries(&ward).unwrap_err().is_retryable());
        assert!(matches!(
            store.readings(ReadingSourceKind::MetricTable),
            Err(QueryError::DataSourceUnavailable { .. })
        ));
    }
}
