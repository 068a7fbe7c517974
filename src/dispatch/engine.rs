use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use tracing::{debug, info, warn};

use crate::{
    aggregate::{aggregate, AggregationPolicy},
    cancel::Cancellation,
    config::EngineConfig,
    dispatch::{pm25_only, AggregationRow, Outcome, QueryRequest, RowSet},
    error::{QueryError, QueryResult},
    geom::{BoundaryLayer, Crs, CrsBinding},
    join::find_contained_points,
    level::AdministrativeLevel,
    readings::{MetricName, PointSource},
    registry::{BoundaryDataset, BoundaryRegistry},
    store::{DataStore, DiskStore, ReadingSourceKind},
};

/// Query lifecycle. `Normalized` and `Dispatched` may short-circuit straight to `Returned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Normalized,
    Dispatched,
    Joined,
    Aggregated,
    Returned,
}

/// How a level's boundaries meet the readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPlan {
    pub source: ReadingSourceKind,
    /// How the stored polygons relate to a reference system (tagged, or stamped at query time).
    pub binding: CrsBinding,
    /// System both sides are joined in.
    pub canonical: Crs,
}

/// Everything the dispatcher needs to answer a query at one level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Route<'a> {
    pub dataset: &'a BoundaryDataset,
    pub join: JoinPlan,
    pub policy: AggregationPolicy,
}

/// Level dispatcher: normalizes the level, routes it to its boundary dataset, joins and aggregates.
/// Boundary layers are conformed once per level and kept as a read-only snapshot;
/// the engine is otherwise stateless between queries and safe to share across threads.
pub struct QueryEngine {
    registry: BoundaryRegistry,
    store: Arc<dyn DataStore>,
    config: EngineConfig,
    layers: RwLock<AHashMap<AdministrativeLevel, Arc<BoundaryLayer>>>,
}

impl QueryEngine {
    /// Build an engine, validating the registry against the canonical reference system.
    pub fn new(registry: BoundaryRegistry, store: Arc<dyn DataStore>, config: EngineConfig) -> QueryResult<Self> {
        registry.validate(config.canonical_crs)?;
        Ok(Self { registry, store, config, layers: RwLock::new(AHashMap::new()) })
    }

    /// Build an engine over the on-disk store at `config.data_dir`.
    pub fn open(config: EngineConfig) -> QueryResult<Self> {
        let Some(dir) = config.data_dir.clone() else {
            return Err(QueryError::InvalidRequest("no data directory configured (AIRSHED_DATA_DIR)".into()));
        };
        let store = DiskStore::open(dir)?;
        if store.manifest().crs != config.canonical_crs {
            return Err(QueryError::GeometryInconsistency(format!(
                "store {} is declared in {} but the engine joins in {}",
                store.manifest().store_id, store.manifest().crs, config.canonical_crs
            )));
        }
        let registry = store.registry()?;
        Self::new(registry, Arc::new(store), config)
    }

    #[inline] pub fn registry(&self) -> &BoundaryRegistry { &self.registry }

    #[inline] pub fn config(&self) -> &EngineConfig { &self.config }

    /// Load every boundary layer and reading source once, failing on any reference-system defect.
    pub fn preload(&self) -> QueryResult<()> {
        for level in AdministrativeLevel::ALL {
            let layer = self.boundaries(level)?;
            info!(level = %level, units = layer.map_or(0, |l| l.len()), "boundaries ready");
        }
        for kind in [ReadingSourceKind::FixedGrid, ReadingSourceKind::MetricTable] {
            if self.store.has_readings(kind) {
                let source = self.readings(kind)?;
                info!(kind = %kind, rows = source.len(), "readings ready");
            }
        }
        Ok(())
    }

    /// Route a canonical level for the given metrics. `Unknown` has no route.
    pub fn route(&self, level: AdministrativeLevel, metrics: &[MetricName], policy: AggregationPolicy) -> Option<Route<'_>> {
        let dataset = self.registry.resolve(level)?;
        Some(Route {
            dataset,
            join: JoinPlan {
                source: self.reading_kind(metrics),
                binding: dataset.crs,
                canonical: self.config.canonical_crs,
            },
            policy,
        })
    }

    /// PM2.5-only requests read the fixed grid when the store has one; everything else reads the table.
    pub fn reading_kind(&self, metrics: &[MetricName]) -> ReadingSourceKind {
        if pm25_only(metrics) && self.store.has_readings(ReadingSourceKind::FixedGrid) {
            ReadingSourceKind::FixedGrid
        } else {
            ReadingSourceKind::MetricTable
        }
    }

    /// Boundary layer of a level, stamped and reprojected into the canonical system.
    pub fn boundaries(&self, level: AdministrativeLevel) -> QueryResult<Option<Arc<BoundaryLayer>>> {
        let Some(dataset) = self.registry.resolve(level) else { return Ok(None) };
        self.conformed(dataset).map(Some)
    }

    /// Conformed layer of a dataset, loaded on first use. Load failures are not remembered.
    fn conformed(&self, dataset: &BoundaryDataset) -> QueryResult<Arc<BoundaryLayer>> {
        let poisoned = || QueryError::unavailable(&dataset.source, "boundary snapshot poisoned");
        if let Some(layer) = self.layers.read().map_err(|_| poisoned())?.get(&dataset.level) {
            return Ok(Arc::clone(layer));
        }

        let layer = self.store.boundaries(dataset)?
            .conform(dataset.crs, self.config.canonical_crs)?;
        debug!(level = %dataset.level, units = layer.len(), "conformed boundaries");

        let mut layers = self.layers.write().map_err(|_| poisoned())?;
        Ok(Arc::clone(layers.entry(dataset.level).or_insert_with(|| Arc::new(layer))))
    }

    /// A reading source, checked against the canonical system.
    pub fn readings(&self, kind: ReadingSourceKind) -> QueryResult<Arc<dyn PointSource>> {
        let source = self.store.readings(kind)?;
        if source.crs() != self.config.canonical_crs {
            return Err(QueryError::GeometryInconsistency(format!(
                "{kind} readings are in {} but the engine joins in {}", source.crs(), self.config.canonical_crs
            )));
        }
        Ok(source)
    }

    /// Policy for a request: its statistic (or the configured one) at the configured precision.
    pub fn policy(&self, request: &QueryRequest) -> AggregationPolicy {
        AggregationPolicy {
            statistic: request.statistic.unwrap_or(self.config.statistic),
            decimals: self.config.decimals,
        }
    }

    /// Answer one request. Unrecognized levels, unknown codes and units without readings
    /// give an empty `RowSet`; only store, reference-system and cancellation failures are errors.
    pub fn query(&self, request: &QueryRequest, cancel: &Cancellation) -> QueryResult<RowSet> {
        let cancel = cancel.child(self.config.query_timeout);
        let metrics = request.metric.metrics();
        debug!(stage = ?Stage::Received, code = %request.code, level = ?request.level, metrics = metrics.len());

        let level = AdministrativeLevel::from_text(request.level.as_deref());
        debug!(stage = ?Stage::Normalized, level = %level);
        let policy = self.policy(request);
        let Some(route) = self.route(level, metrics, policy) else {
            warn!(level = ?request.level, code = %request.code, "unrecognized administrative level, returning no rows");
            return Ok(self.returned(RowSet::empty(level, metrics, Outcome::UnrecognizedLevel)));
        };
        if metrics.is_empty() {
            return Err(QueryError::InvalidRequest("request names no metric".into()));
        }

        cancel.check()?;
        let layer = self.conformed(route.dataset)?;
        let Some(unit) = layer.find(&request.code) else {
            debug!(level = %level, code = %request.code, "no boundary with this code");
            return Ok(self.returned(RowSet::empty(level, metrics, Outcome::NoMatchingBoundary)));
        };
        debug!(stage = ?Stage::Dispatched, level = %level, code = unit.code, source = %route.join.source);

        let source = self.readings(route.join.source)?;
        let matched = find_contained_points(&unit, source.as_ref(), &request.window, &cancel)?;
        debug!(stage = ?Stage::Joined, code = unit.code, matched = matched.len());

        let values = metrics.iter()
            .map(|metric| (metric.clone(), aggregate(&matched, metric, route.policy)))
            .collect::<smallvec::SmallVec<[_; 2]>>();
        debug!(stage = ?Stage::Aggregated, code = unit.code, statistic = %route.policy.statistic);

        if values.iter().all(|(_, value)| value.is_none()) {
            return Ok(self.returned(RowSet::empty(level, metrics, Outcome::NoReadings)));
        }

        let row = AggregationRow { code: unit.code.to_string(), name: unit.name.to_string(), values };
        Ok(self.returned(RowSet { level, metrics: metrics.to_vec(), rows: vec![row], outcome: Outcome::Rows }))
    }

    fn returned(&self, rows: RowSet) -> RowSet {
        debug!(stage = ?Stage::Returned, outcome = ?rows.outcome, rows = rows.len());
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch::MetricSelector,
        geom::WGS84,
        readings::{MetricTable, PointGrid, PointReading, TimeWindow},
        store::MemStore,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use geo::{polygon, MultiPolygon};

    fn at(hour: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap() }

    fn square(x: f64, y: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![(x: x, y: y), (x: x + 1.0, y: y), (x: x + 1.0, y: y + 1.0), (x: x, y: y + 1.0)]])
    }

    fn store(with_grid: bool) -> MemStore {
        let registry = BoundaryRegistry::default();
        let mut store = MemStore::new();
        for dataset in registry.iter() {
            let crs = match dataset.crs {
                CrsBinding::Tagged(crs) => crs,
                CrsBinding::Stamp(_) => Crs::Unspecified,
            };
            store.insert_boundaries(&dataset.source, BoundaryLayer::new(dataset.level, crs, [("X1", "Unit", square(0.0, 0.0))]));
        }
        let table = MetricTable::from_readings(WGS84, [
            PointReading::new(0.5, 0.5, "pm25", Some(10.0), at(6)),
            PointReading::new(0.5, 0.5, "no2", Some(4.0), at(6)),
        ]).unwrap();
        let store = store.with_table(table);
        if with_grid {
            store.with_grid(PointGrid::from_readings(MetricName::pm25(), WGS84, [
                PointReading::new(0.5, 0.5, "pm25", Some(70.0), at(6)),
            ]).unwrap())
        } else {
            store
        }
    }

    fn engine(with_grid: bool) -> QueryEngine {
        QueryEngine::new(BoundaryRegistry::default(), Arc::new(store(with_grid)), EngineConfig::default()).unwrap()
    }

    fn window() -> TimeWindow { TimeWindow::range(at(0), at(12)) }

    #[test]
    fn pm25_only_requests_use_the_grid_when_present() {
        let with_grid = engine(true);
        let policy = AggregationPolicy::default();
        let pm25 = [MetricName::pm25()];
        let both = [MetricName::pm25(), MetricName::new("no2")];
        assert_eq!(with_grid.route(AdministrativeLevel::Ward, &pm25, policy).unwrap().join.source, ReadingSourceKind::FixedGrid);
        assert_eq!(with_grid.route(AdministrativeLevel::Ward, &both, policy).unwrap().join.source, ReadingSourceKind::MetricTable);
        assert!(with_grid.route(AdministrativeLevel::Unknown, &pm25, policy).is_none());

        let rows = with_grid.query(&QueryRequest::new("X1", "ward", "pm25", window()), &Cancellation::new()).unwrap();
        assert_eq!(rows.rows[0].value(), Some(70.0));

        let without_grid = engine(false);
        assert_eq!(without_grid.route(AdministrativeLevel::Ward, &pm25, policy).unwrap().join.source, ReadingSourceKind::MetricTable);
        let rows = without_grid.query(&QueryRequest::new("X1", "ward", "pm25", window()), &Cancellation::new()).unwrap();
        assert_eq!(rows.rows[0].value(), Some(10.0));
    }

    #[test]
    fn ward_route_stamps_untagged_boundaries() {
        let engine = engine(false);
        let route = engine.route(AdministrativeLevel::Ward, &[MetricName::pm25()], AggregationPolicy::default()).unwrap();
        assert_eq!(route.join.binding, CrsBinding::Stamp(WGS84));
        assert_eq!(engine.boundaries(AdministrativeLevel::Ward).unwrap().unwrap().crs(), WGS84);
        assert!(engine.boundaries(AdministrativeLevel::Unknown).unwrap().is_none());
        engine.preload().unwrap();
    }

    #[test]
    fn missing_metrics_serialize_as_null_but_keep_the_row() {
        let engine = engine(false);
        let request = QueryRequest::new("X1", "district", MetricSelector::many(["pm25", "so2"]), window());
        let rows = engine.query(&request, &Cancellation::new()).unwrap();
        assert_eq!(rows.outcome, Outcome::Rows);
        assert_eq!(rows.rows[0].get(&MetricName::pm25()), Some(10.0));
        assert_eq!(rows.rows[0].get(&MetricName::new("so2")), None);

        let request = QueryRequest::new("X1", "district", MetricSelector::many(["so2", "o3"]), window());
        assert_eq!(engine.query(&request, &Cancellation::new()).unwrap().outcome, Outcome::NoReadings);
    }

    #[test]
    fn statistic_override_and_empty_selector() {
        let engine = engine(false);
        let request = QueryRequest::new("X1", "state", "pm25", window()).with_statistic(crate::aggregate::Statistic::Count);
        assert_eq!(engine.query(&request, &Cancellation::new()).unwrap().rows[0].value(), Some(1.0));

        let request = QueryRequest::new("X1", "state", MetricSelector::many(Vec::<&str>::new()), window());
        assert!(matches!(engine.query(&request, &Cancellation::new()), Err(QueryError::InvalidRequest(_))));
    }

    #[test]
    fn unrecognized_level_wins_over_an_empty_selector() {
        let engine = engine(false);
        let request = QueryRequest::new("X1", "province", MetricSelector::many(Vec::<&str>::new()), window());
        let rows = engine.query(&request, &Cancellation::new()).unwrap();
        assert!(rows.is_empty());
        assert_eq!(rows.outcome, Outcome::UnrecognizedLevel);
        assert_eq!(rows.level, AdministrativeLevel::Unknown);
    }

    #[test]
    fn layers_are_conformed_once_and_shared() {
        let engine = engine(false);
        let first = engine.boundaries(AdministrativeLevel::Ward).unwrap().unwrap();
        engine.query(&QueryRequest::new("X1", "ward", "pm25", window()), &Cancellation::new()).unwrap();
        let second = engine.boundaries(AdministrativeLevel::Ward).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.crs(), WGS84);
    }

    #[test]
    fn readings_in_another_system_are_rejected() {
        let store = store(false).with_table(MetricTable::from_readings(Crs::Epsg(3857), [
            PointReading::new(0.5, 0.5, "pm25", Some(10.0), at(6)),
        ]).unwrap());
        let engine = QueryEngine::new(BoundaryRegistry::default(), Arc::new(store), EngineConfig::default()).unwrap();
        let err = engine.query(&QueryRequest::new("X1", "state", "pm25", window()), &Cancellation::new()).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(engine.preload().is_err());
    }

    #[test]
    fn engine_without_data_dir_cannot_open() {
        assert!(matches!(QueryEngine::open(EngineConfig::default()), Err(QueryError::InvalidRequest(_))));
    }
}
