#![allow(dead_code)]

use std::sync::Arc;

use airshed::{
    BoundaryLayer, BoundaryRegistry, Crs, CrsBinding, EngineConfig, MemStore, MetricTable, PointReading,
    QueryEngine, TimeWindow, AdministrativeLevel, WGS84,
};
use chrono::{DateTime, TimeZone, Utc};
use geo::{polygon, MultiPolygon};

/// Ward polygons are stored untagged, in web mercator metres.
pub const WARD_CRS: Crs = Crs::Epsg(3857);

const EARTH_RADIUS: f64 = 6_378_137.0;

pub fn at(hour: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap() }

/// Window holding the 06:00 batch only.
pub fn morning() -> TimeWindow { TimeWindow::range(at(5), at(7)) }

pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]])
}

/// Spherical web-mercator forward projection.
pub fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Lon/lat rectangle expressed in mercator metres.
pub fn mercator_rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    let (mx0, my0) = mercator(x0, y0);
    let (mx1, my1) = mercator(x1, y1);
    rect(mx0, my0, mx1, my1)
}

/// Conventional layout in WGS84, except wards which are stamped as web mercator.
pub fn registry() -> BoundaryRegistry {
    let mut registry = BoundaryRegistry::conventional(WGS84);
    if let Some(ward) = registry.resolve_mut(AdministrativeLevel::Ward) {
        ward.crs = CrsBinding::Stamp(WARD_CRS);
    }
    registry
}

/// ```text
/// S01 [76,78] x [12,14]
///   D02 [76,77] x [12,13]      D01 [77,78] x [12.5,13.5]
///     T01 [76.5,77] x [12.5,13]  W001 [77.5,77.7] x [12.6,13.4] (mercator, untagged)
/// ```
pub fn layers() -> Vec<BoundaryLayer> {
    vec![
        BoundaryLayer::new(AdministrativeLevel::State, WGS84, [("S01", "Karnataka", rect(76.0, 12.0, 78.0, 14.0))]),
        BoundaryLayer::new(AdministrativeLevel::District, WGS84, [
            ("D01", "Bengaluru Urban", rect(77.0, 12.5, 78.0, 13.5)),
            ("D02", "Mysuru", rect(76.0, 12.0, 77.0, 13.0)),
        ]),
        BoundaryLayer::new(AdministrativeLevel::SubDistrict, WGS84, [
            ("T01", "Nanjangud", rect(76.5, 12.5, 77.0, 13.0)),
        ]),
        BoundaryLayer::new(AdministrativeLevel::Ward, Crs::Unspecified, [
            ("W001", "Shivajinagar", mercator_rect(77.5, 12.6, 77.7, 13.4)),
        ]),
    ]
}

pub fn readings() -> Vec<PointReading> {
    vec![
        // D01
        PointReading::new(77.2, 13.2, "pm25", Some(80.0), at(6)),
        PointReading::new(77.6, 13.0, "pm25", Some(90.0), at(6)),
        PointReading::new(77.8, 12.8, "pm25", Some(100.0), at(6)),
        PointReading::new(77.6, 13.0, "no2", Some(41.0), at(6)),
        PointReading::new(77.2, 13.2, "pm25", Some(500.0), at(1)),
        // D02, the second one inside T01
        PointReading::new(76.2, 12.2, "pm25", Some(40.0), at(6)),
        PointReading::new(76.7, 12.7, "pm25", Some(55.0), at(6)),
        PointReading::new(76.7, 12.7, "pm10", Some(120.0), at(6)),
        // Outside every unit
        PointReading::new(80.0, 20.0, "pm25", Some(300.0), at(6)),
    ]
}

pub fn store() -> MemStore {
    let registry = registry();
    let mut store = MemStore::new();
    for (dataset, layer) in registry.iter().zip(layers()) {
        store.insert_boundaries(&dataset.source, layer);
    }
    store.with_table(MetricTable::from_readings(WGS84, readings()).unwrap())
}

pub fn engine() -> QueryEngine {
    QueryEngine::new(registry(), Arc::new(store()), EngineConfig::default()).unwrap()
}

/// Engine over a store holding only `readings`.
pub fn engine_with(readings: Vec<PointReading>) -> QueryEngine {
    let registry = registry();
    let mut store = MemStore::new();
    for (dataset, layer) in registry.iter().zip(layers()) {
        store.insert_boundaries(&dataset.source, layer);
    }
    let store = store.with_table(MetricTable::from_readings(WGS84, readings).unwrap());
    QueryEngine::new(registry, Arc::new(store), EngineConfig::default()).unwrap()
}
