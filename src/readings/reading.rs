use chrono::{DateTime, Utc};
use geo::Point;

use crate::readings::MetricName;

/// A single geolocated, timestamped metric value from a sensor or a model grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PointReading {
    pub location: Point<f64>, // (lon, lat) in the canonical reference system
    pub metric: MetricName,
    pub value: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl PointReading {
    pub fn new(lon: f64, lat: f64, metric: impl Into<MetricName>, value: Option<f64>, observed_at: DateTime<Utc>) -> Self {
        Self { location: Point::new(lon, lat), metric: metric.into(), value, observed_at }
    }
}
