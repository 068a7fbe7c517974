use std::fmt;

use serde::Serialize;

use crate::readings::MetricName;

/// Upper bounds (inclusive) of the PM2.5 severity bands, µg/m³.
const PM25_BANDS: [(f64, Category); 5] = [
    (30.0, Category::Good),
    (60.0, Category::Satisfactory),
    (90.0, Category::Moderate),
    (120.0, Category::Poor),
    (250.0, Category::VeryPoor),
];

/// Air-quality severity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    VeryPoor,
    Severe,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Good => "good",
            Category::Satisfactory => "satisfactory",
            Category::Moderate => "moderate",
            Category::Poor => "poor",
            Category::VeryPoor => "very_poor",
            Category::Severe => "severe",
        }
    }

    /// Band of a PM2.5 concentration.
    pub fn from_pm25(value: f64) -> Self {
        PM25_BANDS.iter()
            .find(|(upper, _)| value <= *upper)
            .map_or(Category::Severe, |(_, category)| *category)
    }

    /// Band of any metric. PM2.5 uses its own bands; other metrics use the PM2.5 bands
    /// scaled so that their hotspot threshold lines up with PM2.5's.
    pub fn for_metric(metric: &MetricName, value: f64) -> Self {
        Self::from_pm25(value * hotspot_threshold(&MetricName::pm25()) / hotspot_threshold(metric))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default value above which a reading is a hotspot.
pub fn hotspot_threshold(metric: &MetricName) -> f64 {
    match metric.as_str() {
        "pm25" => 90.0,
        "pm10" => 150.0,
        "aqi" => 200.0,
        "no2" | "so2" => 80.0,
        "co" => 10.0,
        "o3" => 168.0,
        _ => 100.0,
    }
}

/// Value at or below which a metric is considered safe.
pub fn safe_threshold(metric: &MetricName) -> f64 {
    match metric.as_str() {
        "pm25" => 30.0,
        "aqi" => 50.0,
        "no2" | "so2" => 40.0,
        "co" => 2.0,
        "o3" => 50.0,
        _ => 50.0,
    }
}

/// Value above which a metric is considered unhealthy. Metrics without their own line use 200.
pub fn unhealthy_threshold(metric: &MetricName) -> f64 {
    match metric.as_str() {
        "pm25" => 90.0,
        "aqi" => 200.0,
        "no2" | "so2" => 80.0,
        "co" => 10.0,
        "o3" => 168.0,
        _ => 200.0,
    }
}

#[inline]
pub fn is_safe(metric: &MetricName, value: f64) -> bool { value <= safe_threshold(metric) }

#[inline]
pub fn is_unhealthy(metric: &MetricName, value: f64) -> bool { value > unhealthy_threshold(metric) }
