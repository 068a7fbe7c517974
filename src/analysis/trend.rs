use std::collections::BTreeMap;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::Serialize;
use tracing::debug;

use crate::{
    aggregate::{round_half_away, Statistic},
    analysis::resolve_unit,
    cancel::Cancellation,
    dispatch::{Outcome, QueryEngine},
    error::{QueryError, QueryResult},
    join::find_contained_points,
    readings::{MetricName, TimeWindow},
};

const PEAKS: usize = 3;

/// Width of one time-series bucket, aligned to UTC midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    #[default]
    Hourly,
    SixHourly,
    Daily,
}

impl Bucket {
    pub fn width(&self) -> TimeDelta {
        match self {
            Bucket::Hourly => TimeDelta::hours(1),
            Bucket::SixHourly => TimeDelta::hours(6),
            Bucket::Daily => TimeDelta::days(1),
        }
    }

    /// Start of the bucket holding `t`.
    pub fn start(&self, t: DateTime<Utc>) -> QueryResult<DateTime<Utc>> {
        t.duration_trunc(self.width())
            .map_err(|e| QueryError::InvalidRequest(format!("cannot bucket {t}: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendRequest {
    pub code: String,
    pub level: String,
    pub metric: MetricName,
    pub window: TimeWindow,
    pub bucket: Bucket,
}

impl TrendRequest {
    pub fn new(code: impl Into<String>, level: impl Into<String>, metric: impl Into<MetricName>, window: TimeWindow) -> Self {
        Self { code: code.into(), level: level.into(), metric: metric.into(), window, bucket: Bucket::default() }
    }

    pub fn bucketed(mut self, bucket: Bucket) -> Self {
        self.bucket = bucket;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub start: DateTime<Utc>,
    /// Mean of the bucket's readings, rounded.
    pub value: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendStats {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Sample standard deviation of bucket values (0 with fewer than two buckets).
    pub std_dev: f64,
    pub direction: Direction,
    /// Highest buckets first.
    pub peaks: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub code: String,
    pub name: String,
    pub metric: MetricName,
    pub bucket: Bucket,
    /// Chronological.
    pub points: Vec<TrendPoint>,
    pub stats: Option<TrendStats>,
    pub outcome: Outcome,
}

/// Bucketed time series of one unit's readings.
pub fn trend(engine: &QueryEngine, request: &TrendRequest, cancel: &Cancellation) -> QueryResult<Trend> {
    let empty = |name: String, outcome| Trend {
        code: request.code.clone(),
        name,
        metric: request.metric.clone(),
        bucket: request.bucket,
        points: Vec::new(),
        stats: None,
        outcome,
    };
    let cancel = cancel.child(engine.config().query_timeout);

    let layer = match resolve_unit(engine, &request.code, Some(&request.level))? {
        Ok(layer) => layer,
        Err(outcome) => return Ok(empty(String::new(), outcome)),
    };
    let Some(unit) = layer.find(&request.code) else {
        return Ok(empty(String::new(), Outcome::NoMatchingBoundary));
    };

    let source = engine.readings(engine.reading_kind(std::slice::from_ref(&request.metric)))?;
    let matched = find_contained_points(&unit, source.as_ref(), &request.window, &cancel)?;

    let mut buckets: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
    let columns = source.columns();
    for &row in matched.rows() {
        if let Some(value) = source.value(row, &request.metric) {
            buckets.entry(request.bucket.start(columns.observed_at(row))?).or_default().push(value);
        }
    }

    let decimals = engine.config().decimals;
    let (points, means): (Vec<TrendPoint>, Vec<f64>) = buckets.into_iter()
        .filter_map(|(start, values)| {
            let count = values.len();
            Statistic::Mean.reduce(values)
                .map(|mean| (TrendPoint { start, value: round_half_away(mean, decimals), count }, mean))
        })
        .unzip();
    debug!(code = %request.code, metric = %request.metric, buckets = points.len(), "trend");

    if points.is_empty() {
        return Ok(empty(unit.name.to_string(), Outcome::NoReadings));
    }

    let stats = summarize(&points, &means, decimals);

    Ok(Trend {
        code: unit.code.to_string(),
        name: unit.name.to_string(),
        metric: request.metric.clone(),
        bucket: request.bucket,
        points,
        stats: Some(stats),
        outcome: Outcome::Rows,
    })
}

/// Series statistics over the unrounded bucket means `means`, each rounded once.
/// `points` carry the same buckets in the same order and supply the peaks.
fn summarize(points: &[TrendPoint], means: &[f64], decimals: u32) -> TrendStats {
    let round = |v: f64| round_half_away(v, decimals);
    let mut peaks = points.to_vec();
    peaks.sort_by(|a, b| b.value.total_cmp(&a.value).then(a.start.cmp(&b.start)));
    peaks.truncate(PEAKS);

    TrendStats {
        mean: Statistic::Mean.reduce(means.iter().copied()).map_or(0.0, round),
        max: Statistic::Max.reduce(means.iter().copied()).map_or(0.0, round),
        min: Statistic::Min.reduce(means.iter().copied()).map_or(0.0, round),
        std_dev: round(std_dev(means)),
        direction: direction(means),
        peaks,
    }
}

/// Least-squares slope over evenly spaced values; within 1% of the mean counts as stable.
pub(crate) fn direction(values: &[f64]) -> Direction {
    let n = values.len();
    if n < 2 {
        return Direction::InsufficientData;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;
    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    let slope = num / den;

    if slope.abs() < (y_mean * 0.01).abs() {
        Direction::Stable
    } else if slope > 0.0 {
        Direction::Increasing
    } else if slope < 0.0 {
        Direction::Decreasing
    } else {
        Direction::Stable
    }
}

/// Sample standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn buckets_align_to_utc_boundaries() {
        let t = Utc.with_ymd_and_hms(2025, 1, 15, 14, 42, 7).unwrap();
        assert_eq!(Bucket::Hourly.start(t).unwrap(), Utc.with_ymd_and_hms(2025, 1, 15, 14, 0, 0).unwrap());
        assert_eq!(Bucket::SixHourly.start(t).unwrap(), Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap());
        assert_eq!(Bucket::Daily.start(t).unwrap(), Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn direction_from_slope() {
        assert_eq!(direction(&[]), Direction::InsufficientData);
        assert_eq!(direction(&[50.0]), Direction::InsufficientData);
        assert_eq!(direction(&[10.0, 20.0, 30.0]), Direction::Increasing);
        assert_eq!(direction(&[30.0, 20.0, 10.0]), Direction::Decreasing);
        // Slope 0.5 against a mean of 100.5 is under 1%.
        assert_eq!(direction(&[100.0, 100.5, 101.0]), Direction::Stable);
        assert_eq!(direction(&[0.0, 0.0]), Direction::Stable);
    }

    #[test]
    fn stats_round_once_from_bucket_means() {
        let t = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        let means = [10.005, 10.004];
        let points: Vec<TrendPoint> = means.iter().enumerate()
            .map(|(i, &mean)| TrendPoint { start: t + TimeDelta::hours(i as i64), value: round_half_away(mean, 2), count: 1 })
            .collect();
        assert_eq!(points[0].value, 10.01);
        assert_eq!(points[1].value, 10.0);

        // Averaging the rounded points would give 10.005, i.e. 10.01.
        let stats = summarize(&points, &means, 2);
        assert_eq!(stats.mean, 10.0);
        assert_eq!(stats.max, 10.01);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.peaks[0].start, t);
    }

    #[test]
    fn sample_standard_deviation() {
        assert_eq!(std_dev(&[5.0]), 0.0);
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.138089935).abs() < 1e-9);
    }
}
