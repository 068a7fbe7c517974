use serde::Serialize;
use tracing::debug;

use crate::{
    aggregate::{round_half_away, Statistic},
    analysis::category::{is_safe, is_unhealthy, Category},
    cancel::Cancellation,
    dispatch::{MetricSelector, QueryEngine, QueryRequest},
    error::{QueryError, QueryResult},
    readings::{MetricName, TimeWindow},
};

/// A resolved `(code, level)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub code: String,
    pub level: String,
}

impl Location {
    pub fn new(code: impl Into<String>, level: impl Into<String>) -> Self {
        Self { code: code.into(), level: level.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareRequest {
    pub locations: Vec<Location>,
    pub metric: MetricName,
    pub window: TimeWindow,
    pub statistic: Option<Statistic>,
}

impl CompareRequest {
    pub fn new(locations: impl IntoIterator<Item = Location>, metric: impl Into<MetricName>, window: TimeWindow) -> Self {
        Self { locations: locations.into_iter().collect(), metric: metric.into(), window, statistic: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    /// 1 is the cleanest.
    pub rank: usize,
    pub code: String,
    pub name: String,
    pub value: f64,
    pub category: Category,
    /// Percent above the best location's value (0 when the best value is not positive).
    pub relative_to_best: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spread {
    pub absolute: f64,
    /// Spread as a percent of the lowest value (0 when that value is not positive).
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub metric: MetricName,
    /// Ascending by value.
    pub rankings: Vec<Ranking>,
    /// Locations that produced no value (unknown level or code, or no readings).
    pub missing: Vec<Location>,
    pub spread: Option<Spread>,
    pub all_safe: bool,
    pub all_unhealthy: bool,
}

impl Comparison {
    pub fn best(&self) -> Option<&Ranking> { self.rankings.first() }

    pub fn worst(&self) -> Option<&Ranking> { self.rankings.last() }
}

/// Rank two or more locations on one metric, lowest (cleanest) first.
pub fn compare_locations(engine: &QueryEngine, request: &CompareRequest, cancel: &Cancellation) -> QueryResult<Comparison> {
    if request.locations.len() < 2 {
        return Err(QueryError::InvalidRequest(format!(
            "comparison needs at least 2 locations, got {}", request.locations.len()
        )));
    }
    let decimals = engine.config().decimals;
    let metric = &request.metric;

    let mut present = Vec::new();
    let mut missing = Vec::new();
    for location in &request.locations {
        let query = QueryRequest {
            code: location.code.clone(),
            level: Some(location.level.clone()),
            metric: MetricSelector::One(metric.clone()),
            window: request.window,
            statistic: request.statistic,
        };
        let rows = engine.query(&query, cancel)?;
        match rows.rows.first().and_then(|row| row.value().map(|value| (row, value))) {
            Some((row, value)) => present.push((row.code.clone(), row.name.clone(), value)),
            None => {
                debug!(code = %location.code, outcome = ?rows.outcome, "location has no value");
                missing.push(location.clone());
            }
        }
    }

    // Stable: equal values keep request order.
    present.sort_by(|a, b| a.2.total_cmp(&b.2));
    let best = present.first().map(|p| p.2);
    let rankings: Vec<Ranking> = present.into_iter()
        .enumerate()
        .map(|(idx, (code, name, value))| Ranking {
            rank: idx + 1,
            code,
            name,
            value,
            category: Category::for_metric(metric, value),
            relative_to_best: match best {
                Some(best) if best > 0.0 => round_half_away((value / best - 1.0) * 100.0, decimals),
                _ => 0.0,
            },
        })
        .collect();

    let spread = match (rankings.first(), rankings.last()) {
        (Some(low), Some(high)) => {
            let absolute = round_half_away(high.value - low.value, decimals);
            let percent = if low.value > 0.0 {
                round_half_away((high.value - low.value) / low.value * 100.0, decimals)
            } else {
                0.0
            };
            Some(Spread { absolute, percent })
        }
        _ => None,
    };
    let any = !rankings.is_empty();

    Ok(Comparison {
        metric: metric.clone(),
        all_safe: any && rankings.iter().all(|r| is_safe(metric, r.value)),
        all_unhealthy: any && rankings.iter().all(|r| is_unhealthy(metric, r.value)),
        rankings,
        missing,
        spread,
    })
}
