use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geo::Point;
use gridindex::PointIndex;
use serde::Serialize;
use tracing::debug;

use crate::{
    aggregate::{round_half_away, Statistic},
    analysis::{category::{hotspot_threshold, Category}, resolve_unit},
    cancel::Cancellation,
    dispatch::{Outcome, QueryEngine},
    error::{QueryError, QueryResult},
    join::find_contained_points,
    level::AdministrativeLevel,
    readings::{MetricName, TimeWindow},
};

pub const DEFAULT_LIMIT: usize = 20;

/// Hotspots within this many degrees of each other share a cluster (about 11 km at the equator).
pub const DEFAULT_CLUSTER_RADIUS: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct HotspotRequest {
    pub metric: MetricName,
    pub window: TimeWindow,
    /// Restrict the search to one unit, as `(code, level text)`.
    pub region: Option<(String, String)>,
    /// Defaults to the metric's hotspot threshold.
    pub threshold: Option<f64>,
    /// Defaults to `DEFAULT_LIMIT`.
    pub limit: Option<usize>,
    /// Level whose unit each hotspot is tagged with.
    pub tag_level: AdministrativeLevel,
    /// Linking distance between clustered hotspots, in degrees.
    pub cluster_radius: f64,
}

impl HotspotRequest {
    pub fn new(metric: impl Into<MetricName>, window: TimeWindow) -> Self {
        Self {
            metric: metric.into(),
            window,
            region: None,
            threshold: None,
            limit: None,
            tag_level: AdministrativeLevel::District,
            cluster_radius: DEFAULT_CLUSTER_RADIUS,
        }
    }

    pub fn within(mut self, code: impl Into<String>, level: impl Into<String>) -> Self {
        self.region = Some((code.into(), level.into()));
        self
    }
}

/// Unit a hotspot falls in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRef {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hotspot {
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
    pub severity: Category,
    pub unit: Option<UnitRef>,
}

/// Hotspots chained together by the cluster radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotCluster {
    /// 1-based; cluster 1 holds the highest hotspot.
    pub cluster_id: usize,
    /// Positions in `HotspotReport::hotspots`, ascending.
    pub hotspots: Vec<usize>,
    pub center_lon: f64,
    pub center_lat: f64,
    pub max_value: f64,
    pub avg_value: f64,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotSummary {
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub severity_distribution: BTreeMap<Category, usize>,
    pub clusters_found: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotReport {
    pub metric: MetricName,
    pub threshold: f64,
    pub region: Option<String>,
    /// Highest value first.
    pub hotspots: Vec<Hotspot>,
    pub clusters: Vec<HotspotCluster>,
    pub summary: Option<HotspotSummary>,
    pub outcome: Outcome,
}

impl HotspotReport {
    fn empty(request: &HotspotRequest, threshold: f64, outcome: Outcome) -> Self {
        Self {
            metric: request.metric.clone(),
            threshold,
            region: request.region.as_ref().map(|(code, _)| code.clone()),
            hotspots: Vec::new(),
            clusters: Vec::new(),
            summary: None,
            outcome,
        }
    }
}

/// Readings strictly above the threshold, ranked by value, each tagged with its severity and unit.
pub fn find_hotspots(engine: &QueryEngine, request: &HotspotRequest, cancel: &Cancellation) -> QueryResult<HotspotReport> {
    let threshold = request.threshold.unwrap_or_else(|| hotspot_threshold(&request.metric));
    if !threshold.is_finite() {
        return Err(QueryError::InvalidRequest(format!("hotspot threshold {threshold} is not a number")));
    }
    if !(request.cluster_radius.is_finite() && request.cluster_radius >= 0.0) {
        return Err(QueryError::InvalidRequest(format!("cluster radius {} must be a non-negative number", request.cluster_radius)));
    }
    let limit = request.limit.unwrap_or(DEFAULT_LIMIT);
    let cancel = cancel.child(engine.config().query_timeout);

    let source = engine.readings(engine.reading_kind(std::slice::from_ref(&request.metric)))?;
    let rows: Vec<usize> = match &request.region {
        Some((code, level)) => {
            let layer = match resolve_unit(engine, code, Some(level))? {
                Ok(layer) => layer,
                Err(outcome) => return Ok(HotspotReport::empty(request, threshold, outcome)),
            };
            let Some(unit) = layer.find(code) else {
                return Ok(HotspotReport::empty(request, threshold, Outcome::NoMatchingBoundary));
            };
            find_contained_points(&unit, source.as_ref(), &request.window, &cancel)?.rows().to_vec()
        }
        None => {
            let columns = source.columns();
            match request.window.resolve(columns.batches()) {
                Some(filter) => (0..columns.len()).filter(|&row| filter.contains(columns.observed_at(row))).collect(),
                None => Vec::new(),
            }
        }
    };
    cancel.check()?;

    let mut above: Vec<(usize, f64)> = rows.into_iter()
        .filter_map(|row| source.value(row, &request.metric).map(|value| (row, value)))
        .filter(|&(_, value)| value > threshold)
        .collect();
    above.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    above.truncate(limit);
    debug!(metric = %request.metric, threshold, found = above.len(), "hotspots");

    if above.is_empty() {
        return Ok(HotspotReport::empty(request, threshold, Outcome::NoReadings));
    }

    let tags = engine.boundaries(request.tag_level)?;
    let columns = source.columns();
    let hotspots: Vec<Hotspot> = above.iter()
        .map(|&(row, value)| {
            let location = columns.location(row);
            let unit = tags.as_ref()
                .and_then(|layer| layer.locate(&location).first().map(|unit| UnitRef {
                    code: unit.code.to_string(),
                    name: unit.name.to_string(),
                }));
            Hotspot {
                lon: location.x(),
                lat: location.y(),
                value,
                observed_at: columns.observed_at(row),
                severity: Category::for_metric(&request.metric, value),
                unit,
            }
        })
        .collect();

    let decimals = engine.config().decimals;
    let values = || hotspots.iter().map(|h| h.value);
    let mut severity_distribution = BTreeMap::new();
    for hotspot in &hotspots {
        *severity_distribution.entry(hotspot.severity).or_insert(0) += 1;
    }
    let clusters = cluster(&hotspots, request.cluster_radius, decimals);
    debug!(metric = %request.metric, clusters = clusters.len(), radius = request.cluster_radius, "clustered hotspots");
    let summary = HotspotSummary {
        count: hotspots.len(),
        mean: Statistic::Mean.reduce(values()).map_or(0.0, |v| round_half_away(v, decimals)),
        max: Statistic::Max.reduce(values()).unwrap_or(0.0),
        severity_distribution,
        clusters_found: clusters.len(),
    };

    Ok(HotspotReport {
        metric: request.metric.clone(),
        threshold,
        region: request.region.as_ref().map(|(code, _)| code.clone()),
        hotspots,
        clusters,
        summary: Some(summary),
        outcome: Outcome::Rows,
    })
}

/// Group ranked hotspots into clusters: two hotspots within `radius` of each other share one,
/// and so do chains of such neighbours. Every hotspot lands in exactly one cluster.
fn cluster(hotspots: &[Hotspot], radius: f64, decimals: u32) -> Vec<HotspotCluster> {
    let points: Vec<Point<f64>> = hotspots.iter().map(|h| Point::new(h.lon, h.lat)).collect();
    let index = PointIndex::new(&points);
    let mut assigned: Vec<Option<usize>> = vec![None; hotspots.len()];
    let mut clusters = Vec::new();

    // Seeds are visited in rank order so cluster ids follow the highest member.
    for seed in 0..hotspots.len() {
        if assigned[seed].is_some() {
            continue;
        }
        let cluster_id = clusters.len() + 1;
        assigned[seed] = Some(cluster_id);
        let mut members = vec![seed];
        let mut frontier = vec![seed];
        while let Some(current) = frontier.pop() {
            for neighbour in index.within(&points[current], radius) {
                if assigned[neighbour].is_none() {
                    assigned[neighbour] = Some(cluster_id);
                    members.push(neighbour);
                    frontier.push(neighbour);
                }
            }
        }
        members.sort_unstable();

        let size = members.len() as f64;
        let values = || members.iter().map(|&i| hotspots[i].value);
        clusters.push(HotspotCluster {
            cluster_id,
            center_lon: members.iter().map(|&i| hotspots[i].lon).sum::<f64>() / size,
            center_lat: members.iter().map(|&i| hotspots[i].lat).sum::<f64>() / size,
            max_value: Statistic::Max.reduce(values()).unwrap_or(0.0),
            avg_value: Statistic::Mean.reduce(values()).map_or(0.0, |v| round_half_away(v, decimals)),
            size: members.len(),
            hotspots: members,
        });
    }
    clusters
}
