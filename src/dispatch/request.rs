use smallvec::SmallVec;

use crate::{aggregate::Statistic, readings::{MetricName, TimeWindow}};

/// One metric, or several reported side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricSelector {
    One(MetricName),
    Many(SmallVec<[MetricName; 4]>),
}

impl MetricSelector {
    pub fn one(metric: impl Into<MetricName>) -> Self { MetricSelector::One(metric.into()) }

    /// Several metrics; repeats are dropped, first occurrence wins.
    pub fn many<M: Into<MetricName>>(metrics: impl IntoIterator<Item = M>) -> Self {
        let mut unique: SmallVec<[MetricName; 4]> = SmallVec::new();
        for metric in metrics {
            let metric = metric.into();
            if !unique.contains(&metric) {
                unique.push(metric);
            }
        }
        MetricSelector::Many(unique)
    }

    pub fn metrics(&self) -> &[MetricName] {
        match self {
            MetricSelector::One(metric) => std::slice::from_ref(metric),
            MetricSelector::Many(metrics) => metrics,
        }
    }

    /// Whether the request names PM2.5 and nothing else.
    pub fn is_pm25_only(&self) -> bool { pm25_only(self.metrics()) }
}

/// Whether `metrics` is exactly PM2.5.
pub(crate) fn pm25_only(metrics: &[MetricName]) -> bool {
    matches!(metrics, [metric] if metric.as_str() == MetricName::PM25)
}

impl From<&str> for MetricSelector {
    fn from(metric: &str) -> Self { MetricSelector::one(metric) }
}

impl From<MetricName> for MetricSelector {
    fn from(metric: MetricName) -> Self { MetricSelector::One(metric) }
}

/// An already-resolved `(code, level, metric)` triple plus the time window to aggregate over.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub code: String,
    /// Free-form level text; `None` is treated like any unrecognized level.
    pub level: Option<String>,
    pub metric: MetricSelector,
    pub window: TimeWindow,
    /// Falls back to the engine's configured statistic.
    pub statistic: Option<Statistic>,
}

impl QueryRequest {
    pub fn new(code: impl Into<String>, level: impl Into<String>, metric: impl Into<MetricSelector>, window: TimeWindow) -> Self {
        Self {
            code: code.into(),
            level: Some(level.into()),
            metric: metric.into(),
            window,
            statistic: None,
        }
    }

    pub fn with_statistic(mut self, statistic: Statistic) -> Self {
        self.statistic = Some(statistic);
        self
    }
}
