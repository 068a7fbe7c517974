use serde::{ser::SerializeMap, Serialize, Serializer};
use smallvec::SmallVec;

use crate::{level::AdministrativeLevel, readings::MetricName};

/// One administrative unit's aggregated values, in request metric order.
///
/// Serializes as `{code, name, value}` when it carries a single metric and as
/// `{code, name, <metric>, ...}` otherwise; a metric with no data is `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRow {
    pub code: String,
    pub name: String,
    pub values: SmallVec<[(MetricName, Option<f64>); 2]>,
}

impl AggregationRow {
    /// The first (for single-metric rows, the only) value.
    pub fn value(&self) -> Option<f64> {
        self.values.first().and_then(|(_, value)| *value)
    }

    pub fn get(&self, metric: &MetricName) -> Option<f64> {
        self.values.iter().find(|(m, _)| m == metric).and_then(|(_, value)| *value)
    }
}

impl Serialize for AggregationRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.values.len()))?;
        map.serialize_entry("code", &self.code)?;
        map.serialize_entry("name", &self.name)?;
        match self.values.as_slice() {
            [(_, value)] => map.serialize_entry("value", value)?,
            values => {
                for (metric, value) in values {
                    map.serialize_entry(metric.as_str(), value)?;
                }
            }
        }
        map.end()
    }
}

/// Terminal state of a query, recorded alongside its (possibly empty) rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Rows,
    UnrecognizedLevel,
    NoMatchingBoundary,
    NoReadings,
}

/// Result of a query. An empty set is a valid, successful answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSet {
    pub level: AdministrativeLevel,
    pub metrics: Vec<MetricName>,
    pub rows: Vec<AggregationRow>,
    pub outcome: Outcome,
}

impl RowSet {
    pub fn empty(level: AdministrativeLevel, metrics: &[MetricName], outcome: Outcome) -> Self {
        Self { level, metrics: metrics.to_vec(), rows: Vec::new(), outcome }
    }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &AggregationRow> { self.rows.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smallvec::smallvec;

    #[test]
    fn single_metric_rows_use_value_key() {
        let row = AggregationRow {
            code: "D01".into(),
            name: "Lucknow".into(),
            values: smallvec![(MetricName::pm25(), Some(90.0))],
        };
        assert_eq!(serde_json::to_value(&row).unwrap(), json!({"code": "D01", "name": "Lucknow", "value": 90.0}));
        assert_eq!(row.value(), Some(90.0));
    }

    #[test]
    fn multi_metric_rows_use_metric_keys_and_null_gaps() {
        let row = AggregationRow {
            code: "D01".into(),
            name: "Lucknow".into(),
            values: smallvec![(MetricName::pm25(), Some(90.0)), (MetricName::new("no2"), None)],
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({"code": "D01", "name": "Lucknow", "pm25": 90.0, "no2": null})
        );
        assert_eq!(row.get(&MetricName::new("no2")), None);
        assert_eq!(row.get(&MetricName::pm25()), Some(90.0));
    }

    #[test]
    fn empty_sets_carry_their_outcome() {
        let set = RowSet::empty(AdministrativeLevel::Unknown, &[MetricName::pm25()], Outcome::UnrecognizedLevel);
        assert!(set.is_empty());
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["outcome"], "unrecognized_level");
        assert_eq!(json["rows"], json!([]));
    }
}
