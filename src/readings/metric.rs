use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Name of a numeric field carried by point readings, e.g. "pm25" or "no2".
/// Stored trimmed and lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MetricName(Arc<str>);

impl MetricName {
    pub const PM25: &'static str = "pm25";

    pub fn new(name: &str) -> Self { Self(Arc::from(name.trim().to_lowercase())) }

    pub fn pm25() -> Self { Self(Arc::from(Self::PM25)) }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for MetricName {
    fn from(name: &str) -> Self { Self::new(name) }
}

impl From<String> for MetricName {
    fn from(name: String) -> Self { Self::new(&name) }
}

impl From<MetricName> for String {
    fn from(metric: MetricName) -> Self { metric.0.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_and_space_insensitive() {
        assert_eq!(MetricName::new(" PM25 "), MetricName::pm25());
        assert_eq!(MetricName::from("NO2").as_str(), "no2");
        let parsed: MetricName = serde_json::from_str(r#""SO2""#).unwrap();
        assert_eq!(parsed.to_string(), "so2");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#""so2""#);
    }
}
