//! Reduction of matched readings to a single rounded value per metric.

use std::fmt;

use rust_decimal::{prelude::{FromPrimitive, ToPrimitive}, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{join::Matched, readings::MetricName};

/// Default number of decimal places in aggregated output.
pub const DEFAULT_DECIMALS: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    #[default]
    Mean,
    Max,
    Min,
    Count,
    Sum,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Max => "max",
            Statistic::Min => "min",
            Statistic::Count => "count",
            Statistic::Sum => "sum",
        }
    }

    /// Reduce present values; `None` when there are none.
    pub fn reduce(&self, values: impl IntoIterator<Item = f64>) -> Option<f64> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        if count == 0 {
            return None;
        }

        Some(match self {
            Statistic::Mean => sum / count as f64,
            Statistic::Max => max,
            Statistic::Min => min,
            Statistic::Count => count as f64,
            Statistic::Sum => sum,
        })
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistic plus output precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationPolicy {
    pub statistic: Statistic,
    pub decimals: u32,
}

impl Default for AggregationPolicy {
    fn default() -> Self { Self { statistic: Statistic::Mean, decimals: DEFAULT_DECIMALS } }
}

impl AggregationPolicy {
    /// Reduce then round once.
    pub fn apply(&self, values: impl IntoIterator<Item = f64>) -> Option<f64> {
        self.statistic.reduce(values).map(|value| round_half_away(value, self.decimals))
    }
}

/// Aggregate one metric over the matched rows. Missing values are skipped, not
/// counted as zero; with no present value the result is `None`.
pub fn aggregate(matched: &Matched<'_>, metric: &MetricName, policy: AggregationPolicy) -> Option<f64> {
    policy.apply(matched.values(metric).flatten())
}

/// Round half away from zero to `decimals` places.
///
/// Rounds the shortest decimal form of `value` (what `Display` prints), so 2.675
/// rounds to 2.68 even though its binary value is slightly below the midpoint.
pub fn round_half_away(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let decimal = value.to_string().parse::<Decimal>().ok()
        .or_else(|| Decimal::from_f64(value));

    match decimal.and_then(|d| d.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero).to_f64()) {
        Some(rounded) => rounded,
        // Beyond Decimal's range: plain f64 rounding (also half away from zero).
        None => {
            let scale = 10f64.powi(decimals as i32);
            (value * scale).round() / scale
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_half_away_from_zero_on_the_printed_value() {
        assert_eq!(round_half_away(2.675, 2), 2.68);
        assert_eq!(round_half_away(-0.125, 2), -0.13);
        assert_eq!(round_half_away(0.125, 2), 0.13);
        assert_eq!(round_half_away(1.005, 2), 1.01);
        assert_eq!(round_half_away(90.0, 2), 90.0);
        assert_eq!(round_half_away(2.5, 0), 3.0);
        assert_eq!(round_half_away(-2.5, 0), -3.0);
        assert!((round_half_away(1e300, 2) / 1e300 - 1.0).abs() < 1e-12);
        assert!(round_half_away(f64::NAN, 2).is_nan());
    }

    #[test]
    fn mean_is_rounded_once_after_reduction() {
        let policy = AggregationPolicy::default();
        assert_eq!(policy.apply([10.005, 10.015]), Some(10.01));
        assert_eq!(policy.apply([80.0, 90.0, 100.0]), Some(90.0));
        assert_eq!(policy.apply([1.0, 2.0]), Some(1.5));
        assert_eq!(AggregationPolicy { statistic: Statistic::Mean, decimals: 0 }.apply([1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn other_statistics() {
        let values = [4.0, 1.0, 2.5];
        assert_eq!(Statistic::Max.reduce(values), Some(4.0));
        assert_eq!(Statistic::Min.reduce(values), Some(1.0));
        assert_eq!(Statistic::Count.reduce(values), Some(3.0));
        assert_eq!(Statistic::Sum.reduce(values), Some(7.5));
        for statistic in [Statistic::Mean, Statistic::Max, Statistic::Min, Statistic::Count, Statistic::Sum] {
            assert_eq!(statistic.reduce(std::iter::empty()), None, "{statistic}");
        }
    }

    #[test]
    fn statistic_names_are_snake_case() {
        assert_eq!(serde_json::to_string(&Statistic::Mean).unwrap(), r#""mean""#);
        assert_eq!(serde_json::from_str::<Statistic>(r#""max""#).unwrap(), Statistic::Max);
        assert_eq!(Statistic::default(), Statistic::Mean);
    }
}
