//! Conversions from Polars DataFrames into point sources.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use geo::Point;
use polars::{frame::DataFrame, prelude::DataType};

use crate::{
    geom::Crs,
    readings::{MetricName, MetricTable, PointColumns, PointGrid},
};

/// Columns that locate a reading rather than measure something.
const RESERVED: [&str; 3] = ["lon", "lat", "observed_at"];

/// Parse an observation timestamp: RFC 3339, or a naive "YYYY-MM-DD HH:MM:SS" taken as UTC.
fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .map(|t| t.and_utc())
        .with_context(|| format!("[readings::frame] Invalid timestamp {text:?}"))
}

/// Read a column as f64 values, null where missing.
fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)
        .with_context(|| format!("[readings::frame] Missing column {name}"))?
        .cast(&DataType::Float64)
        .with_context(|| format!("[readings::frame] Column {name} is not numeric"))?;
    Ok(column.f64()?.into_iter().collect())
}

/// Extract the location and timestamp columns.
fn point_columns(df: &DataFrame) -> Result<PointColumns> {
    let lon = float_column(df, "lon")?;
    let lat = float_column(df, "lat")?;
    let locations = lon.into_iter().zip(lat)
        .enumerate()
        .map(|(row, (x, y))| match (x, y) {
            (Some(x), Some(y)) => Ok(Point::new(x, y)),
            _ => Err(anyhow!("[readings::frame] Row {row} has no coordinates")),
        })
        .collect::<Result<Vec<_>>>()?;

    let time = df.column("observed_at").context("[readings::frame] Missing column observed_at")?;
    let observed_at = if *time.dtype() == DataType::String {
        time.str()?.into_iter()
            .enumerate()
            .map(|(row, text)| parse_timestamp(text.ok_or_else(|| anyhow!("[readings::frame] Row {row} has no timestamp"))?))
            .collect::<Result<Vec<_>>>()?
    } else {
        // Integer timestamps are epoch milliseconds.
        time.cast(&DataType::Int64)?.i64()?.into_iter()
            .enumerate()
            .map(|(row, millis)| millis
                .and_then(DateTime::from_timestamp_millis)
                .ok_or_else(|| anyhow!("[readings::frame] Row {row} has no valid timestamp")))
            .collect::<Result<Vec<_>>>()?
    };

    PointColumns::new(locations, observed_at)
}

impl MetricTable {
    /// Build a table from `lon, lat, observed_at` plus one numeric column per metric.
    /// String-typed columns other than the reserved ones are ignored.
    pub fn from_dataframe(df: &DataFrame, crs: Crs) -> Result<Self> {
        let columns = point_columns(df)?;
        let metric_columns = df.get_columns().iter()
            .map(|column| column.name().as_str())
            .filter(|name| !RESERVED.contains(name))
            .filter(|name| df.column(name).map(|c| *c.dtype() != DataType::String).unwrap_or(false))
            .map(|name| Ok((MetricName::new(name), float_column(df, name)?)))
            .collect::<Result<Vec<_>>>()?;

        if metric_columns.is_empty() {
            bail!("[readings::frame] Reading table has no metric columns");
        }
        MetricTable::new(crs, columns, metric_columns)
    }
}

impl PointGrid {
    /// Build a fixed-metric grid from `lon, lat, observed_at` and the column named after `metric`.
    pub fn from_dataframe(df: &DataFrame, metric: MetricName, crs: Crs) -> Result<Self> {
        let columns = point_columns(df)?;
        let name = df.get_columns().iter()
            .map(|column| column.name().as_str())
            .find(|name| MetricName::new(name) == metric)
            .ok_or_else(|| anyhow!("[readings::frame] Grid has no {metric} column"))?;
        let values = float_column(df, name)?;
        PointGrid::new(metric, crs, columns, values)
    }
}
