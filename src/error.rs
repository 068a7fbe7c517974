//! Failure kinds surfaced to callers of the query layer.
//!
//! "No data" conditions (unrecognized level, absent code, zero matches) are not
//! errors: they come back as an empty `RowSet` with an explanatory `Outcome`.

use std::time::Duration;

use thiserror::Error;

use crate::geom::Crs;

#[derive(Debug, Error)]
pub enum QueryError {
    /// A boundary or reading store could not be read. Retryable at the caller's discretion.
    #[error("data source {source_id} unavailable: {reason}")]
    DataSourceUnavailable { source_id: String, reason: String },

    /// Boundary and point data disagree on (or do not declare) their reference system.
    #[error("geometry inconsistency: {0}")]
    GeometryInconsistency(String),

    /// A coordinate reference system this crate cannot transform.
    #[error("unsupported coordinate reference system {0}")]
    UnsupportedCrs(Crs),

    #[error("query cancelled")]
    Cancelled,

    #[error("query exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),

    /// A request that cannot be evaluated as stated (e.g. a comparison of fewer than two locations).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl QueryError {
    pub(crate) fn unavailable(source_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        QueryError::DataSourceUnavailable { source_id: source_id.into(), reason: reason.to_string() }
    }

    /// Build a `DataSourceUnavailable` from an `anyhow` chain, keeping every context layer.
    pub(crate) fn from_load(source_id: impl Into<String>, err: anyhow::Error) -> Self {
        QueryError::DataSourceUnavailable { source_id: source_id.into(), reason: format!("{err:#}") }
    }

    /// Whether retrying the same request against the same store may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::DataSourceUnavailable { .. } | QueryError::DeadlineExceeded(_))
    }

    /// Configuration defects that no retry will fix.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, QueryError::GeometryInconsistency(_) | QueryError::UnsupportedCrs(_))
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_and_configuration_kinds_are_disjoint() {
        let unavailable = QueryError::unavailable("boundaries/ward.geojson", "connection reset");
        assert!(unavailable.is_retryable());
        assert!(!unavailable.is_configuration_error());

        let crs = QueryError::GeometryInconsistency("ward layer is untagged".into());
        assert!(crs.is_configuration_error());
        assert!(!crs.is_retryable());

        assert!(QueryError::DeadlineExceeded(Duration::from_millis(5)).is_retryable());
        assert!(!QueryError::Cancelled.is_retryable());
        assert!(QueryError::UnsupportedCrs(Crs::Epsg(27700)).is_configuration_error());
    }

    #[test]
    fn load_errors_keep_context_chain() {
        let err = anyhow::anyhow!("file not found").context("reading boundaries/state.geojson");
        let QueryError::DataSourceUnavailable { source_id, reason } = QueryError::from_load("state", err) else {
            panic!("expected DataSourceUnavailable");
        };
        assert_eq!(source_id, "state");
        assert_eq!(reason, "reading boundaries/state.geojson: file not found");
    }
}
