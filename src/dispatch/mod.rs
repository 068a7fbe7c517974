mod engine;
mod request;
mod rows;

pub use engine::{JoinPlan, QueryEngine, Route, Stage};
pub use request::{MetricSelector, QueryRequest};
pub(crate) use request::pm25_only;
pub use rows::{AggregationRow, Outcome, RowSet};
