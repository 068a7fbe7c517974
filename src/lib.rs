#![doc = "Airshed public API: hierarchical air-quality aggregation over administrative boundaries"]
mod aggregate;
pub mod analysis;
mod cancel;
mod config;
mod dispatch;
mod error;
mod geom;
mod io;
mod join;
mod level;
mod logging;
mod readings;
mod registry;
mod store;

#[doc(inline)]
pub use dispatch::{AggregationRow, JoinPlan, MetricSelector, Outcome, QueryEngine, QueryRequest, Route, RowSet, Stage};

#[doc(inline)]
pub use level::{normalize, AdministrativeLevel};

#[doc(inline)]
pub use registry::{BoundaryDataset, BoundaryRegistry};

#[doc(inline)]
pub use geom::{BoundaryLayer, BoundaryPolygon, Crs, CrsBinding, WGS84};

#[doc(inline)]
pub use readings::{MetricName, MetricTable, PointColumns, PointGrid, PointReading, PointSource, TimeFilter, TimeWindow};

#[doc(inline)]
pub use join::{find_contained_points, Matched};

#[doc(inline)]
pub use aggregate::{aggregate, round_half_away, AggregationPolicy, Statistic, DEFAULT_DECIMALS};

#[doc(inline)]
pub use store::{
    validate_store, DataStore, DiskStore, FileHash, GridSource, MemStore, ReadingSourceKind, ReadingSources,
    StoreManifest, TableSource,
};

#[doc(inline)]
pub use io::write_boundaries_geojson;

pub use cancel::Cancellation;
pub use config::EngineConfig;
pub use error::{QueryError, QueryResult};
pub use logging::init_logging;
