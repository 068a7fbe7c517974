mod frame;
mod grid;
mod metric;
mod reading;
mod source;
mod table;
mod window;

pub use grid::PointGrid;
pub use metric::MetricName;
pub use reading::PointReading;
pub use source::{PointColumns, PointSource};
pub use table::MetricTable;
pub use window::{TimeFilter, TimeWindow};
