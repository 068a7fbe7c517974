mod dataset;
mod registry;

pub use dataset::BoundaryDataset;
pub use registry::BoundaryRegistry;
