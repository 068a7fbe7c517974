mod crs;
mod layer;
mod proj;

pub use crs::{Crs, CrsBinding, WGS84};
pub use layer::{BoundaryLayer, BoundaryPolygon};
pub(crate) use proj::reproject;
