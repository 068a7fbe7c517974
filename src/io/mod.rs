//! IO module for format-specific reading and writing operations.
//!
//! # Format Modules
//!
//! - `geojson` - GeoJSON FeatureCollections of administrative boundaries
//! - `shp` - ESRI shapefile boundaries with dBase attributes
//! - `csv` - CSV tables of point readings
//! - `hash` - SHA-256 digests for store manifests

mod csv;
mod geojson;
mod hash;
mod shp;

pub(crate) use csv::read_csv;
pub(crate) use geojson::read_boundaries_geojson;
pub use geojson::write_boundaries_geojson;
pub(crate) use hash::sha256_file;
pub(crate) use shp::read_boundaries_shapefile;
