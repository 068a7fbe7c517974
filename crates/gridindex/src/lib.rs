//! R-tree indexes for the two sides of a point-in-polygon join: a grid of
//! geolocated points and a layer of (multi)polygons.
//!
//! Containment is boundary-inclusive everywhere in this crate: a point lying
//! exactly on an edge or vertex counts as covered, so a point on the edge shared
//! by two adjacent polygons is covered by both of them.
mod points;
mod shapes;

pub use points::PointIndex;
pub use shapes::ShapeIndex;

use geo::{coordinate_position::{CoordPos, CoordinatePosition}, MultiPolygon, Point};

/// Boundary-inclusive point-in-polygon test. Points inside a hole are outside.
#[inline]
pub fn covers(shape: &MultiPolygon<f64>, point: &Point<f64>) -> bool {
    shape.coordinate_position(&point.0) != CoordPos::Outside
}
