use ahash::AHashMap;
use geo::{BoundingRect, Coord, MultiPolygon, Point, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::covers;

/// A bounding box in an R-tree, associated with a MultiPolygon by index.
#[derive(Debug, Clone)]
struct ShapeBox {
    idx: usize, // Index of corresponding MultiPolygon in shapes
    bbox: Rect<f64>,
}

impl RTreeObject for ShapeBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// A layer of MultiPolygons with an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub struct ShapeIndex {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<ShapeBox>,
}

impl ShapeIndex {
    /// Construct an index from a vector of MultiPolygons. Empty shapes are kept but never located.
    pub fn new(shapes: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(idx, shape)| shape.bounding_rect().map(|bbox| ShapeBox { idx, bbox }))
                    .collect()
            ),
            shapes,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no MultiPolygons.
    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Get a single MultiPolygon by index.
    #[inline] pub fn shape(&self, idx: usize) -> Option<&MultiPolygon<f64>> { self.shapes.get(idx) }

    /// Indices of every shape covering `point`, sorted ascending.
    /// More than one index comes back only for overlapping shapes or shared edges.
    pub fn locate(&self, point: &Point<f64>) -> Vec<usize> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        let mut hits = self.rtree.locate_in_envelope_intersecting(&envelope)
            .filter(|entry| covers(&self.shapes[entry.idx], point))
            .map(|entry| entry.idx)
            .collect::<Vec<_>>();
        hits.sort_unstable();
        hits
    }

    /// Group points by the shapes that cover them.
    /// A point on a shared edge is listed under every covering shape.
    pub fn assign(&self, points: impl IntoIterator<Item = (usize, Point<f64>)>) -> AHashMap<usize, Vec<usize>> {
        let mut groups: AHashMap<usize, Vec<usize>> = AHashMap::new();
        for (row, point) in points {
            for shape in self.locate(&point) {
                groups.entry(shape).or_default().push(row);
            }
        }
        groups
    }

    /// Compute the bounding rectangle of all MultiPolygons.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.shapes.iter()
            .filter_map(|shape| shape.bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            ))
    }
}
