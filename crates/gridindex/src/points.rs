use geo::{BoundingRect, MultiPolygon, Point, Rect};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::covers;

/// A point in the R-tree, associated with a row of the caller's point table by index.
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    xy: [f64; 2],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { AABB::from_point(self.xy) }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let (dx, dy) = (self.xy[0] - point[0], self.xy[1] - point[1]);
        dx * dx + dy * dy
    }
}

/// Static R-tree over a point table. Built once per table and shared read-only.
#[derive(Debug, Clone)]
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
    skipped: usize, // points with non-finite coordinates, never matched
}

impl PointIndex {
    /// Bulk-load an index from points; the position in `points` is the row index.
    pub fn new(points: &[Point<f64>]) -> Self {
        let entries = points.iter().enumerate()
            .filter(|(_, p)| p.x().is_finite() && p.y().is_finite())
            .map(|(idx, p)| IndexedPoint { idx, xy: [p.x(), p.y()] })
            .collect::<Vec<_>>();

        Self {
            skipped: points.len() - entries.len(),
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed points.
    #[inline] pub fn len(&self) -> usize { self.tree.size() }

    #[inline] pub fn is_empty(&self) -> bool { self.tree.size() == 0 }

    /// Number of input points left out of the index for having NaN/infinite coordinates.
    #[inline] pub fn skipped(&self) -> usize { self.skipped }

    /// Points whose coordinates fall inside `rect` (edges included), in unspecified order.
    pub fn candidates(&self, rect: &Rect<f64>) -> impl Iterator<Item = (usize, Point<f64>)> + '_ {
        let envelope = AABB::from_corners(rect.min().into(), rect.max().into());
        self.tree.locate_in_envelope(&envelope)
            .map(|entry| (entry.idx, Point::new(entry.xy[0], entry.xy[1])))
    }

    /// Row indices of all points within planar distance `radius` of `center` (inclusive), sorted ascending.
    pub fn within(&self, center: &Point<f64>, radius: f64) -> Vec<usize> {
        let mut hits = self.tree.locate_within_distance([center.x(), center.y()], radius * radius)
            .map(|entry| entry.idx)
            .collect::<Vec<_>>();
        hits.sort_unstable();
        hits
    }

    /// Row indices of all points covered by `shape`, sorted ascending.
    pub fn covered_by(&self, shape: &MultiPolygon<f64>) -> Vec<usize> {
        let Some(rect) = shape.bounding_rect() else { return Vec::new() };
        let mut hits = self.candidates(&rect)
            .filter(|(_, point)| covers(shape, point))
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        hits.sort_unstable();
        hits
    }
}
