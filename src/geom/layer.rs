use std::sync::Arc;

use ahash::AHashMap;
use geo::{MultiPolygon, Point};
use gridindex::ShapeIndex;
use tracing::{debug, warn};

use crate::{
    error::{QueryError, QueryResult},
    geom::{reproject, Crs, CrsBinding},
    level::AdministrativeLevel,
};

/// One administrative unit of a boundary layer, borrowed from the layer.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryPolygon<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub geometry: &'a MultiPolygon<f64>,
    pub crs: Crs,
}

/// All units of one administrative level, with an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub struct BoundaryLayer {
    level: AdministrativeLevel,
    crs: Crs,
    codes: Vec<Arc<str>>,
    names: Vec<Arc<str>>,
    index: AHashMap<Arc<str>, u32>, // Map between unit codes and per-layer contiguous indices.
    geoms: ShapeIndex,
}

impl BoundaryLayer {
    /// Build a layer from `(code, name, geometry)` rows. Codes are unique within a level:
    /// when a code repeats, the first row wins and the rest are dropped with a warning.
    pub fn new<C, N>(level: AdministrativeLevel, crs: Crs, units: impl IntoIterator<Item = (C, N, MultiPolygon<f64>)>) -> Self
    where
        C: Into<Arc<str>>,
        N: Into<Arc<str>>,
    {
        let mut codes = Vec::new();
        let mut names = Vec::new();
        let mut shapes = Vec::new();
        let mut index = AHashMap::new();

        for (code, name, geometry) in units {
            let code: Arc<str> = code.into();
            if index.contains_key(&code) {
                warn!(level = %level, code = %code, "duplicate boundary code, keeping first");
                continue;
            }
            index.insert(code.clone(), codes.len() as u32);
            codes.push(code);
            names.push(name.into());
            shapes.push(geometry);
        }

        Self { level, crs, codes, names, index, geoms: ShapeIndex::new(shapes) }
    }

    #[inline] pub fn level(&self) -> AdministrativeLevel { self.level }

    #[inline] pub fn crs(&self) -> Crs { self.crs }

    #[inline] pub fn len(&self) -> usize { self.codes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.codes.is_empty() }

    /// Get the unit at a per-layer index.
    pub fn get(&self, idx: usize) -> Option<BoundaryPolygon<'_>> {
        Some(BoundaryPolygon {
            code: self.codes.get(idx)?,
            name: &self.names[idx],
            geometry: self.geoms.shape(idx)?,
            crs: self.crs,
        })
    }

    /// Find the unit with the given code (exact match), if any.
    pub fn find(&self, code: &str) -> Option<BoundaryPolygon<'_>> {
        self.index.get(code).and_then(|&idx| self.get(idx as usize))
    }

    /// Iterate over all units in layer order.
    pub fn iter(&self) -> impl Iterator<Item = BoundaryPolygon<'_>> + '_ {
        (0..self.len()).filter_map(|idx| self.get(idx))
    }

    /// Units covering `point` (boundary-inclusive), in layer order.
    pub fn locate(&self, point: &Point<f64>) -> Vec<BoundaryPolygon<'_>> {
        self.geoms.locate(point).into_iter().filter_map(|idx| self.get(idx)).collect()
    }

    /// Bring the layer into the canonical reference system:
    /// check the stored tag against the dataset binding, stamp untagged layers, then reproject.
    pub fn conform(mut self, binding: CrsBinding, canonical: Crs) -> QueryResult<Self> {
        let effective = match (binding, self.crs) {
            (CrsBinding::Tagged(declared), Crs::Unspecified) => {
                return Err(QueryError::GeometryInconsistency(format!(
                    "{} boundaries carry no reference system, but the dataset declares {declared}", self.level
                )));
            }
            (CrsBinding::Stamp(assumed), Crs::Unspecified) => {
                debug!(level = %self.level, crs = %assumed, "stamping untagged boundaries");
                assumed
            }
            (binding, stored) if stored != binding.crs() => {
                return Err(QueryError::GeometryInconsistency(format!(
                    "{} boundaries are tagged {stored}, but the dataset declares {}", self.level, binding.crs()
                )));
            }
            (_, stored) => stored,
        };

        if effective != canonical {
            debug!(level = %self.level, from = %effective, to = %canonical, units = self.len(), "reprojecting boundaries");
            let shapes = reproject(self.geoms.shapes(), effective, canonical)?;
            self.geoms = ShapeIndex::new(shapes);
        }
        self.crs = canonical;
        Ok(self)
    }
}
