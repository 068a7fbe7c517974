use std::{path::Path, sync::Arc};

use anyhow::{anyhow, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{
    dbase::{FieldValue, Record},
    PolygonRing, Reader,
};
use tracing::warn;

use crate::{geom::{BoundaryLayer, Crs}, registry::BoundaryDataset};

/// Read a boundary layer from a `.shp` file and its `.dbf` attributes.
/// Shapefile layers are always untagged; the dataset binding supplies the reference system.
pub(crate) fn read_boundaries_shapefile(path: &Path, dataset: &BoundaryDataset) -> Result<BoundaryLayer> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp] Failed to open shapefile: {}", path.display()))?;

    let mut units = Vec::new();
    for (idx, result) in reader.iter_shapes_and_records_as::<shapefile::Polygon, Record>().enumerate() {
        let (shape, record) = result
            .with_context(|| format!("[io::shp] Error reading shape+record {idx} in {}", path.display()))?;
        let code = field_text(&record, &dataset.code_column)
            .ok_or_else(|| anyhow!("[io::shp] Record {idx} has no {} field", dataset.code_column))?;
        let name = field_text(&record, &dataset.name_column).unwrap_or_else(|| code.clone());

        let geometry = shp_to_geo(&shape);
        if geometry.0.is_empty() {
            warn!(level = %dataset.level, code = %code, "boundary record has no rings, skipping");
            continue;
        }
        units.push((Arc::<str>::from(code), Arc::<str>::from(name), geometry));
    }

    Ok(BoundaryLayer::new(dataset.level, Crs::Unspecified, units))
}

/// Get a record field as trimmed text; integral numbers keep their integer spelling.
fn field_text(record: &Record, field: &str) -> Option<String> {
    fn number(n: f64) -> String {
        if n.fract() == 0.0 && n.abs() < 1e15 { format!("{}", n as i64) } else { n.to_string() }
    }

    let text = match record.get(field)? {
        FieldValue::Character(Some(s)) => s.trim().to_string(),
        FieldValue::Numeric(Some(n)) => number(*n),
        FieldValue::Float(Some(n)) => number(*n as f64),
        FieldValue::Double(n) => number(*n),
        FieldValue::Integer(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Convert shapefile::Polygon to geo::MultiPolygon<f64>.
/// Each outer ring starts a polygon; inner rings attach to the outer ring before them.
fn shp_to_geo(p: &shapefile::Polygon) -> MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn closed(ring: &[shapefile::Point]) -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = ring.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect();
        if !coords.is_empty() && coords[0] != coords[coords.len() - 1] {
            coords.push(coords[0]);
        }
        LineString(coords)
    }

    let mut polys = Vec::new();
    let mut current: Option<(LineString<f64>, Vec<LineString<f64>>)> = None;

    for ring in p.rings() {
        match ring {
            PolygonRing::Outer(points) => {
                if let Some((exterior, holes)) = current.take() {
                    polys.push(Polygon::new(exterior, holes));
                }
                current = Some((closed(points), Vec::new()));
            }
            PolygonRing::Inner(points) => match current.as_mut() {
                Some((_, holes)) => holes.push(closed(points)),
                None => warn!("shapefile hole ring precedes any outer ring, dropping"),
            },
        }
    }
    if let Some((exterior, holes)) = current {
        polys.push(Polygon::new(exterior, holes));
    }

    MultiPolygon(polys)
}
