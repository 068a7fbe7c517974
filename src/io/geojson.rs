use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::{geom::{BoundaryLayer, Crs}, registry::BoundaryDataset};

/// Read a boundary layer from GeoJSON FeatureCollection bytes.
/// The legacy `crs` member, when present, tags the layer; otherwise the layer is untagged.
pub(crate) fn read_boundaries_geojson(bytes: &[u8], dataset: &BoundaryDataset) -> Result<BoundaryLayer> {
    let value: Value = serde_json::from_slice(bytes).context("[io::geojson] Failed to parse GeoJSON bytes")?;
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("[io::geojson] Expected a FeatureCollection with a features array"))?;

    let crs = match value["crs"]["properties"]["name"].as_str() {
        Some(name) => name.parse::<Crs>().context("[io::geojson] Invalid crs member")?,
        None => Crs::Unspecified,
    };

    let mut units = Vec::with_capacity(features.len());
    for (idx, feature) in features.iter().enumerate() {
        let properties = &feature["properties"];
        let code = property_text(properties, &dataset.code_column)
            .ok_or_else(|| anyhow!("[io::geojson] Feature {idx} has no {} property", dataset.code_column))?;
        let name = property_text(properties, &dataset.name_column).unwrap_or_else(|| code.clone());

        let geometry = &feature["geometry"];
        if geometry.is_null() {
            warn!(level = %dataset.level, code = %code, "boundary feature has no geometry, skipping");
            continue;
        }
        let shape = parse_geometry(geometry).with_context(|| format!("[io::geojson] Feature {idx} ({code})"))?;
        units.push((Arc::<str>::from(code), Arc::<str>::from(name), shape));
    }

    Ok(BoundaryLayer::new(dataset.level, crs, units))
}

/// Write a boundary layer as GeoJSON bytes, with the layer's crs member when it has one.
pub fn write_boundaries_geojson(layer: &BoundaryLayer, dataset: &BoundaryDataset) -> Result<Vec<u8>> {
    let features: Vec<Value> = layer.iter().map(|unit| {
        let mut properties = Map::new();
        properties.insert(dataset.code_column.clone(), json!(unit.code));
        properties.insert(dataset.name_column.clone(), json!(unit.name));
        json!({
            "type": "Feature",
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": unit.geometry.0.iter().map(polygon_coords).collect::<Vec<_>>(),
            },
            "properties": properties,
        })
    }).collect();

    let mut collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    if layer.crs().is_specified() {
        collection["crs"] = json!({ "type": "name", "properties": { "name": layer.crs().to_string() } });
    }

    serde_json::to_vec(&collection).context("[io::geojson] Failed to serialize GeoJSON to bytes")
}

/// String form of a property; numeric codes keep their integer spelling.
fn property_text(properties: &Value, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.as_i64().map(|i| i.to_string()).unwrap_or_else(|| n.to_string())),
        _ => None,
    }
}

fn polygon_coords(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}

/// Parse a GeoJSON Polygon or MultiPolygon geometry object.
fn parse_geometry(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coords = geometry["coordinates"].as_array()
        .ok_or_else(|| anyhow!("geometry has no coordinates array"))?;
    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon(vec![parse_polygon(coords)?])),
        Some("MultiPolygon") => coords.iter()
            .map(|polygon| parse_polygon(polygon.as_array().ok_or_else(|| anyhow!("polygon is not an array"))?))
            .collect::<Result<Vec<_>>>()
            .map(MultiPolygon),
        Some(other) => bail!("unsupported boundary geometry type {other}"),
        None => bail!("geometry has no type"),
    }
}

/// Parse `[exterior, hole, hole, ...]` rings.
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        parse_ring(ring.as_array().ok_or_else(|| anyhow!("ring is not an array"))?)
    });
    let exterior = rings.next().ok_or_else(|| anyhow!("polygon has no exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse a ring of `[x, y]` positions, closing it if needed.
fn parse_ring(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter().map(|position| {
        let x = position[0].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
        let y = position[1].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
        Ok(Coord { x, y })
    }).collect::<Result<Vec<_>>>()?;

    // Ensure ring is closed (first point == last point)
    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }

    Ok(LineString(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geom::WGS84, level::AdministrativeLevel};
    use geo::Point;

    fn ward_dataset() -> BoundaryDataset {
        BoundaryDataset::conventional(AdministrativeLevel::Ward, WGS84)
    }

    const WARDS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "ward_code": 101, "ward_name": "Civil Lines" },
                "geometry": { "type": "Polygon", "coordinates": [
                    [[0, 0], [4, 0], [4, 4], [0, 4]],
                    [[1, 1], [2, 1], [2, 2], [1, 2], [1, 1]]
                ]}
            },
            {
                "type": "Feature",
                "properties": { "ward_code": "W102" },
                "geometry": { "type": "MultiPolygon", "coordinates": [
                    [[[10, 0], [11, 0], [11, 1], [10, 1], [10, 0]]],
                    [[[12, 0], [13, 0], [13, 1], [12, 1], [12, 0]]]
                ]}
            },
            { "type": "Feature", "properties": { "ward_code": "W103" }, "geometry": null }
        ]
    }"#;

    #[test]
    fn reads_polygons_multipolygons_and_untagged_crs() {
        let layer = read_boundaries_geojson(WARDS.as_bytes(), &ward_dataset()).unwrap();
        assert_eq!(layer.crs(), Crs::Unspecified);
        assert_eq!(layer.len(), 2);

        let first = layer.find("101").unwrap();
        assert_eq!(first.name, "Civil Lines");
        assert_eq!(first.geometry.0[0].interiors().len(), 1);
        assert!(first.geometry.0[0].exterior().is_closed());

        let second = layer.find("W102").unwrap();
        assert_eq!(second.name, "W102"); // falls back to the code
        assert_eq!(second.geometry.0.len(), 2);
        assert_eq!(layer.locate(&Point::new(12.5, 0.5))[0].code, "W102");
        assert!(layer.locate(&Point::new(1.5, 1.5)).is_empty()); // inside the hole
    }

    #[test]
    fn crs_member_tags_the_layer() {
        let tagged = WARDS.replacen("{", r#"{ "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32643" } },"#, 1);
        let layer = read_boundaries_geojson(tagged.as_bytes(), &ward_dataset()).unwrap();
        assert_eq!(layer.crs(), Crs::Epsg(32643));
    }

    #[test]
    fn missing_code_property_is_an_error() {
        let json = r#"{"type": "FeatureCollection", "features": [
            { "type": "Feature", "properties": { "name": "x" },
              "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1]]] } }
        ]}"#;
        assert!(read_boundaries_geojson(json.as_bytes(), &ward_dataset()).is_err());
        assert!(read_boundaries_geojson(b"{\"type\": \"Feature\"}", &ward_dataset()).is_err());
    }

    #[test]
    fn written_layers_read_back_identically() {
        let dataset = ward_dataset();
        let layer = read_boundaries_geojson(WARDS.as_bytes(), &dataset).unwrap()
            .conform(dataset.crs, WGS84).unwrap();
        let bytes = write_boundaries_geojson(&layer, &dataset).unwrap();
        let reread = read_boundaries_geojson(&bytes, &dataset).unwrap();

        assert_eq!(reread.crs(), WGS84);
        assert_eq!(reread.len(), layer.len());
        for (a, b) in layer.iter().zip(reread.iter()) {
            assert_eq!((a.code, a.name, a.geometry), (b.code, b.name, b.geometry));
        }
    }
}
