use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use crate::{error::{QueryError, QueryResult}, geom::Crs};

/// Build a PROJ.4 projection for a supported CRS.
fn build_proj(crs: Crs) -> QueryResult<Proj4> {
    let proj_string = crs.proj4().ok_or(QueryError::UnsupportedCrs(crs))?;
    Proj4::from_proj_string(&proj_string)
        .map_err(|e| QueryError::GeometryInconsistency(format!("failed to build PROJ.4 for {crs} ({proj_string}): {e}")))
}

/// Reproject shapes between two supported reference systems.
/// Geographic systems are in degrees on both ends (radians are handled here).
pub(crate) fn reproject(shapes: &[MultiPolygon<f64>], from: Crs, to: Crs) -> QueryResult<Vec<MultiPolygon<f64>>> {
    if from == to { return Ok(shapes.to_vec()) }

    let src = build_proj(from)?;
    let dst = build_proj(to)?;
    let (src_degrees, dst_degrees) = (from.is_geographic(), to.is_geographic());

    shapes.iter()
        .map(|shape| shape.try_map_coords(|coord: Coord<f64>| -> QueryResult<Coord<f64>> {
            let mut point = if src_degrees {
                (coord.x.to_radians(), coord.y.to_radians(), 0.0)
            } else {
                (coord.x, coord.y, 0.0)
            };
            transform(&src, &dst, &mut point)
                .map_err(|e| QueryError::GeometryInconsistency(
                    format!("CRS transform {from} -> {to} failed at ({}, {}): {e}", coord.x, coord.y)
                ))?;
            Ok(if dst_degrees {
                Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
            } else {
                Coord { x: point.0, y: point.1 }
            })
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::WGS84;
    use geo::{polygon, BoundingRect};

    const EARTH_RADIUS: f64 = 6_378_137.0;

    /// Spherical web-mercator forward projection, written out independently of PROJ.
    fn mercator(lon: f64, lat: f64) -> (f64, f64) {
        let x = EARTH_RADIUS * lon.to_radians();
        let y = EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }

    #[test]
    fn identity_is_a_copy() {
        let shape = MultiPolygon(vec![polygon![(x: 77.0, y: 28.0), (x: 78.0, y: 28.0), (x: 78.0, y: 29.0)]]);
        assert_eq!(reproject(std::slice::from_ref(&shape), WGS84, WGS84).unwrap(), vec![shape]);
    }

    #[test]
    fn mercator_square_lands_near_its_lon_lat_footprint() {
        let (x0, y0) = mercator(77.0, 28.0);
        let (x1, y1) = mercator(78.0, 29.0);
        let shape = MultiPolygon(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]]);

        let out = reproject(&[shape], Crs::Epsg(3857), WGS84).unwrap();
        let rect = out[0].bounding_rect().unwrap();

        // Longitudes are exact; latitudes may shift slightly with the sphere -> ellipsoid datum handling.
        assert!((rect.min().x - 77.0).abs() < 1e-6);
        assert!((rect.max().x - 78.0).abs() < 1e-6);
        assert!((rect.min().y - 28.0).abs() < 0.25);
        assert!((rect.max().y - 29.0).abs() < 0.25);
    }

    #[test]
    fn utm_round_trip_is_stable() {
        let shape = MultiPolygon(vec![polygon![(x: 75.5, y: 20.5), (x: 76.5, y: 20.5), (x: 76.0, y: 21.5)]]);
        let utm = reproject(std::slice::from_ref(&shape), WGS84, Crs::Epsg(32643)).unwrap();
        let back = reproject(&utm, Crs::Epsg(32643), WGS84).unwrap();

        for (a, b) in shape.0[0].exterior().coords().zip(back[0].0[0].exterior().coords()) {
            assert!((a.x - b.x).abs() < 1e-7 && (a.y - b.y).abs() < 1e-7, "{a:?} vs {b:?}");
        }
        // Projected coordinates are in metres, far from the degree range.
        assert!(utm[0].bounding_rect().unwrap().min().x > 1000.0);
    }

    #[test]
    fn unsupported_systems_are_rejected() {
        let shape = MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]]);
        assert!(matches!(
            reproject(std::slice::from_ref(&shape), Crs::Epsg(27700), WGS84),
            Err(QueryError::UnsupportedCrs(Crs::Epsg(27700)))
        ));
        assert!(matches!(
            reproject(&[shape], Crs::Unspecified, WGS84),
            Err(QueryError::UnsupportedCrs(Crs::Unspecified))
        ));
    }
}
