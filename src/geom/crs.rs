use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Coordinate reference system tag attached to a geometry layer or point table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Crs {
    Epsg(u32),
    /// Geometry stored without a reference system tag.
    Unspecified,
}

/// Unprojected WGS84 lon/lat, the canonical system for boundaries and readings.
pub const WGS84: Crs = Crs::Epsg(4326);

impl Crs {
    #[inline]
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Unspecified => None,
        }
    }

    #[inline] pub fn is_specified(&self) -> bool { *self != Crs::Unspecified }

    /// Lon/lat systems take and return degrees; everything else is in metres.
    #[inline]
    pub fn is_geographic(&self) -> bool { matches!(self, Crs::Epsg(4326 | 4269)) }

    /// Whether `reproject` can transform into or out of this system.
    #[inline] pub fn is_supported(&self) -> bool { self.proj4().is_some() }

    /// PROJ.4 definition for the supported subset of EPSG codes.
    pub(crate) fn proj4(&self) -> Option<String> {
        let code = self.epsg()?;
        let proj = match code {
            4326 => "+proj=longlat +datum=WGS84 +no_defs +type=crs".to_string(),
            4269 => "+proj=longlat +datum=NAD83 +no_defs +type=crs".to_string(),
            3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs".to_string(),
            32601..=32660 => format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs +type=crs", code - 32600),
            32701..=32760 => format!("+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs +type=crs", code - 32700),
            _ => return None,
        };
        Some(proj)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{code}"),
            Crs::Unspecified => f.write_str("unspecified"),
        }
    }
}

impl FromStr for Crs {
    type Err = anyhow::Error;

    /// Accepts `EPSG:4326`, the OGC URN forms found in GeoJSON `crs` members, and `unspecified`.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let lower = text.to_ascii_lowercase();
        if lower.is_empty() || lower == "unspecified" {
            return Ok(Crs::Unspecified);
        }
        if lower == "urn:ogc:def:crs:ogc:1.3:crs84" || lower == "crs84" {
            return Ok(WGS84);
        }

        let code = lower.strip_prefix("epsg:")
            .or_else(|| lower.strip_prefix("urn:ogc:def:crs:epsg::"))
            .or_else(|| lower.strip_prefix("urn:ogc:def:crs:epsg:"))
            .ok_or_else(|| anyhow!("Unknown CRS: {text}. Expected 'EPSG:<code>' or 'unspecified'"))?;
        // Versioned URNs look like "urn:ogc:def:crs:EPSG:6.6:4326".
        let code = code.rsplit(':').next().unwrap_or(code);

        code.parse::<u32>()
            .map(Crs::Epsg)
            .map_err(|_| anyhow!("Invalid EPSG code in CRS: {text}"))
    }
}

impl TryFrom<String> for Crs {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self { crs.to_string() }
}

/// How a boundary dataset's stored polygons relate to a reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrsBinding {
    /// Polygons carry this tag; an untagged or differently-tagged layer is an error.
    Tagged(Crs),
    /// Polygons arrive untagged and are stamped with this system at query time.
    Stamp(Crs),
}

impl CrsBinding {
    #[inline]
    pub fn crs(&self) -> Crs {
        match self {
            CrsBinding::Tagged(crs) | CrsBinding::Stamp(crs) => *crs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_epsg_and_urn_forms() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), WGS84);
        assert_eq!("epsg:3857".parse::<Crs>().unwrap(), Crs::Epsg(3857));
        assert_eq!("urn:ogc:def:crs:EPSG::32643".parse::<Crs>().unwrap(), Crs::Epsg(32643));
        assert_eq!("urn:ogc:def:crs:EPSG:6.6:4269".parse::<Crs>().unwrap(), Crs::Epsg(4269));
        assert_eq!("urn:ogc:def:crs:OGC:1.3:CRS84".parse::<Crs>().unwrap(), WGS84);
        assert_eq!("unspecified".parse::<Crs>().unwrap(), Crs::Unspecified);
        assert!("EPSG:abc".parse::<Crs>().is_err());
        assert!("WGS84".parse::<Crs>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for crs in [WGS84, Crs::Epsg(32643), Crs::Unspecified] {
            assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
        }
    }

    #[test]
    fn supported_subset() {
        assert!(WGS84.is_supported() && WGS84.is_geographic());
        assert!(Crs::Epsg(3857).is_supported() && !Crs::Epsg(3857).is_geographic());
        assert!(Crs::Epsg(32643).proj4().unwrap().contains("+zone=43"));
        assert!(Crs::Epsg(32755).proj4().unwrap().contains("+zone=55 +south"));
        assert!(!Crs::Epsg(27700).is_supported());
        assert!(!Crs::Unspecified.is_supported());
    }

    #[test]
    fn binding_serializes_as_tagged_string() {
        let json = serde_json::to_string(&CrsBinding::Stamp(WGS84)).unwrap();
        assert_eq!(json, r#"{"stamp":"EPSG:4326"}"#);
        let parsed: CrsBinding = serde_json::from_str(r#"{"tagged":"EPSG:4269"}"#).unwrap();
        assert_eq!(parsed, CrsBinding::Tagged(Crs::Epsg(4269)));
        assert_eq!(parsed.crs(), Crs::Epsg(4269));
    }
}
