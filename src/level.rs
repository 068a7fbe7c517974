use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical administrative granularity, from the coarsest (state) to the finest (ward).
/// `Unknown` is the outcome of normalizing a level string that matches no synonym set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdministrativeLevel {
    State,          // Highest-level unit
    District,       // District -> State
    SubDistrict,    // Sub-district (taluk/tehsil) -> District
    Ward,           // Lowest-level unit
    Unknown,
}

impl AdministrativeLevel {
    /// The four levels backed by a boundary dataset, coarsest first.
    pub const ALL: [AdministrativeLevel; 4] = [
        AdministrativeLevel::State,
        AdministrativeLevel::District,
        AdministrativeLevel::SubDistrict,
        AdministrativeLevel::Ward,
    ];

    /// Canonical tag used in manifests, logs and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdministrativeLevel::State => "state",
            AdministrativeLevel::District => "district",
            AdministrativeLevel::SubDistrict => "sub_district",
            AdministrativeLevel::Ward => "ward",
            AdministrativeLevel::Unknown => "unknown",
        }
    }

    #[inline] pub fn is_known(&self) -> bool { *self != AdministrativeLevel::Unknown }

    /// Normalize optional (possibly null) level text.
    pub fn from_text(text: Option<&str>) -> Self {
        text.map_or(AdministrativeLevel::Unknown, normalize)
    }
}

impl fmt::Display for AdministrativeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonicalize a free-form level string. Never fails: unmatched input is `Unknown`.
pub fn normalize(level_text: &str) -> AdministrativeLevel {
    match level_text.trim().to_lowercase().as_str() {
        "state" | "st" => AdministrativeLevel::State,
        "district" | "dist" => AdministrativeLevel::District,
        "sub_district" | "subdistrict" | "sub-dist" | "taluk" | "tehsil" => AdministrativeLevel::SubDistrict,
        "ward" => AdministrativeLevel::Ward,
        _ => AdministrativeLevel::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_share_a_canonical_level() {
        for text in ["district", "dist", "District", " district ", "DIST\t"] {
            assert_eq!(normalize(text), AdministrativeLevel::District, "{text:?}");
        }
        for text in ["sub_district", "subdistrict", "sub-dist", "Taluk", " TEHSIL"] {
            assert_eq!(normalize(text), AdministrativeLevel::SubDistrict, "{text:?}");
        }
        for text in ["state", "ST", " State"] {
            assert_eq!(normalize(text), AdministrativeLevel::State, "{text:?}");
        }
        assert_eq!(normalize("Ward "), AdministrativeLevel::Ward);
    }

    #[test]
    fn unrecognized_text_is_unknown() {
        for text in ["", "   ", "province", "city", "district_hq", "sub district", "wards"] {
            assert_eq!(normalize(text), AdministrativeLevel::Unknown, "{text:?}");
        }
        assert_eq!(AdministrativeLevel::from_text(None), AdministrativeLevel::Unknown);
        assert_eq!(AdministrativeLevel::from_text(Some("tehsil")), AdministrativeLevel::SubDistrict);
    }

    #[test]
    fn canonical_tags_round_trip() {
        for level in AdministrativeLevel::ALL {
            assert!(level.is_known());
            assert_eq!(normalize(level.as_str()), level);
            assert_eq!(level.to_string(), level.as_str());
        }
        assert!(!AdministrativeLevel::Unknown.is_known());
    }
}
