use serde::{Deserialize, Serialize};

use crate::{geom::{Crs, CrsBinding, WGS84}, level::AdministrativeLevel};

/// Binding between an administrative level and its authoritative polygon table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryDataset {
    pub level: AdministrativeLevel,
    /// Store-relative identifier of the polygon source, e.g. "boundaries/district.geojson".
    pub source: String,
    pub code_column: String,
    pub name_column: String,
    pub crs: CrsBinding,
}

impl BoundaryDataset {
    pub fn new(level: AdministrativeLevel, source: impl Into<String>,
        code_column: impl Into<String>, name_column: impl Into<String>, crs: CrsBinding,
    ) -> Self {
        Self {
            level,
            source: source.into(),
            code_column: code_column.into(),
            name_column: name_column.into(),
            crs,
        }
    }

    /// Conventional layout: `boundaries/<level>.geojson` with `<level>_code` / `<level>_name` columns.
    /// Wards are stored untagged and stamped; the other levels are tagged.
    pub fn conventional(level: AdministrativeLevel, crs: Crs) -> Self {
        let tag = level.as_str();
        let binding = match level {
            AdministrativeLevel::Ward => CrsBinding::Stamp(crs),
            _ => CrsBinding::Tagged(crs),
        };
        Self::new(level, format!("boundaries/{tag}.geojson"), format!("{tag}_code"), format!("{tag}_name"), binding)
    }
}

impl Default for BoundaryDataset {
    fn default() -> Self { Self::conventional(AdministrativeLevel::State, WGS84) }
}
