use anyhow::{bail, Result};

use crate::{
    error::{QueryError, QueryResult},
    geom::{Crs, WGS84},
    level::AdministrativeLevel,
    registry::BoundaryDataset,
};

/// Lookup table from canonical level to boundary dataset. Always holds exactly four entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryRegistry {
    state: BoundaryDataset,
    district: BoundaryDataset,
    sub_district: BoundaryDataset,
    ward: BoundaryDataset,
}

impl Default for BoundaryRegistry {
    fn default() -> Self { Self::conventional(WGS84) }
}

impl BoundaryRegistry {
    /// The conventional layout for every level (see `BoundaryDataset::conventional`).
    pub fn conventional(crs: Crs) -> Self {
        Self {
            state: BoundaryDataset::conventional(AdministrativeLevel::State, crs),
            district: BoundaryDataset::conventional(AdministrativeLevel::District, crs),
            sub_district: BoundaryDataset::conventional(AdministrativeLevel::SubDistrict, crs),
            ward: BoundaryDataset::conventional(AdministrativeLevel::Ward, crs),
        }
    }

    /// Build a registry from one dataset per canonical level.
    pub fn new(datasets: impl IntoIterator<Item = BoundaryDataset>) -> Result<Self> {
        let mut slots: [Option<BoundaryDataset>; 4] = Default::default();

        for dataset in datasets {
            let Some(slot) = AdministrativeLevel::ALL.iter().position(|&level| level == dataset.level) else {
                bail!("[registry] Boundary dataset {} has no canonical level", dataset.source);
            };
            if slots[slot].is_some() {
                bail!("[registry] More than one boundary dataset for level {}", dataset.level);
            }
            slots[slot] = Some(dataset);
        }

        let [state, district, sub_district, ward] = slots;
        let missing = |level: AdministrativeLevel| anyhow::anyhow!("[registry] Missing boundary dataset for level {level}");
        Ok(Self {
            state: state.ok_or_else(|| missing(AdministrativeLevel::State))?,
            district: district.ok_or_else(|| missing(AdministrativeLevel::District))?,
            sub_district: sub_district.ok_or_else(|| missing(AdministrativeLevel::SubDistrict))?,
            ward: ward.ok_or_else(|| missing(AdministrativeLevel::Ward))?,
        })
    }

    /// Dataset for a canonical level; `Unknown` has none.
    pub fn resolve(&self, level: AdministrativeLevel) -> Option<&BoundaryDataset> {
        match level {
            AdministrativeLevel::State => Some(&self.state),
            AdministrativeLevel::District => Some(&self.district),
            AdministrativeLevel::SubDistrict => Some(&self.sub_district),
            AdministrativeLevel::Ward => Some(&self.ward),
            AdministrativeLevel::Unknown => None,
        }
    }

    pub fn resolve_mut(&mut self, level: AdministrativeLevel) -> Option<&mut BoundaryDataset> {
        match level {
            AdministrativeLevel::State => Some(&mut self.state),
            AdministrativeLevel::District => Some(&mut self.district),
            AdministrativeLevel::SubDistrict => Some(&mut self.sub_district),
            AdministrativeLevel::Ward => Some(&mut self.ward),
            AdministrativeLevel::Unknown => None,
        }
    }

    /// Datasets in level order, coarsest first.
    pub fn iter(&self) -> impl Iterator<Item = &BoundaryDataset> {
        [&self.state, &self.district, &self.sub_district, &self.ward].into_iter()
    }

    /// Setup-time check that every dataset can be brought into `canonical`.
    pub fn validate(&self, canonical: Crs) -> QueryResult<()> {
        if !canonical.is_specified() {
            return Err(QueryError::GeometryInconsistency("canonical reference system is unspecified".into()));
        }
        if !canonical.is_supported() {
            return Err(QueryError::UnsupportedCrs(canonical));
        }

        for dataset in self.iter() {
            let declared = dataset.crs.crs();
            if !declared.is_specified() {
                return Err(QueryError::GeometryInconsistency(format!(
                    "{} dataset {} declares no reference system", dataset.level, dataset.source
                )));
            }
            if declared != canonical && !declared.is_supported() {
                return Err(QueryError::UnsupportedCrs(declared));
            }
            if dataset.code_column.is_empty() || dataset.name_column.is_empty() {
                return Err(QueryError::InvalidRequest(format!(
                    "{} dataset {} is missing its code/name column bindings", dataset.level, dataset.source
                )));
            }
        }
        Ok(())
    }
}
