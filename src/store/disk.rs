use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use ahash::AHashMap;
use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::{
    error::{QueryError, QueryResult},
    geom::BoundaryLayer,
    io::{read_boundaries_geojson, read_boundaries_shapefile, read_csv},
    readings::{MetricTable, PointGrid, PointSource},
    registry::{BoundaryDataset, BoundaryRegistry},
    store::{manifest::MANIFEST, DataStore, ReadingSourceKind, StoreManifest},
};

/// Store rooted at a directory holding `manifest.json`, boundary files and reading CSVs.
/// Reading tables are parsed on first use and held as a read-only snapshot. Boundary files are parsed
/// each time they are asked for; `QueryEngine` keeps the conformed layers.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    manifest: StoreManifest,
    readings: RwLock<AHashMap<ReadingSourceKind, Arc<dyn PointSource>>>,
}

impl DiskStore {
    /// Open a store by reading its manifest.
    pub fn open(root: impl Into<PathBuf>) -> QueryResult<Self> {
        let root = root.into();
        let manifest = StoreManifest::read(&root).map_err(|e| QueryError::from_load(MANIFEST, e))?;
        info!(store = %manifest.store_id, root = %root.display(), "opened store");
        Ok(Self { root, manifest, readings: RwLock::new(AHashMap::new()) })
    }

    #[inline] pub fn root(&self) -> &Path { &self.root }

    #[inline] pub fn manifest(&self) -> &StoreManifest { &self.manifest }

    /// Registry built from the manifest's boundary datasets.
    pub fn registry(&self) -> QueryResult<BoundaryRegistry> {
        BoundaryRegistry::new(self.manifest.boundaries.iter().cloned())
            .map_err(|e| QueryError::from_load(MANIFEST, e))
    }

    fn full(&self, rel: &str) -> PathBuf { self.root.join(rel) }

    fn load_boundaries(&self, dataset: &BoundaryDataset) -> Result<BoundaryLayer> {
        let path = self.full(&dataset.source);
        let is_shapefile = path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"));
        if is_shapefile {
            read_boundaries_shapefile(&path, dataset)
        } else {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            read_boundaries_geojson(&bytes, dataset)
        }
    }

    fn load_readings(&self, kind: ReadingSourceKind) -> Result<Option<Arc<dyn PointSource>>> {
        let sources = &self.manifest.readings;
        Ok(match kind {
            ReadingSourceKind::FixedGrid => match &sources.grid {
                Some(grid) => {
                    let df = read_csv(&self.full(&grid.source))?;
                    Some(Arc::new(PointGrid::from_dataframe(&df, grid.metric.clone(), grid.crs)?) as Arc<dyn PointSource>)
                }
                None => None,
            },
            ReadingSourceKind::MetricTable => match &sources.table {
                Some(table) => {
                    let df = read_csv(&self.full(&table.source))?;
                    Some(Arc::new(MetricTable::from_dataframe(&df, table.crs)?) as Arc<dyn PointSource>)
                }
                None => None,
            },
        })
    }
}

impl DataStore for DiskStore {
    fn boundaries(&self, dataset: &BoundaryDataset) -> QueryResult<BoundaryLayer> {
        let layer = self.load_boundaries(dataset)
            .map_err(|e| QueryError::from_load(&dataset.source, e))?;
        debug!(level = %dataset.level, source = %dataset.source, units = layer.len(), "loaded boundaries");
        Ok(layer)
    }

    fn readings(&self, kind: ReadingSourceKind) -> QueryResult<Arc<dyn PointSource>> {
        let source_id = format!("readings/{kind}");
        if let Some(cached) = self.readings.read()
            .map_err(|_| QueryError::unavailable(&source_id, "reading cache poisoned"))?
            .get(&kind)
        {
            return Ok(cached.clone());
        }

        let loaded = self.load_readings(kind)
            .map_err(|e| QueryError::from_load(&source_id, e))?
            .ok_or_else(|| QueryError::unavailable(&source_id, "store has no such reading source"))?;
        debug!(kind = %kind, rows = loaded.len(), "loaded readings");

        let mut cache = self.readings.write()
            .map_err(|_| QueryError::unavailable(&source_id, "reading cache poisoned"))?;
        Ok(cache.entry(kind).or_insert(loaded).clone())
    }

    fn has_readings(&self, kind: ReadingSourceKind) -> bool {
        match kind {
            ReadingSourceKind::FixedGrid => self.manifest.readings.grid.is_some(),
            ReadingSourceKind::MetricTable => self.manifest.readings.table.is_some(),
        }
    }
}
