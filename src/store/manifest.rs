use std::{collections::BTreeMap, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    geom::Crs,
    io::sha256_file,
    readings::MetricName,
    registry::BoundaryDataset,
};

pub(crate) const MANIFEST: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHash {
    pub sha256: String,
}

/// Fixed-metric grid of sensor points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSource {
    pub source: String,
    pub metric: MetricName,
    pub crs: Crs,
}

/// Multi-metric reading table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSource {
    pub source: String,
    pub crs: Crs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingSources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableSource>,
}

/// Description of an on-disk store, kept in `manifest.json` at the store root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub store_id: String,
    pub version: String,
    /// Canonical reference system the store's data is queried in.
    pub crs: Crs,
    pub boundaries: Vec<BoundaryDataset>,
    #[serde(default)]
    pub readings: ReadingSources,
    #[serde(default)]
    pub files: BTreeMap<String, FileHash>,
}

impl StoreManifest {
    pub fn new(store_id: impl Into<String>, crs: Crs, boundaries: Vec<BoundaryDataset>, readings: ReadingSources) -> Self {
        Self {
            store_id: store_id.into(),
            version: "1".into(),
            crs,
            boundaries,
            readings,
            files: BTreeMap::new(),
        }
    }

    /// Store-relative paths of every data file the manifest refers to.
    /// Shapefiles bring their `.shx`/`.dbf` siblings.
    pub fn data_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        for dataset in &self.boundaries {
            files.push(dataset.source.clone());
            if let Some(stem) = dataset.source.strip_suffix(".shp") {
                files.push(format!("{stem}.shx"));
                files.push(format!("{stem}.dbf"));
            }
        }
        files.extend(self.readings.grid.iter().map(|grid| grid.source.clone()));
        files.extend(self.readings.table.iter().map(|table| table.source.clone()));
        files.sort();
        files.dedup();
        files
    }

    /// Read `manifest.json` from a store root.
    pub fn read(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Recompute the hash of every data file under `root`.
    pub fn rehash(&mut self, root: &Path) -> Result<()> {
        self.files = self.data_files().into_iter()
            .map(|rel| {
                let sha256 = sha256_file(&rel, root)?;
                Ok((rel, FileHash { sha256 }))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(())
    }

    /// Write `manifest.json` (pretty-printed) into a store root.
    pub fn write(&self, root: &Path) -> Result<()> {
        let path = root.join(MANIFEST);
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Check a store's files against the hashes recorded in its manifest.
pub fn validate_store(root: &Path) -> Result<()> {
    let manifest = StoreManifest::read(root)?;

    for rel in manifest.data_files() {
        if !manifest.files.contains_key(&rel) {
            bail!("[validate_store] {rel} is not listed in {MANIFEST}");
        }
    }

    for (rel, expected) in &manifest.files {
        let actual = sha256_file(rel, root)
            .with_context(|| format!("[validate_store] Failed to hash {rel}"))?;
        if actual != expected.sha256 {
            bail!("[validate_store] Hash mismatch for {rel}: expected {}, found {actual}", expected.sha256);
        }
        debug!(file = %rel, "hash ok");
    }

    info!(store = %manifest.store_id, files = manifest.files.len(), "store validated");
    Ok(())
}
