use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::{
    aggregate::{Statistic, DEFAULT_DECIMALS},
    geom::{Crs, WGS84},
};

/// Engine-wide settings. Store layout lives in the store's own manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Reference system every boundary and reading is joined in.
    pub canonical_crs: Crs,
    /// Decimal places of aggregated output.
    pub decimals: u32,
    /// Statistic used when a request does not name one.
    pub statistic: Statistic,
    /// Deadline applied to every query on top of the caller's token.
    pub query_timeout: Option<Duration>,
    /// Root of an on-disk store, if the engine is backed by one.
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canonical_crs: WGS84,
            decimals: DEFAULT_DECIMALS,
            statistic: Statistic::Mean,
            query_timeout: None,
            data_dir: None,
        }
    }
}

impl EngineConfig {
    /// Read `AIRSHED_DATA_DIR`, `AIRSHED_QUERY_TIMEOUT_MS`, `AIRSHED_ROUND_DP` and
    /// `AIRSHED_CANONICAL_CRS` from the process environment; unset variables keep defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = get("AIRSHED_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(ms) = get("AIRSHED_QUERY_TIMEOUT_MS") {
            let ms: u64 = ms.parse().with_context(|| format!("[config] Invalid AIRSHED_QUERY_TIMEOUT_MS: {ms}"))?;
            config.query_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(dp) = get("AIRSHED_ROUND_DP") {
            config.decimals = dp.parse().with_context(|| format!("[config] Invalid AIRSHED_ROUND_DP: {dp}"))?;
            anyhow::ensure!(config.decimals <= 10, "[config] AIRSHED_ROUND_DP must be at most 10, got {}", config.decimals);
        }
        if let Some(crs) = get("AIRSHED_CANONICAL_CRS") {
            config.canonical_crs = crs.parse().context("[config] Invalid AIRSHED_CANONICAL_CRS")?;
        }

        Ok(config)
    }
}
