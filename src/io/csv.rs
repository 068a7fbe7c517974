//! CSV reading operations.

use std::{io::Cursor, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::CsvReader};

/// Reads a CSV file from `path` into a Polars DataFrame.
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("[io::csv] Failed to open CSV file: {}", path.display()))?;
    read_csv_bytes(&bytes)
        .with_context(|| format!("[io::csv] Failed to read CSV from {}", path.display()))
}

/// Reads CSV bytes into a Polars DataFrame.
fn read_csv_bytes(bytes: &[u8]) -> Result<DataFrame> {
    CsvReader::new(Cursor::new(bytes))
        .finish()
        .context("[io::csv] Failed to read CSV from bytes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_rows() {
        let csv = "lon,lat,observed_at,pm25\n80.1,26.1,2025-01-15T06:00:00Z,80\n80.2,26.2,2025-01-15T06:00:00Z,\n";
        let df = read_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(df.shape(), (2, 4));
        assert_eq!(df.column("pm25").unwrap().null_count(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        std::fs::write(&path, csv).unwrap();
        assert_eq!(read_csv(&path).unwrap().shape(), (2, 4));
        assert!(read_csv(&dir.path().join("missing.csv")).is_err());
    }
}
