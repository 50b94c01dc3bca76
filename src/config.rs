//! Store configuration: JSON-loadable per spec.md §6, mirroring the
//! teacher's `serde_json`-based settings loading.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::link::LinkSize;

/// Per-table sizing and growth hints (`buckets`, `size`, `rate`, and the
/// `expected_*` row-count hints from spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSettings {
    /// Bucket count for hashmap tables; ignored for nomap tables.
    pub buckets: u64,
    /// Initial body file capacity, in bytes.
    pub size: u64,
    /// Geometric growth ratio applied when `size` is exceeded.
    pub rate: f64,
    /// Expected steady-state row count, used only to size `buckets`
    /// sensibly at table creation time; not enforced afterward.
    pub expected_rows: u64,
    /// Width in bytes of this table's own `Link`s (4 or 5).
    pub link_bytes: u8,
}

impl TableSettings {
    pub fn link_size(&self) -> LinkSize {
        match self.link_bytes {
            4 => LinkSize::Bytes4,
            5 => LinkSize::Bytes5,
            other => {
                log::warn!("unsupported link_bytes {other}, defaulting to 5");
                LinkSize::Bytes5
            }
        }
    }

    pub fn growth_policy(&self) -> crate::file::GrowthPolicy {
        crate::file::GrowthPolicy {
            min_capacity: self.size,
            growth_ratio: self.rate,
        }
    }
}

impl Default for TableSettings {
    fn default() -> Self {
        TableSettings {
            buckets: 1 << 16,
            size: 1 << 20,
            rate: 1.5,
            expected_rows: 1 << 16,
            link_bytes: 5,
        }
    }
}

/// Top-level configuration: the archive's root directory plus one
/// [`TableSettings`] per table (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub path: PathBuf,
    pub tables: HashMap<String, TableSettings>,
}

const TABLE_NAMES: &[&str] = &[
    "header", "tx", "point", "output", "outs", "txs", "strong_tx", "candidate", "confirmed",
    "neutrino",
];

impl Configuration {
    /// Load configuration from a JSON file at `path` (spec.md §6).
    pub fn load(path: impl AsRef<Path>) -> Result<Configuration> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.as_ref().display())))?;
        serde_json::from_str(&text).map_err(|e| Error::Config(format!("parsing configuration: {e}")))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("serializing configuration: {e}")))?;
        std::fs::write(path.as_ref(), text)
            .map_err(|e| Error::Config(format!("writing {}: {e}", path.as_ref().display())))
    }

    pub fn table(&self, name: &str) -> TableSettings {
        self.tables.get(name).cloned().unwrap_or_default()
    }
}

impl Default for Configuration {
    /// A small single-process/dev archive: every table gets the same
    /// modest defaults, sized for local testing rather than mainnet scale.
    fn default() -> Self {
        let tables = TABLE_NAMES
            .iter()
            .map(|name| (name.to_string(), TableSettings::default()))
            .collect();
        Configuration {
            path: PathBuf::from("./archive"),
            tables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_has_every_table() {
        let config = Configuration::default();
        for name in TABLE_NAMES {
            assert!(config.tables.contains_key(*name));
        }
    }

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Configuration::default();
        config.save(&path).unwrap();
        let loaded = Configuration::load(&path).unwrap();
        assert_eq!(loaded.path, config.path);
        assert_eq!(loaded.tables.len(), config.tables.len());
    }
}
