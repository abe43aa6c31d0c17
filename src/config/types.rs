//! Config types for chunktail.

use serde::Deserialize;
use std::path::PathBuf;

/// Records per fetch when nothing else is configured.
pub const DEFAULT_FETCH_LIMIT: usize = 200;

/// Records held in memory before the far edge is evicted.
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Distance from a buffered edge, in records, that triggers another fetch.
pub const DEFAULT_EDGE_BAND: usize = 20;

/// Raw config file structure (used for parsing).
///
/// Mirrors the YAML file. Unknown fields are rejected with an error.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Directory holding the log files (may contain tilde).
    pub dir: Option<PathBuf>,
    pub fetch_limit: Option<usize>,
    pub max_records: Option<usize>,
    pub edge_band: Option<usize>,
}

/// Field names accepted in the config file, for typo suggestions.
pub const KNOWN_FIELDS: &[&str] = &["dir", "fetch_limit", "max_records", "edge_band"];

/// Validated engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Expanded log directory, if configured.
    pub dir: Option<PathBuf>,
    /// Maximum records per fetch request. Always > 0.
    pub fetch_limit: usize,
    /// Memory bound on buffered records; `None` disables eviction.
    pub max_records: Option<usize>,
    pub edge_band: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dir: None,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            max_records: Some(DEFAULT_MAX_RECORDS),
            edge_band: DEFAULT_EDGE_BAND,
        }
    }
}

impl EngineConfig {
    /// Layer `raw` over `self`: fields present in `raw` win.
    pub(crate) fn overlay(mut self, raw: RawConfig) -> Self {
        if let Some(dir) = raw.dir {
            self.dir = Some(super::loader::expand_path(&dir));
        }
        if let Some(limit) = raw.fetch_limit {
            self.fetch_limit = limit;
        }
        if let Some(max) = raw.max_records {
            self.max_records = Some(max);
        }
        if let Some(band) = raw.edge_band {
            self.edge_band = band;
        }
        self
    }
}
