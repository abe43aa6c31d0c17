//! Config loading for chunktail.
//!
//! Loads YAML config files, layers project over global over defaults, and
//! validates the result.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::discovery::DiscoveryResult;
use crate::config::error::ConfigError;
use crate::config::types::{EngineConfig, RawConfig};

/// Replace a leading `~` component with the home directory. Other paths,
/// including `~user/...`, are returned unchanged.
pub fn expand_path(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Load and parse a YAML config file.
fn load_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if content.trim().is_empty() {
        return Ok(RawConfig::default());
    }

    serde_saphyr::from_str(&content).map_err(|e| ConfigError::parse(path.to_path_buf(), e.to_string()))
}

fn validate(path: &Path, config: EngineConfig) -> Result<EngineConfig, ConfigError> {
    let invalid = |message: &str| ConfigError::Validation {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    if config.fetch_limit == 0 {
        return Err(invalid("fetch_limit must be greater than 0"));
    }
    if config.max_records == Some(0) {
        return Err(invalid("max_records must be greater than 0"));
    }
    if let Some(max) = config.max_records {
        if max < config.fetch_limit {
            return Err(invalid("max_records must be at least fetch_limit"));
        }
    }
    Ok(config)
}

/// Load a single config file over the defaults.
pub fn load_single_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let raw = load_file(path)?;
    validate(path, EngineConfig::default().overlay(raw))
}

/// Load config from discovered config files.
///
/// Global values apply first, project values override them. Returns the
/// defaults if no config files exist.
pub fn load(discovery: &DiscoveryResult) -> Result<EngineConfig, ConfigError> {
    let mut config = EngineConfig::default();
    let mut last_path = None;

    for path in [&discovery.global_config, &discovery.project_config]
        .into_iter()
        .flatten()
    {
        config = config.overlay(load_file(path)?);
        last_path = Some(path.as_path());
    }

    match last_path {
        Some(path) => validate(path, config),
        None => Ok(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{DEFAULT_EDGE_BAND, DEFAULT_FETCH_LIMIT};
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path(Path::new("~/logs"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("logs"));
        }
    }

    #[test]
    fn test_expand_path_absolute_unchanged() {
        assert_eq!(expand_path(Path::new("/var/log")), PathBuf::from("/var/log"));
    }

    #[test]
    fn test_load_single_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "c.yaml", "fetch_limit: 50\nmax_records: 500\n");

        let config = load_single_file(&path).unwrap();
        assert_eq!(config.fetch_limit, 50);
        assert_eq!(config.max_records, Some(500));
        assert_eq!(config.edge_band, DEFAULT_EDGE_BAND);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "c.yaml", "");
        let config = load_single_file(&path).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "c.yaml", "fetch_limt: 50\n");
        let err = load_single_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "c.yaml", "fetch_limit: 0\n");
        assert!(matches!(
            load_single_file(&path).unwrap_err(),
            ConfigError::Validation { .. }
        ));
    }

    #[test]
    fn test_max_below_limit_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "c.yaml", "fetch_limit: 100\nmax_records: 10\n");
        assert!(load_single_file(&path).is_err());
    }

    #[test]
    fn test_project_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = write(&temp, "global.yaml", "fetch_limit: 20\nedge_band: 5\n");
        let project = write(&temp, "chunktail.yaml", "fetch_limit: 40\n");

        let config = load(&DiscoveryResult {
            project_config: Some(project),
            global_config: Some(global),
        })
        .unwrap();

        assert_eq!(config.fetch_limit, 40);
        assert_eq!(config.edge_band, 5);
    }

    #[test]
    fn test_no_config_gives_defaults() {
        let config = load(&DiscoveryResult::default()).unwrap();
        assert_eq!(config.fetch_limit, DEFAULT_FETCH_LIMIT);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_single_file(Path::new("/no/such/chunktail.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
