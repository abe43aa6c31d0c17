//! Config discovery for chunktail.
//!
//! Walks parent directories to find `chunktail.yaml` and checks for a global
//! config at `~/.config/chunktail/config.yaml`.

use std::path::{Path, PathBuf};

/// Project config filename to search for in parent directories.
pub const PROJECT_CONFIG_NAME: &str = "chunktail.yaml";

/// Global config filename within the chunktail config directory.
pub const GLOBAL_CONFIG_NAME: &str = "config.yaml";

/// Result of config discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    /// Full path to the nearest project config (`chunktail.yaml`).
    pub project_config: Option<PathBuf>,
    /// Full path to the global config file.
    pub global_config: Option<PathBuf>,
}

impl DiscoveryResult {
    /// Returns true if any config was found (project or global).
    pub fn has_config(&self) -> bool {
        self.project_config.is_some() || self.global_config.is_some()
    }
}

fn is_file(path: &Path) -> bool {
    path.try_exists().unwrap_or(false) && path.is_file()
}

/// Discover config files starting from the current working directory.
pub fn discover() -> DiscoveryResult {
    let global = dirs::config_dir().map(|dir| dir.join("chunktail").join(GLOBAL_CONFIG_NAME));
    match std::env::current_dir() {
        Ok(cwd) => discover_from(&cwd.canonicalize().unwrap_or(cwd), global),
        Err(_) => DiscoveryResult {
            project_config: None,
            global_config: global.filter(|p| is_file(p)),
        },
    }
}

/// Discover config files walking up from `start`, with an explicit candidate
/// for the global config.
pub fn discover_from(start: &Path, global_candidate: Option<PathBuf>) -> DiscoveryResult {
    let project_config = start
        .ancestors()
        .map(|ancestor| ancestor.join(PROJECT_CONFIG_NAME))
        .find(|candidate| is_file(candidate));

    DiscoveryResult {
        project_config,
        global_config: global_candidate.filter(|p| is_file(p)),
    }
}
