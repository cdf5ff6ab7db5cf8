//! Store configuration.
//!
//! Read from `conf/batmapper.toml`. Every key is optional; a missing file
//! yields the defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    pub max_connections: u32,
    /// Copy the store aside before each startup migration run.
    pub backup_on_startup: bool,
    /// Import legacy `.batmap` files on startup.
    pub migrate_legacy: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
            max_connections: 4,
            backup_on_startup: true,
            migrate_legacy: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_connections, 4);
        assert!(config.backup_on_startup);
        assert!(config.migrate_legacy);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batmapper.toml");
        std::fs::write(&path, "busy_timeout_ms = 250\nmigrate_legacy = false\n").unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert!(!config.migrate_legacy);
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batmapper.toml");
        std::fs::write(&path, "busy_timeout_ms = \"soon\"").unwrap();
        assert!(StoreConfig::load(&path).is_err());
    }
}
