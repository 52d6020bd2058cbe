//! Server configuration

use moodwave_telemetry::PersistenceConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Ensemble configuration file (models, voting, windows)
    #[serde(default = "default_ensemble_config")]
    pub ensemble_config: PathBuf,

    /// Session store settings
    #[serde(default)]
    pub store: PersistenceConfig,

    /// Largest accepted recording body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub port: Option<u16>,
    pub ensemble_config: Option<PathBuf>,
    pub store_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides.
    ///
    /// A missing file falls back to defaults. A relative `ensemble_config`
    /// or store directory in the file resolves against the file's directory.
    pub fn load(config_path: &Path, overrides: &Overrides) -> anyhow::Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let mut config: Self = serde_yaml::from_str(&content)?;
            if let Some(base) = config_path.parent() {
                config.resolve_paths(base);
            }
            config
        } else {
            Self::default()
        };

        if let Some(listen) = &overrides.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = overrides.port {
            config.port = port;
        }
        if let Some(path) = &overrides.ensemble_config {
            config.ensemble_config = path.clone();
        }
        if let Some(dir) = &overrides.store_dir {
            config.store.dir = dir.clone();
        }

        if config.store.flush_interval == 0 {
            anyhow::bail!("store.flush_interval must be at least 1");
        }

        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.ensemble_config.is_relative() {
            self.ensemble_config = base.join(&self.ensemble_config);
        }
        if self.store.dir.is_relative() {
            self.store.dir = base.join(&self.store.dir);
        }
    }

    /// `listen:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            ensemble_config: default_ensemble_config(),
            store: PersistenceConfig::default(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_ensemble_config() -> PathBuf {
    PathBuf::from("./ensemble.yaml")
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load(Path::new("/nonexistent/moodwave.yaml"), &Overrides::default())
            .unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.store.flush_interval, 1);
    }

    #[test]
    fn test_file_and_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.yaml");
        std::fs::write(
            &path,
            "port: 9000\nensemble_config: conf/ensemble.yaml\nstore:\n  dir: /var/lib/moodwave\n  flush_interval: 4\n",
        )
        .unwrap();

        let config = ServerConfig::load(
            &path,
            &Overrides {
                listen: Some("127.0.0.1".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.ensemble_config, dir.path().join("conf/ensemble.yaml"));
        assert_eq!(config.store.dir, PathBuf::from("/var/lib/moodwave"));
        assert_eq!(config.store.flush_interval, 4);
    }

    #[test]
    fn test_zero_flush_interval_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.yaml");
        std::fs::write(&path, "store:\n  flush_interval: 0\n").unwrap();

        assert!(ServerConfig::load(&path, &Overrides::default()).is_err());
    }
}
