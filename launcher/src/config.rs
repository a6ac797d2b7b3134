use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::management::process::SupervisorTimings;
use crate::storage::file::{Config, FileIoWithBackup};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// immutable through full lifetime of app, unless restart app.
pub struct AppConfig {
    #[serde(default = "default_servers_dir")]
    pub servers_dir: PathBuf,
    #[serde(default = "default_host_sample_interval_secs")]
    pub host_sample_interval_secs: u64,
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,
}

fn default_servers_dir() -> PathBuf {
    PathBuf::from("mcserver")
}

fn default_host_sample_interval_secs() -> u64 {
    2
}

fn default_stop_grace_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            servers_dir: default_servers_dir(),
            host_sample_interval_secs: default_host_sample_interval_secs(),
            stop_grace_secs: default_stop_grace_secs(),
        }
    }
}

impl FileIoWithBackup for AppConfig {}

impl Config for AppConfig {
    type ConfigType = AppConfig;
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<AppConfig> {
        Self::load_config_or_default(path, Self::default)
    }

    pub fn host_sample_interval(&self) -> Duration {
        Duration::from_secs(self.host_sample_interval_secs)
    }

    pub fn supervisor_timings(&self) -> SupervisorTimings {
        SupervisorTimings {
            stop_grace: Duration::from_secs(self.stop_grace_secs),
            ..SupervisorTimings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults_and_writes_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.servers_dir, PathBuf::from("mcserver"));
        assert!(path.is_file());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"servers_dir":"/srv/minecraft"}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.servers_dir, PathBuf::from("/srv/minecraft"));
        assert_eq!(config.stop_grace_secs, 30);
    }
}
