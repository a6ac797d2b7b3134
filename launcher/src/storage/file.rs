use std::path::Path;

use serde::{Deserialize, Serialize};

pub trait FileIoWithBackup {
    /// Writes the given content to a file and creates a backup of the file before writing.
    fn write_with_backup<P: AsRef<Path>>(path: P, content: &str) -> Result<(), std::io::Error> {
        let path = path.as_ref();

        if path.exists() {
            let backup_path = path.with_extension("bak");

            // Create a backup of the file
            std::fs::copy(path, backup_path)?;
        }

        // Write the content to the file
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Trait for configuration handling.
pub trait Config: FileIoWithBackup {
    type ConfigType: Serialize + for<'de> Deserialize<'de>;

    fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Self::ConfigType> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self::ConfigType = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn save_config<P: AsRef<Path>>(path: P, config: &Self::ConfigType) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(config)?;
        Self::write_with_backup(path, &content)?;
        Ok(())
    }

    fn load_config_or_default<P: AsRef<Path>, F: FnOnce() -> Self::ConfigType>(
        path: P,
        default: F,
    ) -> anyhow::Result<Self::ConfigType> {
        match std::fs::metadata(path.as_ref()) {
            Ok(metadata) if metadata.is_file() => Self::load_config(path),
            _ => {
                let config = default();
                Self::save_config(path, &config)?;
                Ok(config)
            }
        }
    }
}

/// Per-install `server_config.json`, stored next to the jar.
pub struct ServerConfigStore;

pub const SERVER_CONFIG_FILE: &str = "server_config.json";

impl FileIoWithBackup for ServerConfigStore {}

impl Config for ServerConfigStore {
    type ConfigType = mcl_protocol::management::server::ServerConfig;
}

impl ServerConfigStore {
    /// Loads the config of the server installed at `dir`, writing a
    /// default one on first touch.
    pub fn load_or_init(dir: &Path) -> anyhow::Result<<Self as Config>::ConfigType> {
        Self::load_config_or_default(dir.join(SERVER_CONFIG_FILE), Default::default)
    }

    pub fn save(dir: &Path, config: &<Self as Config>::ConfigType) -> anyhow::Result<()> {
        Self::save_config(dir.join(SERVER_CONFIG_FILE), config)
    }
}
