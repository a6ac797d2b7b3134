use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Launch settings for one server installation. The value is only
/// read to compose a launch command; it is never mutated by the core.
/// `min_memory_mb <= max_memory_mb` is the caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "Uuid::new_v4")]
    pub server_id: Uuid,

    #[serde(default = "default_min_memory")]
    pub min_memory_mb: u32,
    #[serde(default = "default_max_memory")]
    pub max_memory_mb: u32,

    #[serde(default)]
    pub safe_mode: bool,
    #[serde(default = "default_true")]
    pub no_gui: bool,
    #[serde(default)]
    pub auto_restart: bool,

    #[serde(default)]
    pub custom_jvm_args: String,
    #[serde(default)]
    pub custom_server_args: String,

    #[serde(default = "default_java_path")]
    pub java_path: String,
}

fn default_min_memory() -> u32 {
    1024
}

fn default_max_memory() -> u32 {
    2048
}

fn default_true() -> bool {
    true
}

fn default_java_path() -> String {
    "java".to_owned()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            server_id: Uuid::new_v4(),
            min_memory_mb: default_min_memory(),
            max_memory_mb: default_max_memory(),
            safe_mode: false,
            no_gui: true,
            auto_restart: false,
            custom_jvm_args: String::new(),
            custom_server_args: String::new(),
            java_path: default_java_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_fills_defaults() {
        let config: ServerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.min_memory_mb, 1024);
        assert_eq!(config.max_memory_mb, 2048);
        assert!(config.no_gui);
        assert!(!config.safe_mode);
        assert_eq!(config.java_path, "java");
    }

    #[test]
    fn round_trips_through_json() {
        let config = ServerConfig {
            custom_jvm_args: "-XX:+UseG1GC".to_owned(),
            ..ServerConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.server_id, config.server_id);
        assert_eq!(back.custom_jvm_args, "-XX:+UseG1GC");
    }
}
