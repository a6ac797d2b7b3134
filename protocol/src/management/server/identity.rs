use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable server identifier, derived from the install path. Two scans
/// of the same installation always produce the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    pub fn from_path(path: &Path) -> Self {
        ServerId(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerFlavor {
    Paper,
    Spigot,
    Vanilla,
    Forge,
    Fabric,
    #[default]
    Unknown,
}

impl fmt::Display for ServerFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerFlavor::Paper => "Paper",
            ServerFlavor::Spigot => "Spigot",
            ServerFlavor::Vanilla => "Vanilla",
            ServerFlavor::Forge => "Forge",
            ServerFlavor::Fabric => "Fabric",
            ServerFlavor::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Immutable description of a discovered server installation.
/// Produced once at scan time, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub id: ServerId,
    pub name: String,
    pub path: PathBuf,
    pub flavor: ServerFlavor,
    pub version: String,
}
