use lazy_static::lazy_static;
use log::{debug, info};
use mcl_protocol::management::server::{ServerFlavor, ServerId, ServerIdentity};
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref VERSION_PATTERN: Regex = Regex::new(r"\d+\.\d+(?:\.\d+)?").unwrap();
}

const UNKNOWN_VERSION: &str = "Unknown";

/// Scans the servers root for jar-bearing subdirectories and returns
/// their identities, sorted by name. Creates the root on first run.
pub fn scan_servers(root: &Path) -> anyhow::Result<Vec<ServerIdentity>> {
    if !root.exists() {
        std::fs::create_dir_all(root)?;
        info!("created servers directory: {}", root.display());
    }

    let mut servers = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        match identify(&path) {
            Some(identity) => servers.push(identity),
            None => debug!("skipping {}: no server jar", path.display()),
        }
    }
    servers.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(servers)
}

/// Identifies one installation directory, or `None` if it holds no jar.
/// Flavor and version come from the folder name first, jar names as a
/// fallback.
pub fn identify(dir: &Path) -> Option<ServerIdentity> {
    let jars = jar_names(dir);
    if jars.is_empty() {
        return None;
    }

    let name = dir.file_name()?.to_string_lossy().into_owned();
    let mut flavor = detect_flavor(&name);
    let mut version = detect_version(&name);

    for jar in &jars {
        if flavor == ServerFlavor::Unknown {
            flavor = detect_flavor(jar);
        }
        if version.is_none() {
            version = detect_version(jar);
        }
    }

    Some(ServerIdentity {
        id: ServerId::from_path(dir),
        name,
        path: dir.to_path_buf(),
        flavor,
        version: version.unwrap_or_else(|| UNKNOWN_VERSION.to_owned()),
    })
}

fn jar_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.to_lowercase().ends_with(".jar"))
        .collect();
    names.sort();
    names
}

fn detect_flavor(name: &str) -> ServerFlavor {
    let lower = name.to_lowercase();
    if lower.contains("paper") {
        ServerFlavor::Paper
    } else if lower.contains("spigot") {
        ServerFlavor::Spigot
    } else if lower.contains("forge") {
        ServerFlavor::Forge
    } else if lower.contains("fabric") {
        ServerFlavor::Fabric
    } else if lower.contains("vanilla") {
        ServerFlavor::Vanilla
    } else {
        ServerFlavor::Unknown
    }
}

fn detect_version(name: &str) -> Option<String> {
    VERSION_PATTERN.find(name).map(|m| m.as_str().to_owned())
}
