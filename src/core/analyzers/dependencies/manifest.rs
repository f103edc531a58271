// src/core/analyzers/dependencies/manifest.rs
//! Best-effort reading of declared package dependencies.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{RepodocsError, Result};

/// Declared dependencies keyed by package name, values are version requirements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageManifest {
    pub source: String,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    pub fn version_of(&self, package: &str) -> Option<&str> {
        self.dependencies
            .get(package)
            .or_else(|| self.dev_dependencies.get(package))
            .map(String::as_str)
    }

    pub fn is_dev(&self, package: &str) -> bool {
        !self.dependencies.contains_key(package) && self.dev_dependencies.contains_key(package)
    }

    /// Every declared package, runtime ones first
    pub fn packages(&self) -> impl Iterator<Item = &String> {
        self.dependencies.keys().chain(
            self.dev_dependencies
                .keys()
                .filter(|k| !self.dependencies.contains_key(*k)),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PackageJson {
    dependencies: BTreeMap<String, serde_json::Value>,
    dev_dependencies: BTreeMap<String, serde_json::Value>,
    peer_dependencies: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CargoManifest {
    dependencies: BTreeMap<String, toml::Value>,
    #[serde(rename = "dev-dependencies")]
    dev_dependencies: BTreeMap<String, toml::Value>,
}

fn json_version(value: &serde_json::Value) -> String {
    value.as_str().unwrap_or("*").to_string()
}

/// `serde = "1"` or `serde = { version = "1", ... }`; path and git deps report `*`
fn toml_version(value: &toml::Value) -> String {
    match value {
        toml::Value::String(v) => v.clone(),
        toml::Value::Table(t) => t
            .get("version")
            .and_then(toml::Value::as_str)
            .unwrap_or("*")
            .to_string(),
        _ => "*".to_string(),
    }
}

pub fn parse_package_json(content: &str) -> Result<PackageManifest> {
    let parsed: PackageJson = serde_json::from_str(content)
        .map_err(|e| RepodocsError::Manifest(format!("package.json: {}", e)))?;

    let mut dependencies: BTreeMap<String, String> = parsed
        .dependencies
        .iter()
        .map(|(k, v)| (k.clone(), json_version(v)))
        .collect();
    for (name, version) in &parsed.peer_dependencies {
        dependencies
            .entry(name.clone())
            .or_insert_with(|| json_version(version));
    }

    Ok(PackageManifest {
        source: "package.json".to_string(),
        dependencies,
        dev_dependencies: parsed
            .dev_dependencies
            .iter()
            .map(|(k, v)| (k.clone(), json_version(v)))
            .collect(),
    })
}

pub fn parse_cargo_toml(content: &str) -> Result<PackageManifest> {
    let parsed: CargoManifest = toml::from_str(content)
        .map_err(|e| RepodocsError::Manifest(format!("Cargo.toml: {}", e)))?;

    Ok(PackageManifest {
        source: "Cargo.toml".to_string(),
        dependencies: parsed
            .dependencies
            .iter()
            .map(|(k, v)| (k.clone(), toml_version(v)))
            .collect(),
        dev_dependencies: parsed
            .dev_dependencies
            .iter()
            .map(|(k, v)| (k.clone(), toml_version(v)))
            .collect(),
    })
}

/// First readable manifest under `project_path`; every failure degrades to `None`
pub fn load_manifest(project_path: &Path) -> Option<PackageManifest> {
    let candidates: [(&str, fn(&str) -> Result<PackageManifest>); 2] = [
        ("package.json", parse_package_json),
        ("Cargo.toml", parse_cargo_toml),
    ];

    for (file_name, parse) in candidates {
        let path = project_path.join(file_name);
        if !path.exists() {
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Skipping unreadable manifest {}: {}", path.display(), e);
                continue;
            }
        };
        match parse(&content) {
            Ok(manifest) => return Some(manifest),
            Err(e) => debug!("Ignoring malformed manifest: {}", e),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_json_merges_peer_dependencies() {
        let manifest = parse_package_json(
            r#"{
                "name": "app",
                "dependencies": {"react": "^18.2.0"},
                "devDependencies": {"vitest": "^1.0.0"},
                "peerDependencies": {"react-dom": "^18.0.0"}
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.version_of("react"), Some("^18.2.0"));
        assert_eq!(manifest.version_of("react-dom"), Some("^18.0.0"));
        assert!(manifest.is_dev("vitest"));
        assert!(!manifest.is_dev("react"));
    }

    #[test]
    fn test_cargo_versions_from_string_or_table() {
        let manifest = parse_cargo_toml(
            r#"
[package]
name = "demo"

[dependencies]
serde = { version = "1.0", features = ["derive"] }
anyhow = "1"
local = { path = "../local" }

[dev-dependencies]
tempfile = "3"
"#,
        )
        .unwrap();

        assert_eq!(manifest.version_of("serde"), Some("1.0"));
        assert_eq!(manifest.version_of("anyhow"), Some("1"));
        assert_eq!(manifest.version_of("local"), Some("*"));
        assert!(manifest.is_dev("tempfile"));
    }

    #[test]
    fn test_malformed_manifest_degrades_to_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{ not json").unwrap();

        assert!(load_manifest(dir.path()).is_none());
    }

    #[test]
    fn test_package_json_preferred_over_cargo() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"dependencies": {"vue": "3"}}"#).unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[dependencies]\ntokio = \"1\"\n").unwrap();

        let manifest = load_manifest(dir.path()).unwrap();
        assert_eq!(manifest.source, "package.json");
        assert!(manifest.version_of("tokio").is_none());
    }
}
