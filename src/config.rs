use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RepodocsError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Analyzer defaults
    pub analysis: AnalyzerOptions,

    /// Condensed summary settings
    pub context: ContextConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Repository map produced by the external mapper, relative to the project root
    pub repo_map: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Default token budget for the condensed summary
    pub max_tokens: usize,
}

/// Resolved options shared by every analyzer in one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    /// Where the Markdown documents are written
    pub output_dir: PathBuf,

    /// Keep private-tagged members in the API surface
    pub include_private: bool,

    /// Upper bound on examples collected per pattern (at least 1)
    pub max_examples: usize,

    /// Render Mermaid diagrams into the documents
    pub generate_diagrams: bool,
}

/// Caller-supplied overrides; unset fields keep the base value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzerOverrides {
    pub output_dir: Option<PathBuf>,
    pub include_private: Option<bool>,
    pub max_examples: Option<usize>,
    pub generate_diagrams: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            analysis: AnalyzerOptions::default(),
            context: ContextConfig::default(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            repo_map: PathBuf::from(".nexus/repo-map.json"),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { max_tokens: 8000 }
    }
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(".nexus/codebase/"),
            include_private: false,
            max_examples: 3,
            generate_diagrams: true,
        }
    }
}

impl AnalyzerOptions {
    /// Merge overrides on top of these options, clamping `max_examples` to at least 1
    pub fn merged(&self, overrides: &AnalyzerOverrides) -> Self {
        let max_examples = overrides.max_examples.unwrap_or(self.max_examples);
        Self {
            output_dir: overrides
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            include_private: overrides.include_private.unwrap_or(self.include_private),
            max_examples: max_examples.max(1),
            generate_diagrams: overrides.generate_diagrams.unwrap_or(self.generate_diagrams),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| RepodocsError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RepodocsError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = ["Repodocs.toml", "repodocs.toml", ".repodocs.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_merge_and_clamp() {
        let base = AnalyzerOptions::default();
        let merged = base.merged(&AnalyzerOverrides {
            max_examples: Some(0),
            generate_diagrams: Some(false),
            ..Default::default()
        });

        assert_eq!(merged.max_examples, 1);
        assert!(!merged.generate_diagrams);
        assert_eq!(merged.output_dir, PathBuf::from(".nexus/codebase/"));
        assert!(!merged.include_private);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[analysis]\nmax_examples = 5\n").unwrap();

        assert_eq!(config.analysis.max_examples, 5);
        assert!(config.analysis.generate_diagrams);
        assert_eq!(config.context.max_tokens, 8000);
        assert_eq!(config.project.repo_map, PathBuf::from(".nexus/repo-map.json"));
    }

    #[test]
    fn test_save_and_load_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repodocs.toml");

        let mut config = Config::default();
        config.analysis.include_private = true;
        config.save(&path).unwrap();

        let loaded = Config::load_or_default(Some(&path)).unwrap();
        assert!(loaded.analysis.include_private);
    }
}
