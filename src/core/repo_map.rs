// src/core/repo_map.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{RepodocsError, Result};

/// One source file known to the repository mapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoFile {
    pub path: String,
    #[serde(default)]
    pub relative_path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub symbol_count: usize,
    #[serde(default)]
    pub line_count: usize,
}

impl RepoFile {
    /// Project-relative identity of the file, falling back to the raw path
    pub fn id(&self) -> &str {
        if self.relative_path.is_empty() {
            &self.path
        } else {
            &self.relative_path
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Interface,
    Function,
    Method,
    Property,
    Variable,
    Constant,
    Type,
    Enum,
    #[serde(other)]
    Other,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Other => "symbol",
        }
    }
}

/// A named declaration extracted by the mapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub end_line: usize,
    #[serde(default)]
    pub column: usize,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub references: usize,
    #[serde(default)]
    pub modifiers: BTreeSet<String>,
    #[serde(default)]
    pub documentation: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Symbol {
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.contains(modifier)
    }

    /// `file:line` reference used across the documents
    pub fn location(&self) -> String {
        format!("{}:{}", super::view::normalize_path(&self.file), self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Import,
    TypeImport,
    #[serde(other)]
    Other,
}

/// Directed edge from an importing file to a file or external package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type", default = "default_dependency_kind")]
    pub kind: DependencyKind,
    #[serde(default)]
    pub symbols: Vec<String>,
}

fn default_dependency_kind() -> DependencyKind {
    DependencyKind::Import
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepoStats {
    pub total_files: usize,
    pub total_symbols: usize,
    pub total_dependencies: usize,
    pub languages: BTreeMap<String, usize>,
}

/// Immutable snapshot of a source tree handed to every analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMap {
    pub project_path: String,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub files: Vec<RepoFile>,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
    #[serde(default)]
    pub stats: RepoStats,
}

impl RepoMap {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// File count, preferring the mapper's own statistics when present
    pub fn total_files(&self) -> usize {
        if self.stats.total_files > 0 {
            self.stats.total_files
        } else {
            self.files.len()
        }
    }

    pub fn total_symbols(&self) -> usize {
        if self.stats.total_symbols > 0 {
            self.stats.total_symbols
        } else {
            self.symbols.len()
        }
    }

    pub fn total_dependencies(&self) -> usize {
        if self.stats.total_dependencies > 0 {
            self.stats.total_dependencies
        } else {
            self.dependencies.len()
        }
    }
}

/// Source of repository maps; the parser that builds them lives outside this crate
#[async_trait]
pub trait RepoMapProvider: Send + Sync {
    async fn repo_map(&self, project_path: &Path) -> Result<RepoMap>;
}

/// Reads a repository map serialized as JSON by the external mapper
pub struct JsonRepoMapProvider {
    map_path: PathBuf,
}

impl JsonRepoMapProvider {
    /// `map_path` is resolved against the project path when relative
    pub fn new(map_path: impl Into<PathBuf>) -> Self {
        Self {
            map_path: map_path.into(),
        }
    }

    fn resolve(&self, project_path: &Path) -> PathBuf {
        if self.map_path.is_absolute() {
            self.map_path.clone()
        } else {
            project_path.join(&self.map_path)
        }
    }
}

#[async_trait]
impl RepoMapProvider for JsonRepoMapProvider {
    async fn repo_map(&self, project_path: &Path) -> Result<RepoMap> {
        let path = self.resolve(project_path);
        debug!("Reading repository map from {}", path.display());

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            RepodocsError::RepoMap(format!("cannot read {}: {}", path.display(), e))
        })?;

        RepoMap::from_json(&content)
    }
}

/// Serves a map that is already in memory
pub struct InMemoryRepoMapProvider {
    map: Arc<RepoMap>,
}

impl InMemoryRepoMapProvider {
    pub fn new(map: RepoMap) -> Self {
        Self { map: Arc::new(map) }
    }
}

#[async_trait]
impl RepoMapProvider for InMemoryRepoMapProvider {
    async fn repo_map(&self, _project_path: &Path) -> Result<RepoMap> {
        Ok(self.map.as_ref().clone())
    }
}
