// src/core/view.rs
//! Read-only query surface over a [`RepoMap`] shared by every analyzer.
//!
//! Paths coming from the mapper are compared after [`normalize_path`], so
//! `.\src\a.ts`, `./src/a.ts` and `src/a.ts` all name the same file.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::AnalyzerOptions;
use super::repo_map::{DependencyEdge, RepoFile, RepoMap, Symbol, SymbolKind};

/// Backslashes become forward slashes and any leading `./` is dropped
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized
}

/// Directory part of a normalized path, empty for root-level files
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Final path component
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// File name up to its first dot: `user-service.test.ts` -> `user-service`
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.find('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

pub fn is_test_path(path: &str) -> bool {
    path.contains(".test.") || path.contains(".spec.")
}

pub struct RepoMapView<'a> {
    map: &'a RepoMap,
    options: &'a AnalyzerOptions,
    file_ids: HashSet<String>,
    symbols_by_id: HashMap<&'a str, &'a Symbol>,
}

impl<'a> RepoMapView<'a> {
    pub fn new(map: &'a RepoMap, options: &'a AnalyzerOptions) -> Self {
        let file_ids = map
            .files
            .iter()
            .map(|f| normalize_path(f.id()))
            .collect();
        let symbols_by_id = map.symbols.iter().map(|s| (s.id.as_str(), s)).collect();

        Self {
            map,
            options,
            file_ids,
            symbols_by_id,
        }
    }

    pub fn map(&self) -> &'a RepoMap {
        self.map
    }

    pub fn options(&self) -> &'a AnalyzerOptions {
        self.options
    }

    pub fn files(&self) -> &'a [RepoFile] {
        &self.map.files
    }

    /// Normalized identities of every file, in map order
    pub fn file_paths(&self) -> Vec<String> {
        self.map.files.iter().map(|f| normalize_path(f.id())).collect()
    }

    pub fn symbols(&self) -> &'a [Symbol] {
        &self.map.symbols
    }

    pub fn dependencies(&self) -> &'a [DependencyEdge] {
        &self.map.dependencies
    }

    pub fn symbols_of_kind(&self, kind: SymbolKind) -> Vec<&'a Symbol> {
        self.map.symbols.iter().filter(|s| s.kind == kind).collect()
    }

    pub fn symbols_of_kinds(&self, kinds: &[SymbolKind]) -> Vec<&'a Symbol> {
        self.map
            .symbols
            .iter()
            .filter(|s| kinds.contains(&s.kind))
            .collect()
    }

    pub fn symbols_named(&self, name: &str) -> Vec<&'a Symbol> {
        self.map.symbols.iter().filter(|s| s.name == name).collect()
    }

    pub fn symbols_in_file(&self, file: &str) -> Vec<&'a Symbol> {
        let file = normalize_path(file);
        self.map
            .symbols
            .iter()
            .filter(|s| normalize_path(&s.file) == file)
            .collect()
    }

    pub fn exported_symbols(&self) -> Vec<&'a Symbol> {
        self.map.symbols.iter().filter(|s| s.exported).collect()
    }

    pub fn exported_of_kinds(&self, kinds: &[SymbolKind]) -> Vec<&'a Symbol> {
        self.map
            .symbols
            .iter()
            .filter(|s| s.exported && kinds.contains(&s.kind))
            .collect()
    }

    pub fn symbol_by_id(&self, id: &str) -> Option<&'a Symbol> {
        self.symbols_by_id.get(id).copied()
    }

    /// Symbols contained by `parent` in the same file, in map order
    pub fn children_of(&self, parent: &Symbol) -> Vec<&'a Symbol> {
        self.map
            .symbols
            .iter()
            .filter(|s| {
                s.parent_id.as_deref() == Some(parent.id.as_str())
                    && normalize_path(&s.file) == normalize_path(&parent.file)
            })
            .collect()
    }

    /// Descending reference count; equal counts keep their original order
    pub fn rank_by_references(&self, mut symbols: Vec<&'a Symbol>) -> Vec<&'a Symbol> {
        symbols.sort_by(|a, b| b.references.cmp(&a.references));
        symbols
    }

    pub fn is_internal_file(&self, path: &str) -> bool {
        self.file_ids.contains(&normalize_path(path))
    }

    /// Internal files directly imported by `file`, deduplicated in edge order
    pub fn imports_of(&self, file: &str) -> Vec<String> {
        let file = normalize_path(file);
        let mut seen = HashSet::new();
        self.map
            .dependencies
            .iter()
            .filter(|e| normalize_path(&e.from) == file)
            .map(|e| normalize_path(&e.to))
            .filter(|to| self.file_ids.contains(to) && seen.insert(to.clone()))
            .collect()
    }

    /// Non-file targets (package names) imported by `file`
    pub fn external_imports_of(&self, file: &str) -> Vec<String> {
        let file = normalize_path(file);
        let mut seen = HashSet::new();
        self.map
            .dependencies
            .iter()
            .filter(|e| normalize_path(&e.from) == file)
            .map(|e| normalize_path(&e.to))
            .filter(|to| !self.file_ids.contains(to) && seen.insert(to.clone()))
            .collect()
    }

    /// Files that directly import `file`, deduplicated in edge order
    pub fn importers_of(&self, file: &str) -> Vec<String> {
        let file = normalize_path(file);
        let mut seen = HashSet::new();
        self.map
            .dependencies
            .iter()
            .filter(|e| normalize_path(&e.to) == file)
            .map(|e| normalize_path(&e.from))
            .filter(|from| seen.insert(from.clone()))
            .collect()
    }

    /// Every ancestor directory of every file path
    pub fn directories(&self) -> BTreeSet<String> {
        let mut dirs = BTreeSet::new();
        for path in self.file_paths() {
            let mut dir = parent_dir(&path);
            while !dir.is_empty() {
                if !dirs.insert(dir.to_string()) {
                    break;
                }
                dir = parent_dir(dir);
            }
        }
        dirs
    }

    pub fn test_files(&self) -> Vec<String> {
        self.file_paths()
            .into_iter()
            .filter(|p| is_test_path(p))
            .collect()
    }
}
