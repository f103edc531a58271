// Test-only builders for small repository maps.
use std::collections::BTreeSet;

use super::repo_map::{
    DependencyEdge, DependencyKind, RepoFile, RepoMap, RepoStats, Symbol, SymbolKind,
};

pub fn file(path: &str) -> RepoFile {
    RepoFile {
        path: format!("/work/app/{}", path),
        relative_path: path.to_string(),
        size: 100,
        last_modified: "2024-01-01T00:00:00Z".to_string(),
        symbol_count: 0,
        line_count: 40,
    }
}

pub fn file_with_lines(path: &str, lines: usize) -> RepoFile {
    RepoFile {
        line_count: lines,
        ..file(path)
    }
}

pub fn symbol(id: &str, name: &str, kind: SymbolKind, file: &str) -> Symbol {
    Symbol {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        file: file.to_string(),
        line: 1,
        end_line: 10,
        column: 0,
        signature: String::new(),
        exported: false,
        references: 0,
        modifiers: BTreeSet::new(),
        documentation: None,
        parent_id: None,
    }
}

pub fn edge(from: &str, to: &str) -> DependencyEdge {
    DependencyEdge {
        from: from.to_string(),
        to: to.to_string(),
        kind: DependencyKind::Import,
        symbols: Vec::new(),
    }
}

pub fn map(files: Vec<RepoFile>, symbols: Vec<Symbol>, dependencies: Vec<DependencyEdge>) -> RepoMap {
    RepoMap {
        project_path: "/work/app".to_string(),
        generated_at: "2024-01-01T00:00:00Z".to_string(),
        files,
        symbols,
        dependencies,
        stats: RepoStats::default(),
    }
}

impl Symbol {
    pub fn refs(mut self, references: usize) -> Self {
        self.references = references;
        self
    }

    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    pub fn parent(mut self, parent_id: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self
    }

    pub fn doc(mut self, documentation: &str) -> Self {
        self.documentation = Some(documentation.to_string());
        self
    }

    pub fn sig(mut self, signature: &str) -> Self {
        self.signature = signature.to_string();
        self
    }

    pub fn at(mut self, line: usize) -> Self {
        self.line = line;
        self.end_line = line + 5;
        self
    }

    pub fn modifier(mut self, modifier: &str) -> Self {
        self.modifiers.insert(modifier.to_string());
        self
    }
}
