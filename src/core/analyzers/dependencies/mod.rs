// src/core/analyzers/dependencies/mod.rs
//! External packages, internal modules and circular dependencies.

mod graph;
mod manifest;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

use crate::core::diagram::{render_flowchart, sanitize_id, FlowDirection, FlowEdge, FlowNode, NodeShape};
use crate::core::markdown::{code_list, document_header, mermaid, or_dash, table};
use crate::core::view::{normalize_path, parent_dir, RepoMapView};

pub use graph::{
    classify_cycle, cycle_layers, find_elementary_cycles, layer_of, severity_for, suggestion_for,
    CircularDependencyDoc, DependencyGraph, MAX_CYCLES,
};
pub use manifest::{load_manifest, parse_cargo_toml, parse_package_json, PackageManifest};

/// Packages always flagged critical regardless of usage
const CRITICAL_PACKAGES: &[&str] = &[
    "react",
    "react-dom",
    "vue",
    "svelte",
    "next",
    "express",
    "electron",
    "typescript",
    "zustand",
    "redux",
    "@anthropic-ai/sdk",
    "openai",
    "better-sqlite3",
    "prisma",
    "tokio",
    "serde",
];

/// More importers than this makes a package critical
const CRITICAL_IMPORTER_THRESHOLD: usize = 10;

const MAX_MODULE_EXPORTS: usize = 8;

const KNOWN_PURPOSES: &[(&str, &str)] = &[
    ("react", "UI component rendering"),
    ("react-dom", "DOM rendering for React"),
    ("vue", "UI component rendering"),
    ("svelte", "UI component compilation"),
    ("next", "React application framework"),
    ("express", "HTTP server framework"),
    ("electron", "Desktop application shell"),
    ("typescript", "Static type checking"),
    ("zustand", "State management"),
    ("redux", "State management"),
    ("@anthropic-ai/sdk", "Anthropic API client"),
    ("openai", "OpenAI API client"),
    ("better-sqlite3", "SQLite database access"),
    ("prisma", "Database ORM"),
    ("lodash", "General-purpose utilities"),
    ("axios", "HTTP client"),
    ("zod", "Schema validation"),
    ("vitest", "Test runner"),
    ("jest", "Test runner"),
    ("tokio", "Async runtime"),
    ("serde", "Serialization framework"),
    ("clap", "Command-line argument parsing"),
    ("anyhow", "Error handling"),
    ("thiserror", "Error type derivation"),
    ("tracing", "Structured logging"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDependencyDoc {
    pub name: String,
    pub version: Option<String>,
    pub dev: bool,
    pub purpose: String,
    pub critical: bool,
    /// Internal files importing the package, deduplicated
    pub importers: Vec<String>,
}

impl ExternalDependencyDoc {
    pub fn usage_count(&self) -> usize {
        self.importers.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalModuleDoc {
    pub path: String,
    pub file_count: usize,
    pub exports: Vec<String>,
    pub depends_on: Vec<String>,
    pub depended_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependenciesDoc {
    pub overview: String,
    pub manifest_source: Option<String>,
    pub external: Vec<ExternalDependencyDoc>,
    pub internal_modules: Vec<InternalModuleDoc>,
    pub circular_dependencies: Vec<CircularDependencyDoc>,
    pub module_diagram: Option<String>,
}

impl DependenciesDoc {
    pub fn critical(&self) -> impl Iterator<Item = &ExternalDependencyDoc> {
        self.external.iter().filter(|d| d.critical)
    }
}

/// `@scope/name/sub` -> `@scope/name`, `lodash/fp` -> `lodash`; relative targets have no package
pub fn package_root(target: &str) -> Option<String> {
    let target = normalize_path(target);
    if target.is_empty() || target.starts_with('.') || target.starts_with('/') {
        return None;
    }
    let mut segments = target.split('/');
    let first = segments.next()?;
    if first.starts_with('@') {
        let second = segments.next()?;
        Some(format!("{}/{}", first, second))
    } else {
        Some(first.to_string())
    }
}

pub fn is_critical(name: &str, importer_count: usize) -> bool {
    CRITICAL_PACKAGES.contains(&name) || importer_count > CRITICAL_IMPORTER_THRESHOLD
}

fn package_purpose(name: &str) -> String {
    if let Some((_, purpose)) = KNOWN_PURPOSES.iter().find(|(n, _)| *n == name) {
        return purpose.to_string();
    }
    if name.starts_with("@types/") {
        return "Type declarations".to_string();
    }
    if name.starts_with("@testing-library/") {
        return "Testing utilities".to_string();
    }
    "Third-party package".to_string()
}

fn module_of(path: &str) -> String {
    let dir = parent_dir(path);
    if dir.is_empty() {
        ".".to_string()
    } else {
        dir.to_string()
    }
}

/// Importing files per external package root, in edge order
fn external_usage(view: &RepoMapView) -> BTreeMap<String, Vec<String>> {
    let mut usage: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for edge in view.dependencies() {
        if view.is_internal_file(&edge.to) {
            continue;
        }
        let Some(package) = package_root(&edge.to) else {
            continue;
        };
        let from = normalize_path(&edge.from);
        let importers = usage.entry(package).or_default();
        if !importers.contains(&from) {
            importers.push(from);
        }
    }
    usage
}

fn external_dependencies(
    view: &RepoMapView,
    manifest: Option<&PackageManifest>,
) -> Vec<ExternalDependencyDoc> {
    let usage = external_usage(view);
    let doc = |name: &str, version: Option<String>, dev: bool| {
        let importers = usage.get(name).cloned().unwrap_or_default();
        ExternalDependencyDoc {
            name: name.to_string(),
            version,
            dev,
            purpose: package_purpose(name),
            critical: is_critical(name, importers.len()),
            importers,
        }
    };

    let mut external: Vec<ExternalDependencyDoc> = match manifest {
        Some(manifest) => manifest
            .packages()
            .map(|name| {
                doc(
                    name,
                    manifest.version_of(name).map(str::to_string),
                    manifest.is_dev(name),
                )
            })
            .collect(),
        None => usage.keys().map(|name| doc(name, None, false)).collect(),
    };

    external.sort_by(|a, b| b.usage_count().cmp(&a.usage_count()));
    external
}

fn internal_modules(view: &RepoMapView) -> Vec<InternalModuleDoc> {
    let mut files_by_module: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in view.file_paths() {
        files_by_module.entry(module_of(&path)).or_default().push(path);
    }

    let mut depends_on: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut depended_by: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (module, files) in &files_by_module {
        for file in files {
            for target in view.imports_of(file) {
                let target_module = module_of(&target);
                if &target_module == module {
                    continue;
                }
                depends_on
                    .entry(module.clone())
                    .or_default()
                    .insert(target_module.clone());
                depended_by
                    .entry(target_module)
                    .or_default()
                    .insert(module.clone());
            }
        }
    }

    files_by_module
        .into_iter()
        .map(|(module, files)| {
            let exports = files
                .iter()
                .flat_map(|f| view.symbols_in_file(f))
                .filter(|s| s.exported && s.parent_id.is_none())
                .map(|s| s.name.clone())
                .take(MAX_MODULE_EXPORTS)
                .collect();
            InternalModuleDoc {
                file_count: files.len(),
                exports,
                depends_on: depends_on
                    .remove(&module)
                    .map(|s| s.into_iter().collect())
                    .unwrap_or_default(),
                depended_by: depended_by
                    .remove(&module)
                    .map(|s| s.into_iter().collect())
                    .unwrap_or_default(),
                path: module,
            }
        })
        .collect()
}

fn module_diagram(modules: &[InternalModuleDoc]) -> Option<String> {
    if modules.is_empty() {
        return None;
    }
    let nodes: Vec<FlowNode> = modules
        .iter()
        .map(|m| FlowNode::new(sanitize_id(&m.path), &m.path, NodeShape::Rectangle))
        .collect();
    let edges: Vec<FlowEdge> = modules
        .iter()
        .flat_map(|m| {
            m.depends_on
                .iter()
                .map(move |target| FlowEdge::solid(sanitize_id(&m.path), sanitize_id(target)))
        })
        .collect();
    Some(render_flowchart(FlowDirection::LeftRight, &nodes, &edges))
}

pub fn analyze(view: &RepoMapView) -> DependenciesDoc {
    let manifest = load_manifest(Path::new(&view.map().project_path));
    analyze_with_manifest(view, manifest.as_ref())
}

/// Same as [`analyze`] with the package manifest supplied by the caller
pub fn analyze_with_manifest(view: &RepoMapView, manifest: Option<&PackageManifest>) -> DependenciesDoc {
    if manifest.is_none() {
        debug!("No package manifest; inferring external packages from imports");
    }

    let external = external_dependencies(view, manifest);
    let internal_modules = internal_modules(view);

    let graph = DependencyGraph::from_view(view);
    let circular_dependencies: Vec<CircularDependencyDoc> =
        graph.cycles().into_iter().map(classify_cycle).collect();
    debug!(
        "Dependency graph: {} files, {} edges, {} cycles",
        graph.nodes().len(),
        graph.edge_count(),
        circular_dependencies.len()
    );

    let module_diagram = if view.options().generate_diagrams {
        module_diagram(&internal_modules)
    } else {
        None
    };

    let critical = external.iter().filter(|d| d.critical).count();
    let mut overview = format!(
        "{} external packages ({} critical) and {} internal modules.",
        external.len(),
        critical,
        internal_modules.len()
    );
    if circular_dependencies.is_empty() {
        overview.push_str(" No circular dependencies were found.");
    } else {
        overview.push_str(&format!(
            " {} circular dependencies need attention.",
            circular_dependencies.len()
        ));
    }

    DependenciesDoc {
        overview,
        manifest_source: manifest.map(|m| m.source.clone()),
        external,
        internal_modules,
        circular_dependencies,
        module_diagram,
    }
}

pub fn to_markdown(doc: &DependenciesDoc, generated_at: &DateTime<Utc>) -> String {
    let mut out = document_header("Dependencies", generated_at, &doc.overview);

    out.push_str("## External Dependencies\n\n");
    if let Some(source) = &doc.manifest_source {
        out.push_str(&format!("Declared in `{}`.\n\n", source));
    }
    if doc.external.is_empty() {
        out.push_str("_No external dependencies detected._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .external
            .iter()
            .map(|d| {
                let mut name = d.name.clone();
                if d.dev {
                    name.push_str(" (dev)");
                }
                vec![
                    name,
                    or_dash(d.version.as_deref().unwrap_or_default()),
                    d.purpose.clone(),
                    if d.critical { "Yes" } else { "No" }.to_string(),
                    d.usage_count().to_string(),
                ]
            })
            .collect();
        out.push_str(&table(&["Package", "Version", "Purpose", "Critical", "Used By"], &rows));
    }

    out.push_str("## Internal Modules\n\n");
    if doc.internal_modules.is_empty() {
        out.push_str("_No internal modules detected._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .internal_modules
            .iter()
            .map(|m| {
                vec![
                    format!("`{}`", m.path),
                    m.file_count.to_string(),
                    or_dash(&m.exports.join(", ")),
                    or_dash(&code_list(&m.depends_on)),
                ]
            })
            .collect();
        out.push_str(&table(&["Module", "Files", "Key Exports", "Depends On"], &rows));
    }

    out.push_str("## Circular Dependencies\n\n");
    if doc.circular_dependencies.is_empty() {
        out.push_str("_No circular dependencies detected._\n\n");
    }
    for (i, cycle) in doc.circular_dependencies.iter().enumerate() {
        let mut path: Vec<String> = cycle.files.iter().map(|f| format!("`{}`", f)).collect();
        if let Some(first) = path.first().cloned() {
            path.push(first);
        }
        out.push_str(&format!("### Cycle {} ({})\n\n", i + 1, cycle.severity));
        out.push_str(&format!("{}\n\n", path.join(" → ")));
        if !cycle.layers.is_empty() {
            out.push_str(&format!("**Layers**: {}\n\n", cycle.layers.join(", ")));
        }
        out.push_str(&format!("**Suggestion**: {}\n\n", cycle.suggestion));
    }

    if let Some(diagram) = &doc.module_diagram {
        out.push_str("## Module Graph\n\n");
        out.push_str(&mermaid(diagram));
    }

    out
}

pub fn condense(doc: &DependenciesDoc) -> String {
    let mut out = String::from("## Dependencies\n");
    let critical: Vec<&str> = doc.critical().map(|d| d.name.as_str()).collect();
    if !critical.is_empty() {
        out.push_str(&format!("Critical: {}\n", critical.join(", ")));
    }
    out.push_str(&format!(
        "{} external packages, {} internal modules\n",
        doc.external.len(),
        doc.internal_modules.len()
    ));
    for cycle in &doc.circular_dependencies {
        out.push_str(&format!("- Cycle ({}): {}\n", cycle.severity, cycle.files.join(" -> ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerOptions;
    use crate::core::analyzers::Severity;
    use crate::core::fixtures::{edge, file, map, symbol};
    use crate::core::repo_map::{RepoMap, SymbolKind};
    use chrono::TimeZone;

    fn cyclic() -> RepoMap {
        map(
            vec![
                file("src/ui/A.tsx"),
                file("src/ui/B.tsx"),
                file("src/persistence/C.ts"),
            ],
            vec![symbol("1", "Store", SymbolKind::Class, "src/persistence/C.ts").exported()],
            vec![
                edge("src/ui/A.tsx", "src/ui/B.tsx"),
                edge("src/ui/B.tsx", "src/persistence/C.ts"),
                edge("src/persistence/C.ts", "src/ui/A.tsx"),
                edge("src/ui/A.tsx", "react"),
                edge("src/ui/B.tsx", "react/jsx-runtime"),
                edge("src/ui/B.tsx", "@tanstack/react-query/core"),
            ],
        )
    }

    #[test]
    fn test_package_root() {
        assert_eq!(package_root("lodash/fp").as_deref(), Some("lodash"));
        assert_eq!(package_root("@scope/pkg/sub").as_deref(), Some("@scope/pkg"));
        assert_eq!(package_root("./local"), None);
        assert_eq!(package_root("../up"), None);
    }

    #[test]
    fn test_cycle_across_two_layers_is_medium() {
        let repo = cyclic();
        let options = AnalyzerOptions::default();
        let doc = analyze_with_manifest(&RepoMapView::new(&repo, &options), None);

        assert_eq!(doc.circular_dependencies.len(), 1);
        let cycle = &doc.circular_dependencies[0];
        assert_eq!(cycle.severity, Severity::Medium);
        assert_eq!(cycle.files.len(), 3);
    }

    #[test]
    fn test_external_packages_inferred_without_manifest() {
        let repo = cyclic();
        let options = AnalyzerOptions::default();
        let doc = analyze_with_manifest(&RepoMapView::new(&repo, &options), None);

        let react = doc.external.iter().find(|d| d.name == "react").unwrap();
        assert_eq!(react.usage_count(), 2);
        assert!(react.critical);
        assert!(doc.external.iter().any(|d| d.name == "@tanstack/react-query"));
        assert!(doc.manifest_source.is_none());
    }

    #[test]
    fn test_manifest_drives_external_list() {
        let repo = cyclic();
        let options = AnalyzerOptions::default();
        let manifest = parse_package_json(
            r#"{"dependencies": {"lodash": "^4.17.0"}, "devDependencies": {"vitest": "^1.0.0"}}"#,
        )
        .unwrap();
        let doc = analyze_with_manifest(&RepoMapView::new(&repo, &options), Some(&manifest));

        let names: Vec<&str> = doc.external.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["lodash", "vitest"]);
        assert!(doc.external[1].dev);
        assert!(!doc.external[0].critical);
    }

    #[test]
    fn test_heavily_imported_package_is_critical() {
        let files: Vec<_> = (0..11).map(|i| file(&format!("src/f{}.ts", i))).collect();
        let edges: Vec<_> = (0..11).map(|i| edge(&format!("src/f{}.ts", i), "date-fns")).collect();
        let repo = map(files, vec![], edges);
        let options = AnalyzerOptions::default();
        let doc = analyze_with_manifest(&RepoMapView::new(&repo, &options), None);

        assert!(doc.external[0].critical);
    }

    #[test]
    fn test_internal_modules_track_both_directions() {
        let repo = cyclic();
        let options = AnalyzerOptions::default();
        let doc = analyze_with_manifest(&RepoMapView::new(&repo, &options), None);

        let ui = doc.internal_modules.iter().find(|m| m.path == "src/ui").unwrap();
        assert_eq!(ui.file_count, 2);
        assert_eq!(ui.depends_on, vec!["src/persistence"]);
        assert_eq!(ui.depended_by, vec!["src/persistence"]);

        let persistence = doc
            .internal_modules
            .iter()
            .find(|m| m.path == "src/persistence")
            .unwrap();
        assert_eq!(persistence.exports, vec!["Store"]);
    }

    #[test]
    fn test_markdown_sections() {
        let repo = cyclic();
        let options = AnalyzerOptions::default();
        let doc = analyze_with_manifest(&RepoMapView::new(&repo, &options), None);
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let md = to_markdown(&doc, &at);
        assert!(md.starts_with("# Dependencies\n"));
        assert!(md.contains("| Package | Version | Purpose | Critical | Used By |"));
        assert!(md.contains("| Module | Files | Key Exports | Depends On |"));
        assert!(md.contains("### Cycle 1 (medium)"));
        assert!(md.contains("```mermaid\ngraph LR\n"));
    }

    #[test]
    fn test_diagram_disabled() {
        let repo = cyclic();
        let options = AnalyzerOptions {
            generate_diagrams: false,
            ..AnalyzerOptions::default()
        };
        let doc = analyze_with_manifest(&RepoMapView::new(&repo, &options), None);
        assert!(doc.module_diagram.is_none());
    }
}
