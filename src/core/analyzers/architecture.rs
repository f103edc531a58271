// src/core/analyzers/architecture.rs
//! Layers, key components, entry points and design decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::diagram::{render_flowchart, sanitize_id, FlowDirection, FlowEdge, FlowNode, NodeShape};
use crate::core::markdown::{code_list, document_header, mermaid, or_dash, table};
use crate::core::purpose::infer_purpose;
use crate::core::repo_map::SymbolKind;
use crate::core::view::{file_stem, is_test_path, normalize_path, RepoMapView};

const MAX_KEY_COMPONENTS: usize = 15;

const ENTRY_STEMS: &[&str] = &["index", "main", "app", "server", "cli", "extension"];

struct LayerRule {
    name: &'static str,
    description: &'static str,
    directories: &'static [&'static str],
}

/// Directory names per layer, earlier layers win on ambiguity
const LAYER_RULES: &[LayerRule] = &[
    LayerRule {
        name: "Presentation",
        description: "User-facing views and components",
        directories: &["ui", "components", "views", "pages", "renderer", "screens", "widgets"],
    },
    LayerRule {
        name: "Application",
        description: "Request handling and workflow orchestration",
        directories: &["orchestration", "controllers", "routes", "handlers", "commands", "cli"],
    },
    LayerRule {
        name: "Domain",
        description: "Business logic and core services",
        directories: &["services", "domain", "core", "planning", "execution", "agents"],
    },
    LayerRule {
        name: "Data",
        description: "Persistence, models and state",
        directories: &["persistence", "database", "db", "repositories", "models", "stores", "storage"],
    },
    LayerRule {
        name: "Infrastructure",
        description: "External services, adapters and integrations",
        directories: &["infrastructure", "adapters", "llm", "api", "clients", "integrations"],
    },
    LayerRule {
        name: "Shared",
        description: "Cross-cutting utilities and types",
        directories: &["utils", "helpers", "lib", "shared", "common", "types"],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDoc {
    pub name: String,
    pub description: String,
    pub directories: Vec<String>,
    pub file_count: usize,
    /// Other layers this one imports from
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDoc {
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: usize,
    pub purpose: String,
    pub layer: Option<String>,
    pub references: usize,
    pub imports: Vec<String>,
    pub importer_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPointDoc {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignDecisionDoc {
    pub title: String,
    pub description: String,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureDoc {
    pub overview: String,
    pub layers: Vec<LayerDoc>,
    pub key_components: Vec<ComponentDoc>,
    pub entry_points: Vec<EntryPointDoc>,
    pub design_decisions: Vec<DesignDecisionDoc>,
    pub layer_diagram: Option<String>,
}

/// Deepest directory segment naming a layer, with the directory prefix it matched
fn classify_path(path: &str) -> Option<(&'static LayerRule, String)> {
    let segments: Vec<&str> = path.split('/').collect();
    let dir_segments = &segments[..segments.len().saturating_sub(1)];

    for depth in (0..dir_segments.len()).rev() {
        let segment = dir_segments[depth].to_ascii_lowercase();
        if let Some(rule) = LAYER_RULES
            .iter()
            .find(|r| r.directories.contains(&segment.as_str()))
        {
            return Some((rule, dir_segments[..=depth].join("/")));
        }
    }
    None
}

pub fn layer_name(path: &str) -> Option<&'static str> {
    classify_path(path).map(|(rule, _)| rule.name)
}

fn detect_layers(view: &RepoMapView) -> Vec<LayerDoc> {
    let mut directories: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();
    let mut file_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut dependencies: BTreeMap<&'static str, BTreeSet<&'static str>> = BTreeMap::new();

    for path in view.file_paths() {
        let Some((rule, dir)) = classify_path(&path) else {
            continue;
        };
        directories.entry(rule.name).or_default().insert(dir);
        *file_counts.entry(rule.name).or_default() += 1;

        for target in view.imports_of(&path) {
            if let Some(target_layer) = layer_name(&target) {
                if target_layer != rule.name {
                    dependencies.entry(rule.name).or_default().insert(target_layer);
                }
            }
        }
    }

    LAYER_RULES
        .iter()
        .filter(|rule| file_counts.contains_key(rule.name))
        .map(|rule| LayerDoc {
            name: rule.name.to_string(),
            description: rule.description.to_string(),
            directories: directories
                .remove(rule.name)
                .map(|d| d.into_iter().collect())
                .unwrap_or_default(),
            file_count: file_counts.get(rule.name).copied().unwrap_or_default(),
            dependencies: dependencies
                .remove(rule.name)
                .map(|d| d.into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
        })
        .collect()
}

fn key_components(view: &RepoMapView) -> Vec<ComponentDoc> {
    let candidates = view.exported_of_kinds(&[SymbolKind::Class, SymbolKind::Interface, SymbolKind::Function]);

    view.rank_by_references(candidates)
        .into_iter()
        .take(MAX_KEY_COMPONENTS)
        .map(|symbol| {
            let file = normalize_path(&symbol.file);
            ComponentDoc {
                name: symbol.name.clone(),
                kind: symbol.kind,
                line: symbol.line,
                purpose: infer_purpose(symbol),
                layer: layer_name(&file).map(str::to_string),
                references: symbol.references,
                imports: view.imports_of(&file),
                importer_count: view.importers_of(&file).len(),
                file,
            }
        })
        .collect()
}

fn entry_points(view: &RepoMapView) -> Vec<EntryPointDoc> {
    view.file_paths()
        .into_iter()
        .filter(|path| !is_test_path(path))
        .filter_map(|path| {
            let stem = file_stem(&path).to_ascii_lowercase();
            let reason = if ENTRY_STEMS.contains(&stem.as_str()) {
                format!("Conventional `{}` entry file", stem)
            } else if view
                .symbols_in_file(&path)
                .iter()
                .any(|s| s.name == "main" && s.kind == SymbolKind::Function)
            {
                "Defines a `main` function".to_string()
            } else {
                return None;
            };
            Some(EntryPointDoc { file: path, reason })
        })
        .collect()
}

fn is_store_name(name: &str) -> bool {
    name.ends_with("Store") && name.len() > "Store".len()
}

fn design_decisions(view: &RepoMapView, layers: &[LayerDoc]) -> Vec<DesignDecisionDoc> {
    let mut decisions = Vec::new();

    if layers.len() >= 2 {
        decisions.push(DesignDecisionDoc {
            title: "Layered architecture".to_string(),
            description: "Code is grouped into layers by directory, separating concerns such as presentation, logic and data access.".to_string(),
            evidence: layers.iter().map(|l| l.name.clone()).collect(),
        });
    }

    let interfaces = view.exported_of_kinds(&[SymbolKind::Interface]);
    if interfaces.len() >= 3 {
        decisions.push(DesignDecisionDoc {
            title: "Interface-driven design".to_string(),
            description: "Exported interfaces define contracts between modules.".to_string(),
            evidence: interfaces.iter().take(5).map(|s| s.name.clone()).collect(),
        });
    }

    let stores: Vec<String> = view
        .symbols()
        .iter()
        .filter(|s| s.parent_id.is_none() && is_store_name(&s.name))
        .map(|s| s.name.clone())
        .collect();
    let has_store_dir = view
        .file_paths()
        .iter()
        .any(|p| format!("/{}", p).contains("/stores/"));
    if !stores.is_empty() || has_store_dir {
        decisions.push(DesignDecisionDoc {
            title: "Centralized state".to_string(),
            description: "Application state lives in dedicated stores rather than being scattered across components.".to_string(),
            evidence: stores.into_iter().take(5).collect(),
        });
    }

    let events: Vec<String> = view
        .symbols()
        .iter()
        .filter(|s| {
            s.name.ends_with("Event") || s.name.ends_with("Emitter") || s.signature.contains("EventEmitter")
        })
        .map(|s| s.name.clone())
        .collect();
    if !events.is_empty() {
        decisions.push(DesignDecisionDoc {
            title: "Event-driven communication".to_string(),
            description: "Components communicate through events instead of direct calls.".to_string(),
            evidence: events.into_iter().take(5).collect(),
        });
    }

    let barrels: Vec<String> = view
        .file_paths()
        .into_iter()
        .filter(|p| file_stem(p) == "index" && p.contains('/'))
        .collect();
    if barrels.len() >= 2 {
        decisions.push(DesignDecisionDoc {
            title: "Barrel modules".to_string(),
            description: "Directories re-export their public API through index files.".to_string(),
            evidence: barrels.into_iter().take(5).collect(),
        });
    }

    decisions
}

fn layer_diagram(layers: &[LayerDoc]) -> Option<String> {
    if layers.is_empty() {
        return None;
    }
    let nodes: Vec<FlowNode> = layers
        .iter()
        .map(|l| {
            FlowNode::new(
                sanitize_id(&l.name),
                format!("{} ({} files)", l.name, l.file_count),
                NodeShape::Rounded,
            )
        })
        .collect();
    let edges: Vec<FlowEdge> = layers
        .iter()
        .flat_map(|l| {
            l.dependencies
                .iter()
                .map(move |d| FlowEdge::solid(sanitize_id(&l.name), sanitize_id(d)))
        })
        .collect();
    Some(render_flowchart(FlowDirection::TopDown, &nodes, &edges))
}

pub fn analyze(view: &RepoMapView) -> ArchitectureDoc {
    let layers = detect_layers(view);
    let key_components = key_components(view);
    let entry_points = entry_points(view);
    let design_decisions = design_decisions(view, &layers);
    let layer_diagram = if view.options().generate_diagrams {
        layer_diagram(&layers)
    } else {
        None
    };

    let map = view.map();
    let mut overview = format!(
        "The codebase contains {} files and {} symbols.",
        map.total_files(),
        map.total_symbols()
    );
    if layers.is_empty() {
        overview.push_str(" No conventional layer directories were detected.");
    } else {
        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        overview.push_str(&format!(
            " It is organized into {} layers: {}.",
            layers.len(),
            names.join(", ")
        ));
    }
    if !entry_points.is_empty() {
        overview.push_str(&format!(" {} entry points were found.", entry_points.len()));
    }

    ArchitectureDoc {
        overview,
        layers,
        key_components,
        entry_points,
        design_decisions,
        layer_diagram,
    }
}

pub fn to_markdown(doc: &ArchitectureDoc, generated_at: &DateTime<Utc>) -> String {
    let mut out = document_header("Architecture", generated_at, &doc.overview);

    out.push_str("## Layers\n\n");
    if doc.layers.is_empty() {
        out.push_str("_No layers detected._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .layers
            .iter()
            .map(|l| {
                vec![
                    l.name.clone(),
                    l.description.clone(),
                    code_list(&l.directories),
                    l.file_count.to_string(),
                    or_dash(&l.dependencies.join(", ")),
                ]
            })
            .collect();
        out.push_str(&table(&["Layer", "Description", "Directories", "Files", "Depends On"], &rows));
    }

    if let Some(diagram) = &doc.layer_diagram {
        out.push_str("## Layer Diagram\n\n");
        out.push_str(&mermaid(diagram));
    }

    out.push_str("## Key Components\n\n");
    if doc.key_components.is_empty() {
        out.push_str("_No exported components found._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .key_components
            .iter()
            .map(|c| {
                vec![
                    format!("`{}`", c.name),
                    c.kind.as_str().to_string(),
                    format!("`{}:{}`", c.file, c.line),
                    c.purpose.clone(),
                    c.importer_count.to_string(),
                ]
            })
            .collect();
        out.push_str(&table(&["Component", "Kind", "Location", "Purpose", "Imported By"], &rows));
    }

    out.push_str("## Entry Points\n\n");
    if doc.entry_points.is_empty() {
        out.push_str("_No entry points detected._\n\n");
    } else {
        for entry in &doc.entry_points {
            out.push_str(&format!("- `{}`: {}\n", entry.file, entry.reason));
        }
        out.push('\n');
    }

    out.push_str("## Design Decisions\n\n");
    if doc.design_decisions.is_empty() {
        out.push_str("_No notable design decisions inferred._\n\n");
    }
    for decision in &doc.design_decisions {
        out.push_str(&format!("### {}\n\n{}\n\n", decision.title, decision.description));
        if !decision.evidence.is_empty() {
            out.push_str(&format!("**Evidence**: {}\n\n", code_list(&decision.evidence)));
        }
    }

    out
}

pub fn condense(doc: &ArchitectureDoc) -> String {
    let mut out = String::from("## Architecture\n");
    out.push_str(&format!("{}\n", doc.overview));
    for layer in &doc.layers {
        out.push_str(&format!("- {}: {}\n", layer.name, layer.directories.join(", ")));
    }
    let components: Vec<&str> = doc
        .key_components
        .iter()
        .take(5)
        .map(|c| c.name.as_str())
        .collect();
    if !components.is_empty() {
        out.push_str(&format!("Key components: {}\n", components.join(", ")));
    }
    let entries: Vec<&str> = doc.entry_points.iter().map(|e| e.file.as_str()).collect();
    if !entries.is_empty() {
        out.push_str(&format!("Entry points: {}\n", entries.join(", ")));
    }
    out
}
