// src/core/analyzers/data_flow.rs
//! State stores, persistence, events and data transformations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::diagram::{
    render_flowchart, render_sequence_diagram, sanitize_id, FlowDirection, FlowEdge, FlowNode,
    Message, MessageKind, NodeShape, Participant,
};
use crate::core::markdown::{code_list, document_header, mermaid, or_dash, table};
use crate::core::purpose::infer_purpose;
use crate::core::repo_map::{Symbol, SymbolKind};
use crate::core::signature::{LexicalSignatureParser, SignatureParser};
use crate::core::view::{file_stem, normalize_path, RepoMapView};

const TRANSFORM_PREFIXES: &[&str] = &[
    "parse",
    "format",
    "transform",
    "convert",
    "serialize",
    "deserialize",
    "map",
    "to",
];

const MAX_DIAGRAM_CONSUMERS: usize = 5;
const MAX_SEQUENCE_FLOWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStoreKind {
    Repository,
    Database,
    Cache,
    Storage,
}

impl DataStoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataStoreKind::Repository => "repository",
            DataStoreKind::Database => "database",
            DataStoreKind::Cache => "cache",
            DataStoreKind::Storage => "storage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDoc {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub description: String,
    pub state: Vec<String>,
    pub actions: Vec<String>,
    /// Files importing the store's module
    pub consumers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStoreDoc {
    pub name: String,
    pub kind: DataStoreKind,
    pub file: String,
    pub operations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFlowDoc {
    pub event: String,
    pub file: String,
    pub emitters: Vec<String>,
    pub handlers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationDoc {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub input: Option<String>,
    pub output: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFlowDoc {
    pub overview: String,
    pub stores: Vec<StoreDoc>,
    pub data_stores: Vec<DataStoreDoc>,
    pub event_flows: Vec<EventFlowDoc>,
    pub transformations: Vec<TransformationDoc>,
    pub flow_diagram: Option<String>,
    pub sequence_diagram: Option<String>,
}

/// `useCartStore`, `cartStore`, `SessionStore`
fn is_store_name(name: &str) -> bool {
    name.len() > "Store".len() && (name.ends_with("Store") || name.ends_with("store"))
}

fn in_store_dir(path: &str) -> bool {
    format!("/{}", path).contains("/stores/")
}

pub fn data_store_kind(name: &str) -> Option<DataStoreKind> {
    if name.contains("Repository") {
        Some(DataStoreKind::Repository)
    } else if name.contains("Database") || name.ends_with("Db") || name.ends_with("DB") || name.starts_with("db") {
        Some(DataStoreKind::Database)
    } else if name.contains("Cache") || name.starts_with("cache") {
        Some(DataStoreKind::Cache)
    } else if name.contains("Storage") || name.starts_with("storage") {
        Some(DataStoreKind::Storage)
    } else {
        None
    }
}

/// `parseConfig` and `toDto` match, `mapping` and `total` do not
pub fn is_transformation_name(name: &str) -> bool {
    TRANSFORM_PREFIXES.iter().any(|prefix| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_uppercase())
    })
}

fn member_names(view: &RepoMapView, parent: &Symbol, kinds: &[SymbolKind]) -> Vec<String> {
    view.children_of(parent)
        .into_iter()
        .filter(|s| kinds.contains(&s.kind))
        .map(|s| s.name.clone())
        .collect()
}

fn detect_stores(view: &RepoMapView) -> Vec<StoreDoc> {
    view.symbols()
        .iter()
        .filter(|s| s.parent_id.is_none())
        .filter(|s| {
            is_store_name(&s.name)
                || (in_store_dir(&normalize_path(&s.file))
                    && s.exported
                    && matches!(s.kind, SymbolKind::Variable | SymbolKind::Constant | SymbolKind::Function | SymbolKind::Class))
        })
        .map(|s| {
            let file = normalize_path(&s.file);
            StoreDoc {
                name: s.name.clone(),
                line: s.line,
                description: infer_purpose(s),
                state: member_names(view, s, &[SymbolKind::Property, SymbolKind::Variable]),
                actions: member_names(view, s, &[SymbolKind::Method, SymbolKind::Function]),
                consumers: view.importers_of(&file),
                file,
            }
        })
        .collect()
}

fn detect_data_stores(view: &RepoMapView) -> Vec<DataStoreDoc> {
    view.symbols_of_kinds(&[SymbolKind::Class, SymbolKind::Variable, SymbolKind::Constant])
        .into_iter()
        .filter(|s| s.parent_id.is_none())
        .filter_map(|s| {
            let kind = data_store_kind(&s.name)?;
            Some(DataStoreDoc {
                name: s.name.clone(),
                kind,
                file: normalize_path(&s.file),
                operations: member_names(view, s, &[SymbolKind::Method]),
            })
        })
        .collect()
}

fn event_stem(event: &str) -> &str {
    event.strip_suffix("Event").unwrap_or(event)
}

fn handles_event(handler: &Symbol, event: &str) -> bool {
    let stem = event_stem(event);
    let named_for = handler
        .name
        .strip_prefix("on")
        .or_else(|| handler.name.strip_prefix("handle"))
        .is_some_and(|rest| !stem.is_empty() && rest.starts_with(stem));
    named_for || handler.signature.contains(event)
}

fn is_handler_name(name: &str) -> bool {
    ["on", "handle"].iter().any(|prefix| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_uppercase())
    })
}

fn detect_event_flows(view: &RepoMapView) -> Vec<EventFlowDoc> {
    let handlers: Vec<&Symbol> = view
        .symbols_of_kinds(&[SymbolKind::Function, SymbolKind::Method])
        .into_iter()
        .filter(|s| is_handler_name(&s.name))
        .collect();

    let mut seen = HashSet::new();
    view.symbols_of_kinds(&[SymbolKind::Type, SymbolKind::Interface, SymbolKind::Class])
        .into_iter()
        .filter(|s| s.name.ends_with("Event") && s.name.len() > "Event".len())
        .filter(|s| seen.insert(s.name.clone()))
        .map(|event| {
            let file = normalize_path(&event.file);
            let matched: Vec<&&Symbol> = handlers
                .iter()
                .filter(|h| handles_event(h, &event.name))
                .collect();
            let handler_files: HashSet<String> =
                matched.iter().map(|h| normalize_path(&h.file)).collect();
            EventFlowDoc {
                event: event.name.clone(),
                emitters: view
                    .importers_of(&file)
                    .into_iter()
                    .filter(|f| !handler_files.contains(f))
                    .collect(),
                handlers: matched.iter().map(|h| h.name.clone()).collect(),
                file,
            }
        })
        .collect()
}

fn detect_transformations(view: &RepoMapView, parser: &dyn SignatureParser) -> Vec<TransformationDoc> {
    view.symbols_of_kinds(&[SymbolKind::Function, SymbolKind::Method])
        .into_iter()
        .filter(|s| is_transformation_name(&s.name))
        .map(|s| TransformationDoc {
            name: s.name.clone(),
            file: normalize_path(&s.file),
            line: s.line,
            input: parser
                .parameters(&s.signature)
                .into_iter()
                .next()
                .and_then(|p| p.type_name),
            output: parser.return_type(&s.signature),
            description: infer_purpose(s),
        })
        .collect()
}

fn flow_diagram(stores: &[StoreDoc], data_stores: &[DataStoreDoc], view: &RepoMapView) -> Option<String> {
    if stores.is_empty() && data_stores.is_empty() {
        return None;
    }

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut known = HashSet::new();

    for data_store in data_stores {
        let id = sanitize_id(&data_store.name);
        if known.insert(id.clone()) {
            nodes.push(FlowNode::new(id, &data_store.name, NodeShape::Circle));
        }
    }

    for store in stores {
        let store_id = sanitize_id(&store.name);
        if known.insert(store_id.clone()) {
            nodes.push(FlowNode::new(store_id.clone(), &store.name, NodeShape::Rounded));
        }
        for consumer in store.consumers.iter().take(MAX_DIAGRAM_CONSUMERS) {
            let consumer_id = sanitize_id(consumer);
            if known.insert(consumer_id.clone()) {
                nodes.push(FlowNode::new(consumer_id.clone(), file_stem(consumer), NodeShape::Rectangle));
            }
            edges.push(FlowEdge::solid(consumer_id, store_id.clone()));
        }
        let imported = view.imports_of(&store.file);
        for data_store in data_stores.iter().filter(|d| imported.contains(&d.file)) {
            edges.push(FlowEdge::labeled(store_id.clone(), sanitize_id(&data_store.name), "persists"));
        }
    }

    Some(render_flowchart(FlowDirection::LeftRight, &nodes, &edges))
}

fn add_participant(participants: &mut Vec<Participant>, id: &str, label: &str) {
    if !participants.iter().any(|p| p.id == id) {
        participants.push(Participant {
            id: id.to_string(),
            label: label.to_string(),
        });
    }
}

fn sequence_diagram(flows: &[EventFlowDoc]) -> Option<String> {
    let flows: Vec<&EventFlowDoc> = flows
        .iter()
        .filter(|f| !f.emitters.is_empty() && !f.handlers.is_empty())
        .take(MAX_SEQUENCE_FLOWS)
        .collect();
    if flows.is_empty() {
        return None;
    }

    let mut participants: Vec<Participant> = Vec::new();
    let mut messages = Vec::new();

    for flow in flows {
        for emitter in &flow.emitters {
            let emitter_id = sanitize_id(file_stem(emitter));
            add_participant(&mut participants, &emitter_id, file_stem(emitter));
            for handler in &flow.handlers {
                let handler_id = sanitize_id(handler);
                add_participant(&mut participants, &handler_id, handler);
                messages.push(Message {
                    from: emitter_id.clone(),
                    to: handler_id,
                    text: flow.event.clone(),
                    kind: MessageKind::Async,
                });
            }
        }
    }

    Some(render_sequence_diagram(&participants, &messages))
}

pub fn analyze(view: &RepoMapView) -> DataFlowDoc {
    let stores = detect_stores(view);
    let data_stores = detect_data_stores(view);
    let event_flows = detect_event_flows(view);
    let transformations = detect_transformations(view, &LexicalSignatureParser);

    let (flow_diagram, sequence_diagram) = if view.options().generate_diagrams {
        (
            flow_diagram(&stores, &data_stores, view),
            sequence_diagram(&event_flows),
        )
    } else {
        (None, None)
    };

    let overview = if stores.is_empty()
        && data_stores.is_empty()
        && event_flows.is_empty()
        && transformations.is_empty()
    {
        "No state stores, persistence layers, events or transformations were detected.".to_string()
    } else {
        format!(
            "Data moves through {} state stores, {} data stores, {} event flows and {} transformations.",
            stores.len(),
            data_stores.len(),
            event_flows.len(),
            transformations.len()
        )
    };

    DataFlowDoc {
        overview,
        stores,
        data_stores,
        event_flows,
        transformations,
        flow_diagram,
        sequence_diagram,
    }
}

pub fn to_markdown(doc: &DataFlowDoc, generated_at: &DateTime<Utc>) -> String {
    let mut out = document_header("Data Flow", generated_at, &doc.overview);

    if let Some(diagram) = &doc.flow_diagram {
        out.push_str("## Flow Diagram\n\n");
        out.push_str(&mermaid(diagram));
    }

    out.push_str("## State Management\n\n");
    if doc.stores.is_empty() {
        out.push_str("_No state stores detected._\n\n");
    }
    for store in &doc.stores {
        out.push_str(&format!("### `{}`\n\n{}\n\n", store.name, store.description));
        out.push_str(&format!("Defined in `{}:{}`\n\n", store.file, store.line));
        if !store.state.is_empty() {
            out.push_str(&format!("**State**: {}\n\n", code_list(&store.state)));
        }
        if !store.actions.is_empty() {
            out.push_str(&format!("**Actions**: {}\n\n", code_list(&store.actions)));
        }
        if !store.consumers.is_empty() {
            out.push_str(&format!("**Used by**: {}\n\n", code_list(&store.consumers)));
        }
    }

    out.push_str("## Data Stores\n\n");
    if doc.data_stores.is_empty() {
        out.push_str("_No data stores detected._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .data_stores
            .iter()
            .map(|d| {
                vec![
                    format!("`{}`", d.name),
                    d.kind.as_str().to_string(),
                    format!("`{}`", d.file),
                    or_dash(&d.operations.join(", ")),
                ]
            })
            .collect();
        out.push_str(&table(&["Store", "Type", "File", "Operations"], &rows));
    }

    out.push_str("## Event Flows\n\n");
    if doc.event_flows.is_empty() {
        out.push_str("_No event flows detected._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .event_flows
            .iter()
            .map(|e| {
                vec![
                    format!("`{}`", e.event),
                    or_dash(&code_list(&e.emitters)),
                    or_dash(&code_list(&e.handlers)),
                ]
            })
            .collect();
        out.push_str(&table(&["Event", "Emitted From", "Handlers"], &rows));
    }
    if let Some(diagram) = &doc.sequence_diagram {
        out.push_str(&mermaid(diagram));
    }

    out.push_str("## Transformations\n\n");
    if doc.transformations.is_empty() {
        out.push_str("_No transformations detected._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .transformations
            .iter()
            .map(|t| {
                vec![
                    format!("`{}`", t.name),
                    or_dash(t.input.as_deref().unwrap_or_default()),
                    or_dash(t.output.as_deref().unwrap_or_default()),
                    format!("`{}:{}`", t.file, t.line),
                ]
            })
            .collect();
        out.push_str(&table(&["Function", "Input", "Output", "Location"], &rows));
    }

    out
}
