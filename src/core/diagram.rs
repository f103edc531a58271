// src/core/diagram.rs
//! Mermaid text for flow, class and sequence diagrams.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowDirection {
    TopDown,
    LeftRight,
}

impl FlowDirection {
    fn keyword(&self) -> &'static str {
        match self {
            FlowDirection::TopDown => "TD",
            FlowDirection::LeftRight => "LR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeShape {
    Rectangle,
    Rounded,
    Circle,
    Diamond,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub dotted: bool,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, shape: NodeShape) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            shape,
        }
    }
}

impl FlowEdge {
    pub fn solid(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
            dotted: false,
        }
    }

    pub fn labeled(from: impl Into<String>, to: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: Some(label.into()),
            dotted: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
    Protected,
}

impl Visibility {
    fn marker(&self) -> char {
        match self {
            Visibility::Public => '+',
            Visibility::Private => '-',
            Visibility::Protected => '#',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMember {
    pub visibility: Visibility,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    pub name: String,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    Inheritance,
    Composition,
    Aggregation,
    Dependency,
    Implementation,
}

impl Relationship {
    fn arrow(&self) -> &'static str {
        match self {
            Relationship::Inheritance => "<|--",
            Relationship::Composition => "*--",
            Relationship::Aggregation => "o--",
            Relationship::Dependency => "..>",
            Relationship::Implementation => "..|>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRelation {
    pub from: String,
    pub to: String,
    pub kind: Relationship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Sync,
    Async,
    Return,
}

impl MessageKind {
    fn arrow(&self) -> &'static str {
        match self {
            MessageKind::Sync => "->>",
            MessageKind::Async => "-)",
            MessageKind::Return => "-->>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub text: String,
    pub kind: MessageKind,
}

/// Mermaid node ids cannot contain path punctuation
pub fn sanitize_id(raw: &str) -> String {
    let id: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if id.starts_with(|c: char| c.is_ascii_digit()) || id.is_empty() {
        format!("n_{}", id)
    } else {
        id
    }
}

fn sanitize_label(raw: &str) -> String {
    raw.replace(['[', ']', '(', ')', '{', '}', '|', '"'], " ")
        .trim()
        .to_string()
}

pub fn render_flowchart(direction: FlowDirection, nodes: &[FlowNode], edges: &[FlowEdge]) -> String {
    let mut out = format!("graph {}\n", direction.keyword());

    for node in nodes {
        let label = sanitize_label(&node.label);
        let shaped = match node.shape {
            NodeShape::Rectangle => format!("[{}]", label),
            NodeShape::Rounded => format!("({})", label),
            NodeShape::Circle => format!("(({}))", label),
            NodeShape::Diamond => format!("{{{}}}", label),
        };
        out.push_str(&format!("    {}{}\n", node.id, shaped));
    }

    for edge in edges {
        let line = match (&edge.label, edge.dotted) {
            (Some(label), _) => format!("{} -.->|{}| {}", edge.from, sanitize_label(label), edge.to),
            (None, true) => format!("{} -.-> {}", edge.from, edge.to),
            (None, false) => format!("{} --> {}", edge.from, edge.to),
        };
        out.push_str(&format!("    {}\n", line));
    }

    out
}

pub fn render_class_diagram(classes: &[ClassNode], relations: &[ClassRelation]) -> String {
    let mut out = String::from("classDiagram\n");

    for class in classes {
        out.push_str(&format!("    class {} {{\n", sanitize_id(&class.name)));
        for member in &class.members {
            out.push_str(&format!("        {}{}\n", member.visibility.marker(), member.text));
        }
        out.push_str("    }\n");
    }

    for relation in relations {
        out.push_str(&format!(
            "    {} {} {}\n",
            sanitize_id(&relation.from),
            relation.kind.arrow(),
            sanitize_id(&relation.to)
        ));
    }

    out
}

pub fn render_sequence_diagram(participants: &[Participant], messages: &[Message]) -> String {
    let mut out = String::from("sequenceDiagram\n");

    for participant in participants {
        out.push_str(&format!(
            "    participant {} as {}\n",
            participant.id,
            sanitize_label(&participant.label)
        ));
    }

    for message in messages {
        out.push_str(&format!(
            "    {}{}{}: {}\n",
            message.from,
            message.kind.arrow(),
            message.to,
            message.text
        ));
    }

    out
}
