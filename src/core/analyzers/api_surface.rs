// src/core/analyzers/api_surface.rs
//! Exported interfaces, classes, functions and types with their members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::diagram::{
    render_class_diagram, ClassMember, ClassNode, ClassRelation, Relationship, Visibility,
};
use crate::core::markdown::{document_header, mermaid, or_dash, table};
use crate::core::purpose::infer_purpose;
use crate::core::repo_map::{Symbol, SymbolKind};
use crate::core::signature::{LexicalSignatureParser, ParameterDoc, SignatureParser};
use crate::core::view::{normalize_path, RepoMapView};

/// Classes and interfaces beyond this are left out of the diagram
const MAX_DIAGRAM_TYPES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDoc {
    pub name: String,
    pub type_name: Option<String>,
    pub optional: bool,
    pub readonly: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDoc {
    pub name: String,
    pub signature: String,
    pub description: String,
    pub parameters: Vec<ParameterDoc>,
    pub return_type: Option<String>,
    pub is_async: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDoc {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub description: String,
    pub extends: Vec<String>,
    pub properties: Vec<PropertyDoc>,
    pub methods: Vec<MethodDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDoc {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub description: String,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub constructor: Vec<ParameterDoc>,
    pub properties: Vec<PropertyDoc>,
    pub methods: Vec<MethodDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDoc {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub signature: String,
    pub description: String,
    pub parameters: Vec<ParameterDoc>,
    pub return_type: Option<String>,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDoc {
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: usize,
    pub definition: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSurfaceDoc {
    pub overview: String,
    pub interfaces: Vec<InterfaceDoc>,
    pub classes: Vec<ClassDoc>,
    pub functions: Vec<FunctionDoc>,
    pub types: Vec<TypeDoc>,
    pub class_diagram: Option<String>,
}

impl ApiSurfaceDoc {
    pub fn export_count(&self) -> usize {
        self.interfaces.len() + self.classes.len() + self.functions.len() + self.types.len()
    }
}

/// Hidden from the public surface unless private members are requested
pub fn is_private(symbol: &Symbol) -> bool {
    if symbol.has_modifier("private") || symbol.name.starts_with('#') {
        return true;
    }
    symbol
        .documentation
        .as_deref()
        .is_some_and(|doc| doc.contains("@private") || doc.contains("@internal"))
}

fn is_async(symbol: &Symbol) -> bool {
    symbol.has_modifier("async")
        || symbol.signature.split_whitespace().any(|word| word == "async")
}

/// `BaseRepository<User>` -> `BaseRepository`
fn base_type_name(type_name: &str) -> &str {
    type_name
        .split('<')
        .next()
        .unwrap_or(type_name)
        .trim()
}

struct Extractor<'v, 'a> {
    view: &'v RepoMapView<'a>,
    parser: &'v dyn SignatureParser,
}

impl<'v, 'a> Extractor<'v, 'a> {
    fn visible(&self, symbol: &Symbol) -> bool {
        self.view.options().include_private || !is_private(symbol)
    }

    fn members(&self, parent: &Symbol, kind: SymbolKind) -> Vec<&'a Symbol> {
        self.view
            .children_of(parent)
            .into_iter()
            .filter(|s| s.kind == kind && self.visible(s))
            .collect()
    }

    fn property(&self, symbol: &Symbol) -> PropertyDoc {
        let shape = self.parser.property(&symbol.signature);
        PropertyDoc {
            name: symbol.name.clone(),
            type_name: shape.type_name,
            optional: shape.optional,
            readonly: shape.readonly || symbol.has_modifier("readonly"),
            description: infer_purpose(symbol),
        }
    }

    fn method(&self, symbol: &Symbol) -> MethodDoc {
        MethodDoc {
            name: symbol.name.clone(),
            signature: symbol.signature.trim().to_string(),
            description: infer_purpose(symbol),
            parameters: self.parser.parameters(&symbol.signature),
            return_type: self.parser.return_type(&symbol.signature),
            is_async: is_async(symbol),
            is_static: symbol.has_modifier("static"),
        }
    }

    fn interface(&self, symbol: &Symbol) -> InterfaceDoc {
        InterfaceDoc {
            name: symbol.name.clone(),
            file: normalize_path(&symbol.file),
            line: symbol.line,
            description: infer_purpose(symbol),
            extends: self.parser.heritage(&symbol.signature).extends,
            properties: self
                .members(symbol, SymbolKind::Property)
                .into_iter()
                .map(|s| self.property(s))
                .collect(),
            methods: self
                .members(symbol, SymbolKind::Method)
                .into_iter()
                .map(|s| self.method(s))
                .collect(),
        }
    }

    fn class(&self, symbol: &Symbol) -> ClassDoc {
        let heritage = self.parser.heritage(&symbol.signature);
        let methods = self.members(symbol, SymbolKind::Method);
        let constructor = methods
            .iter()
            .find(|m| m.name == "constructor")
            .map(|m| self.parser.parameters(&m.signature))
            .unwrap_or_default();

        ClassDoc {
            name: symbol.name.clone(),
            file: normalize_path(&symbol.file),
            line: symbol.line,
            description: infer_purpose(symbol),
            extends: heritage.extends.into_iter().next(),
            implements: heritage.implements,
            constructor,
            properties: self
                .members(symbol, SymbolKind::Property)
                .into_iter()
                .map(|s| self.property(s))
                .collect(),
            methods: methods
                .into_iter()
                .filter(|m| m.name != "constructor")
                .map(|m| self.method(m))
                .collect(),
        }
    }

    fn function(&self, symbol: &Symbol) -> FunctionDoc {
        FunctionDoc {
            name: symbol.name.clone(),
            file: normalize_path(&symbol.file),
            line: symbol.line,
            signature: symbol.signature.trim().to_string(),
            description: infer_purpose(symbol),
            parameters: self.parser.parameters(&symbol.signature),
            return_type: self.parser.return_type(&symbol.signature),
            is_async: is_async(symbol),
        }
    }

    fn type_alias(&self, symbol: &Symbol) -> TypeDoc {
        TypeDoc {
            name: symbol.name.clone(),
            kind: symbol.kind,
            file: normalize_path(&symbol.file),
            line: symbol.line,
            definition: symbol.signature.trim().to_string(),
            description: infer_purpose(symbol),
        }
    }

    fn exported(&self, kinds: &[SymbolKind]) -> Vec<&'a Symbol> {
        self.view
            .exported_of_kinds(kinds)
            .into_iter()
            .filter(|s| s.parent_id.is_none() && self.visible(s))
            .collect()
    }
}

fn member_visibility(view: &RepoMapView, class: &ClassDoc, name: &str) -> Visibility {
    let member = view
        .symbols_named(name)
        .into_iter()
        .find(|s| normalize_path(&s.file) == class.file && s.parent_id.is_some());
    match member {
        Some(s) if s.has_modifier("private") || s.name.starts_with('#') => Visibility::Private,
        Some(s) if s.has_modifier("protected") => Visibility::Protected,
        _ => Visibility::Public,
    }
}

fn class_diagram(view: &RepoMapView, interfaces: &[InterfaceDoc], classes: &[ClassDoc]) -> Option<String> {
    if interfaces.is_empty() && classes.is_empty() {
        return None;
    }

    let mut nodes = Vec::new();
    let mut relations = Vec::new();

    for interface in interfaces.iter().take(MAX_DIAGRAM_TYPES) {
        let mut members: Vec<ClassMember> = interface
            .properties
            .iter()
            .map(|p| ClassMember {
                visibility: Visibility::Public,
                text: format!("{}: {}", p.name, p.type_name.as_deref().unwrap_or("unknown")),
            })
            .collect();
        members.extend(interface.methods.iter().map(|m| ClassMember {
            visibility: Visibility::Public,
            text: format!("{}()", m.name),
        }));
        nodes.push(ClassNode {
            name: interface.name.clone(),
            members,
        });
        for parent in &interface.extends {
            relations.push(ClassRelation {
                from: base_type_name(parent).to_string(),
                to: interface.name.clone(),
                kind: Relationship::Inheritance,
            });
        }
    }

    for class in classes.iter().take(MAX_DIAGRAM_TYPES) {
        let mut members: Vec<ClassMember> = class
            .properties
            .iter()
            .map(|p| ClassMember {
                visibility: member_visibility(view, class, &p.name),
                text: format!("{}: {}", p.name, p.type_name.as_deref().unwrap_or("unknown")),
            })
            .collect();
        members.extend(class.methods.iter().map(|m| ClassMember {
            visibility: member_visibility(view, class, &m.name),
            text: format!("{}()", m.name),
        }));
        nodes.push(ClassNode {
            name: class.name.clone(),
            members,
        });
        if let Some(parent) = &class.extends {
            relations.push(ClassRelation {
                from: base_type_name(parent).to_string(),
                to: class.name.clone(),
                kind: Relationship::Inheritance,
            });
        }
        for contract in &class.implements {
            relations.push(ClassRelation {
                from: class.name.clone(),
                to: base_type_name(contract).to_string(),
                kind: Relationship::Implementation,
            });
        }
    }

    Some(render_class_diagram(&nodes, &relations))
}

pub fn analyze(view: &RepoMapView) -> ApiSurfaceDoc {
    analyze_with_parser(view, &LexicalSignatureParser)
}

/// Same as [`analyze`] with a caller-provided signature parser
pub fn analyze_with_parser(view: &RepoMapView, parser: &dyn SignatureParser) -> ApiSurfaceDoc {
    let extractor = Extractor { view, parser };

    let interfaces: Vec<InterfaceDoc> = extractor
        .exported(&[SymbolKind::Interface])
        .into_iter()
        .map(|s| extractor.interface(s))
        .collect();
    let classes: Vec<ClassDoc> = extractor
        .exported(&[SymbolKind::Class])
        .into_iter()
        .map(|s| extractor.class(s))
        .collect();
    let functions: Vec<FunctionDoc> = extractor
        .exported(&[SymbolKind::Function])
        .into_iter()
        .map(|s| extractor.function(s))
        .collect();
    let types: Vec<TypeDoc> = extractor
        .exported(&[SymbolKind::Type, SymbolKind::Enum])
        .into_iter()
        .map(|s| extractor.type_alias(s))
        .collect();

    let class_diagram = if view.options().generate_diagrams {
        class_diagram(view, &interfaces, &classes)
    } else {
        None
    };

    let overview = format!(
        "The public API exposes {} interfaces, {} classes, {} functions and {} types.",
        interfaces.len(),
        classes.len(),
        functions.len(),
        types.len()
    );

    ApiSurfaceDoc {
        overview,
        interfaces,
        classes,
        functions,
        types,
        class_diagram,
    }
}

fn parameter_table(parameters: &[ParameterDoc]) -> String {
    let rows: Vec<Vec<String>> = parameters
        .iter()
        .map(|p| {
            vec![
                format!("`{}`", p.name),
                or_dash(p.type_name.as_deref().unwrap_or_default()),
                if p.optional { "No" } else { "Yes" }.to_string(),
                or_dash(p.default_value.as_deref().unwrap_or_default()),
            ]
        })
        .collect();
    table(&["Parameter", "Type", "Required", "Default"], &rows)
}

fn property_table(properties: &[PropertyDoc]) -> String {
    let rows: Vec<Vec<String>> = properties
        .iter()
        .map(|p| {
            let mut name = format!("`{}`", p.name);
            if p.readonly {
                name.push_str(" (readonly)");
            }
            vec![
                name,
                or_dash(p.type_name.as_deref().unwrap_or_default()),
                if p.optional { "No" } else { "Yes" }.to_string(),
                p.description.clone(),
            ]
        })
        .collect();
    table(&["Property", "Type", "Required", "Description"], &rows)
}

fn render_methods(out: &mut String, methods: &[MethodDoc]) {
    if methods.is_empty() {
        return;
    }
    out.push_str("**Methods**:\n\n");
    for method in methods {
        let mut flags = Vec::new();
        if method.is_static {
            flags.push("static");
        }
        if method.is_async {
            flags.push("async");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" _({})_", flags.join(", "))
        };
        let returns = method
            .return_type
            .as_deref()
            .map(|r| format!(" → `{}`", r))
            .unwrap_or_default();
        out.push_str(&format!(
            "- `{}`{}{}: {}\n",
            method.name, returns, flags, method.description
        ));
    }
    out.push('\n');
}

pub fn to_markdown(doc: &ApiSurfaceDoc, generated_at: &DateTime<Utc>) -> String {
    let mut out = document_header("API Surface", generated_at, &doc.overview);

    out.push_str("## Interfaces\n\n");
    if doc.interfaces.is_empty() {
        out.push_str("_No exported interfaces._\n\n");
    }
    for interface in &doc.interfaces {
        out.push_str(&format!("### `{}`\n\n{}\n\n", interface.name, interface.description));
        out.push_str(&format!("Defined in `{}:{}`\n\n", interface.file, interface.line));
        if !interface.extends.is_empty() {
            out.push_str(&format!("**Extends**: {}\n\n", interface.extends.join(", ")));
        }
        if !interface.properties.is_empty() {
            out.push_str(&property_table(&interface.properties));
        }
        render_methods(&mut out, &interface.methods);
    }

    out.push_str("## Classes\n\n");
    if doc.classes.is_empty() {
        out.push_str("_No exported classes._\n\n");
    }
    for class in &doc.classes {
        out.push_str(&format!("### `{}`\n\n{}\n\n", class.name, class.description));
        out.push_str(&format!("Defined in `{}:{}`\n\n", class.file, class.line));
        if let Some(parent) = &class.extends {
            out.push_str(&format!("**Extends**: `{}`\n\n", parent));
        }
        if !class.implements.is_empty() {
            out.push_str(&format!("**Implements**: {}\n\n", class.implements.join(", ")));
        }
        if !class.constructor.is_empty() {
            out.push_str("**Constructor**:\n\n");
            out.push_str(&parameter_table(&class.constructor));
        }
        if !class.properties.is_empty() {
            out.push_str(&property_table(&class.properties));
        }
        render_methods(&mut out, &class.methods);
    }

    out.push_str("## Functions\n\n");
    if doc.functions.is_empty() {
        out.push_str("_No exported functions._\n\n");
    }
    for function in &doc.functions {
        out.push_str(&format!("### `{}`\n\n{}\n\n", function.name, function.description));
        if !function.signature.is_empty() {
            out.push_str(&format!("```typescript\n{}\n```\n\n", function.signature));
        }
        if !function.parameters.is_empty() {
            out.push_str(&parameter_table(&function.parameters));
        }
        if let Some(returns) = &function.return_type {
            out.push_str(&format!("**Returns**: `{}`\n\n", returns));
        }
        out.push_str(&format!("Defined in `{}:{}`\n\n", function.file, function.line));
    }

    out.push_str("## Types\n\n");
    if doc.types.is_empty() {
        out.push_str("_No exported types._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .types
            .iter()
            .map(|t| {
                vec![
                    format!("`{}`", t.name),
                    t.kind.as_str().to_string(),
                    t.description.clone(),
                    format!("`{}:{}`", t.file, t.line),
                ]
            })
            .collect();
        out.push_str(&table(&["Type", "Kind", "Description", "Location"], &rows));
    }

    if let Some(diagram) = &doc.class_diagram {
        out.push_str("## Class Diagram\n\n");
        out.push_str(&mermaid(diagram));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerOptions;
    use crate::core::fixtures::{file, map, symbol};
    use crate::core::repo_map::RepoMap;
    use chrono::TimeZone;

    fn sample() -> RepoMap {
        map(
            vec![file("src/db/UserRepository.ts"), file("src/api.ts")],
            vec![
                symbol("c", "UserRepository", SymbolKind::Class, "src/db/UserRepository.ts")
                    .exported()
                    .sig("export class UserRepository extends BaseRepository<User> implements IRepository {"),
                symbol("ctor", "constructor", SymbolKind::Method, "src/db/UserRepository.ts")
                    .parent("c")
                    .sig("constructor(private readonly db: Database)"),
                symbol("find", "findById", SymbolKind::Method, "src/db/UserRepository.ts")
                    .parent("c")
                    .modifier("async")
                    .sig("async findById(id: string): Promise<User | null>"),
                symbol("cache", "cache", SymbolKind::Property, "src/db/UserRepository.ts")
                    .parent("c")
                    .modifier("private")
                    .sig("private cache: Map<string, User>"),
                symbol("tmp", "resetForTests", SymbolKind::Method, "src/db/UserRepository.ts")
                    .parent("c")
                    .doc("/** @internal */"),
                symbol("f", "createClient", SymbolKind::Function, "src/api.ts")
                    .exported()
                    .sig("export function createClient(url: string, retries = 3): Client"),
                symbol("t", "UserId", SymbolKind::Type, "src/api.ts")
                    .exported()
                    .sig("type UserId = string"),
                symbol("hidden", "helper", SymbolKind::Function, "src/api.ts"),
            ],
            vec![],
        )
    }

    #[test]
    fn test_private_members_excluded_by_default() {
        let repo = sample();
        let options = AnalyzerOptions::default();
        let doc = analyze(&RepoMapView::new(&repo, &options));

        let class = &doc.classes[0];
        assert_eq!(class.extends.as_deref(), Some("BaseRepository<User>"));
        assert_eq!(class.implements, vec!["IRepository"]);
        assert_eq!(class.constructor[0].name, "db");
        assert!(class.properties.is_empty());

        let methods: Vec<&str> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["findById"]);
        assert!(class.methods[0].is_async);
        assert_eq!(class.methods[0].return_type.as_deref(), Some("Promise<User | null>"));
    }

    #[test]
    fn test_include_private_keeps_everything() {
        let repo = sample();
        let options = AnalyzerOptions {
            include_private: true,
            ..AnalyzerOptions::default()
        };
        let doc = analyze(&RepoMapView::new(&repo, &options));

        let class = &doc.classes[0];
        assert_eq!(class.properties[0].name, "cache");
        assert_eq!(class.methods.len(), 2);
    }

    #[test]
    fn test_functions_and_types() {
        let repo = sample();
        let options = AnalyzerOptions::default();
        let doc = analyze(&RepoMapView::new(&repo, &options));

        assert_eq!(doc.functions.len(), 1);
        let function = &doc.functions[0];
        assert_eq!(function.parameters.len(), 2);
        assert_eq!(function.return_type.as_deref(), Some("Client"));
        assert_eq!(doc.types[0].name, "UserId");
        assert_eq!(doc.export_count(), 3);
    }

    #[test]
    fn test_class_diagram_relations() {
        let repo = sample();
        let options = AnalyzerOptions::default();
        let doc = analyze(&RepoMapView::new(&repo, &options));

        let diagram = doc.class_diagram.as_deref().unwrap();
        assert!(diagram.starts_with("classDiagram\n"));
        assert!(diagram.contains("BaseRepository <|-- UserRepository"));
        assert!(diagram.contains("UserRepository ..|> IRepository"));
        assert!(diagram.contains("+findById()"));
    }

    #[test]
    fn test_markdown_sections() {
        let repo = sample();
        let options = AnalyzerOptions::default();
        let doc = analyze(&RepoMapView::new(&repo, &options));
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let md = to_markdown(&doc, &at);
        assert!(md.starts_with("# API Surface\n"));
        assert!(md.contains("### `UserRepository`"));
        assert!(md.contains("| Parameter | Type | Required | Default |"));
        assert!(md.contains("_No exported interfaces._"));
    }
}
