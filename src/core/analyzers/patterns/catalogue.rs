// src/core/analyzers/patterns/catalogue.rs
//! Declarative catalogue of architectural and coding patterns.
//!
//! Each pattern owns an ordered list of detectors. Detection walks the
//! detectors in order and keeps at most one example per file, so a single
//! file full of factories does not crowd out the rest of the codebase.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::core::repo_map::{Symbol, SymbolKind};
use crate::core::view::{normalize_path, RepoMapView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternCategory {
    Architectural,
    Coding,
}

#[derive(Debug)]
pub enum Detector {
    /// Class or interface name ends with the suffix
    Suffix(&'static str),
    /// Function name starts with the prefix and is strictly longer than it
    Prefix(&'static str),
    /// Exact name on one of the listed kinds
    ExactName {
        kinds: &'static [SymbolKind],
        name: &'static str,
    },
    SignatureRegex(Regex),
    NameRegex(Regex),
}

impl Detector {
    pub fn matches(&self, symbol: &Symbol) -> bool {
        match self {
            Detector::Suffix(suffix) => {
                matches!(symbol.kind, SymbolKind::Class | SymbolKind::Interface)
                    && symbol.name.ends_with(suffix)
            }
            Detector::Prefix(prefix) => {
                symbol.kind == SymbolKind::Function
                    && symbol.name.len() > prefix.len()
                    && symbol.name.starts_with(prefix)
            }
            Detector::ExactName { kinds, name } => {
                kinds.contains(&symbol.kind) && symbol.name == *name
            }
            Detector::SignatureRegex(re) => re.is_match(&symbol.signature),
            Detector::NameRegex(re) => re.is_match(&symbol.name),
        }
    }
}

#[derive(Debug)]
pub struct PatternDefinition {
    pub name: &'static str,
    pub category: PatternCategory,
    pub description: &'static str,
    pub when_to_use: &'static str,
    pub related: &'static [&'static str],
    pub detectors: Vec<Detector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternExample {
    pub file: String,
    pub line: usize,
    pub symbol: String,
    pub snippet: Option<String>,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("catalogue regex")
}

const METHOD_OR_FUNCTION: &[SymbolKind] = &[SymbolKind::Method, SymbolKind::Function];
const ANY_CALLABLE_OR_CLASS: &[SymbolKind] =
    &[SymbolKind::Method, SymbolKind::Function, SymbolKind::Class];

fn build_catalogue() -> Vec<PatternDefinition> {
    vec![
        PatternDefinition {
            name: "Repository Pattern",
            category: PatternCategory::Architectural,
            description: "Data access is encapsulated behind collection-like objects.",
            when_to_use: "When domain code should not know how records are stored or queried.",
            related: &["Service Layer", "Adapter Pattern"],
            detectors: vec![Detector::Suffix("Repository"), Detector::Suffix("Repo")],
        },
        PatternDefinition {
            name: "Service Layer",
            category: PatternCategory::Architectural,
            description: "Business operations are grouped into service objects.",
            when_to_use: "When several callers share the same workflow or business rules.",
            related: &["Repository Pattern", "Dependency Injection"],
            detectors: vec![Detector::Suffix("Service")],
        },
        PatternDefinition {
            name: "Factory Pattern",
            category: PatternCategory::Architectural,
            description: "Object creation is delegated to dedicated factories.",
            when_to_use: "When construction needs configuration or picks an implementation at runtime.",
            related: &["Builder Pattern", "Singleton Pattern"],
            detectors: vec![Detector::Suffix("Factory"), Detector::Prefix("create")],
        },
        PatternDefinition {
            name: "Singleton Pattern",
            category: PatternCategory::Architectural,
            description: "A single shared instance is exposed through a static accessor.",
            when_to_use: "For process-wide resources such as registries or connection pools.",
            related: &["Factory Pattern"],
            detectors: vec![
                Detector::ExactName {
                    kinds: ANY_CALLABLE_OR_CLASS,
                    name: "getInstance",
                },
                Detector::SignatureRegex(regex(r"\bstatic\s+(?:readonly\s+)?(?:_|#)?instance\b")),
            ],
        },
        PatternDefinition {
            name: "Observer Pattern",
            category: PatternCategory::Architectural,
            description: "Subscribers are notified when a subject emits events.",
            when_to_use: "When producers must not depend on the code reacting to their changes.",
            related: &["Handler Pattern", "Strategy Pattern"],
            detectors: vec![
                Detector::Suffix("Observer"),
                Detector::Suffix("Listener"),
                Detector::Suffix("Emitter"),
                Detector::ExactName {
                    kinds: METHOD_OR_FUNCTION,
                    name: "subscribe",
                },
                Detector::ExactName {
                    kinds: METHOD_OR_FUNCTION,
                    name: "addEventListener",
                },
            ],
        },
        PatternDefinition {
            name: "Adapter Pattern",
            category: PatternCategory::Architectural,
            description: "Third-party or legacy interfaces are wrapped behind a common interface.",
            when_to_use: "When several providers must be interchangeable for the caller.",
            related: &["Bridge Pattern", "Repository Pattern"],
            detectors: vec![Detector::Suffix("Adapter")],
        },
        PatternDefinition {
            name: "Bridge Pattern",
            category: PatternCategory::Architectural,
            description: "An abstraction is decoupled from its implementation across a boundary.",
            when_to_use: "When two sides (for example main and renderer processes) evolve independently.",
            related: &["Adapter Pattern"],
            detectors: vec![Detector::Suffix("Bridge")],
        },
        PatternDefinition {
            name: "Strategy Pattern",
            category: PatternCategory::Architectural,
            description: "Interchangeable algorithms share one interface and are selected at runtime.",
            when_to_use: "When behaviour varies by configuration, provider or input type.",
            related: &["Factory Pattern", "Observer Pattern"],
            detectors: vec![Detector::Suffix("Strategy"), Detector::Suffix("Policy")],
        },
        PatternDefinition {
            name: "Handler Pattern",
            category: PatternCategory::Architectural,
            description: "Requests or events are routed to dedicated handler units.",
            when_to_use: "When inputs arrive through a dispatcher such as IPC, HTTP or a message bus.",
            related: &["Observer Pattern"],
            detectors: vec![Detector::Suffix("Handler"), Detector::Prefix("handle")],
        },
        PatternDefinition {
            name: "Builder Pattern",
            category: PatternCategory::Architectural,
            description: "Complex values are assembled step by step.",
            when_to_use: "When a value has many optional parts or must be validated before use.",
            related: &["Factory Pattern"],
            detectors: vec![Detector::Suffix("Builder"), Detector::Prefix("build")],
        },
        PatternDefinition {
            name: "Async/Await",
            category: PatternCategory::Coding,
            description: "Asynchronous work is expressed with async functions and promises.",
            when_to_use: "For I/O-bound operations: network, filesystem, subprocesses.",
            related: &["Error Handling"],
            detectors: vec![Detector::SignatureRegex(regex(r"\basync\b|Promise<"))],
        },
        PatternDefinition {
            name: "Type Guards",
            category: PatternCategory::Coding,
            description: "Runtime checks narrow union types for the compiler.",
            when_to_use: "When data crosses a trust boundary or a union must be discriminated.",
            related: &["Error Handling"],
            detectors: vec![Detector::SignatureRegex(regex(r"\)\s*:\s*\w+\s+is\s+\w+"))],
        },
        PatternDefinition {
            name: "Error Handling",
            category: PatternCategory::Coding,
            description: "Failures are modelled with dedicated error types or explicit result values.",
            when_to_use: "Whenever callers need to distinguish failure causes.",
            related: &["Async/Await", "Type Guards"],
            detectors: vec![
                Detector::Suffix("Error"),
                Detector::Suffix("Exception"),
                Detector::SignatureRegex(regex(r"\bthrows?\b|Result<")),
            ],
        },
        PatternDefinition {
            name: "Dependency Injection",
            category: PatternCategory::Coding,
            description: "Collaborators are passed in rather than constructed internally.",
            when_to_use: "When components must be testable in isolation or swapped per environment.",
            related: &["Service Layer", "Factory Pattern"],
            detectors: vec![
                Detector::SignatureRegex(regex(
                    r"constructor\s*\(\s*(?:private|public|protected|readonly)\s",
                )),
                Detector::NameRegex(regex(r"^(?:inject|provide)[A-Z]")),
                Detector::Suffix("Container"),
            ],
        },
    ]
}

pub fn catalogue() -> &'static [PatternDefinition] {
    static CATALOGUE: OnceLock<Vec<PatternDefinition>> = OnceLock::new();
    CATALOGUE.get_or_init(build_catalogue)
}

/// Examples for one pattern: detectors in order, first match per file, at most `max_examples`
pub fn find_examples(
    definition: &PatternDefinition,
    view: &RepoMapView,
    max_examples: usize,
) -> Vec<PatternExample> {
    let mut seen_files = HashSet::new();
    let mut examples = Vec::new();

    for detector in &definition.detectors {
        for symbol in view.symbols() {
            if examples.len() >= max_examples {
                return examples;
            }
            if !detector.matches(symbol) {
                continue;
            }
            let file = normalize_path(&symbol.file);
            if !seen_files.insert(file.clone()) {
                continue;
            }
            examples.push(PatternExample {
                file,
                line: symbol.line,
                symbol: symbol.name.clone(),
                snippet: (!symbol.signature.is_empty()).then(|| symbol.signature.clone()),
            });
        }
    }

    examples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerOptions;
    use crate::core::fixtures::{file, map, symbol};

    fn definition(name: &str) -> &'static PatternDefinition {
        catalogue().iter().find(|p| p.name == name).unwrap()
    }

    #[test]
    fn test_prefix_detector_is_strict() {
        let d = Detector::Prefix("create");
        assert!(d.matches(&symbol("1", "createUser", SymbolKind::Function, "a.ts")));
        assert!(!d.matches(&symbol("2", "create", SymbolKind::Function, "a.ts")));
        assert!(!d.matches(&symbol("3", "createUser", SymbolKind::Method, "a.ts")));
    }

    #[test]
    fn test_suffix_detector_only_on_types() {
        let d = Detector::Suffix("Service");
        assert!(d.matches(&symbol("1", "AuthService", SymbolKind::Interface, "a.ts")));
        assert!(!d.matches(&symbol("2", "AuthService", SymbolKind::Variable, "a.ts")));
    }

    #[test]
    fn test_examples_deduplicate_by_file_and_cap() {
        let repo = map(
            vec![file("a.ts"), file("b.ts"), file("c.ts")],
            vec![
                symbol("1", "UserFactory", SymbolKind::Class, "a.ts"),
                symbol("2", "createUser", SymbolKind::Function, "a.ts"),
                symbol("3", "createOrder", SymbolKind::Function, "b.ts"),
                symbol("4", "createInvoice", SymbolKind::Function, "c.ts"),
            ],
            vec![],
        );
        let options = AnalyzerOptions::default();
        let view = RepoMapView::new(&repo, &options);

        let examples = find_examples(definition("Factory Pattern"), &view, 2);
        let names: Vec<_> = examples.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(names, vec!["UserFactory", "createOrder"]);
    }

    #[test]
    fn test_signature_regex_detectors() {
        let guard = symbol("1", "isUser", SymbolKind::Function, "a.ts")
            .sig("function isUser(value: unknown): value is User");
        let asynchronous = symbol("2", "load", SymbolKind::Function, "a.ts")
            .sig("async function load(): Promise<void>");

        assert!(definition("Type Guards").detectors[0].matches(&guard));
        assert!(definition("Async/Await").detectors[0].matches(&asynchronous));
        assert!(!definition("Async/Await").detectors[0].matches(&guard));
    }

    #[test]
    fn test_catalogue_order() {
        let names: Vec<_> = catalogue().iter().map(|p| p.name).collect();
        assert_eq!(names[0], "Repository Pattern");
        assert_eq!(names[9], "Builder Pattern");
        assert_eq!(names[13], "Dependency Injection");
    }
}
