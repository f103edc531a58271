// src/core/analyzers/patterns/naming.rs
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use crate::core::repo_map::SymbolKind;
use crate::core::view::{file_stem, is_test_path, parent_dir, RepoMapView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStyle {
    PascalCase,
    CamelCase,
    UpperSnakeCase,
    KebabCase,
    Mixed,
}

impl fmt::Display for CaseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CaseStyle::PascalCase => "PascalCase",
            CaseStyle::CamelCase => "camelCase",
            CaseStyle::UpperSnakeCase => "UPPER_SNAKE_CASE",
            CaseStyle::KebabCase => "kebab-case",
            CaseStyle::Mixed => "Mixed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConventionDoc {
    pub element: String,
    pub convention: CaseStyle,
    pub affix: Option<String>,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOrganizationRule {
    pub pattern: String,
    pub description: String,
    pub location: String,
    pub file_count: usize,
    pub examples: Vec<String>,
}

pub const CO_LOCATED: &str = "Co-located with source files";
pub const SEGREGATED: &str = "Segregated test directory";

struct CaseRegexes {
    kebab: Regex,
    upper_snake: Regex,
    pascal: Regex,
    camel: Regex,
}

fn case_regexes() -> &'static CaseRegexes {
    static RE: OnceLock<CaseRegexes> = OnceLock::new();
    RE.get_or_init(|| CaseRegexes {
        kebab: Regex::new(r"^[a-z][a-z0-9]*(?:-[a-z0-9]+)+$").expect("static regex"),
        upper_snake: Regex::new(r"^[A-Z][A-Z0-9]*(?:_[A-Z0-9]+)+$|^[A-Z][A-Z0-9]+$")
            .expect("static regex"),
        pascal: Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("static regex"),
        camel: Regex::new(r"^[a-z][A-Za-z0-9]*$").expect("static regex"),
    })
}

/// Case style of a single name; the checks are ordered so styles never overlap
pub fn classify(name: &str) -> Option<CaseStyle> {
    let re = case_regexes();
    if re.kebab.is_match(name) {
        Some(CaseStyle::KebabCase)
    } else if re.upper_snake.is_match(name) {
        Some(CaseStyle::UpperSnakeCase)
    } else if re.pascal.is_match(name) {
        Some(CaseStyle::PascalCase)
    } else if re.camel.is_match(name) {
        Some(CaseStyle::CamelCase)
    } else {
        None
    }
}

/// Unanimous style, else a strict-majority style, else `Mixed`
pub fn dominant_style(names: &[&str]) -> CaseStyle {
    let total = names.len();
    let styles: Vec<Option<CaseStyle>> = names.iter().map(|n| classify(n)).collect();

    let candidates = [
        CaseStyle::PascalCase,
        CaseStyle::CamelCase,
        CaseStyle::UpperSnakeCase,
        CaseStyle::KebabCase,
    ];

    if let Some(style) = candidates
        .iter()
        .find(|c| total > 0 && styles.iter().all(|s| s.as_ref() == Some(*c)))
    {
        return *style;
    }

    candidates
        .iter()
        .find(|c| {
            let count = styles.iter().filter(|s| s.as_ref() == Some(*c)).count();
            count * 2 > total
        })
        .copied()
        .unwrap_or(CaseStyle::Mixed)
}

const COMMON_SUFFIXES: &[&str] = &[
    "Service", "Repository", "Props", "State", "Store", "Handler", "Error", "Type", "Config",
];

fn detect_affix(element_kind: Option<SymbolKind>, names: &[&str]) -> Option<String> {
    if element_kind == Some(SymbolKind::Interface) {
        let prefixed = names
            .iter()
            .filter(|n| {
                let mut chars = n.chars();
                chars.next() == Some('I') && chars.next().is_some_and(|c| c.is_ascii_uppercase())
            })
            .count();
        if prefixed > 0 && prefixed * 2 >= names.len() {
            return Some("I prefix".to_string());
        }
    }
    if element_kind.is_none() {
        return None;
    }

    COMMON_SUFFIXES
        .iter()
        .map(|suffix| {
            let count = names
                .iter()
                .filter(|n| n.len() > suffix.len() && n.ends_with(suffix))
                .count();
            (suffix, count)
        })
        .filter(|(_, count)| *count >= 2)
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        .map(|(suffix, _)| format!("{} suffix", suffix))
}

fn convention_for(
    element: &str,
    element_kind: Option<SymbolKind>,
    names: &[&str],
    max_examples: usize,
) -> Option<NamingConventionDoc> {
    if names.is_empty() {
        return None;
    }
    let convention = dominant_style(names);

    let mut seen = HashSet::new();
    let examples = names
        .iter()
        .filter(|n| convention == CaseStyle::Mixed || classify(n) == Some(convention))
        .filter(|n| seen.insert(**n))
        .take(max_examples)
        .map(|n| n.to_string())
        .collect();

    Some(NamingConventionDoc {
        element: element.to_string(),
        convention,
        affix: detect_affix(element_kind, names),
        examples,
    })
}

/// One convention per element kind that has members
pub fn detect_naming_conventions(view: &RepoMapView) -> Vec<NamingConventionDoc> {
    let max_examples = view.options().max_examples;
    let elements = [
        ("Classes", SymbolKind::Class),
        ("Interfaces", SymbolKind::Interface),
        ("Functions", SymbolKind::Function),
        ("Constants", SymbolKind::Constant),
        ("Types", SymbolKind::Type),
    ];

    let mut conventions: Vec<NamingConventionDoc> = elements
        .iter()
        .filter_map(|(element, kind)| {
            let symbols = view.symbols_of_kind(*kind);
            let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
            convention_for(element, Some(*kind), &names, max_examples)
        })
        .collect();

    let paths = view.file_paths();
    let stems: Vec<&str> = paths
        .iter()
        .map(|p| file_stem(p))
        .filter(|s| !s.starts_with('.'))
        .collect();
    if let Some(files) = convention_for("Files", None, &stems, max_examples) {
        conventions.push(files);
    }

    conventions
}

struct OrganizationPredicate {
    pattern: &'static str,
    description: &'static str,
    matches: fn(&str) -> bool,
}

fn component_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/components/[^/]+\.tsx$").expect("static regex"))
}

fn is_types_file(path: &str) -> bool {
    path.ends_with("/types.ts")
}

fn is_index_file(path: &str) -> bool {
    path.ends_with("/index.ts")
}

fn is_config_file(path: &str) -> bool {
    path.contains(".config.")
}

fn is_component_file(path: &str) -> bool {
    component_regex().is_match(path)
}

fn is_store_file(path: &str) -> bool {
    path.contains("/stores/")
}

fn is_handler_file(path: &str) -> bool {
    path.contains("/handlers/")
}

const ORGANIZATION_PREDICATES: &[OrganizationPredicate] = &[
    OrganizationPredicate {
        pattern: "*.test.* / *.spec.*",
        description: "Tests are named with a .test or .spec infix",
        matches: is_test_path,
    },
    OrganizationPredicate {
        pattern: "*/types.ts",
        description: "Shared type declarations live in dedicated types.ts files",
        matches: is_types_file,
    },
    OrganizationPredicate {
        pattern: "*/index.ts",
        description: "Modules re-export their public surface through index.ts barrels",
        matches: is_index_file,
    },
    OrganizationPredicate {
        pattern: "*.config.*",
        description: "Tool configuration uses *.config.* files",
        matches: is_config_file,
    },
    OrganizationPredicate {
        pattern: "components/*.tsx",
        description: "UI components are TSX files grouped under components/",
        matches: is_component_file,
    },
    OrganizationPredicate {
        pattern: "stores/",
        description: "State stores are grouped under stores/",
        matches: is_store_file,
    },
    OrganizationPredicate {
        pattern: "handlers/",
        description: "Request and event handlers are grouped under handlers/",
        matches: is_handler_file,
    },
];

/// Co-located when the test's directory also holds a non-test file
fn test_location(paths: &[String], tests: &[&String]) -> &'static str {
    let source_dirs: HashSet<&str> = paths
        .iter()
        .filter(|p| !is_test_path(p))
        .map(|p| parent_dir(p))
        .collect();

    let co_located = tests
        .iter()
        .filter(|t| source_dirs.contains(parent_dir(t)))
        .count();
    let segregated = tests.len() - co_located;

    if co_located >= segregated {
        CO_LOCATED
    } else {
        SEGREGATED
    }
}

pub fn detect_file_organization(view: &RepoMapView) -> Vec<FileOrganizationRule> {
    let max_examples = view.options().max_examples;
    let paths = view.file_paths();

    ORGANIZATION_PREDICATES
        .iter()
        .filter_map(|predicate| {
            let matched: Vec<&String> = paths
                .iter()
                .filter(|p| (predicate.matches)(&format!("/{}", p)))
                .collect();
            if matched.is_empty() {
                return None;
            }

            let location = match predicate.pattern {
                "*.test.* / *.spec.*" => test_location(&paths, &matched).to_string(),
                "*.config.*" if matched.iter().all(|p| !p.contains('/')) => {
                    "Project root".to_string()
                }
                "*.config.*" => "Alongside the code they configure".to_string(),
                "*/types.ts" | "*/index.ts" => "Module directories".to_string(),
                "components/*.tsx" => "components/ directories".to_string(),
                other => format!("{} directories", other),
            };

            Some(FileOrganizationRule {
                pattern: predicate.pattern.to_string(),
                description: predicate.description.to_string(),
                location,
                file_count: matched.len(),
                examples: matched
                    .iter()
                    .take(max_examples)
                    .map(|p| p.to_string())
                    .collect(),
            })
        })
        .collect()
}
