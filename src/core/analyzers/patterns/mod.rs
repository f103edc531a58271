// src/core/analyzers/patterns/mod.rs
//! Pattern, naming and file-organization analysis.

mod catalogue;
mod naming;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::markdown::{document_header, or_dash, table};
use crate::core::view::RepoMapView;

pub use catalogue::{
    catalogue, find_examples, Detector, PatternCategory, PatternDefinition, PatternExample,
};
pub use naming::{
    classify, detect_file_organization, detect_naming_conventions, dominant_style, CaseStyle,
    FileOrganizationRule, NamingConventionDoc, CO_LOCATED, SEGREGATED,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDoc {
    pub name: String,
    pub category: PatternCategory,
    pub description: String,
    pub when_to_use: String,
    pub examples: Vec<PatternExample>,
    pub related_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternsDoc {
    pub overview: String,
    pub architectural_patterns: Vec<PatternDoc>,
    pub coding_patterns: Vec<PatternDoc>,
    pub naming_conventions: Vec<NamingConventionDoc>,
    pub file_organization: Vec<FileOrganizationRule>,
}

impl PatternsDoc {
    pub fn pattern_count(&self) -> usize {
        self.architectural_patterns.len() + self.coding_patterns.len()
    }
}

pub fn analyze(view: &RepoMapView) -> PatternsDoc {
    let max_examples = view.options().max_examples.max(1);

    let mut architectural_patterns = Vec::new();
    let mut coding_patterns = Vec::new();

    for definition in catalogue() {
        let examples = find_examples(definition, view, max_examples);
        if examples.is_empty() {
            continue;
        }
        let doc = PatternDoc {
            name: definition.name.to_string(),
            category: definition.category,
            description: definition.description.to_string(),
            when_to_use: definition.when_to_use.to_string(),
            examples,
            related_patterns: definition.related.iter().map(|r| r.to_string()).collect(),
        };
        match definition.category {
            PatternCategory::Architectural => architectural_patterns.push(doc),
            PatternCategory::Coding => coding_patterns.push(doc),
        }
    }

    let naming_conventions = detect_naming_conventions(view);
    let file_organization = detect_file_organization(view);

    let overview = if architectural_patterns.is_empty() && coding_patterns.is_empty() {
        "No recognizable architectural or coding patterns were detected.".to_string()
    } else {
        let names: Vec<&str> = architectural_patterns
            .iter()
            .chain(coding_patterns.iter())
            .map(|p| p.name.as_str())
            .collect();
        format!(
            "Detected {} architectural and {} coding patterns: {}.",
            architectural_patterns.len(),
            coding_patterns.len(),
            names.join(", ")
        )
    };

    PatternsDoc {
        overview,
        architectural_patterns,
        coding_patterns,
        naming_conventions,
        file_organization,
    }
}

fn render_patterns(out: &mut String, patterns: &[PatternDoc]) {
    for pattern in patterns {
        out.push_str(&format!("### {}\n\n", pattern.name));
        out.push_str(&format!("{}\n\n", pattern.description));
        out.push_str(&format!("**When to use**: {}\n\n", pattern.when_to_use));
        out.push_str("**Examples**:\n");
        for example in &pattern.examples {
            out.push_str(&format!(
                "- `{}` in `{}:{}`\n",
                example.symbol, example.file, example.line
            ));
            if let Some(snippet) = &example.snippet {
                out.push_str(&format!("  ```\n  {}\n  ```\n", snippet));
            }
        }
        out.push('\n');
        if !pattern.related_patterns.is_empty() {
            out.push_str(&format!(
                "**Related**: {}\n\n",
                pattern.related_patterns.join(", ")
            ));
        }
    }
}

pub fn to_markdown(doc: &PatternsDoc, generated_at: &DateTime<Utc>) -> String {
    let mut out = document_header("Code Patterns", generated_at, &doc.overview);

    out.push_str("## Architectural Patterns\n\n");
    if doc.architectural_patterns.is_empty() {
        out.push_str("_No architectural patterns detected._\n\n");
    }
    render_patterns(&mut out, &doc.architectural_patterns);

    out.push_str("## Coding Patterns\n\n");
    if doc.coding_patterns.is_empty() {
        out.push_str("_No coding patterns detected._\n\n");
    }
    render_patterns(&mut out, &doc.coding_patterns);

    out.push_str("## Naming Conventions\n\n");
    let rows: Vec<Vec<String>> = doc
        .naming_conventions
        .iter()
        .map(|c| {
            vec![
                c.element.clone(),
                c.convention.to_string(),
                or_dash(c.affix.as_deref().unwrap_or_default()),
                c.examples.join(", "),
            ]
        })
        .collect();
    out.push_str(&table(
        &["Element", "Convention", "Prefix/Suffix", "Examples"],
        &rows,
    ));

    out.push_str("## File Organization\n\n");
    if doc.file_organization.is_empty() {
        out.push_str("_No file organization rules detected._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .file_organization
            .iter()
            .map(|r| {
                vec![
                    format!("`{}`", r.pattern),
                    r.description.clone(),
                    r.location.clone(),
                    r.examples.join(", "),
                ]
            })
            .collect();
        out.push_str(&table(&["Pattern", "Description", "Location", "Examples"], &rows));
    }

    out
}

/// Compact summary for context-constrained consumers
pub fn condense(doc: &PatternsDoc) -> String {
    let mut out = String::from("## Patterns\n");
    for pattern in doc.architectural_patterns.iter().chain(doc.coding_patterns.iter()) {
        let symbols: Vec<&str> = pattern.examples.iter().map(|e| e.symbol.as_str()).collect();
        out.push_str(&format!("- {}: {}\n", pattern.name, symbols.join(", ")));
    }
    if !doc.naming_conventions.is_empty() {
        let naming: Vec<String> = doc
            .naming_conventions
            .iter()
            .map(|c| format!("{} {}", c.element, c.convention))
            .collect();
        out.push_str(&format!("Naming: {}\n", naming.join("; ")));
    }
    for rule in &doc.file_organization {
        out.push_str(&format!("- `{}`: {}\n", rule.pattern, rule.location));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerOptions;
    use crate::core::fixtures::{file, map, symbol};
    use crate::core::repo_map::SymbolKind;
    use chrono::TimeZone;

    fn sample() -> crate::core::repo_map::RepoMap {
        map(
            vec![
                file("src/db/UserRepository.ts"),
                file("src/db/OrderRepository.ts"),
                file("src/services/auth.ts"),
            ],
            vec![
                symbol("1", "UserRepository", SymbolKind::Class, "src/db/UserRepository.ts")
                    .exported()
                    .refs(8),
                symbol("2", "OrderRepository", SymbolKind::Class, "src/db/OrderRepository.ts"),
                symbol("3", "login", SymbolKind::Function, "src/services/auth.ts")
                    .sig("async function login(user: string): Promise<Session>"),
            ],
            vec![],
        )
    }

    #[test]
    fn test_repository_pattern_detected() {
        let repo = sample();
        let options = AnalyzerOptions::default();
        let doc = analyze(&RepoMapView::new(&repo, &options));

        let repository = doc
            .architectural_patterns
            .iter()
            .find(|p| p.name == "Repository Pattern")
            .unwrap();
        assert!(repository
            .examples
            .iter()
            .any(|e| e.file == "src/db/UserRepository.ts"));
        assert_eq!(doc.coding_patterns[0].name, "Async/Await");
    }

    #[test]
    fn test_every_pattern_has_bounded_examples() {
        let repo = sample();
        let options = AnalyzerOptions {
            max_examples: 1,
            ..AnalyzerOptions::default()
        };
        let doc = analyze(&RepoMapView::new(&repo, &options));

        for pattern in doc.architectural_patterns.iter().chain(doc.coding_patterns.iter()) {
            assert!(!pattern.examples.is_empty());
            assert!(pattern.examples.len() <= 1);
        }
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let repo = sample();
        let options = AnalyzerOptions::default();
        let view = RepoMapView::new(&repo, &options);
        assert_eq!(analyze(&view), analyze(&view));
    }

    #[test]
    fn test_markdown_has_naming_table() {
        let repo = sample();
        let options = AnalyzerOptions::default();
        let doc = analyze(&RepoMapView::new(&repo, &options));
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let md = to_markdown(&doc, &at);
        assert!(md.starts_with("# Code Patterns\n\n> Generated: "));
        assert!(md.contains("## Overview"));
        assert!(md.contains("| Element | Convention | Prefix/Suffix | Examples |"));
        assert!(md.contains("| Classes | PascalCase | Repository suffix |"));
    }
}
