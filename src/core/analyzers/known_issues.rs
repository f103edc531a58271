// src/core/analyzers/known_issues.rs
//! Technical debt, limitations, workarounds and suggested improvements.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::core::analyzers::Severity;
use crate::core::markdown::{document_header, table};
use crate::core::repo_map::{Symbol, SymbolKind};
use crate::core::signature::{LexicalSignatureParser, SignatureParser};
use crate::core::view::{normalize_path, RepoMapView};

pub const LARGE_FILE_LINES: usize = 500;
pub const LARGE_CLASS_METHODS: usize = 20;
pub const LONG_PARAMETER_LIST: usize = 5;
pub const HIGH_COUPLING_IMPORTS: usize = 15;

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(TODO|FIXME|HACK|XXX)\b[:\s-]*(.*)").expect("static regex"))
}

fn deprecated_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@deprecated\b\s*(.*)").expect("static regex"))
}

fn limitation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@limitation\b\s*(.*)").expect("static regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtCategory {
    Deprecation,
    Marker,
    LargeFile,
    LargeClass,
    LongParameterList,
    HighCoupling,
}

impl DebtCategory {
    pub fn label(&self) -> &'static str {
        match self {
            DebtCategory::Deprecation => "Deprecation",
            DebtCategory::Marker => "Code marker",
            DebtCategory::LargeFile => "Large file",
            DebtCategory::LargeClass => "Large class",
            DebtCategory::LongParameterList => "Long parameter list",
            DebtCategory::HighCoupling => "High coupling",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalDebtDoc {
    pub category: DebtCategory,
    pub description: String,
    /// `file:line` for symbol findings, the file path for file findings
    pub location: String,
    pub severity: Severity,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitationDoc {
    pub description: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkaroundDoc {
    pub description: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementDoc {
    pub title: String,
    pub description: String,
    pub priority: Severity,
    pub related_items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownIssuesDoc {
    pub overview: String,
    pub technical_debt: Vec<TechnicalDebtDoc>,
    pub limitations: Vec<LimitationDoc>,
    pub workarounds: Vec<WorkaroundDoc>,
    pub improvements: Vec<ImprovementDoc>,
}

impl KnownIssuesDoc {
    pub fn debt_count(&self) -> usize {
        self.technical_debt.len()
    }

    pub fn debt_with_severity(&self, severity: Severity) -> usize {
        self.technical_debt
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

pub fn is_deprecated(symbol: &Symbol) -> bool {
    symbol.has_modifier("deprecated")
        || symbol
            .documentation
            .as_deref()
            .is_some_and(|d| d.contains("@deprecated"))
}

fn marker_severity(marker: &str) -> Severity {
    match marker {
        "TODO" => Severity::Low,
        "FIXME" => Severity::Medium,
        _ => Severity::High,
    }
}

/// Text of a documentation line with comment punctuation removed
fn doc_text(line: &str) -> &str {
    line.trim()
        .trim_start_matches("/**")
        .trim_start_matches("/*")
        .trim_start_matches("//")
        .trim_start_matches('*')
        .trim_end_matches("*/")
        .trim()
}

fn deprecation_item(symbol: &Symbol) -> TechnicalDebtDoc {
    let reason = symbol
        .documentation
        .as_deref()
        .and_then(|d| deprecated_regex().captures(d))
        .and_then(|c| c.get(1))
        .map(|m| doc_text(m.as_str()).to_string())
        .filter(|r| !r.is_empty());

    let description = match reason {
        Some(reason) => format!("`{}` is deprecated: {}", symbol.name, reason),
        None => format!("`{}` is deprecated", symbol.name),
    };

    TechnicalDebtDoc {
        category: DebtCategory::Deprecation,
        description,
        location: symbol.location(),
        severity: Severity::Medium,
        suggestion: format!("Migrate callers away from `{}` and remove it", symbol.name),
    }
}

fn marker_items(symbol: &Symbol) -> Vec<TechnicalDebtDoc> {
    let Some(documentation) = symbol.documentation.as_deref() else {
        return Vec::new();
    };

    documentation
        .lines()
        .filter_map(|line| marker_regex().captures(line))
        .filter_map(|captures| {
            let marker = captures.get(1)?.as_str();
            let note = captures.get(2).map(|m| doc_text(m.as_str())).unwrap_or_default();
            Some(TechnicalDebtDoc {
                category: DebtCategory::Marker,
                description: if note.is_empty() {
                    format!("{} in `{}`", marker, symbol.name)
                } else {
                    format!("{} in `{}`: {}", marker, symbol.name, note)
                },
                location: symbol.location(),
                severity: marker_severity(marker),
                suggestion: "Resolve the note or track it as an issue".to_string(),
            })
        })
        .collect()
}

fn symbol_debt(view: &RepoMapView, parser: &dyn SignatureParser) -> Vec<TechnicalDebtDoc> {
    let mut items = Vec::new();

    for symbol in view.symbols() {
        if is_deprecated(symbol) {
            items.push(deprecation_item(symbol));
            continue;
        }

        items.extend(marker_items(symbol));

        if symbol.kind == SymbolKind::Class {
            let methods = view
                .children_of(symbol)
                .iter()
                .filter(|s| s.kind == SymbolKind::Method)
                .count();
            if methods > LARGE_CLASS_METHODS {
                items.push(TechnicalDebtDoc {
                    category: DebtCategory::LargeClass,
                    description: format!("`{}` has {} methods", symbol.name, methods),
                    location: symbol.location(),
                    severity: Severity::Medium,
                    suggestion: "Split responsibilities into smaller collaborating classes".to_string(),
                });
            }
        }

        if matches!(symbol.kind, SymbolKind::Function | SymbolKind::Method) {
            let parameters = parser.parameters(&symbol.signature).len();
            if parameters > LONG_PARAMETER_LIST {
                items.push(TechnicalDebtDoc {
                    category: DebtCategory::LongParameterList,
                    description: format!("`{}` takes {} parameters", symbol.name, parameters),
                    location: symbol.location(),
                    severity: Severity::Low,
                    suggestion: "Group related parameters into an options object".to_string(),
                });
            }
        }
    }

    items
}

fn file_debt(view: &RepoMapView) -> Vec<TechnicalDebtDoc> {
    let mut items = Vec::new();

    for file in view.files() {
        let path = normalize_path(file.id());
        if file.line_count > LARGE_FILE_LINES {
            items.push(TechnicalDebtDoc {
                category: DebtCategory::LargeFile,
                description: format!("File has {} lines", file.line_count),
                location: path.clone(),
                severity: Severity::Medium,
                suggestion: "Split the file into focused modules".to_string(),
            });
        }

        let imports = view.imports_of(&path).len();
        if imports > HIGH_COUPLING_IMPORTS {
            items.push(TechnicalDebtDoc {
                category: DebtCategory::HighCoupling,
                description: format!("File imports {} internal modules", imports),
                location: path,
                severity: Severity::Low,
                suggestion: "Introduce a facade or reduce direct dependencies".to_string(),
            });
        }
    }

    items
}

fn detect_limitations(view: &RepoMapView) -> Vec<LimitationDoc> {
    let mut limitations = Vec::new();

    for symbol in view.symbols() {
        let Some(documentation) = symbol.documentation.as_deref() else {
            continue;
        };
        for line in documentation.lines() {
            let description = if let Some(captures) = limitation_regex().captures(line) {
                captures.get(1).map(|m| doc_text(m.as_str()).to_string())
            } else if line.to_ascii_lowercase().contains("not supported") {
                Some(doc_text(line).to_string())
            } else {
                None
            };
            if let Some(description) = description.filter(|d| !d.is_empty()) {
                limitations.push(LimitationDoc {
                    description,
                    location: Some(symbol.location()),
                });
            }
        }
    }

    if !view.files().is_empty() && view.test_files().is_empty() {
        limitations.push(LimitationDoc {
            description: "The repository has no automated tests".to_string(),
            location: None,
        });
    }

    limitations
}

fn detect_workarounds(view: &RepoMapView) -> Vec<WorkaroundDoc> {
    let mut workarounds = Vec::new();

    for symbol in view.symbols() {
        let Some(documentation) = symbol.documentation.as_deref() else {
            continue;
        };
        for line in documentation.lines() {
            let lowered = line.to_ascii_lowercase();
            if lowered.contains("workaround") || line.contains("HACK") {
                workarounds.push(WorkaroundDoc {
                    description: doc_text(line).to_string(),
                    location: symbol.location(),
                });
            }
        }
    }

    workarounds
}

fn derive_improvements(debt: &[TechnicalDebtDoc], has_tests: bool) -> Vec<ImprovementDoc> {
    let mut by_category: BTreeMap<DebtCategory, (usize, Severity)> = BTreeMap::new();
    for item in debt {
        let entry = by_category.entry(item.category).or_insert((0, item.severity));
        entry.0 += 1;
        entry.1 = entry.1.max(item.severity);
    }

    let mut improvements: Vec<ImprovementDoc> = by_category
        .into_iter()
        .map(|(category, (count, priority))| {
            let (title, description) = match category {
                DebtCategory::Deprecation => (
                    "Remove deprecated APIs",
                    "Migrate remaining callers and delete deprecated symbols.",
                ),
                DebtCategory::Marker => (
                    "Resolve outstanding code markers",
                    "Work through TODO, FIXME and HACK notes or move them to the issue tracker.",
                ),
                DebtCategory::LargeFile => (
                    "Split large files",
                    "Break files over 500 lines into smaller modules with a single focus.",
                ),
                DebtCategory::LargeClass => (
                    "Break up large classes",
                    "Extract cohesive groups of methods into their own classes.",
                ),
                DebtCategory::LongParameterList => (
                    "Simplify function signatures",
                    "Replace long parameter lists with options objects.",
                ),
                DebtCategory::HighCoupling => (
                    "Reduce module coupling",
                    "Cut direct imports in highly connected files through facades or dependency injection.",
                ),
            };
            ImprovementDoc {
                title: title.to_string(),
                description: description.to_string(),
                priority,
                related_items: count,
            }
        })
        .collect();

    if !has_tests {
        improvements.push(ImprovementDoc {
            title: "Add automated tests".to_string(),
            description: "Start with unit tests for the most referenced components.".to_string(),
            priority: Severity::High,
            related_items: 0,
        });
    }

    improvements.sort_by(|a, b| b.priority.cmp(&a.priority));
    improvements
}

pub fn analyze(view: &RepoMapView) -> KnownIssuesDoc {
    let mut technical_debt = symbol_debt(view, &LexicalSignatureParser);
    technical_debt.extend(file_debt(view));

    let limitations = detect_limitations(view);
    let workarounds = detect_workarounds(view);
    let has_tests = view.files().is_empty() || !view.test_files().is_empty();
    let improvements = derive_improvements(&technical_debt, has_tests);

    let overview = if technical_debt.is_empty() {
        "No technical debt was detected.".to_string()
    } else {
        format!(
            "{} technical debt items ({} high, {} medium, {} low), {} limitations and {} workarounds.",
            technical_debt.len(),
            technical_debt.iter().filter(|d| d.severity == Severity::High).count(),
            technical_debt.iter().filter(|d| d.severity == Severity::Medium).count(),
            technical_debt.iter().filter(|d| d.severity == Severity::Low).count(),
            limitations.len(),
            workarounds.len()
        )
    };

    KnownIssuesDoc {
        overview,
        technical_debt,
        limitations,
        workarounds,
        improvements,
    }
}

pub fn to_markdown(doc: &KnownIssuesDoc, generated_at: &DateTime<Utc>) -> String {
    let mut out = document_header("Known Issues", generated_at, &doc.overview);

    out.push_str("## Technical Debt\n\n");
    if doc.technical_debt.is_empty() {
        out.push_str("_No technical debt detected._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .technical_debt
            .iter()
            .map(|d| {
                vec![
                    d.severity.to_string(),
                    d.category.label().to_string(),
                    d.description.clone(),
                    format!("`{}`", d.location),
                    d.suggestion.clone(),
                ]
            })
            .collect();
        out.push_str(&table(
            &["Severity", "Category", "Description", "Location", "Suggestion"],
            &rows,
        ));
    }

    out.push_str("## Limitations\n\n");
    if doc.limitations.is_empty() {
        out.push_str("_No documented limitations._\n\n");
    } else {
        for limitation in &doc.limitations {
            match &limitation.location {
                Some(location) => out.push_str(&format!("- {} (`{}`)\n", limitation.description, location)),
                None => out.push_str(&format!("- {}\n", limitation.description)),
            }
        }
        out.push('\n');
    }

    out.push_str("## Workarounds\n\n");
    if doc.workarounds.is_empty() {
        out.push_str("_No workarounds documented._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .workarounds
            .iter()
            .map(|w| vec![w.description.clone(), format!("`{}`", w.location)])
            .collect();
        out.push_str(&table(&["Workaround", "Location"], &rows));
    }

    out.push_str("## Suggested Improvements\n\n");
    if doc.improvements.is_empty() {
        out.push_str("_Nothing to suggest._\n\n");
    }
    for improvement in &doc.improvements {
        out.push_str(&format!(
            "### {} ({} priority)\n\n{}\n\n",
            improvement.title, improvement.priority, improvement.description
        ));
        if improvement.related_items > 0 {
            out.push_str(&format!("Related items: {}\n\n", improvement.related_items));
        }
    }

    out
}

pub fn condense(doc: &KnownIssuesDoc) -> String {
    let mut out = String::from("## Known Issues\n");
    out.push_str(&format!(
        "Debt: {} high, {} medium, {} low\n",
        doc.debt_with_severity(Severity::High),
        doc.debt_with_severity(Severity::Medium),
        doc.debt_with_severity(Severity::Low)
    ));
    for item in doc.technical_debt.iter().filter(|d| d.severity == Severity::High) {
        out.push_str(&format!("- {} ({})\n", item.description, item.location));
    }
    for improvement in doc.improvements.iter().take(3) {
        out.push_str(&format!("- Improve: {}\n", improvement.title));
    }
    out
}
