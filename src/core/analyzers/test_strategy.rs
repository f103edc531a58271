// src/core/analyzers/test_strategy.rs
//! Test frameworks, test types, coverage estimate and testing patterns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::core::analyzers::dependencies::package_root;
use crate::core::markdown::{code_list, document_header, table};
use crate::core::view::{file_stem, is_test_path, normalize_path, parent_dir, RepoMapView};

/// Untested files listed in the report
const MAX_UNTESTED: usize = 10;

struct FrameworkRule {
    package: &'static str,
    name: &'static str,
    purpose: &'static str,
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule { package: "vitest", name: "Vitest", purpose: "Test runner and assertions" },
    FrameworkRule { package: "jest", name: "Jest", purpose: "Test runner and assertions" },
    FrameworkRule { package: "@jest/globals", name: "Jest", purpose: "Test runner and assertions" },
    FrameworkRule { package: "mocha", name: "Mocha", purpose: "Test runner" },
    FrameworkRule { package: "jasmine", name: "Jasmine", purpose: "Behaviour-driven test framework" },
    FrameworkRule { package: "ava", name: "AVA", purpose: "Concurrent test runner" },
    FrameworkRule { package: "@testing-library/", name: "Testing Library", purpose: "Component testing utilities" },
    FrameworkRule { package: "@playwright/test", name: "Playwright", purpose: "End-to-end browser testing" },
    FrameworkRule { package: "playwright", name: "Playwright", purpose: "End-to-end browser testing" },
    FrameworkRule { package: "cypress", name: "Cypress", purpose: "End-to-end browser testing" },
    FrameworkRule { package: "supertest", name: "Supertest", purpose: "HTTP integration testing" },
];

fn framework_for(package: &str) -> Option<&'static FrameworkRule> {
    FRAMEWORKS.iter().find(|rule| {
        if rule.package.ends_with('/') {
            package.starts_with(rule.package)
        } else {
            package == rule.package
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Unit,
    Integration,
    E2e,
    Component,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Unit => "unit",
            TestKind::Integration => "integration",
            TestKind::E2e => "e2e",
            TestKind::Component => "component",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            TestKind::Unit => "Isolated tests of individual functions and classes",
            TestKind::Integration => "Tests exercising several modules or services together",
            TestKind::E2e => "End-to-end tests driving the application from the outside",
            TestKind::Component => "Rendering and interaction tests for UI components",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFrameworkDoc {
    pub name: String,
    pub purpose: String,
    pub usage_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTypeDoc {
    pub kind: TestKind,
    pub description: String,
    pub file_count: usize,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageDoc {
    pub source_files: usize,
    pub tested_files: usize,
    /// Share of source files with a matching test file, 0.0 to 1.0
    pub ratio: f64,
    pub untested: Vec<String>,
}

impl CoverageDoc {
    pub fn percent(&self) -> f64 {
        (self.ratio * 1000.0).round() / 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestingPatternDoc {
    pub name: String,
    pub description: String,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStrategyDoc {
    pub overview: String,
    pub test_file_count: usize,
    pub frameworks: Vec<TestFrameworkDoc>,
    pub test_types: Vec<TestTypeDoc>,
    pub coverage: CoverageDoc,
    pub testing_patterns: Vec<TestingPatternDoc>,
}

fn classify_test(view: &RepoMapView, path: &str) -> TestKind {
    let rooted = format!("/{}", path);
    let packages: Vec<String> = view
        .external_imports_of(path)
        .iter()
        .filter_map(|t| package_root(t))
        .collect();
    let imports = |needle: &str| packages.iter().any(|p| p.starts_with(needle));

    if rooted.contains("/e2e/") || rooted.contains(".e2e.") || imports("playwright") || imports("@playwright/") || imports("cypress") {
        TestKind::E2e
    } else if rooted.contains("/integration/") || rooted.contains(".integration.") || imports("supertest") {
        TestKind::Integration
    } else if path.ends_with(".tsx") || path.ends_with(".jsx") || imports("@testing-library/") {
        TestKind::Component
    } else {
        TestKind::Unit
    }
}

fn detect_frameworks(view: &RepoMapView, tests: &[String]) -> Vec<TestFrameworkDoc> {
    let mut usage: BTreeMap<&'static str, (usize, &'static str)> = BTreeMap::new();
    let mut order: Vec<&'static str> = Vec::new();

    for test in tests {
        let mut counted = HashSet::new();
        for target in view.external_imports_of(test) {
            let Some(package) = package_root(&target) else {
                continue;
            };
            let Some(rule) = framework_for(&package) else {
                continue;
            };
            if !counted.insert(rule.name) {
                continue;
            }
            if !usage.contains_key(rule.name) {
                order.push(rule.name);
            }
            usage.entry(rule.name).or_insert((0, rule.purpose)).0 += 1;
        }
    }

    order
        .into_iter()
        .filter_map(|name| {
            usage.get(name).map(|(count, purpose)| TestFrameworkDoc {
                name: name.to_string(),
                purpose: purpose.to_string(),
                usage_count: *count,
            })
        })
        .collect()
}

fn detect_test_types(view: &RepoMapView, tests: &[String]) -> Vec<TestTypeDoc> {
    let mut by_kind: BTreeMap<TestKind, Vec<String>> = BTreeMap::new();
    for test in tests {
        by_kind
            .entry(classify_test(view, test))
            .or_default()
            .push(test.clone());
    }

    let max_examples = view.options().max_examples.max(1);
    by_kind
        .into_iter()
        .map(|(kind, files)| TestTypeDoc {
            kind,
            description: kind.description().to_string(),
            file_count: files.len(),
            examples: files.into_iter().take(max_examples).collect(),
        })
        .collect()
}

/// A source file counts as tested when a test shares its stem or imports it
fn estimate_coverage(view: &RepoMapView, tests: &[String]) -> CoverageDoc {
    let test_stems: HashSet<String> = tests
        .iter()
        .map(|t| file_stem(t).to_ascii_lowercase())
        .collect();
    let imported_by_tests: HashSet<String> = tests.iter().flat_map(|t| view.imports_of(t)).collect();

    let sources: Vec<String> = view
        .file_paths()
        .into_iter()
        .filter(|p| !is_test_path(p) && !p.ends_with(".d.ts") && !p.contains(".config."))
        .collect();

    let (tested, untested): (Vec<String>, Vec<String>) = sources.iter().cloned().partition(|source| {
        test_stems.contains(&file_stem(source).to_ascii_lowercase()) || imported_by_tests.contains(source)
    });

    let ratio = if sources.is_empty() {
        0.0
    } else {
        tested.len() as f64 / sources.len() as f64
    };

    CoverageDoc {
        source_files: sources.len(),
        tested_files: tested.len(),
        ratio,
        untested: untested.into_iter().take(MAX_UNTESTED).collect(),
    }
}

fn is_helper_path(path: &str) -> bool {
    let rooted = format!("/{}", path);
    ["/test-utils", "/testUtils", "/test-helpers", "/__tests__/helpers", "/test/helpers", "/tests/helpers", "/testing/"]
        .iter()
        .any(|needle| rooted.contains(needle))
}

fn detect_testing_patterns(view: &RepoMapView, tests: &[String]) -> Vec<TestingPatternDoc> {
    let test_set: HashSet<&String> = tests.iter().collect();
    let test_symbols: Vec<_> = view
        .symbols()
        .iter()
        .filter(|s| test_set.contains(&normalize_path(&s.file)))
        .collect();
    let max_examples = view.options().max_examples.max(1);
    let mut patterns = Vec::new();

    let mut mocks: Vec<String> = test_symbols
        .iter()
        .filter(|s| {
            let name = s.name.to_ascii_lowercase();
            name.contains("mock")
                || name.contains("stub")
                || name.contains("spy")
                || s.signature.contains("vi.fn")
                || s.signature.contains("jest.fn")
        })
        .map(|s| s.name.clone())
        .collect();
    for test in tests {
        if view.imports_of(test).iter().any(|i| i.contains("__mocks__") || i.contains("mock")) {
            mocks.push(test.clone());
        }
    }
    if !mocks.is_empty() {
        patterns.push(TestingPatternDoc {
            name: "Mocking".to_string(),
            description: "Collaborators are replaced with mocks, stubs or spies.".to_string(),
            examples: mocks.into_iter().take(max_examples).collect(),
        });
    }

    let fixtures: Vec<String> = view
        .file_paths()
        .into_iter()
        .filter(|p| {
            let rooted = format!("/{}", p);
            rooted.contains("/fixtures/") || rooted.contains("/__fixtures__/") || file_stem(p).to_ascii_lowercase().contains("fixture")
        })
        .collect();
    if !fixtures.is_empty() {
        patterns.push(TestingPatternDoc {
            name: "Fixtures".to_string(),
            description: "Shared test data lives in dedicated fixture files.".to_string(),
            examples: fixtures.into_iter().take(max_examples).collect(),
        });
    }

    let lifecycle: Vec<String> = test_symbols
        .iter()
        .filter(|s| {
            matches!(
                s.name.as_str(),
                "beforeEach" | "afterEach" | "beforeAll" | "afterAll" | "setup" | "teardown"
            )
        })
        .map(|s| s.location())
        .collect();
    if !lifecycle.is_empty() {
        patterns.push(TestingPatternDoc {
            name: "Setup and teardown".to_string(),
            description: "Lifecycle hooks prepare and reset state around each test.".to_string(),
            examples: lifecycle.into_iter().take(max_examples).collect(),
        });
    }

    let mut helpers: Vec<String> = Vec::new();
    for path in view.file_paths().into_iter().filter(|p| !is_test_path(p)) {
        let used_by_tests = tests.iter().any(|t| view.imports_of(t).contains(&path));
        let in_test_dir = parent_dir(&path)
            .split('/')
            .any(|segment| matches!(segment, "test" | "tests" | "__tests__"));
        if is_helper_path(&path) || (used_by_tests && in_test_dir) {
            helpers.push(path);
        }
    }
    if !helpers.is_empty() {
        patterns.push(TestingPatternDoc {
            name: "Shared test helpers".to_string(),
            description: "Common setup and assertions are factored into reusable helper modules.".to_string(),
            examples: helpers.into_iter().take(max_examples).collect(),
        });
    }

    patterns
}

pub fn analyze(view: &RepoMapView) -> TestStrategyDoc {
    let tests = view.test_files();
    let coverage = estimate_coverage(view, &tests);

    if tests.is_empty() {
        return TestStrategyDoc {
            overview: "No test files were found in the repository. Consider adding tests for the key components.".to_string(),
            test_file_count: 0,
            frameworks: Vec::new(),
            test_types: Vec::new(),
            coverage,
            testing_patterns: Vec::new(),
        };
    }

    let frameworks = detect_frameworks(view, &tests);
    let test_types = detect_test_types(view, &tests);
    let testing_patterns = detect_testing_patterns(view, &tests);

    let framework_names: Vec<&str> = frameworks.iter().map(|f| f.name.as_str()).collect();
    let overview = format!(
        "{} test files{}; an estimated {}% of {} source files have a matching test.",
        tests.len(),
        if framework_names.is_empty() {
            String::new()
        } else {
            format!(" using {}", framework_names.join(", "))
        },
        coverage.percent(),
        coverage.source_files
    );

    TestStrategyDoc {
        overview,
        test_file_count: tests.len(),
        frameworks,
        test_types,
        coverage,
        testing_patterns,
    }
}

pub fn to_markdown(doc: &TestStrategyDoc, generated_at: &DateTime<Utc>) -> String {
    let mut out = document_header("Test Strategy", generated_at, &doc.overview);

    out.push_str("## Frameworks\n\n");
    if doc.frameworks.is_empty() {
        out.push_str("_No test frameworks detected._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .frameworks
            .iter()
            .map(|f| vec![f.name.clone(), f.purpose.clone(), f.usage_count.to_string()])
            .collect();
        out.push_str(&table(&["Framework", "Purpose", "Test Files"], &rows));
    }

    out.push_str("## Test Types\n\n");
    if doc.test_types.is_empty() {
        out.push_str("_No tests found._\n\n");
    } else {
        let rows: Vec<Vec<String>> = doc
            .test_types
            .iter()
            .map(|t| {
                vec![
                    t.kind.as_str().to_string(),
                    t.description.clone(),
                    t.file_count.to_string(),
                    code_list(&t.examples),
                ]
            })
            .collect();
        out.push_str(&table(&["Type", "Description", "Files", "Examples"], &rows));
    }

    out.push_str("## Coverage\n\n");
    out.push_str(&format!(
        "{} of {} source files ({}%) have a matching test file.\n\n",
        doc.coverage.tested_files,
        doc.coverage.source_files,
        doc.coverage.percent()
    ));
    if !doc.coverage.untested.is_empty() {
        out.push_str("**Untested files**:\n\n");
        for file in &doc.coverage.untested {
            out.push_str(&format!("- `{}`\n", file));
        }
        out.push('\n');
    }

    out.push_str("## Testing Patterns\n\n");
    if doc.testing_patterns.is_empty() {
        out.push_str("_No testing patterns detected._\n\n");
    }
    for pattern in &doc.testing_patterns {
        out.push_str(&format!("### {}\n\n{}\n\n", pattern.name, pattern.description));
        if !pattern.examples.is_empty() {
            out.push_str(&format!("**Examples**: {}\n\n", code_list(&pattern.examples)));
        }
    }

    out
}

pub fn condense(doc: &TestStrategyDoc) -> String {
    let mut out = String::from("## Test Strategy\n");
    if doc.test_file_count == 0 {
        out.push_str("No test files found.\n");
        return out;
    }
    let frameworks: Vec<&str> = doc.frameworks.iter().map(|f| f.name.as_str()).collect();
    if !frameworks.is_empty() {
        out.push_str(&format!("Frameworks: {}\n", frameworks.join(", ")));
    }
    let types: Vec<String> = doc
        .test_types
        .iter()
        .map(|t| format!("{} ({})", t.kind.as_str(), t.file_count))
        .collect();
    out.push_str(&format!("Types: {}\n", types.join(", ")));
    out.push_str(&format!("Coverage estimate: {}%\n", doc.coverage.percent()));
    out
}
