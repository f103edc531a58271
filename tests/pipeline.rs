use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};

use repodocs::config::{AnalyzerOverrides, Config};
use repodocs::core::analyzers::dependencies::MAX_CYCLES;
use repodocs::core::orchestrator::{estimate_tokens, DOCUMENT_FILES};
use repodocs::core::{InMemoryRepoMapProvider, Orchestrator, RepoMap};
use repodocs::RepodocsError;

fn layered_map() -> serde_json::Value {
    json!({
        "projectPath": "/work/app",
        "generatedAt": "2024-01-01T00:00:00Z",
        "files": [
            {"path": "/work/app/src/index.ts", "relativePath": "src/index.ts", "lineCount": 20},
            {"path": "/work/app/src/services/UserService.ts", "relativePath": "src/services/UserService.ts", "lineCount": 80},
            {"path": "/work/app/src/db/UserRepository.ts", "relativePath": "src/db/UserRepository.ts", "lineCount": 120},
            {"path": "/work/app/src/ui/UserPanel.tsx", "relativePath": "src/ui/UserPanel.tsx", "lineCount": 60}
        ],
        "symbols": [
            {"id": "1", "name": "UserRepository", "kind": "class", "file": "src/db/UserRepository.ts",
             "line": 3, "exported": true, "references": 12,
             "documentation": "/** Persists users in the primary database. */"},
            {"id": "2", "name": "findById", "kind": "method", "file": "src/db/UserRepository.ts",
             "line": 8, "signature": "async findById(id: string): Promise<User>", "parentId": "1",
             "modifiers": ["async"]},
            {"id": "3", "name": "UserService", "kind": "class", "file": "src/services/UserService.ts",
             "line": 5, "exported": true, "references": 4},
            {"id": "4", "name": "IUserStore", "kind": "interface", "file": "src/services/UserService.ts",
             "line": 1, "exported": true, "references": 2},
            {"id": "5", "name": "UserPanel", "kind": "function", "file": "src/ui/UserPanel.tsx",
             "line": 2, "exported": true, "references": 1, "signature": "function UserPanel(props: UserPanelProps)"},
            {"id": "6", "name": "main", "kind": "function", "file": "src/index.ts", "line": 1}
        ],
        "dependencies": [
            {"from": "src/index.ts", "to": "src/ui/UserPanel.tsx", "type": "import"},
            {"from": "src/ui/UserPanel.tsx", "to": "src/services/UserService.ts", "type": "import"},
            {"from": "src/services/UserService.ts", "to": "src/db/UserRepository.ts", "type": "import"},
            {"from": "src/services/UserService.ts", "to": "src/db/UserRepository.ts", "type": "type_import"},
            {"from": "src/ui/UserPanel.tsx", "to": "react", "type": "import"}
        ]
    })
}

fn cyclic_map() -> serde_json::Value {
    json!({
        "projectPath": "/work/app",
        "files": [
            {"path": "src/ui/App.tsx"},
            {"path": "src/ui/Panel.tsx"},
            {"path": "src/persistence/store.ts"}
        ],
        "symbols": [],
        "dependencies": [
            {"from": "src/ui/App.tsx", "to": "src/ui/Panel.tsx"},
            {"from": "src/ui/Panel.tsx", "to": "src/persistence/store.ts"},
            {"from": "src/persistence/store.ts", "to": "src/ui/App.tsx"}
        ]
    })
}

/// `count` files spread over ten directories; file i imports i+1..=i+3
fn generated_map(count: usize, back_edge: bool) -> serde_json::Value {
    let path = |i: usize| format!("src/mod{}/file{}.ts", i % 10, i);
    let files: Vec<serde_json::Value> = (0..count)
        .map(|i| json!({"path": path(i), "lineCount": 30}))
        .collect();
    let mut dependencies: Vec<serde_json::Value> = (0..count)
        .flat_map(|i| (i + 1..=i + 3).filter(move |&j| j < count).map(move |j| (i, j)))
        .map(|(i, j)| json!({"from": path(i), "to": path(j)}))
        .collect();
    if back_edge {
        dependencies.push(json!({"from": path(count - 1), "to": path(0)}));
    }
    json!({
        "projectPath": "/work/generated",
        "files": files,
        "symbols": [],
        "dependencies": dependencies
    })
}

fn in_memory(value: serde_json::Value) -> Orchestrator {
    let map: RepoMap = serde_json::from_value(value).unwrap();
    Orchestrator::new(Box::new(InMemoryRepoMapProvider::new(map)), Config::default())
}

#[tokio::test]
async fn generate_writes_every_document_under_the_project() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".nexus/repo-map.json")
        .write_str(&layered_map().to_string())
        .unwrap();

    let mut orchestrator = Orchestrator::from_config(Config::default());
    orchestrator.analyze(temp.path(), None).await.unwrap();
    let written = orchestrator.save_docs(None).await.unwrap();
    assert_eq!(written.len(), DOCUMENT_FILES.len());

    for name in DOCUMENT_FILES {
        temp.child(".nexus/codebase").child(name).assert(predicate::path::exists());
    }
    temp.child(".nexus/codebase/ARCHITECTURE.md")
        .assert(predicate::str::starts_with("# Architecture\n\n> Generated: "));
    temp.child(".nexus/codebase/DEPENDENCIES.md")
        .assert(predicate::str::contains("| react |"));
    temp.child(".nexus/codebase/index.md")
        .assert(predicate::str::contains("| Files | 4 |").and(predicate::str::contains("[Data Flow](DATA_FLOW.md)")));

    temp.close().unwrap();
}

#[tokio::test]
async fn missing_repo_map_is_reported() {
    let temp = assert_fs::TempDir::new().unwrap();
    let mut orchestrator = Orchestrator::from_config(Config::default());

    let err = orchestrator.analyze(temp.path(), None).await.unwrap_err();
    assert!(matches!(err, RepodocsError::RepoMap(_)));
    assert!(orchestrator.current_docs().is_none());
}

#[tokio::test]
async fn operations_require_a_prior_analysis() {
    let orchestrator = in_memory(layered_map());

    assert!(matches!(
        orchestrator.generate_architecture(),
        Err(RepodocsError::NotAnalyzed("analyze"))
    ));
    assert!(matches!(
        orchestrator.save_docs(Some(Path::new("/tmp/never"))).await,
        Err(RepodocsError::NotAnalyzed(_))
    ));
    assert_eq!(orchestrator.get_docs_for_context(Some(8000)), "");
}

#[tokio::test]
async fn condensed_summary_respects_every_budget() {
    let mut orchestrator = in_memory(layered_map());
    let docs = orchestrator.analyze("/work/app", None).await.unwrap();
    let sections = docs.condensed_sections();

    for budget in [0, 5, 20, 60, 150, 400, 8000] {
        let context = orchestrator.get_docs_for_context(Some(budget));
        assert!(estimate_tokens(&context) <= budget, "budget {}", budget);
        for part in context.split("\n\n").filter(|p| !p.is_empty()) {
            assert!(
                sections.iter().any(|s| s.trim_end() == part),
                "partial section under budget {}",
                budget
            );
        }
    }

    assert_eq!(orchestrator.get_docs_for_context(Some(0)), "");
    let full = orchestrator.get_docs_for_context(None);
    assert!(full.starts_with("## Architecture\n"));
    assert!(full.contains("## Known Issues"));
}

#[tokio::test]
async fn most_referenced_class_is_the_first_key_component() {
    let mut orchestrator = in_memory(layered_map());
    orchestrator.analyze("/work/app", None).await.unwrap();

    let architecture = orchestrator.generate_architecture().unwrap();
    let first = &architecture.key_components[0];
    assert_eq!(first.name, "UserRepository");
    assert_eq!(first.references, 12);
    assert!(architecture
        .entry_points
        .iter()
        .any(|e| e.file == "src/index.ts"));
}

#[tokio::test]
async fn ui_persistence_cycle_is_medium_severity() {
    let temp = assert_fs::TempDir::new().unwrap();
    let mut orchestrator = in_memory(cyclic_map());
    orchestrator.analyze(temp.path(), None).await.unwrap();

    let docs = orchestrator.current_docs().unwrap();
    let cycles = &docs.dependencies.circular_dependencies;
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].files.len(), 3);
    assert_eq!(cycles[0].severity.to_string(), "medium");

    orchestrator.save_docs(Some(Path::new("docs"))).await.unwrap();
    temp.child("docs/DEPENDENCIES.md")
        .assert(predicate::str::contains("### Cycle 1 (medium)"));
}

#[tokio::test]
async fn repository_without_tests_gets_a_testing_improvement() {
    let temp = assert_fs::TempDir::new().unwrap();
    let mut orchestrator = in_memory(layered_map());
    let docs = orchestrator.analyze(temp.path(), None).await.unwrap();

    assert_eq!(docs.test_strategy.test_file_count, 0);
    assert!(docs.test_strategy.test_types.is_empty());
    assert!(docs
        .known_issues
        .improvements
        .iter()
        .any(|i| i.title == "Add automated tests"));

    orchestrator.save_docs(None).await.unwrap();
    temp.child(".nexus/codebase/TEST_STRATEGY.md")
        .assert(predicate::str::contains("No test files were found"));
}

#[tokio::test]
async fn update_reanalyzes_with_previous_options() {
    let mut orchestrator = in_memory(layered_map());
    let overrides = AnalyzerOverrides {
        generate_diagrams: Some(false),
        ..AnalyzerOverrides::default()
    };
    let first = orchestrator.analyze("/work/app", Some(overrides)).await.unwrap();
    assert!(first.architecture.layer_diagram.is_none());

    let changed = vec![PathBuf::from("src/db/UserRepository.ts")];
    let second = orchestrator.update_docs(&changed, None).await.unwrap();
    assert!(second.architecture.layer_diagram.is_none());
    assert_eq!(second.total_symbols, first.total_symbols);
    assert_eq!(second.architecture, first.architecture);
}

#[tokio::test]
async fn large_acyclic_map_analyzes_without_cycles() {
    let mut orchestrator = in_memory(generated_map(120, false));
    let docs = orchestrator.analyze("/work/generated", None).await.unwrap();

    assert_eq!(docs.total_files, 120);
    assert!(docs.dependencies.circular_dependencies.is_empty());
    assert_eq!(docs.dependencies.internal_modules.len(), 10);
}

#[tokio::test]
async fn large_map_with_back_edge_caps_reported_cycles() {
    let mut orchestrator = in_memory(generated_map(120, true));
    let docs = orchestrator.analyze("/work/generated", None).await.unwrap();

    let cycles = &docs.dependencies.circular_dependencies;
    assert_eq!(cycles.len(), MAX_CYCLES);
    assert!(cycles.iter().all(|c| c.files[0] == "src/mod0/file0.ts"));
}
