// src/core/orchestrator.rs
//! Runs the analyzers over one repository map, persists the Markdown
//! documents and packs the condensed summary.
//!
//! A successful [`Orchestrator::analyze`] produces a [`DocsSession`]; every
//! later operation reads from that session, so a half-finished run is never
//! observable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::{Context, Tera};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::{AnalyzerOptions, AnalyzerOverrides, Config};
use crate::error::{RepodocsError, Result};

use super::analyzers::api_surface::{self, ApiSurfaceDoc};
use super::analyzers::architecture::{self, ArchitectureDoc};
use super::analyzers::data_flow::{self, DataFlowDoc};
use super::analyzers::dependencies::{self, DependenciesDoc};
use super::analyzers::known_issues::{self, KnownIssuesDoc};
use super::analyzers::patterns::{self, PatternsDoc};
use super::analyzers::test_strategy::{self, TestStrategyDoc};
use super::markdown::timestamp;
use super::repo_map::{JsonRepoMapProvider, RepoMap, RepoMapProvider};
use super::view::RepoMapView;

pub const ARCHITECTURE_FILE: &str = "ARCHITECTURE.md";
pub const PATTERNS_FILE: &str = "PATTERNS.md";
pub const DEPENDENCIES_FILE: &str = "DEPENDENCIES.md";
pub const API_SURFACE_FILE: &str = "API_SURFACE.md";
pub const DATA_FLOW_FILE: &str = "DATA_FLOW.md";
pub const TEST_STRATEGY_FILE: &str = "TEST_STRATEGY.md";
pub const KNOWN_ISSUES_FILE: &str = "KNOWN_ISSUES.md";
pub const INDEX_FILE: &str = "index.md";

/// Every file written by a save, in write order
pub const DOCUMENT_FILES: [&str; 8] = [
    ARCHITECTURE_FILE,
    PATTERNS_FILE,
    DEPENDENCIES_FILE,
    API_SURFACE_FILE,
    DATA_FLOW_FILE,
    TEST_STRATEGY_FILE,
    KNOWN_ISSUES_FILE,
    INDEX_FILE,
];

const CONTEXT_SEPARATOR: &str = "\n\n";

const INDEX_TEMPLATE: &str = r#"# Codebase Documentation

> Generated: {{ generated_at }}

## Overview

Documentation synthesized from the repository map of `{{ project_path }}`.

## Documents

- [Architecture](ARCHITECTURE.md): layers, key components and entry points
- [Patterns](PATTERNS.md): architectural and coding patterns, naming conventions
- [Dependencies](DEPENDENCIES.md): external packages, internal modules and cycles
- [API Surface](API_SURFACE.md): exported interfaces, classes, functions and types
- [Data Flow](DATA_FLOW.md): state, persistence, events and transformations
- [Test Strategy](TEST_STRATEGY.md): frameworks, test types and coverage
- [Known Issues](KNOWN_ISSUES.md): technical debt, limitations and improvements

## Statistics

| Metric | Value |
|---|---|
| Files | {{ files }} |
| Symbols | {{ symbols }} |
| Dependencies | {{ dependencies }} |
| Layers | {{ layers }} |
| Patterns | {{ patterns }} |
| Technical debt items | {{ debt }} |
"#;

/// One complete analysis snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodebaseDocumentation {
    pub generated_at: DateTime<Utc>,
    pub project_path: PathBuf,
    pub total_files: usize,
    pub total_symbols: usize,
    pub total_dependencies: usize,
    pub architecture: ArchitectureDoc,
    pub patterns: PatternsDoc,
    pub dependencies: DependenciesDoc,
    pub api_surface: ApiSurfaceDoc,
    pub data_flow: DataFlowDoc,
    pub test_strategy: TestStrategyDoc,
    pub known_issues: KnownIssuesDoc,
}

impl CodebaseDocumentation {
    /// Run every analyzer over `map` in a fixed order
    pub fn build(
        map: &RepoMap,
        options: &AnalyzerOptions,
        project_path: &Path,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let view = RepoMapView::new(map, options);

        debug!("Analyzing architecture");
        let architecture = architecture::analyze(&view);
        debug!("Analyzing patterns");
        let patterns = patterns::analyze(&view);
        debug!("Analyzing dependencies");
        let dependencies = dependencies::analyze(&view);
        debug!("Analyzing API surface");
        let api_surface = api_surface::analyze(&view);
        debug!("Analyzing data flow");
        let data_flow = data_flow::analyze(&view);
        debug!("Analyzing test strategy");
        let test_strategy = test_strategy::analyze(&view);
        debug!("Analyzing known issues");
        let known_issues = known_issues::analyze(&view);

        Self {
            generated_at,
            project_path: project_path.to_path_buf(),
            total_files: map.total_files(),
            total_symbols: map.total_symbols(),
            total_dependencies: map.total_dependencies(),
            architecture,
            patterns,
            dependencies,
            api_surface,
            data_flow,
            test_strategy,
            known_issues,
        }
    }

    /// The seven domain documents followed by the index, paired with their file names
    pub fn render(&self) -> Result<Vec<(&'static str, String)>> {
        let at = &self.generated_at;
        Ok(vec![
            (ARCHITECTURE_FILE, architecture::to_markdown(&self.architecture, at)),
            (PATTERNS_FILE, patterns::to_markdown(&self.patterns, at)),
            (DEPENDENCIES_FILE, dependencies::to_markdown(&self.dependencies, at)),
            (API_SURFACE_FILE, api_surface::to_markdown(&self.api_surface, at)),
            (DATA_FLOW_FILE, data_flow::to_markdown(&self.data_flow, at)),
            (TEST_STRATEGY_FILE, test_strategy::to_markdown(&self.test_strategy, at)),
            (KNOWN_ISSUES_FILE, known_issues::to_markdown(&self.known_issues, at)),
            (INDEX_FILE, self.render_index()?),
        ])
    }

    pub fn render_index(&self) -> Result<String> {
        let mut context = Context::new();
        context.insert("generated_at", &timestamp(&self.generated_at));
        context.insert("project_path", &self.project_path.display().to_string());
        context.insert("files", &self.total_files);
        context.insert("symbols", &self.total_symbols);
        context.insert("dependencies", &self.total_dependencies);
        context.insert("layers", &self.architecture.layers.len());
        context.insert("patterns", &self.patterns.pattern_count());
        context.insert("debt", &self.known_issues.debt_count());

        Ok(Tera::one_off(INDEX_TEMPLATE, &context, false)?)
    }

    /// Condensed sections in priority order: architecture, patterns,
    /// dependencies, test strategy, known issues
    pub fn condensed_sections(&self) -> [String; 5] {
        [
            architecture::condense(&self.architecture),
            patterns::condense(&self.patterns),
            dependencies::condense(&self.dependencies),
            test_strategy::condense(&self.test_strategy),
            known_issues::condense(&self.known_issues),
        ]
    }

    /// Greedy whole-section packing into `max_tokens`
    pub fn condense(&self, max_tokens: usize) -> String {
        pack_sections(&self.condensed_sections(), max_tokens)
    }
}

/// Four bytes per token, rounded up
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Append sections in order, skipping any that would push the total over budget
pub fn pack_sections<S: AsRef<str>>(sections: &[S], max_tokens: usize) -> String {
    let mut out = String::new();

    for section in sections {
        let section = section.as_ref().trim_end();
        if section.is_empty() {
            continue;
        }
        let separator = if out.is_empty() { "" } else { CONTEXT_SEPARATOR };
        let projected = out.len() + separator.len() + section.len();
        if projected.div_ceil(4) > max_tokens {
            debug!(
                "Skipping context section ({} tokens) over the {} token budget",
                estimate_tokens(section),
                max_tokens
            );
            continue;
        }
        out.push_str(separator);
        out.push_str(section);
    }

    out
}

/// Handle to a completed analysis
#[derive(Debug, Clone)]
pub struct DocsSession {
    map: Arc<RepoMap>,
    options: AnalyzerOptions,
    docs: Arc<CodebaseDocumentation>,
}

impl DocsSession {
    /// Analyze `map` on a blocking worker; the dependency analyzer may read a manifest from disk
    pub async fn analyze(project_path: &Path, map: RepoMap, options: AnalyzerOptions) -> Result<Self> {
        let map = Arc::new(map);
        let project = project_path.to_path_buf();
        let worker_map = Arc::clone(&map);
        let worker_options = options.clone();

        let docs = tokio::task::spawn_blocking(move || {
            CodebaseDocumentation::build(&worker_map, &worker_options, &project, Utc::now())
        })
        .await?;

        Ok(Self {
            map,
            options,
            docs: Arc::new(docs),
        })
    }

    pub fn docs(&self) -> Arc<CodebaseDocumentation> {
        Arc::clone(&self.docs)
    }

    pub fn map(&self) -> &RepoMap {
        &self.map
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    pub fn project_path(&self) -> &Path {
        &self.docs.project_path
    }

    pub fn architecture(&self) -> &ArchitectureDoc {
        &self.docs.architecture
    }

    /// Relative directories resolve against the project path
    pub fn resolve_output_dir(&self, output_dir: Option<&Path>) -> PathBuf {
        let dir = output_dir.unwrap_or(&self.options.output_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.project_path().join(dir)
        }
    }

    /// Write the eight documents concurrently and return their paths in [`DOCUMENT_FILES`] order
    pub async fn save_docs(&self, output_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
        let dir = self.resolve_output_dir(output_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let documents = self.docs.render()?;
        let mut writes = JoinSet::new();
        for (order, (name, content)) in documents.into_iter().enumerate() {
            let path = dir.join(name);
            writes.spawn(async move {
                tokio::fs::write(&path, content).await?;
                Ok::<_, RepodocsError>((order, path))
            });
        }

        let mut written = Vec::with_capacity(DOCUMENT_FILES.len());
        while let Some(result) = writes.join_next().await {
            written.push(result??);
        }
        written.sort_by_key(|(order, _)| *order);

        info!("Wrote {} documents to {}", written.len(), dir.display());
        Ok(written.into_iter().map(|(_, path)| path).collect())
    }

    pub fn docs_for_context(&self, max_tokens: usize) -> String {
        self.docs.condense(max_tokens)
    }
}

/// Owns the map provider and the current session
pub struct Orchestrator {
    provider: Box<dyn RepoMapProvider>,
    config: Config,
    session: Option<DocsSession>,
}

impl Orchestrator {
    pub fn new(provider: Box<dyn RepoMapProvider>, config: Config) -> Self {
        Self {
            provider,
            config,
            session: None,
        }
    }

    /// Reads the repository map from the path configured in `[project]`
    pub fn from_config(config: Config) -> Self {
        let provider = JsonRepoMapProvider::new(config.project.repo_map.clone());
        Self::new(Box::new(provider), config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> Option<&DocsSession> {
        self.session.as_ref()
    }

    fn require_session(&self) -> Result<&DocsSession> {
        self.session
            .as_ref()
            .ok_or(RepodocsError::NotAnalyzed("analyze"))
    }

    /// Analyze the project and replace the current snapshot on success
    pub async fn analyze(
        &mut self,
        project_path: impl AsRef<Path>,
        overrides: Option<AnalyzerOverrides>,
    ) -> Result<Arc<CodebaseDocumentation>> {
        let options = self
            .config
            .analysis
            .merged(&overrides.unwrap_or_default());
        self.run(project_path.as_ref(), options).await
    }

    async fn run(&mut self, project_path: &Path, options: AnalyzerOptions) -> Result<Arc<CodebaseDocumentation>> {
        info!("Analyzing codebase at {}", project_path.display());
        let map = self.provider.repo_map(project_path).await?;
        info!(
            "Repository map: {} files, {} symbols, {} dependencies",
            map.total_files(),
            map.total_symbols(),
            map.total_dependencies()
        );

        let session = DocsSession::analyze(project_path, map, options).await?;
        let docs = session.docs();
        info!(
            "Analysis complete: {} layers, {} patterns, {} debt items",
            docs.architecture.layers.len(),
            docs.patterns.pattern_count(),
            docs.known_issues.debt_count()
        );

        self.session = Some(session);
        Ok(docs)
    }

    pub fn generate_architecture(&self) -> Result<ArchitectureDoc> {
        Ok(self.require_session()?.architecture().clone())
    }

    pub async fn save_docs(&self, output_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
        self.require_session()?.save_docs(output_dir).await
    }

    /// Full re-analysis with the previous options; `changed` is only reported
    pub async fn update_docs(
        &mut self,
        changed: &[PathBuf],
        overrides: Option<AnalyzerOverrides>,
    ) -> Result<Arc<CodebaseDocumentation>> {
        let session = self.require_session()?;
        let project_path = session.project_path().to_path_buf();
        let options = session.options().merged(&overrides.unwrap_or_default());

        info!("Updating documentation after {} changed files", changed.len());
        for path in changed {
            debug!("Changed: {}", path.display());
        }

        self.run(&project_path, options).await
    }

    /// Condensed summary, empty when nothing has been analyzed yet
    pub fn get_docs_for_context(&self, max_tokens: Option<usize>) -> String {
        let budget = max_tokens.unwrap_or(self.config.context.max_tokens);
        self.session
            .as_ref()
            .map(|s| s.docs_for_context(budget))
            .unwrap_or_default()
    }

    pub fn current_docs(&self) -> Option<Arc<CodebaseDocumentation>> {
        self.session.as_ref().map(DocsSession::docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{edge, file, map, symbol};
    use crate::core::repo_map::{InMemoryRepoMapProvider, SymbolKind};
    use chrono::TimeZone;

    fn sample() -> RepoMap {
        map(
            vec![
                file("src/index.ts"),
                file("src/db/UserRepository.ts"),
                file("src/services/UserService.ts"),
            ],
            vec![
                symbol("1", "UserRepository", SymbolKind::Class, "src/db/UserRepository.ts")
                    .exported()
                    .refs(8),
                symbol("2", "UserService", SymbolKind::Class, "src/services/UserService.ts")
                    .exported()
                    .refs(2),
            ],
            vec![
                edge("src/services/UserService.ts", "src/db/UserRepository.ts"),
                edge("src/index.ts", "src/services/UserService.ts"),
            ],
        )
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            Box::new(InMemoryRepoMapProvider::new(sample())),
            Config::default(),
        )
    }

    #[test]
    fn test_pack_sections_skips_whole_sections() {
        let sections = ["a".repeat(40), "b".repeat(400), "c".repeat(20)];

        let packed = pack_sections(&sections, 20);
        assert_eq!(packed, format!("{}\n\n{}", "a".repeat(40), "c".repeat(20)));
        assert!(estimate_tokens(&packed) <= 20);

        assert_eq!(pack_sections(&sections, 0), "");
    }

    #[test]
    fn test_separator_counts_toward_budget() {
        let sections = ["a".repeat(8), "b".repeat(8)];
        // 8 + 2 + 8 = 18 bytes needs 5 tokens
        assert_eq!(pack_sections(&sections, 4), "a".repeat(8));
        assert_eq!(pack_sections(&sections, 5).len(), 18);
    }

    #[test]
    fn test_build_is_deterministic_for_fixed_timestamp() {
        let repo = sample();
        let options = AnalyzerOptions::default();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let first = CodebaseDocumentation::build(&repo, &options, Path::new("/work/app"), at);
        let second = CodebaseDocumentation::build(&repo, &options, Path::new("/work/app"), at);
        assert_eq!(first, second);
    }

    #[test]
    fn test_index_lists_documents_and_counters() {
        let repo = sample();
        let options = AnalyzerOptions::default();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let docs = CodebaseDocumentation::build(&repo, &options, Path::new("/work/app"), at);

        let index = docs.render_index().unwrap();
        assert!(index.starts_with("# Codebase Documentation\n\n> Generated: 2024-01-01T00:00:00.000Z"));
        assert!(index.contains("## Overview"));
        assert!(index.contains("[Known Issues](KNOWN_ISSUES.md)"));
        assert!(index.contains("| Files | 3 |"));
        assert!(index.contains("| Dependencies | 2 |"));
    }

    #[tokio::test]
    async fn test_operations_before_analyze() {
        let orchestrator = orchestrator();

        assert!(matches!(
            orchestrator.generate_architecture(),
            Err(RepodocsError::NotAnalyzed("analyze"))
        ));
        assert!(matches!(
            orchestrator.save_docs(None).await,
            Err(RepodocsError::NotAnalyzed(_))
        ));
        assert_eq!(orchestrator.get_docs_for_context(None), "");
        assert!(orchestrator.current_docs().is_none());
    }

    #[tokio::test]
    async fn test_update_before_analyze_fails() {
        let mut orchestrator = orchestrator();
        let err = orchestrator.update_docs(&[], None).await.unwrap_err();
        assert!(matches!(err, RepodocsError::NotAnalyzed("analyze")));
    }

    #[tokio::test]
    async fn test_analyze_then_query() {
        let mut orchestrator = orchestrator();
        let docs = orchestrator.analyze("/work/app", None).await.unwrap();

        assert_eq!(docs.total_files, 3);
        let architecture = orchestrator.generate_architecture().unwrap();
        assert_eq!(architecture.key_components[0].name, "UserRepository");

        let context = orchestrator.get_docs_for_context(Some(8000));
        assert!(context.starts_with("## Architecture\n"));
        assert!(context.contains("## Patterns"));
    }

    #[tokio::test]
    async fn test_update_keeps_previous_options() {
        let mut orchestrator = orchestrator();
        let overrides = AnalyzerOverrides {
            max_examples: Some(1),
            ..AnalyzerOverrides::default()
        };
        orchestrator.analyze("/work/app", Some(overrides)).await.unwrap();

        let changed = vec![PathBuf::from("src/index.ts")];
        orchestrator.update_docs(&changed, None).await.unwrap();

        let session = orchestrator.session().unwrap();
        assert_eq!(session.options().max_examples, 1);
        assert_eq!(session.project_path(), Path::new("/work/app"));
    }

    #[tokio::test]
    async fn test_save_docs_writes_eight_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut orchestrator = orchestrator();
        orchestrator.analyze(dir.path(), None).await.unwrap();

        let written = orchestrator.save_docs(Some(Path::new("out/docs"))).await.unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, DOCUMENT_FILES.to_vec());
        assert!(written.iter().all(|p| p.starts_with(dir.path().join("out/docs"))));

        let architecture = std::fs::read_to_string(&written[0]).unwrap();
        assert!(architecture.starts_with("# Architecture\n\n> Generated: "));
    }
}
