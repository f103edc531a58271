use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::{AnalyzerOverrides, Config};
use crate::core::analyzers::architecture;
use crate::core::Orchestrator;

#[derive(Parser)]
#[command(name = "repodocs")]
#[command(about = "Synthesizes codebase documentation from a repository map")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze the project and write the Markdown documents
    Generate {
        /// Project root (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Output directory, relative to the project root unless absolute
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Print the condensed summary for a token budget
    Context {
        /// Project root (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Token budget (defaults to [context].max_tokens)
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Print the architecture document
    Architecture {
        /// Project root (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

/// Per-run overrides of the `[analysis]` section
#[derive(clap::Args, Debug, Default)]
pub struct AnalysisArgs {
    /// Include private members in the API surface
    #[arg(long)]
    pub include_private: bool,

    /// Skip Mermaid diagrams
    #[arg(long)]
    pub no_diagrams: bool,

    /// Maximum examples recorded per pattern
    #[arg(long)]
    pub max_examples: Option<usize>,
}

impl AnalysisArgs {
    fn overrides(&self, output_dir: Option<PathBuf>) -> AnalyzerOverrides {
        AnalyzerOverrides {
            output_dir,
            include_private: self.include_private.then_some(true),
            max_examples: self.max_examples,
            generate_diagrams: self.no_diagrams.then_some(false),
        }
    }
}

fn project_root(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("cannot determine current directory"),
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Config::load_or_default(self.config.as_deref())?;
        debug!("Loaded configuration: {:?}", config);
        let mut orchestrator = Orchestrator::from_config(config);

        match self.command {
            Commands::Generate { path, output, analysis } => {
                let root = project_root(path)?;
                orchestrator
                    .analyze(&root, Some(analysis.overrides(output)))
                    .await?;
                let written = orchestrator.save_docs(None).await?;
                for path in &written {
                    info!("Generated {}", path.display());
                }
                Ok(())
            }
            Commands::Context { path, max_tokens } => {
                let root = project_root(path)?;
                orchestrator.analyze(&root, None).await?;
                println!("{}", orchestrator.get_docs_for_context(max_tokens));
                Ok(())
            }
            Commands::Architecture { path, analysis } => {
                let root = project_root(path)?;
                let docs = orchestrator
                    .analyze(&root, Some(analysis.overrides(None)))
                    .await?;
                let doc = orchestrator.generate_architecture()?;
                print!("{}", architecture::to_markdown(&doc, &docs.generated_at));
                Ok(())
            }
        }
    }
}
