use thiserror::Error;

/// Main error type for repodocs operations
#[derive(Error, Debug)]
pub enum RepodocsError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A post-analysis operation ran before a successful `analyze()`
    #[error("No analysis available: call {0}() before using this operation")]
    NotAnalyzed(&'static str),

    #[error("Repository map error: {0}")]
    RepoMap(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, RepodocsError>;
