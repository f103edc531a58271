// src/core/mod.rs
pub mod analyzers;
pub mod diagram;
pub mod markdown;
pub mod orchestrator;
pub mod purpose;
pub mod repo_map;
pub mod signature;
pub mod view;

#[cfg(test)]
mod fixtures;

pub use orchestrator::{CodebaseDocumentation, DocsSession, Orchestrator};
pub use repo_map::{InMemoryRepoMapProvider, JsonRepoMapProvider, RepoMap, RepoMapProvider};
pub use view::RepoMapView;
