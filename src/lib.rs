//! Synthesizes architecture, pattern, dependency, API, data-flow, test and
//! known-issue documentation from a repository map.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;

pub use config::{AnalyzerOptions, AnalyzerOverrides, Config};
pub use error::{RepodocsError, Result};
