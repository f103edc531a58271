// src/core/analyzers/mod.rs
//! The seven domain analyzers.
//!
//! Each module exposes a pure `analyze(&RepoMapView)` and a
//! `to_markdown(&Doc, &DateTime<Utc>)` renderer; the ones that feed the
//! context summary also expose `condense`.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod api_surface;
pub mod architecture;
pub mod data_flow;
pub mod dependencies;
pub mod known_issues;
pub mod patterns;
pub mod test_strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(text)
    }
}
