// src/ids.rs

use dusa_collection_utils::core::types::stringy::Stringy;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, caller-generated identifier for one observed app run (spec.md §3:
/// "Process-wide mapping from opaque app-run-id (caller-generated UUID) to
/// app peer"). The core never parses or validates the string beyond treating
/// it as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppRunId(pub Stringy);

impl AppRunId {
    /// Generates a fresh random id. Used by the collector-side reference
    /// implementation and by tests; the server itself never mints one.
    pub fn generate() -> Self {
        AppRunId(Stringy::from(Uuid::new_v4().to_string()))
    }

}

impl fmt::Display for AppRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AppRunId {
    fn from(s: &str) -> Self {
        AppRunId(Stringy::new(s))
    }
}

impl From<String> for AppRunId {
    fn from(s: String) -> Self {
        AppRunId(Stringy::from(s))
    }
}
