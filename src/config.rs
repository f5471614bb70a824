//! Adapter configuration, loadable from JSON
use crate::errors::ReconcileError;
use serde::{Deserialize, Serialize};

/// What to do when an inserted or reloaded item has no registered cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedKindPolicy {
    /// Abort the cycle before touching the surface.
    #[default]
    Fail,
    /// Substitute a `PlaceholderCell` and log a warning.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub animating_differences: bool,
    pub unresolved_kind: UnresolvedKindPolicy,
    /// Drop the queued snapshot when the surface reports a failed batch.
    pub discard_queued_on_failure: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            animating_differences: true,
            unresolved_kind: UnresolvedKindPolicy::Fail,
            discard_queued_on_failure: true,
        }
    }
}

impl AdapterConfig {
    pub fn from_json(json: &str) -> Result<Self, ReconcileError> {
        Ok(serde_json::from_str(json)?)
    }
}
