// /src/errors.rs
//! Error taxonomy for snapshot validation, cell realization and batch application
use crate::surface::SurfaceError;
use crate::types::{BatchId, CellKind, SectionId};
use std::fmt;
use thiserror::Error;

/// The element that appeared twice in one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Item { kind: CellKind, model: String },
    Section(SectionId),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Item { kind, model } => write!(f, "item ({}, {})", kind, model),
            Identity::Section(id) => write!(f, "section '{}'", id),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Duplicate identity in snapshot: {identity}")]
    DuplicateIdentity { identity: Identity },

    #[error("No cell registered for kind '{kind}'")]
    UnresolvedKind { kind: CellKind },

    #[error("Cell registered for kind '{kind}' expects a model of type {expected}")]
    ModelMismatch { kind: CellKind, expected: &'static str },

    #[error("Kind '{kind}' is already registered to {existing}, refusing {attempted}")]
    ConflictingRegistration {
        kind: CellKind,
        existing: &'static str,
        attempted: &'static str,
    },

    #[error("Surface failed to apply {batch}: {source}")]
    WidgetApplyFailure {
        batch: BatchId,
        #[source]
        source: SurfaceError,
    },

    #[error("Unknown section '{id}'")]
    UnknownSection { id: SectionId },

    #[error("Completion for {got} does not match the batch in flight ({expected:?})")]
    BatchMismatch { expected: Option<BatchId>, got: BatchId },

    #[error("A batch is in flight; wait for its completion first")]
    CycleInFlight,

    #[error("Invalid adapter configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ReconcileError {
    /// True for failures reported by the surface itself; the caller should
    /// resubmit a full trusted snapshot to resynchronize.
    pub fn requires_resync(&self) -> bool {
        matches!(self, ReconcileError::WidgetApplyFailure { .. })
    }
}
