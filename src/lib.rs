//! Snapshot-driven reconciliation for sectioned list widgets
//!
//! The caller describes the whole list as a [`Snapshot`] of sections and
//! items. [`ListAdapter`] diffs it against the last applied snapshot and
//! drives a [`ListSurface`] through one batch of deletes, inserts, moves and
//! reloads. Cells are built from a [`CellRegistry`] keyed by item kind.
pub mod adapter;
pub mod config;
pub mod delegate;
pub mod diff_engine;
pub mod errors;
pub mod memory_surface;
pub mod reconciler;
pub mod registry;
pub mod snapshot;
pub mod surface;
pub mod types;

pub use adapter::{Completed, ListAdapter, Submission};
pub use config::{AdapterConfig, UnresolvedKindPolicy};
pub use delegate::{EditingStyle, ListDataSource, ListDelegate, Noop, SurfaceEvent};
pub use diff_engine::{Change, DiffEngine, EditScript, ScriptSummary, diff};
pub use errors::{Identity, ReconcileError};
pub use memory_surface::{MemorySurface, SurfaceCall};
pub use reconciler::{ApplyReport, BatchDispatch, Reconciler};
pub use registry::{
    CellFactory, CellRegistry, CellView, ModelableCell, PlaceholderCell, SupplementaryKind,
    TextSupplementaryView,
};
pub use snapshot::{Snapshot, SnapshotIndex};
pub use surface::{Completion, ListSurface, RealizedItem, RealizedSection, SurfaceError};
pub use types::{
    AnyModel, BatchId, CellKind, IndexPath, Item, Model, Section, SectionId, Size, SurfaceContext,
};
