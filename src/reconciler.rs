//! Drives one edit script against a list surface as a single batch
use crate::config::UnresolvedKindPolicy;
use crate::delegate::ListDelegate;
use crate::diff_engine::{Change, DiffEngine, EditScript, ScriptSummary};
use crate::errors::ReconcileError;
use crate::registry::{CellRegistry, CellView, PlaceholderCell};
use crate::snapshot::{Snapshot, SnapshotIndex};
use crate::surface::{Completion, ListSurface, RealizedItem, RealizedSection};
use crate::types::{BatchId, IndexPath, Item, Section, SectionId};
use log::{debug, warn};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of a committed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// `None` when the script was empty and the surface was not touched.
    pub batch: Option<BatchId>,
    pub snapshot: Uuid,
    pub summary: ScriptSummary,
    pub placeholders: usize,
}

/// A batch handed to the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDispatch {
    pub batch: BatchId,
    pub completion: Completion,
    pub placeholders: usize,
}

/// Every surface call of one batch, realized and translated to indices
/// before the batch opens.
#[derive(Default)]
struct PreparedBatch {
    section_deletes: Vec<usize>,
    section_inserts: Vec<RealizedSection>,
    section_moves: Vec<(usize, usize)>,
    item_deletes: Vec<IndexPath>,
    item_inserts: Vec<RealizedItem>,
    item_moves: Vec<(IndexPath, IndexPath)>,
    item_reloads: Vec<RealizedItem>,
    placeholders: usize,
}

pub struct Reconciler<'r> {
    registry: &'r CellRegistry,
    delegate: Option<&'r mut dyn ListDelegate>,
    policy: UnresolvedKindPolicy,
    animated: bool,
}

impl<'r> Reconciler<'r> {
    pub fn new(registry: &'r CellRegistry, policy: UnresolvedKindPolicy, animated: bool) -> Self {
        Reconciler {
            registry,
            delegate: None,
            policy,
            animated,
        }
    }

    /// Let `delegate` adjust every cell right after it is realized.
    pub fn with_delegate(mut self, delegate: &'r mut dyn ListDelegate) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Apply `script` (computed by `engine`) to `surface` inside one batch.
    ///
    /// Cells are realized before `begin_batch`, so an unresolved kind under
    /// the `Fail` policy aborts without any surface call.
    pub fn apply<S: ListSurface + ?Sized>(
        &mut self,
        engine: &DiffEngine<'_>,
        script: &EditScript,
        surface: &mut S,
        batch: BatchId,
    ) -> Result<BatchDispatch, ReconcileError> {
        let prepared = self.prepare(engine, script)?;
        let placeholders = prepared.placeholders;

        debug!(
            "Reconciler: {} applying {:?} ({} placeholders)",
            batch,
            script.summary(),
            placeholders
        );

        surface.begin_batch(batch, self.animated);
        if !prepared.section_deletes.is_empty() {
            surface.delete_sections(&prepared.section_deletes);
        }
        if !prepared.section_inserts.is_empty() {
            surface.insert_sections(prepared.section_inserts);
        }
        for (from, to) in prepared.section_moves {
            surface.move_section(from, to);
        }
        if !prepared.item_deletes.is_empty() {
            surface.delete_items(&prepared.item_deletes);
        }
        if !prepared.item_inserts.is_empty() {
            surface.insert_items(prepared.item_inserts);
        }
        for (from, to) in prepared.item_moves {
            surface.move_item(from, to);
        }
        for reload in prepared.item_reloads {
            surface.reload_item(reload);
        }
        let completion = surface.end_batch(batch);

        Ok(BatchDispatch {
            batch,
            completion,
            placeholders,
        })
    }

    /// Realize every section and row of `snapshot`, for a full reload.
    pub fn realize_snapshot(
        &mut self,
        snapshot: &Snapshot,
    ) -> Result<(Vec<RealizedSection>, usize), ReconcileError> {
        let mut placeholders = 0;
        let sections = snapshot
            .sections()
            .iter()
            .enumerate()
            .map(|(index, section)| {
                self.realize_section(index, section.clone(), &mut placeholders)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((sections, placeholders))
    }

    fn prepare(
        &mut self,
        engine: &DiffEngine<'_>,
        script: &EditScript,
    ) -> Result<PreparedBatch, ReconcileError> {
        let old_index = engine.old_index();
        let new_index = engine.new_index();
        let mut prepared = PreparedBatch::default();

        for change in script {
            match change {
                Change::SectionDelete { index } => prepared.section_deletes.push(*index),
                Change::SectionInsert { index, section } => {
                    let realized =
                        self.realize_section(*index, section.clone(), &mut prepared.placeholders)?;
                    prepared.section_inserts.push(realized);
                }
                Change::SectionMove { from, to } => prepared.section_moves.push((*from, *to)),
                Change::ItemDelete { section, index } => {
                    let path = IndexPath::new(position(old_index, section)?, *index);
                    prepared.item_deletes.push(path);
                }
                Change::ItemInsert {
                    section,
                    index,
                    item,
                } => {
                    let path = IndexPath::new(position(new_index, section)?, *index);
                    let realized = self.realize_item(path, item, &mut prepared.placeholders)?;
                    prepared.item_inserts.push(realized);
                }
                Change::ItemMove {
                    from_section,
                    from,
                    to_section,
                    to,
                } => {
                    let from = IndexPath::new(position(old_index, from_section)?, *from);
                    let to = IndexPath::new(position(new_index, to_section)?, *to);
                    prepared.item_moves.push((from, to));
                }
                Change::ItemReload { section, index } => {
                    let path = IndexPath::new(position(old_index, section)?, *index);
                    let item = engine
                        .old()
                        .item_at(path)
                        .ok_or_else(|| ReconcileError::UnknownSection { id: section.clone() })?;
                    let realized = self.realize_item(path, item, &mut prepared.placeholders)?;
                    prepared.item_reloads.push(realized);
                }
            }
        }

        Ok(prepared)
    }

    fn realize_section(
        &mut self,
        index: usize,
        section: Section,
        placeholders: &mut usize,
    ) -> Result<RealizedSection, ReconcileError> {
        let rows = section
            .items
            .iter()
            .enumerate()
            .map(|(row, item)| self.realize_item(IndexPath::new(index, row), item, placeholders))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RealizedSection {
            index,
            section,
            rows,
        })
    }

    fn realize_item(
        &mut self,
        index_path: IndexPath,
        item: &Item,
        placeholders: &mut usize,
    ) -> Result<RealizedItem, ReconcileError> {
        let mut cell: Box<dyn CellView> = match self.registry.realize(item) {
            Ok(cell) => cell,
            Err(ReconcileError::UnresolvedKind { kind })
                if self.policy == UnresolvedKindPolicy::Placeholder =>
            {
                warn!(
                    "Reconciler: no cell for kind '{}' at {}, using placeholder",
                    kind, index_path
                );
                *placeholders += 1;
                Box::new(PlaceholderCell::for_item(item))
            }
            Err(e) => return Err(e),
        };
        if let Some(delegate) = self.delegate.as_deref_mut() {
            delegate.modify_cell(cell.as_mut(), item, index_path);
        }
        Ok(RealizedItem {
            index_path,
            item: item.clone(),
            cell,
        })
    }
}

fn position(index: &SnapshotIndex<'_>, id: &SectionId) -> Result<usize, ReconcileError> {
    index
        .section_position(id)
        .ok_or_else(|| ReconcileError::UnknownSection { id: id.clone() })
}
