//! Headless in-memory list surface
//!
//! Holds sections of realized rows and applies batches with the same index
//! rules a platform list widget uses: deletes and move sources against the
//! arrangement before the batch, inserts and move destinations against the
//! arrangement after it. An inconsistent batch is refused as a whole and the
//! arrangement stays untouched.
use crate::registry::CellView;
use crate::surface::{Completion, ListSurface, RealizedItem, RealizedSection, SurfaceError};
use crate::types::{BatchId, IndexPath, Item, SectionId, SurfaceContext};
use log::{debug, warn};
use std::collections::VecDeque;

#[derive(Debug)]
pub struct MemoryRow {
    pub item: Item,
    pub cell: Box<dyn CellView>,
    /// How many times this row was reloaded in place.
    pub reloads: u32,
}

impl From<RealizedItem> for MemoryRow {
    fn from(realized: RealizedItem) -> Self {
        MemoryRow {
            item: realized.item,
            cell: realized.cell,
            reloads: 0,
        }
    }
}

#[derive(Debug)]
pub struct MemorySection {
    pub id: SectionId,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub rows: Vec<MemoryRow>,
}

impl From<RealizedSection> for MemorySection {
    fn from(realized: RealizedSection) -> Self {
        MemorySection {
            id: realized.section.id,
            header: realized.section.header,
            footer: realized.section.footer,
            rows: realized.rows.into_iter().map(MemoryRow::from).collect(),
        }
    }
}

/// Every call the surface received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    BeginBatch { batch: BatchId, animated: bool },
    DeleteSections(Vec<usize>),
    InsertSections(Vec<usize>),
    MoveSection { from: usize, to: usize },
    DeleteItems(Vec<IndexPath>),
    InsertItems(Vec<IndexPath>),
    MoveItem { from: IndexPath, to: IndexPath },
    ReloadItem(IndexPath),
    EndBatch(BatchId),
    ReloadData,
}

impl SurfaceCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, SurfaceCall::BeginBatch { .. } | SurfaceCall::EndBatch(_))
    }
}

#[derive(Debug)]
struct PendingBatch {
    batch: BatchId,
    section_deletes: Vec<usize>,
    section_inserts: Vec<RealizedSection>,
    section_moves: Vec<(usize, usize)>,
    item_deletes: Vec<IndexPath>,
    item_inserts: Vec<RealizedItem>,
    item_moves: Vec<(IndexPath, IndexPath)>,
    item_reloads: Vec<RealizedItem>,
}

impl PendingBatch {
    fn new(batch: BatchId) -> Self {
        PendingBatch {
            batch,
            section_deletes: Vec::new(),
            section_inserts: Vec::new(),
            section_moves: Vec::new(),
            item_deletes: Vec::new(),
            item_inserts: Vec::new(),
            item_moves: Vec::new(),
            item_reloads: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SectionSource {
    Old(usize),
    Inserted(usize),
}

#[derive(Debug, Clone, Copy)]
enum RowSource {
    Old(IndexPath),
    Inserted(usize),
}

#[derive(Debug, Default)]
pub struct MemorySurface {
    sections: Vec<MemorySection>,
    pending: Option<PendingBatch>,
    context: SurfaceContext,
    defer_completion: bool,
    fail_next: Option<SurfaceError>,
    completions: VecDeque<(BatchId, Result<(), SurfaceError>)>,
    calls: Vec<SurfaceCall>,
}

impl MemorySurface {
    pub fn new() -> Self {
        MemorySurface::default()
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.context.width = width;
        self
    }

    /// Report completion through [`MemorySurface::take_completion`] instead
    /// of synchronously from `end_batch`.
    pub fn with_deferred_completion(mut self) -> Self {
        self.defer_completion = true;
        self
    }

    /// Make the next batch fail with `error`, leaving the arrangement as is.
    pub fn fail_next_batch(&mut self, error: SurfaceError) {
        self.fail_next = Some(error);
    }

    /// Oldest completion not yet delivered, in deferred mode.
    pub fn take_completion(&mut self) -> Option<(BatchId, Result<(), SurfaceError>)> {
        self.completions.pop_front()
    }

    pub fn sections(&self) -> &[MemorySection] {
        &self.sections
    }

    pub fn arrangement(&self) -> Vec<(SectionId, Vec<Item>)> {
        self.sections
            .iter()
            .map(|s| (s.id.clone(), s.rows.iter().map(|r| r.item.clone()).collect()))
            .collect()
    }

    pub fn row_at(&self, path: IndexPath) -> Option<&MemoryRow> {
        self.sections.get(path.section)?.rows.get(path.item)
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn in_batch(&self) -> bool {
        self.pending.is_some()
    }

    fn pending_mut(&mut self, call: &str) -> Option<&mut PendingBatch> {
        if self.pending.is_none() {
            warn!("MemorySurface: {} outside of a batch ignored", call);
        }
        self.pending.as_mut()
    }

    fn commit(&mut self, batch: PendingBatch) -> Result<(), SurfaceError> {
        let old_len = self.sections.len();

        let mut deleted = vec![false; old_len];
        for &i in &batch.section_deletes {
            check_index("section", i, old_len)?;
            if std::mem::replace(&mut deleted[i], true) {
                return Err(inconsistent(format!("section {} deleted twice", i)));
            }
        }

        let mut moved_from = vec![false; old_len];
        for &(from, _) in &batch.section_moves {
            check_index("section", from, old_len)?;
            if deleted[from] || std::mem::replace(&mut moved_from[from], true) {
                return Err(inconsistent(format!("section {} moved after delete or twice", from)));
            }
        }

        let deleted_count = deleted.iter().filter(|&&d| d).count();
        let final_len = old_len - deleted_count + batch.section_inserts.len();

        let mut section_slots: Vec<Option<SectionSource>> = vec![None; final_len];
        for &(from, to) in &batch.section_moves {
            place(&mut section_slots, "section", to, SectionSource::Old(from))?;
        }
        for (k, inserted) in batch.section_inserts.iter().enumerate() {
            place(&mut section_slots, "section", inserted.index, SectionSource::Inserted(k))?;
        }
        let section_plan = fill(
            section_slots,
            (0..old_len)
                .filter(|&i| !deleted[i] && !moved_from[i])
                .map(SectionSource::Old),
        )
        .ok_or_else(|| inconsistent("section count mismatch".to_string()))?;

        let mut removed: Vec<Vec<bool>> = self
            .sections
            .iter()
            .map(|s| vec![false; s.rows.len()])
            .collect();
        let old_paths = batch
            .item_deletes
            .iter()
            .copied()
            .chain(batch.item_moves.iter().map(|&(from, _)| from));
        for path in old_paths {
            self.check_old_path(path, &deleted)?;
            if std::mem::replace(&mut removed[path.section][path.item], true) {
                return Err(inconsistent(format!("item {} removed twice", path)));
            }
        }
        for reload in &batch.item_reloads {
            let path = reload.index_path;
            self.check_old_path(path, &deleted)?;
            if removed[path.section][path.item] {
                return Err(inconsistent(format!("item {} reloaded and removed", path)));
            }
        }

        let mut incoming: Vec<Vec<(usize, RowSource)>> = (0..final_len).map(|_| Vec::new()).collect();
        let destinations = batch
            .item_moves
            .iter()
            .map(|&(from, to)| (to, RowSource::Old(from)))
            .chain(
                batch
                    .item_inserts
                    .iter()
                    .enumerate()
                    .map(|(k, inserted)| (inserted.index_path, RowSource::Inserted(k))),
            );
        for (to, source) in destinations {
            check_index("section", to.section, final_len)?;
            if let SectionSource::Inserted(_) = section_plan[to.section] {
                return Err(inconsistent(format!(
                    "item {} targets a section inserted in the same batch",
                    to
                )));
            }
            incoming[to.section].push((to.item, source));
        }

        let mut row_plans: Vec<Vec<RowSource>> = Vec::with_capacity(final_len);
        for (j, source) in section_plan.iter().enumerate() {
            let SectionSource::Old(i) = *source else {
                row_plans.push(Vec::new());
                continue;
            };
            let kept: Vec<usize> = (0..self.sections[i].rows.len())
                .filter(|&r| !removed[i][r])
                .collect();
            let len = kept.len() + incoming[j].len();
            let mut slots: Vec<Option<RowSource>> = vec![None; len];
            for (position, source) in incoming[j].drain(..) {
                place(&mut slots, "item", position, source)?;
            }
            let plan = fill(slots, kept.into_iter().map(|r| RowSource::Old(IndexPath::new(i, r))))
                .ok_or_else(|| inconsistent(format!("item count mismatch in section {}", j)))?;
            row_plans.push(plan);
        }

        // Validated; from here on nothing fails.
        let old_sections = std::mem::take(&mut self.sections);
        let mut metas = Vec::with_capacity(old_len);
        let mut grid: Vec<Vec<Option<MemoryRow>>> = Vec::with_capacity(old_len);
        for section in old_sections {
            metas.push((section.id, section.header, section.footer));
            grid.push(section.rows.into_iter().map(Some).collect());
        }

        for reload in batch.item_reloads {
            let path = reload.index_path;
            if let Some(row) = grid[path.section][path.item].as_mut() {
                row.item = reload.item;
                row.cell = reload.cell;
                row.reloads += 1;
            }
        }

        let mut inserted_sections: Vec<Option<RealizedSection>> =
            batch.section_inserts.into_iter().map(Some).collect();
        let mut inserted_rows: Vec<Option<RealizedItem>> =
            batch.item_inserts.into_iter().map(Some).collect();

        let mut sections = Vec::with_capacity(final_len);
        for (source, rows) in section_plan.into_iter().zip(row_plans) {
            match source {
                SectionSource::Old(i) => {
                    let (id, header, footer) = metas[i].clone();
                    let rows = rows
                        .into_iter()
                        .filter_map(|row| match row {
                            RowSource::Old(p) => grid[p.section][p.item].take(),
                            RowSource::Inserted(k) => inserted_rows[k].take().map(MemoryRow::from),
                        })
                        .collect();
                    sections.push(MemorySection {
                        id,
                        header,
                        footer,
                        rows,
                    });
                }
                SectionSource::Inserted(k) => {
                    if let Some(realized) = inserted_sections[k].take() {
                        sections.push(MemorySection::from(realized));
                    }
                }
            }
        }

        self.sections = sections;
        Ok(())
    }

    fn check_old_path(&self, path: IndexPath, deleted: &[bool]) -> Result<(), SurfaceError> {
        check_index("section", path.section, self.sections.len())?;
        if deleted[path.section] {
            return Err(inconsistent(format!(
                "item {} belongs to a section deleted in the same batch",
                path
            )));
        }
        check_index("item", path.item, self.sections[path.section].rows.len())
    }
}

fn inconsistent(message: String) -> SurfaceError {
    SurfaceError::Inconsistent(message)
}

fn check_index(what: &'static str, index: usize, len: usize) -> Result<(), SurfaceError> {
    if index < len {
        Ok(())
    } else {
        Err(SurfaceError::IndexOutOfRange { what, index, len })
    }
}

fn place<T>(slots: &mut [Option<T>], what: &'static str, index: usize, value: T) -> Result<(), SurfaceError> {
    check_index(what, index, slots.len())?;
    if slots[index].is_some() {
        return Err(inconsistent(format!("two {}s land at index {}", what, index)));
    }
    slots[index] = Some(value);
    Ok(())
}

/// Fill the empty slots with `rest` in order; `None` when the counts differ.
fn fill<T>(mut slots: Vec<Option<T>>, rest: impl IntoIterator<Item = T>) -> Option<Vec<T>> {
    let mut rest = rest.into_iter();
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        *slot = rest.next();
    }
    if rest.next().is_some() {
        return None;
    }
    slots.into_iter().collect()
}

impl ListSurface for MemorySurface {
    fn context(&self) -> SurfaceContext {
        self.context
    }

    fn begin_batch(&mut self, batch: BatchId, animated: bool) {
        self.calls.push(SurfaceCall::BeginBatch { batch, animated });
        if let Some(stale) = self.pending.replace(PendingBatch::new(batch)) {
            warn!("MemorySurface: {} replaced unfinished {}", batch, stale.batch);
        }
    }

    fn delete_sections(&mut self, indices: &[usize]) {
        self.calls.push(SurfaceCall::DeleteSections(indices.to_vec()));
        if let Some(pending) = self.pending_mut("delete_sections") {
            pending.section_deletes.extend_from_slice(indices);
        }
    }

    fn insert_sections(&mut self, sections: Vec<RealizedSection>) {
        self.calls.push(SurfaceCall::InsertSections(
            sections.iter().map(|s| s.index).collect(),
        ));
        if let Some(pending) = self.pending_mut("insert_sections") {
            pending.section_inserts.extend(sections);
        }
    }

    fn move_section(&mut self, from: usize, to: usize) {
        self.calls.push(SurfaceCall::MoveSection { from, to });
        if let Some(pending) = self.pending_mut("move_section") {
            pending.section_moves.push((from, to));
        }
    }

    fn delete_items(&mut self, paths: &[IndexPath]) {
        self.calls.push(SurfaceCall::DeleteItems(paths.to_vec()));
        if let Some(pending) = self.pending_mut("delete_items") {
            pending.item_deletes.extend_from_slice(paths);
        }
    }

    fn insert_items(&mut self, items: Vec<RealizedItem>) {
        self.calls.push(SurfaceCall::InsertItems(
            items.iter().map(|i| i.index_path).collect(),
        ));
        if let Some(pending) = self.pending_mut("insert_items") {
            pending.item_inserts.extend(items);
        }
    }

    fn move_item(&mut self, from: IndexPath, to: IndexPath) {
        self.calls.push(SurfaceCall::MoveItem { from, to });
        if let Some(pending) = self.pending_mut("move_item") {
            pending.item_moves.push((from, to));
        }
    }

    fn reload_item(&mut self, item: RealizedItem) {
        self.calls.push(SurfaceCall::ReloadItem(item.index_path));
        if let Some(pending) = self.pending_mut("reload_item") {
            pending.item_reloads.push(item);
        }
    }

    fn end_batch(&mut self, batch: BatchId) -> Completion {
        self.calls.push(SurfaceCall::EndBatch(batch));
        let result = match self.pending.take() {
            None => Err(inconsistent(format!("{} ended without begin", batch))),
            Some(pending) if pending.batch != batch => Err(inconsistent(format!(
                "{} ended while {} was open",
                batch, pending.batch
            ))),
            Some(pending) => match self.fail_next.take() {
                Some(error) => Err(error),
                None => self.commit(pending),
            },
        };
        debug!("MemorySurface: {} finished with {:?}", batch, result);

        if self.defer_completion {
            self.completions.push_back((batch, result));
            Completion::Deferred
        } else {
            Completion::Finished(result)
        }
    }

    fn reload_data(&mut self, sections: Vec<RealizedSection>) {
        self.calls.push(SurfaceCall::ReloadData);
        if self.pending.take().is_some() {
            warn!("MemorySurface: reload_data discarded an open batch");
        }
        let mut ordered = sections;
        ordered.sort_by_key(|s| s.index);
        self.sections = ordered.into_iter().map(MemorySection::from).collect();
    }
}
