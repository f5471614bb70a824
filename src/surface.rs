//! Mutation capability of the external list widget
use crate::registry::CellView;
use crate::types::{BatchId, IndexPath, Item, Section, SurfaceContext};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Inconsistent batch: {0}")]
    Inconsistent(String),

    #[error("Surface rejected the batch: {0}")]
    Rejected(String),
}

/// An item paired with the cell built for it.
#[derive(Debug)]
pub struct RealizedItem {
    pub index_path: IndexPath,
    pub item: Item,
    pub cell: Box<dyn CellView>,
}

/// A section to insert, with every row already realized.
#[derive(Debug)]
pub struct RealizedSection {
    pub index: usize,
    pub section: Section,
    pub rows: Vec<RealizedItem>,
}

/// How a batch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The surface finished synchronously.
    Finished(Result<(), SurfaceError>),
    /// The surface will signal completion later through
    /// [`ListAdapter::complete`](crate::adapter::ListAdapter::complete).
    Deferred,
}

/// What the reconciler needs from a sectioned list widget.
///
/// Between `begin_batch` and `end_batch`, delete and move-from indices
/// refer to the arrangement before the batch and insert and move-to
/// indices to the arrangement after it. `end_batch` must always report
/// completion, including when the batch failed.
pub trait ListSurface {
    fn context(&self) -> SurfaceContext {
        SurfaceContext::default()
    }

    fn begin_batch(&mut self, batch: BatchId, animated: bool);

    fn delete_sections(&mut self, indices: &[usize]);

    fn insert_sections(&mut self, sections: Vec<RealizedSection>);

    fn move_section(&mut self, from: usize, to: usize);

    fn delete_items(&mut self, paths: &[IndexPath]);

    fn insert_items(&mut self, items: Vec<RealizedItem>);

    fn move_item(&mut self, from: IndexPath, to: IndexPath);

    /// `item.index_path` is the position before the batch.
    fn reload_item(&mut self, item: RealizedItem);

    fn end_batch(&mut self, batch: BatchId) -> Completion;

    /// Throw away everything and show `sections`, outside of any batch.
    fn reload_data(&mut self, sections: Vec<RealizedSection>);
}
