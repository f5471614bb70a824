//! Lifecycle and data-source callbacks forwarded from the surface
//!
//! Every method has a no-op (or "no opinion") default, so an implementor
//! overrides only what it needs.
use crate::registry::{CellView, SupplementaryKind};
use crate::types::{IndexPath, Item, Section, Size};

/// Something the surface reports about what it shows or what the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    WillDisplayCell(IndexPath),
    DidEndDisplayingCell(IndexPath),
    WillDisplaySupplementary {
        kind: SupplementaryKind,
        section: usize,
    },
    DidEndDisplayingSupplementary {
        kind: SupplementaryKind,
        section: usize,
    },
    Select(IndexPath),
    Deselect(IndexPath),
    Highlight(IndexPath),
    Unhighlight(IndexPath),
    PrimaryAction(IndexPath),
    Prefetch(Vec<IndexPath>),
    CancelPrefetch(Vec<IndexPath>),
    WillDisplayContextMenu(IndexPath),
    WillEndContextMenu(IndexPath),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditingStyle {
    None,
    Delete,
    Insert,
}

pub trait ListDelegate {
    /// Last chance to adjust a cell after it was configured with its model.
    fn modify_cell(&mut self, _cell: &mut dyn CellView, _item: &Item, _at: IndexPath) {}

    fn modify_supplementary(
        &mut self,
        _view: &mut dyn CellView,
        _section: &Section,
        _kind: SupplementaryKind,
        _at: usize,
    ) {
    }

    fn will_display(&mut self, _item: &Item, _at: IndexPath) {}

    fn did_end_displaying(&mut self, _item: &Item, _at: IndexPath) {}

    fn did_select(&mut self, _item: &Item, _at: IndexPath) {}

    fn did_deselect(&mut self, _item: &Item, _at: IndexPath) {}

    fn did_highlight(&mut self, _item: &Item, _at: IndexPath) {}

    fn did_unhighlight(&mut self, _item: &Item, _at: IndexPath) {}

    fn perform_primary_action(&mut self, _item: &Item, _at: IndexPath) {}

    fn will_display_supplementary(
        &mut self,
        _section: &Section,
        _kind: SupplementaryKind,
        _at: usize,
    ) {
    }

    fn did_end_displaying_supplementary(
        &mut self,
        _section: &Section,
        _kind: SupplementaryKind,
        _at: usize,
    ) {
    }

    fn will_display_context_menu(&mut self, _item: &Item, _at: IndexPath) {}

    fn will_end_context_menu_interaction(&mut self, _item: &Item, _at: IndexPath) {}
}

pub trait ListDataSource {
    /// Overrides the cell's own sizing when `Some`.
    fn size(&self, _item: &Item, _at: IndexPath) -> Option<Size> {
        None
    }

    /// Falls back to [`ListDataSource::size`].
    fn estimated_size(&self, item: &Item, at: IndexPath) -> Option<Size> {
        self.size(item, at)
    }

    /// Overrides the default text header/footer when `Some`.
    fn supplementary_view(
        &self,
        _section: &Section,
        _kind: SupplementaryKind,
        _at: usize,
    ) -> Option<Box<dyn CellView>> {
        None
    }

    fn section_index_titles(&self) -> Option<Vec<String>> {
        None
    }

    fn prefetch(&mut self, _items: &[Item], _at: &[IndexPath]) {}

    fn cancel_prefetch(&mut self, _items: &[Item], _at: &[IndexPath]) {}

    fn can_move(&self, _item: &Item, _at: IndexPath) -> bool {
        false
    }

    fn move_item(&mut self, _item: &Item, _from: IndexPath, _to: IndexPath) {}

    fn can_edit(&self, _item: &Item, _at: IndexPath) -> bool {
        false
    }

    fn commit_edit(&mut self, _item: &Item, _style: EditingStyle, _at: IndexPath) {}
}

/// Delegate and data source that keep every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct Noop;

impl ListDelegate for Noop {}

impl ListDataSource for Noop {}
