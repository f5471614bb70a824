#![allow(dead_code)]

use list_reconciler::{
    CellRegistry, Item, ListSurface, MemorySurface, ModelableCell, Reconciler, Section, Size,
    Snapshot, SurfaceContext, UnresolvedKindPolicy,
};

/// Row cell backed by a numeric id.
#[derive(Debug, Default)]
pub struct RowCell {
    pub id: Option<u32>,
}

impl ModelableCell for RowCell {
    type Model = u32;

    fn set_model(&mut self, model: u32) {
        self.id = Some(model);
    }

    fn model(&self) -> Option<&u32> {
        self.id.as_ref()
    }

    fn size(_model: &u32, context: &SurfaceContext) -> Option<Size> {
        Some(Size::new(context.width, 44.0))
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn row(id: u32) -> Item {
    Item::new("row", id)
}

pub fn section(id: &str, rows: &[u32]) -> Section {
    Section::new(id).with_items(rows.iter().copied().map(row))
}

pub fn registry() -> CellRegistry {
    let mut registry = CellRegistry::new();
    registry
        .register_as::<RowCell>("row")
        .expect("fresh registry accepts RowCell");
    registry
}

/// A surface already showing `snapshot`, with its call log cleared.
pub fn seeded_surface(registry: &CellRegistry, snapshot: &Snapshot) -> MemorySurface {
    let mut surface = MemorySurface::new();
    let (sections, _) = Reconciler::new(registry, UnresolvedKindPolicy::Fail, false)
        .realize_snapshot(snapshot)
        .expect("every row kind is registered");
    surface.reload_data(sections);
    surface.clear_calls();
    surface
}

/// Header and footer of every section the surface shows.
pub fn supplementaries(surface: &MemorySurface) -> Vec<(Option<String>, Option<String>)> {
    surface
        .sections()
        .iter()
        .map(|s| (s.header.clone(), s.footer.clone()))
        .collect()
}

pub fn snapshot_supplementaries(snapshot: &Snapshot) -> Vec<(Option<String>, Option<String>)> {
    snapshot
        .sections()
        .iter()
        .map(|s| (s.header.clone(), s.footer.clone()))
        .collect()
}
