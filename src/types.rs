//! Identity model: type-erased models, items, sections and index paths
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Anything that can back a list item: compared and hashed by value.
///
/// Blanket-implemented, so any `Eq + Hash + Debug` type that is `'static`
/// and thread-safe can be used as a model without ceremony.
pub trait Model: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn Model) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl<T> Model for T
where
    T: Any + fmt::Debug + Eq + Hash + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Model) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// A model with its concrete type erased. Equality and hashing go through
/// the concrete type, so two models of different types never compare equal.
#[derive(Clone)]
pub struct AnyModel(Arc<dyn Model>);

impl AnyModel {
    pub fn new<T: Model>(model: T) -> Self {
        AnyModel(Arc::new(model))
    }

    /// Recover the concrete model, `None` when `T` is not the stored type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.as_ref().as_any().is::<T>()
    }
}

impl PartialEq for AnyModel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.as_ref().dyn_eq(other.0.as_ref())
    }
}

impl Eq for AnyModel {}

impl Hash for AnyModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_ref().dyn_hash(state);
    }
}

impl fmt::Debug for AnyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.0.as_ref(), f)
    }
}

/// Tag naming which cell type renders an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKind(Arc<str>);

impl CellKind {
    pub fn new(kind: impl AsRef<str>) -> Self {
        CellKind(Arc::from(kind.as_ref()))
    }

    /// Default kind of a cell type: its type name.
    pub fn of<C: ?Sized + 'static>() -> Self {
        CellKind::new(std::any::type_name::<C>())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CellKind {
    fn from(kind: &str) -> Self {
        CellKind::new(kind)
    }
}

impl From<String> for CellKind {
    fn from(kind: String) -> Self {
        CellKind::new(kind)
    }
}

/// One list element. The (kind, model) pair is both its identity across
/// snapshots and its change-detection key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    kind: CellKind,
    model: AnyModel,
}

impl Item {
    pub fn new<T: Model>(kind: impl Into<CellKind>, model: T) -> Self {
        Item {
            kind: kind.into(),
            model: AnyModel::new(model),
        }
    }

    /// Item rendered by cell type `C`, tagged with `C`'s default kind.
    pub fn cell<C: crate::registry::ModelableCell>(model: C::Model) -> Self {
        Item::new(CellKind::of::<C>(), model)
    }

    pub fn kind(&self) -> &CellKind {
        &self.kind
    }

    pub fn model(&self) -> &AnyModel {
        &self.model
    }

    pub fn model_as<T: Any>(&self) -> Option<&T> {
        self.model.downcast_ref::<T>()
    }
}

/// Section identifier, unique within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(Arc<str>);

impl SectionId {
    pub fn new(id: impl AsRef<str>) -> Self {
        SectionId(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SectionId {
    fn from(id: &str) -> Self {
        SectionId::new(id)
    }
}

impl From<String> for SectionId {
    fn from(id: String) -> Self {
        SectionId::new(id)
    }
}

impl From<&SectionId> for SectionId {
    fn from(id: &SectionId) -> Self {
        id.clone()
    }
}

/// A section: identifier, optional header/footer text, ordered items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub items: Vec<Item>,
}

impl Section {
    pub fn new(id: impl Into<SectionId>) -> Self {
        Section {
            id: id.into(),
            header: None,
            footer: None,
            items: Vec::new(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items.extend(items);
        self
    }

    /// Header and footer equal; items are not compared.
    pub fn same_supplementaries(&self, other: &Section) -> bool {
        self.header == other.header && self.footer == other.footer
    }
}

/// Position of an item: section index plus item index within that section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    pub fn new(section: usize, item: usize) -> Self {
        IndexPath { section, item }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.item)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }
}

/// What a cell needs to know about the surface to size itself.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceContext {
    pub width: f64,
}

/// Identifier of one batch transaction against a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch#{}", self.0)
    }
}

/// Global batch counter (lock-free, atomic)
static BATCH_COUNTER: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(1));

pub fn next_batch_id() -> BatchId {
    BatchId(BATCH_COUNTER.fetch_add(1, Ordering::SeqCst))
}
