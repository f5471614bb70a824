//! Cell/View registry: item kind -> typed cell factory
use crate::errors::ReconcileError;
use crate::types::{AnyModel, CellKind, Item, Size, SurfaceContext};
use indexmap::IndexMap;
use log::debug;
use phf::phf_map;
use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;

/// A realized cell as the surface sees it: an opaque, inspectable view.
pub trait CellView: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn CellView {
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl<C: ModelableCell> CellView for C {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A cell bound to one model type at registration time.
pub trait ModelableCell: Default + fmt::Debug + 'static {
    type Model: crate::types::Model + Clone;

    fn set_model(&mut self, model: Self::Model);

    fn model(&self) -> Option<&Self::Model>;

    fn size(_model: &Self::Model, _context: &SurfaceContext) -> Option<Size> {
        None
    }

    fn estimated_size(model: &Self::Model, context: &SurfaceContext) -> Option<Size> {
        Self::size(model, context)
    }

    fn indentation_level(_model: &Self::Model, _context: &SurfaceContext) -> usize {
        0
    }
}

/// Type-erased factory stored in the registry.
pub trait CellFactory {
    fn make(&self, kind: &CellKind, model: &AnyModel) -> Result<Box<dyn CellView>, ReconcileError>;

    fn size(&self, model: &AnyModel, context: &SurfaceContext) -> Option<Size>;

    fn estimated_size(&self, model: &AnyModel, context: &SurfaceContext) -> Option<Size>;

    fn indentation_level(&self, model: &AnyModel, context: &SurfaceContext) -> usize;

    fn cell_type(&self) -> &'static str;
}

struct TypedFactory<C>(PhantomData<fn() -> C>);

impl<C: ModelableCell> CellFactory for TypedFactory<C> {
    fn make(&self, kind: &CellKind, model: &AnyModel) -> Result<Box<dyn CellView>, ReconcileError> {
        let model = model
            .downcast_ref::<C::Model>()
            .ok_or_else(|| ReconcileError::ModelMismatch {
                kind: kind.clone(),
                expected: type_name::<C::Model>(),
            })?;
        let mut cell = C::default();
        cell.set_model(model.clone());
        Ok(Box::new(cell))
    }

    fn size(&self, model: &AnyModel, context: &SurfaceContext) -> Option<Size> {
        C::size(model.downcast_ref::<C::Model>()?, context)
    }

    fn estimated_size(&self, model: &AnyModel, context: &SurfaceContext) -> Option<Size> {
        C::estimated_size(model.downcast_ref::<C::Model>()?, context)
    }

    fn indentation_level(&self, model: &AnyModel, context: &SurfaceContext) -> usize {
        model
            .downcast_ref::<C::Model>()
            .map_or(0, |model| C::indentation_level(model, context))
    }

    fn cell_type(&self) -> &'static str {
        type_name::<C>()
    }
}

/// Stand-in cell used when an item's kind is unregistered and the adapter
/// is configured to substitute rather than fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderCell {
    pub kind: CellKind,
    pub model: String,
}

impl CellView for PlaceholderCell {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl PlaceholderCell {
    pub fn for_item(item: &Item) -> Self {
        PlaceholderCell {
            kind: item.kind().clone(),
            model: format!("{:?}", item.model()),
        }
    }
}

#[derive(Default)]
pub struct CellRegistry {
    factories: IndexMap<CellKind, Box<dyn CellFactory>>,
}

impl fmt::Debug for CellRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.factories.iter().map(|(k, v)| (k.as_str(), v.cell_type())))
            .finish()
    }
}

impl CellRegistry {
    pub fn new() -> Self {
        CellRegistry::default()
    }

    /// Register `C` under its default kind, see [`CellKind::of`].
    pub fn register<C: ModelableCell>(&mut self) -> Result<(), ReconcileError> {
        self.register_as::<C>(CellKind::of::<C>())
    }

    /// Register `C` under an explicit kind. Registering the same type twice
    /// is a no-op; a different type under a taken kind is refused.
    pub fn register_as<C: ModelableCell>(
        &mut self,
        kind: impl Into<CellKind>,
    ) -> Result<(), ReconcileError> {
        let kind = kind.into();
        if let Some(existing) = self.factories.get(&kind) {
            if existing.cell_type() == type_name::<C>() {
                return Ok(());
            }
            return Err(ReconcileError::ConflictingRegistration {
                kind,
                existing: existing.cell_type(),
                attempted: type_name::<C>(),
            });
        }
        debug!("CellRegistry: '{}' -> {}", kind, type_name::<C>());
        self.factories
            .insert(kind, Box::new(TypedFactory::<C>(PhantomData)));
        Ok(())
    }

    pub fn resolve(&self, kind: &CellKind) -> Option<&dyn CellFactory> {
        self.factories.get(kind).map(|f| f.as_ref())
    }

    pub fn contains(&self, kind: &CellKind) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &CellKind> {
        self.factories.keys()
    }

    /// Build a configured cell for `item`.
    pub fn realize(&self, item: &Item) -> Result<Box<dyn CellView>, ReconcileError> {
        let factory = self
            .resolve(item.kind())
            .ok_or_else(|| ReconcileError::UnresolvedKind {
                kind: item.kind().clone(),
            })?;
        factory.make(item.kind(), item.model())
    }
}

/// Which supplementary slot of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplementaryKind {
    Header,
    Footer,
}

static SUPPLEMENTARY_KINDS: phf::Map<&'static str, SupplementaryKind> = phf_map! {
    "header" => SupplementaryKind::Header,
    "footer" => SupplementaryKind::Footer,
    "section-header" => SupplementaryKind::Header,
    "section-footer" => SupplementaryKind::Footer,
    "UICollectionElementKindSectionHeader" => SupplementaryKind::Header,
    "UICollectionElementKindSectionFooter" => SupplementaryKind::Footer,
};

impl SupplementaryKind {
    pub fn parse(name: &str) -> Option<Self> {
        SUPPLEMENTARY_KINDS.get(name).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SupplementaryKind::Header => "header",
            SupplementaryKind::Footer => "footer",
        }
    }
}

/// Default header/footer view: a single line of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSupplementaryView {
    model: Option<String>,
}

impl TextSupplementaryView {
    pub const HEIGHT: f64 = 22.0;

    pub fn text(&self) -> Option<&str> {
        self.model.as_deref()
    }
}

impl ModelableCell for TextSupplementaryView {
    type Model = String;

    fn set_model(&mut self, model: String) {
        self.model = Some(model);
    }

    fn model(&self) -> Option<&String> {
        self.model.as_ref()
    }

    fn size(_model: &String, context: &SurfaceContext) -> Option<Size> {
        Some(Size::new(context.width, Self::HEIGHT))
    }
}
