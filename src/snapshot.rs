//! Immutable description of the desired list content at one point in time
use crate::errors::{Identity, ReconcileError};
use crate::types::{IndexPath, Item, Section, SectionId};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Ordered sections of ordered items.
///
/// Building is permissive: duplicates are only rejected by [`Snapshot::validate`],
/// which the diff engine runs on entry.
#[derive(Debug)]
pub struct Snapshot {
    id: Uuid,
    sections: Vec<Section>,
    reloads: HashSet<Item>,
}

/// A clone is a new instance with the same content, so it gets its own id.
impl Clone for Snapshot {
    fn clone(&self) -> Self {
        Snapshot {
            id: Uuid::new_v4(),
            sections: self.sections.clone(),
            reloads: self.reloads.clone(),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot::new()
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot {
            id: Uuid::new_v4(),
            sections: Vec::new(),
            reloads: HashSet::new(),
        }
    }

    pub fn from_sections(sections: impl IntoIterator<Item = Section>) -> Self {
        let mut snapshot = Snapshot::new();
        snapshot.append_sections(sections);
        snapshot
    }

    /// Unique per instance, clones included; correlates log lines and reports.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn append_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn append_sections(&mut self, sections: impl IntoIterator<Item = Section>) {
        self.sections.extend(sections);
    }

    /// Append items to the first section with `section` as identifier.
    pub fn append_items(
        &mut self,
        section: impl Into<SectionId>,
        items: impl IntoIterator<Item = Item>,
    ) -> Result<(), ReconcileError> {
        let id = section.into();
        let target = self
            .sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(ReconcileError::UnknownSection { id })?;
        target.items.extend(items);
        Ok(())
    }

    /// Ask for these items' cells to be rebuilt even though their identity
    /// did not change.
    pub fn reload_items(&mut self, items: impl IntoIterator<Item = Item>) {
        self.reloads.extend(items);
    }

    pub fn is_marked_for_reload(&self, item: &Item) -> bool {
        self.reloads.contains(item)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| &s.id == id)
    }

    pub fn section_at(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn section_ids(&self) -> impl Iterator<Item = &SectionId> {
        self.sections.iter().map(|s| &s.id)
    }

    pub fn item_at(&self, path: IndexPath) -> Option<&Item> {
        self.sections.get(path.section)?.items.get(path.item)
    }

    pub fn index_path_of(&self, item: &Item) -> Option<IndexPath> {
        self.sections.iter().enumerate().find_map(|(s, section)| {
            section
                .items
                .iter()
                .position(|candidate| candidate == item)
                .map(|i| IndexPath::new(s, i))
        })
    }

    pub fn number_of_sections(&self) -> usize {
        self.sections.len()
    }

    pub fn number_of_items(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section ids with their items in order; two snapshots with equal
    /// arrangements describe the same on-screen content.
    pub fn arrangement(&self) -> Vec<(SectionId, Vec<Item>)> {
        self.sections
            .iter()
            .map(|s| (s.id.clone(), s.items.clone()))
            .collect()
    }

    /// Check uniqueness of section ids and item identities, and build the
    /// lookup tables used for diffing.
    pub fn validate(&self) -> Result<SnapshotIndex<'_>, ReconcileError> {
        let mut sections = IndexMap::with_capacity(self.sections.len());
        let mut items = HashMap::with_capacity(self.number_of_items());

        for (s, section) in self.sections.iter().enumerate() {
            if sections.insert(&section.id, s).is_some() {
                return Err(ReconcileError::DuplicateIdentity {
                    identity: Identity::Section(section.id.clone()),
                });
            }
            for (i, item) in section.items.iter().enumerate() {
                if items.insert(item, IndexPath::new(s, i)).is_some() {
                    return Err(ReconcileError::DuplicateIdentity {
                        identity: Identity::Item {
                            kind: item.kind().clone(),
                            model: format!("{:?}", item.model()),
                        },
                    });
                }
            }
        }

        Ok(SnapshotIndex { sections, items })
    }
}

/// Lookup tables over a validated snapshot.
#[derive(Debug)]
pub struct SnapshotIndex<'a> {
    sections: IndexMap<&'a SectionId, usize>,
    items: HashMap<&'a Item, IndexPath>,
}

impl<'a> SnapshotIndex<'a> {
    pub fn section_position(&self, id: &SectionId) -> Option<usize> {
        self.sections.get(id).copied()
    }

    pub fn locate(&self, item: &Item) -> Option<IndexPath> {
        self.items.get(item).copied()
    }

    pub fn contains_section(&self, id: &SectionId) -> bool {
        self.sections.contains_key(id)
    }
}
