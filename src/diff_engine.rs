//! Core diffing engine: identity-hash matching with LIS-based move minimization
use crate::errors::ReconcileError;
use crate::snapshot::{Snapshot, SnapshotIndex};
use crate::types::{Item, Section, SectionId};
use log::{debug, trace};
use serde::Serialize;
use std::collections::HashSet;

/// One edit against the list surface.
///
/// Delete and move-from positions refer to the old arrangement, insert and
/// move-to positions to the new one. Reloads use old positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    SectionDelete {
        index: usize,
    },
    SectionInsert {
        index: usize,
        section: Section,
    },
    SectionMove {
        from: usize,
        to: usize,
    },
    ItemDelete {
        section: SectionId,
        index: usize,
    },
    ItemInsert {
        section: SectionId,
        index: usize,
        item: Item,
    },
    ItemMove {
        from_section: SectionId,
        from: usize,
        to_section: SectionId,
        to: usize,
    },
    ItemReload {
        section: SectionId,
        index: usize,
    },
}

/// Ordered edit script: section deletes, section inserts, section moves,
/// item deletes, item inserts, item moves, item reloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript {
    changes: Vec<Change>,
}

/// Per-kind change counts, used for logging and apply reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScriptSummary {
    pub section_deletes: usize,
    pub section_inserts: usize,
    pub section_moves: usize,
    pub item_deletes: usize,
    pub item_inserts: usize,
    pub item_moves: usize,
    pub item_reloads: usize,
}

impl EditScript {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn summary(&self) -> ScriptSummary {
        let mut summary = ScriptSummary::default();
        for change in &self.changes {
            match change {
                Change::SectionDelete { .. } => summary.section_deletes += 1,
                Change::SectionInsert { .. } => summary.section_inserts += 1,
                Change::SectionMove { .. } => summary.section_moves += 1,
                Change::ItemDelete { .. } => summary.item_deletes += 1,
                Change::ItemInsert { .. } => summary.item_inserts += 1,
                Change::ItemMove { .. } => summary.item_moves += 1,
                Change::ItemReload { .. } => summary.item_reloads += 1,
            }
        }
        summary
    }
}

impl IntoIterator for EditScript {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'s> IntoIterator for &'s EditScript {
    type Item = &'s Change;
    type IntoIter = std::slice::Iter<'s, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Compute the edit script turning `old` into `new`.
///
/// Fails with `DuplicateIdentity` when either snapshot repeats a section id
/// or an item identity; nothing is emitted in that case.
pub fn diff(old: &Snapshot, new: &Snapshot) -> Result<EditScript, ReconcileError> {
    Ok(DiffEngine::new(old, new)?.diff())
}

pub struct DiffEngine<'a> {
    old: &'a Snapshot,
    new: &'a Snapshot,
    old_index: SnapshotIndex<'a>,
    new_index: SnapshotIndex<'a>,
}

/// Buckets filled while walking the snapshots, concatenated in emission order.
#[derive(Default)]
struct Buckets {
    section_deletes: Vec<Change>,
    section_inserts: Vec<Change>,
    section_moves: Vec<Change>,
    item_deletes: Vec<Change>,
    item_inserts: Vec<Change>,
    item_moves: Vec<Change>,
    item_reloads: Vec<Change>,
}

impl Buckets {
    fn into_script(self) -> EditScript {
        let changes = self
            .section_deletes
            .into_iter()
            .chain(self.section_inserts)
            .chain(self.section_moves)
            .chain(self.item_deletes)
            .chain(self.item_inserts)
            .chain(self.item_moves)
            .chain(self.item_reloads)
            .collect();
        EditScript { changes }
    }
}

impl<'a> DiffEngine<'a> {
    pub fn new(old: &'a Snapshot, new: &'a Snapshot) -> Result<Self, ReconcileError> {
        let old_index = old.validate()?;
        let new_index = new.validate()?;
        Ok(DiffEngine {
            old,
            new,
            old_index,
            new_index,
        })
    }

    pub fn old(&self) -> &'a Snapshot {
        self.old
    }

    pub fn new_snapshot(&self) -> &'a Snapshot {
        self.new
    }

    pub fn old_index(&self) -> &SnapshotIndex<'a> {
        &self.old_index
    }

    pub fn new_index(&self) -> &SnapshotIndex<'a> {
        &self.new_index
    }

    pub fn diff(&self) -> EditScript {
        let old_sections = self.old.sections();
        let new_sections = self.new.sections();

        // A section survives when its id is in both snapshots and its
        // header/footer are unchanged; otherwise it is deleted and reinserted.
        let survivor_of_old: Vec<Option<usize>> = old_sections
            .iter()
            .map(|section| {
                self.new_index
                    .section_position(&section.id)
                    .filter(|&j| new_sections[j].same_supplementaries(section))
            })
            .collect();
        let survivor_of_new: Vec<Option<usize>> = new_sections
            .iter()
            .enumerate()
            .map(|(j, section)| {
                self.old_index
                    .section_position(&section.id)
                    .filter(|&i| survivor_of_old[i] == Some(j))
            })
            .collect();

        let mut out = Buckets::default();

        for (i, survivor) in survivor_of_old.iter().enumerate() {
            if survivor.is_none() {
                out.section_deletes.push(Change::SectionDelete { index: i });
            }
        }

        for (j, survivor) in survivor_of_new.iter().enumerate() {
            if survivor.is_none() {
                out.section_inserts.push(Change::SectionInsert {
                    index: j,
                    section: new_sections[j].clone(),
                });
            }
        }

        let kept: Vec<usize> = survivor_of_new.iter().flatten().copied().collect();
        let stable = stable_positions(&kept);
        for (j, survivor) in survivor_of_new.iter().enumerate() {
            if let Some(i) = *survivor {
                if !stable.contains(&i) {
                    out.section_moves.push(Change::SectionMove { from: i, to: j });
                }
            }
        }

        // Items leaving surviving sections.
        for (i, section) in old_sections.iter().enumerate() {
            if survivor_of_old[i].is_none() {
                continue;
            }
            for (o, item) in section.items.iter().enumerate() {
                let lands_in_survivor = self
                    .new_index
                    .locate(item)
                    .is_some_and(|p| survivor_of_new[p.section].is_some());
                if !lands_in_survivor {
                    out.item_deletes.push(Change::ItemDelete {
                        section: section.id.clone(),
                        index: o,
                    });
                }
            }
        }

        // Items arriving in, moving within, or moving between surviving sections.
        for (j, section) in new_sections.iter().enumerate() {
            let Some(i) = survivor_of_new[j] else {
                continue;
            };

            let mut same_section: Vec<(usize, usize)> = Vec::new();
            let mut arrivals: Vec<(usize, Change)> = Vec::new();

            for (r, item) in section.items.iter().enumerate() {
                match self.old_index.locate(item) {
                    Some(p) if p.section == i => same_section.push((r, p.item)),
                    Some(p) if survivor_of_old[p.section].is_some() => arrivals.push((
                        r,
                        Change::ItemMove {
                            from_section: old_sections[p.section].id.clone(),
                            from: p.item,
                            to_section: section.id.clone(),
                            to: r,
                        },
                    )),
                    _ => out.item_inserts.push(Change::ItemInsert {
                        section: section.id.clone(),
                        index: r,
                        item: item.clone(),
                    }),
                }
            }

            let old_positions: Vec<usize> = same_section.iter().map(|&(_, o)| o).collect();
            let stable = stable_positions(&old_positions);
            for (r, o) in same_section {
                if !stable.contains(&o) {
                    arrivals.push((
                        r,
                        Change::ItemMove {
                            from_section: section.id.clone(),
                            from: o,
                            to_section: section.id.clone(),
                            to: r,
                        },
                    ));
                } else if self.new.is_marked_for_reload(&section.items[r]) {
                    out.item_reloads.push(Change::ItemReload {
                        section: section.id.clone(),
                        index: o,
                    });
                }
            }

            arrivals.sort_by_key(|&(r, _)| r);
            out.item_moves.extend(arrivals.into_iter().map(|(_, change)| change));
        }

        let script = out.into_script();
        for change in &script {
            trace!("DiffEngine: {:?}", change);
        }
        debug!(
            "DiffEngine: {} -> {} produced {} changes {:?}",
            self.old.id(),
            self.new.id(),
            script.len(),
            script.summary()
        );
        script
    }
}

/// Old positions that keep their relative order: the longest increasing
/// subsequence of `old_positions` (given in new order).
fn stable_positions(old_positions: &[usize]) -> HashSet<usize> {
    // lis panics on an empty slice
    if old_positions.is_empty() {
        return HashSet::new();
    }
    lis::longest_increasing_subsequence(old_positions)
        .into_iter()
        .map(|k| old_positions[k])
        .collect()
}
