//! Incremental reconciliation of the rendered rows against a new item list.
//!
//! ```text
//!  rendered: a b c d        target: d a c e
//!  1. remove unconsumed       → a c d        (b removed)
//!  2. stable set = longest run already in order (a c)
//!  3. place right to left, each before its successor
//!       e: create at end      → a c d e
//!       c: stable
//!       a: stable
//!       d: move before a      → d a c e
//! ```
//!
//! Rows in the stable set are never touched structurally, so an update that
//! only swaps two neighbours costs a single move.

use std::collections::{HashMap, HashSet};

use super::{ItemId, PlaylistItem, RowSink, VisibilityClassifier};
use crate::error::{Error, Result};

/// What one [`PlaylistReconciler::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    pub created: usize,
    pub moved: usize,
    pub updated: usize,
    pub removed: usize,
    pub visible: usize,
    pub hidden: usize,
    /// "Has any visible item" changed, so drawer geometry must be re-measured
    pub visibility_flipped: bool,
    /// The active item is no longer rendered
    pub active_lost: bool,
}

impl ReconcileReport {
    /// No row was created, moved, updated or removed.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.moved == 0 && self.updated == 0 && self.removed == 0
    }
}

/// Mirror of the rows owned by this engine, keyed by item id.
#[derive(Debug, Default)]
pub struct PlaylistReconciler {
    /// Last full item list with `hidden` set
    items: Vec<PlaylistItem>,
    /// Ids in the sink's current row order
    rendered: Vec<ItemId>,
    /// Field snapshot of every rendered row
    snapshots: HashMap<ItemId, PlaylistItem>,
    active: Option<ItemId>,
    highlighted: Option<ItemId>,
}

impl PlaylistReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last item list, in source order, hidden items included.
    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    /// Ids of the rendered rows, in row order.
    pub fn rendered(&self) -> &[ItemId] {
        &self.rendered
    }

    pub fn has_visible(&self) -> bool {
        !self.rendered.is_empty()
    }

    pub fn is_item_visible(&self, id: &str) -> bool {
        self.snapshots.contains_key(id)
    }

    /// The item the host reported as playing, rendered or not.
    pub fn active(&self) -> Option<&ItemId> {
        self.active.as_ref()
    }

    /// The row currently highlighted in the sink.
    pub fn highlighted(&self) -> Option<&ItemId> {
        self.highlighted.as_ref()
    }

    /// Replace the item list and bring the rows in line with it.
    pub fn update<R: RowSink + ?Sized>(
        &mut self,
        mut items: Vec<PlaylistItem>,
        classifier: &VisibilityClassifier<'_>,
        rows: &mut R,
    ) -> ReconcileReport {
        let had_visible = self.has_visible();
        let mut report = ReconcileReport::default();
        classifier.apply(&mut items);

        // Visible items in order; a repeated id only renders once
        let mut target: Vec<usize> = Vec::new();
        let mut wanted: HashSet<ItemId> = HashSet::new();
        for (index, item) in items.iter_mut().enumerate() {
            if item.is_hidden() {
                continue;
            }
            if wanted.insert(item.id.clone()) {
                target.push(index);
            } else {
                tracing::warn!(target: "playlist::reconcile", "Duplicate item id {} ignored", item.id);
                item.set_hidden(true);
            }
        }
        report.visible = target.len();
        report.hidden = items.len() - target.len();

        // Removals first so they never cost extra moves
        let snapshots = &mut self.snapshots;
        self.rendered.retain(|id| {
            if wanted.contains(id) {
                return true;
            }
            rows.remove_row(id);
            snapshots.remove(id);
            report.removed += 1;
            false
        });

        let stable = self.stable_ids(&items, &target);
        let mut current = std::mem::take(&mut self.rendered);
        let mut anchor: Option<&ItemId> = None;
        for &index in target.iter().rev() {
            let item = &items[index];
            match self.snapshots.get_mut(&item.id) {
                None => {
                    let at = position_before(&current, anchor);
                    rows.create_row(at, item);
                    current.insert(at, item.id.clone());
                    self.snapshots.insert(item.id.clone(), item.clone());
                    report.created += 1;
                }
                Some(snapshot) => {
                    if !stable.contains(&item.id) {
                        if let Some(from) = current.iter().position(|id| *id == item.id) {
                            current.remove(from);
                        }
                        let at = position_before(&current, anchor);
                        rows.move_row(&item.id, at);
                        current.insert(at, item.id.clone());
                        report.moved += 1;
                    }
                    if !snapshot.same_content(item) {
                        rows.update_row(item);
                        *snapshot = item.clone();
                        report.updated += 1;
                    }
                }
            }
            anchor = Some(&item.id);
        }
        self.rendered = current;
        debug_assert!(
            self.rendered
                .iter()
                .eq(target.iter().map(|&i| &items[i].id)),
            "rendered rows out of order"
        );

        report.active_lost = self.sync_highlight(rows);
        report.visibility_flipped = had_visible != self.has_visible();
        self.items = items;

        tracing::debug!(
            target: "playlist::reconcile",
            "Reconciled {} items ({} hidden): +{} ~{} >{} -{}",
            report.visible + report.hidden,
            report.hidden,
            report.created,
            report.updated,
            report.moved,
            report.removed
        );
        report
    }

    /// Record the playing item and highlight its row.
    ///
    /// The id is remembered even when it is not rendered so the highlight
    /// comes back if a later update shows it again; in that case nothing is
    /// highlighted and [`Error::StaleIdentity`] is returned.
    pub fn set_active_item<R: RowSink + ?Sized>(&mut self, id: ItemId, rows: &mut R) -> Result<()> {
        self.active = Some(id.clone());
        if self.sync_highlight(rows) {
            return Err(Error::StaleIdentity(id));
        }
        Ok(())
    }

    pub fn clear_active<R: RowSink + ?Sized>(&mut self, rows: &mut R) {
        self.active = None;
        self.sync_highlight(rows);
    }

    /// Remove every row and forget all state.
    pub fn clear<R: RowSink + ?Sized>(&mut self, rows: &mut R) {
        for id in self.rendered.drain(..) {
            rows.remove_row(&id);
        }
        self.snapshots.clear();
        self.items.clear();
        self.active = None;
        self.highlighted = None;
    }

    /// Make the sink's highlight match `active`. Returns true when the active
    /// item exists but has no row.
    fn sync_highlight<R: RowSink + ?Sized>(&mut self, rows: &mut R) -> bool {
        let wanted = self
            .active
            .as_ref()
            .filter(|id| self.snapshots.contains_key(id.as_str()));
        if wanted != self.highlighted.as_ref() {
            rows.set_active(wanted);
            self.highlighted = wanted.cloned();
        }
        let lost = self.active.is_some() && wanted.is_none();
        if lost {
            tracing::debug!(target: "playlist::reconcile", "Active item is not rendered");
        }
        lost
    }

    /// Ids of rendered rows that can stay where they are: the longest run of
    /// target items whose current order already matches.
    fn stable_ids(&self, items: &[PlaylistItem], target: &[usize]) -> HashSet<ItemId> {
        let position: HashMap<&ItemId, usize> = self.rendered.iter().enumerate().map(|(i, id)| (id, i)).collect();
        let existing: Vec<(&ItemId, usize)> = target
            .iter()
            .filter_map(|&i| position.get(&items[i].id).map(|&pos| (&items[i].id, pos)))
            .collect();
        let positions: Vec<usize> = existing.iter().map(|&(_, pos)| pos).collect();
        longest_increasing(&positions)
            .into_iter()
            .zip(existing)
            .filter_map(|(keep, (id, _))| keep.then(|| id.clone()))
            .collect()
    }
}

/// Index at which a row must be inserted to sit right before `anchor`
/// (or at the end).
fn position_before(current: &[ItemId], anchor: Option<&ItemId>) -> usize {
    anchor
        .and_then(|anchor| current.iter().position(|id| id == anchor))
        .unwrap_or(current.len())
}

/// Marks the members of one longest strictly increasing subsequence.
fn longest_increasing(seq: &[usize]) -> Vec<bool> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, &value) in seq.iter().enumerate() {
        let pos = tails.partition_point(|&t| seq[t] < value);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }
    let mut keep = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = prev[i];
    }
    keep
}
