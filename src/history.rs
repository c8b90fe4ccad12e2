//! Operation history: invertible entries, bounded undo/redo stacks, and
//! batch bracketing.
//!
//! Every entry is one variant of a single tagged union carrying exactly the
//! data needed to reverse itself, so undo and redo are each one exhaustive
//! `match` rather than virtual dispatch across a class hierarchy. Only
//! mutations that actually changed state ever reach the stacks — expected
//! no-ops (nothing to lock, group too small, last page) are filtered out by
//! the session before recording.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use crate::consts::MAX_HISTORY;
use crate::doc::{Asset, Group, ItemId, Page, Stroke};
use crate::session::{BoardEvent, BoardSession};

/// Previous lock state of one item, captured before a lock/unlock pass.
#[derive(Debug, Clone)]
pub struct LockChange {
    pub id: ItemId,
    pub prev_locked: bool,
    pub prev_owner: Option<String>,
}

/// One reversible mutation. Variants carry inverse-sufficient data.
#[derive(Debug, Clone)]
pub enum HistoryEntry {
    AddStroke {
        page_index: usize,
        stroke: Stroke,
    },
    AddAsset {
        page_index: usize,
        asset: Asset,
    },
    /// Deletion of a set of items, with original positions and the group
    /// lists before/after the same-transaction auto-dissolve.
    DeleteItems {
        page_index: usize,
        strokes: Vec<(usize, Stroke)>,
        assets: Vec<(usize, Asset)>,
        groups_before: Vec<Group>,
        groups_after: Vec<Group>,
    },
    Lock {
        page_index: usize,
        owner: String,
        changes: Vec<LockChange>,
    },
    Unlock {
        page_index: usize,
        changes: Vec<LockChange>,
    },
    CreateGroup {
        page_index: usize,
        group: Group,
    },
    DeleteGroup {
        page_index: usize,
        group: Group,
    },
    AddPage {
        page: Page,
    },
    DeletePage {
        page: Page,
        index: usize,
        was_current: usize,
    },
    ReorderPages {
        previous_order: Vec<String>,
        new_order: Vec<String>,
        previous_page_index: usize,
    },
    /// Clearing unlocked items off a page; locked items were preserved.
    ClearPage {
        page_index: usize,
        strokes: Vec<Stroke>,
        assets: Vec<Asset>,
        groups_before: Vec<Group>,
        groups_after: Vec<Group>,
    },
    Duplicate {
        page_index: usize,
        new_ids: Vec<ItemId>,
        original_ids: Vec<ItemId>,
        strokes: Vec<Stroke>,
        assets: Vec<Asset>,
    },
    MoveItems {
        page_index: usize,
        ids: Vec<ItemId>,
        dx: f64,
        dy: f64,
    },
    SetStickyText {
        page_index: usize,
        id: ItemId,
        prev_text: Option<String>,
        new_text: String,
    },
    /// Bracketed primitives undone/redone atomically as one unit.
    Batch(Vec<HistoryEntry>),
}

/// Two bounded stacks plus an optional open batch.
#[derive(Debug, Default)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    batch: Option<Vec<HistoryEntry>>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a state-changing mutation. Inside an open batch the entry is
    /// deferred into it; otherwise it lands on the undo stack, the oldest
    /// entry is evicted past the cap, and the redo stack is cleared.
    pub fn record(&mut self, entry: HistoryEntry) {
        if let Some(batch) = &mut self.batch {
            batch.push(entry);
            return;
        }
        self.undo.push_back(entry);
        if self.undo.len() > MAX_HISTORY {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Open a batch; subsequent records accumulate until [`Self::end_batch`].
    /// Re-opening an already open batch is a no-op.
    pub fn start_batch(&mut self) {
        if self.batch.is_none() {
            self.batch = Some(Vec::new());
        }
    }

    /// Close the open batch. A batch with no entries vanishes; a single-entry
    /// batch collapses to that entry. Returns `true` if anything was recorded.
    pub fn end_batch(&mut self) -> bool {
        let Some(mut entries) = self.batch.take() else {
            return false;
        };
        match entries.len() {
            0 => false,
            1 => {
                if let Some(entry) = entries.pop() {
                    self.record(entry);
                }
                true
            }
            _ => {
                self.record(HistoryEntry::Batch(entries));
                true
            }
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub(crate) fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo.pop_back()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo.pop()
    }

    /// Return an undone entry to the redo stack.
    pub(crate) fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo.push(entry);
    }

    /// Return a redone entry to the undo stack without clearing redo.
    pub(crate) fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo.push_back(entry);
        if self.undo.len() > MAX_HISTORY {
            self.undo.pop_front();
        }
    }

    /// Forget everything, e.g. after hydrating a snapshot.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.batch = None;
    }
}

impl BoardSession {
    /// Reverse the entry on top of the undo stack. Returns `false` when the
    /// stack is empty.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.pop_undo() else {
            return false;
        };
        self.revert_entry(&entry);
        self.history.push_redo(entry);
        self.notify(&BoardEvent::Mutated);
        true
    }

    /// Re-apply the entry on top of the redo stack. Returns `false` when the
    /// stack is empty.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.pop_redo() else {
            return false;
        };
        self.apply_entry(&entry);
        self.history.push_undo(entry);
        self.notify(&BoardEvent::Mutated);
        true
    }

    /// Apply an entry's inverse to the document. Batches reverse children in
    /// reverse order.
    fn revert_entry(&mut self, entry: &HistoryEntry) {
        match entry {
            HistoryEntry::AddStroke { page_index, stroke } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.strokes.retain(|s| s.id != stroke.id);
                }
            }
            HistoryEntry::AddAsset { page_index, asset } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.assets.retain(|a| a.id != asset.id);
                }
            }
            HistoryEntry::DeleteItems {
                page_index,
                strokes,
                assets,
                groups_before,
                ..
            } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    for (index, stroke) in strokes {
                        let at = (*index).min(page.strokes.len());
                        page.strokes.insert(at, stroke.clone());
                    }
                    for (index, asset) in assets {
                        let at = (*index).min(page.assets.len());
                        page.assets.insert(at, asset.clone());
                    }
                    page.groups = groups_before.clone();
                }
            }
            HistoryEntry::Lock { page_index, changes, .. }
            | HistoryEntry::Unlock { page_index, changes } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    for change in changes {
                        page.set_item_lock(
                            &change.id,
                            change.prev_locked,
                            change.prev_owner.clone(),
                        );
                    }
                }
            }
            HistoryEntry::CreateGroup { page_index, group } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.groups.retain(|g| g.id != group.id);
                }
            }
            HistoryEntry::DeleteGroup { page_index, group } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.groups.push(group.clone());
                }
            }
            HistoryEntry::AddPage { page } => {
                self.remove_page_by_id(&page.id);
            }
            HistoryEntry::DeletePage { page, index, was_current } => {
                let at = (*index).min(self.pages.len());
                self.pages.insert(at, page.clone());
                self.current_page_index = (*was_current).min(self.pages.len() - 1);
            }
            HistoryEntry::ReorderPages {
                previous_order,
                previous_page_index,
                ..
            } => {
                self.apply_page_order(previous_order);
                self.current_page_index =
                    (*previous_page_index).min(self.pages.len().saturating_sub(1));
            }
            HistoryEntry::ClearPage {
                page_index,
                strokes,
                assets,
                groups_before,
                ..
            } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.strokes.extend(strokes.iter().cloned());
                    page.assets.extend(assets.iter().cloned());
                    page.groups = groups_before.clone();
                }
            }
            HistoryEntry::Duplicate { page_index, new_ids, original_ids, .. } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.strokes.retain(|s| !new_ids.contains(&s.id));
                    page.assets.retain(|a| !new_ids.contains(&a.id));
                }
                self.selected_ids = original_ids.clone();
            }
            HistoryEntry::MoveItems { page_index, ids, dx, dy } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    for id in ids {
                        page.translate_item(id, -dx, -dy);
                    }
                }
            }
            HistoryEntry::SetStickyText { page_index, id, prev_text, .. } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    if let Some(asset) = page.assets.iter_mut().find(|a| a.id == *id) {
                        asset.text = prev_text.clone();
                    }
                }
            }
            HistoryEntry::Batch(entries) => {
                for child in entries.iter().rev() {
                    self.revert_entry(child);
                }
            }
        }
    }

    /// Re-apply an entry forward. Batches replay children in order.
    fn apply_entry(&mut self, entry: &HistoryEntry) {
        match entry {
            HistoryEntry::AddStroke { page_index, stroke } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.strokes.push(stroke.clone());
                }
            }
            HistoryEntry::AddAsset { page_index, asset } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.assets.push(asset.clone());
                }
            }
            HistoryEntry::DeleteItems {
                page_index,
                strokes,
                assets,
                groups_after,
                ..
            } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.strokes.retain(|s| !strokes.iter().any(|(_, d)| d.id == s.id));
                    page.assets.retain(|a| !assets.iter().any(|(_, d)| d.id == a.id));
                    page.groups = groups_after.clone();
                }
            }
            HistoryEntry::Lock { page_index, owner, changes } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    for change in changes {
                        page.set_item_lock(&change.id, true, Some(owner.clone()));
                    }
                }
            }
            HistoryEntry::Unlock { page_index, changes } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    for change in changes {
                        page.set_item_lock(&change.id, false, None);
                    }
                }
            }
            HistoryEntry::CreateGroup { page_index, group } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.groups.push(group.clone());
                }
            }
            HistoryEntry::DeleteGroup { page_index, group } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.groups.retain(|g| g.id != group.id);
                }
            }
            HistoryEntry::AddPage { page } => {
                self.pages.push(page.clone());
                self.current_page_index = self.pages.len() - 1;
            }
            HistoryEntry::DeletePage { page, .. } => {
                self.remove_page_by_id(&page.id);
            }
            HistoryEntry::ReorderPages {
                previous_order,
                new_order,
                previous_page_index,
            } => {
                self.apply_page_order(new_order);
                // Keep the user on the page that was active before the reorder.
                let active_id = previous_order.get(*previous_page_index);
                let resolved = active_id
                    .and_then(|id| self.pages.iter().position(|p| &p.id == id));
                self.current_page_index = resolved.unwrap_or_else(|| {
                    (*previous_page_index).min(self.pages.len().saturating_sub(1))
                });
            }
            HistoryEntry::ClearPage {
                page_index,
                strokes,
                assets,
                groups_after,
                ..
            } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.strokes.retain(|s| !strokes.iter().any(|d| d.id == s.id));
                    page.assets.retain(|a| !assets.iter().any(|d| d.id == a.id));
                    page.groups = groups_after.clone();
                }
            }
            HistoryEntry::Duplicate { page_index, new_ids, strokes, assets, .. } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    page.strokes.extend(strokes.iter().cloned());
                    page.assets.extend(assets.iter().cloned());
                }
                self.selected_ids = new_ids.clone();
            }
            HistoryEntry::MoveItems { page_index, ids, dx, dy } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    for id in ids {
                        page.translate_item(id, *dx, *dy);
                    }
                }
            }
            HistoryEntry::SetStickyText { page_index, id, new_text, .. } => {
                if let Some(page) = self.pages.get_mut(*page_index) {
                    if let Some(asset) = page.assets.iter_mut().find(|a| a.id == *id) {
                        asset.text = Some(new_text.clone());
                    }
                }
            }
            HistoryEntry::Batch(entries) => {
                for child in entries {
                    self.apply_entry(child);
                }
            }
        }
    }
}
