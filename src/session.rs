//! Board session: the single mutation authority for one client's replica.
//!
//! Every local edit flows through a session method, which applies the change
//! to the document, records an invertible history entry, and notifies
//! subscribers. Remote deltas enter through [`BoardSession::apply_remote`],
//! which merges the sender's vector clock and replays the operation through
//! non-history paths — undo only ever reverses *this* client's edits.
//!
//! Locking here is etiquette, not enforcement: predicates like
//! [`BoardSession::can_modify`] tell callers what they should touch, and the
//! bulk mutators pre-filter on them, but a direct remote delta is applied
//! as sent. A hard authority gate belongs on a server, not in the replica.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::clock::VectorClock;
use crate::consts::{DUPLICATE_OFFSET, MAX_PAGES, MAX_STICKY_TEXT};
use crate::doc::{Asset, AssetKind, Group, ItemId, Page, Stroke};
use crate::history::{History, HistoryEntry, LockChange};
use crate::queue::{OfflineQueue, OverflowStatus, PendingOperation};
use crate::sanitize::{sanitize_text, validate_image_url};
use crate::wire::Delta;

/// What a session mutation did, for subscribers to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// Item-level document content changed.
    Mutated,
    /// The page list or the active page changed.
    PagesChanged,
    /// The local selection changed.
    SelectionChanged,
    /// The offline queue refused an operation; `count` is the running total.
    QueueOverflow { count: u64 },
}

/// Disposition of a remote delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Applied; the sender's history was causally ordered with ours.
    Applied,
    /// Applied, but the sender had not seen our latest edits. Arrival order
    /// decided the visible result; callers may surface this to the user.
    AppliedConcurrent,
    /// Not applied: our own echo, a malformed delta, or a no-effect replay.
    Ignored,
}

type Observer = Box<dyn FnMut(&BoardEvent)>;

/// One client's live replica of a board document.
pub struct BoardSession {
    node_id: String,
    pub(crate) clock: VectorClock,
    pub(crate) pages: Vec<Page>,
    pub(crate) current_page_index: usize,
    pub(crate) selected_ids: Vec<ItemId>,
    pub(crate) history: History,
    queue: OfflineQueue,
    observers: Vec<Observer>,
}

/// Persistable document state. History, selection, and the offline queue are
/// session-local and deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub pages: Vec<Page>,
    pub current_page_index: usize,
    pub clock: VectorClock,
}

impl BoardSession {
    /// Create a session with a single empty page and a zeroed clock.
    #[must_use]
    pub fn new(node_id: impl Into<String>) -> Self {
        let node_id = node_id.into();
        Self {
            clock: VectorClock::new(node_id.clone()),
            node_id,
            pages: vec![Page::new("Page 1")],
            current_page_index: 0,
            selected_ids: Vec::new(),
            history: History::new(),
            queue: OfflineQueue::new(),
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    #[must_use]
    pub fn clock(&self) -> &VectorClock {
        &self.clock
    }

    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    #[must_use]
    pub fn current_page_index(&self) -> usize {
        self.current_page_index
    }

    #[must_use]
    pub fn current_page(&self) -> &Page {
        &self.pages[self.current_page_index]
    }

    /// Register a subscriber for session events.
    pub fn subscribe(&mut self, observer: impl FnMut(&BoardEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub(crate) fn notify(&mut self, event: &BoardEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }

    // ── History surface ─────────────────────────────────────────────

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Open a history batch: mutations until [`Self::end_batch`] undo as one.
    pub fn start_batch(&mut self) {
        self.history.start_batch();
    }

    /// Close the open batch. Returns `true` if the batch recorded anything.
    pub fn end_batch(&mut self) -> bool {
        self.history.end_batch()
    }

    // ── Item mutations ──────────────────────────────────────────────

    /// Add a stroke to the current page.
    pub fn add_stroke(&mut self, stroke: Stroke) {
        let page_index = self.current_page_index;
        self.pages[page_index].strokes.push(stroke.clone());
        self.history.record(HistoryEntry::AddStroke { page_index, stroke });
        self.notify(&BoardEvent::Mutated);
    }

    /// Add an asset to the current page. Sticky text is entity-escaped and
    /// length-capped; image sources pass the URL gate and degrade to `""`.
    pub fn add_asset(&mut self, mut asset: Asset) {
        if let Some(src) = asset.src.take() {
            asset.src = Some(validate_image_url(&src));
        }
        if let Some(text) = asset.text.take() {
            let clean = sanitize_text(&text);
            asset.text = Some(clean.chars().take(MAX_STICKY_TEXT).collect());
        }
        let page_index = self.current_page_index;
        self.pages[page_index].assets.push(asset.clone());
        self.history.record(HistoryEntry::AddAsset { page_index, asset });
        self.notify(&BoardEvent::Mutated);
    }

    /// Replace a sticky note's text. Returns `false` if the id does not name
    /// a sticky on the current page.
    pub fn set_sticky_text(&mut self, id: &str, text: &str) -> bool {
        let page_index = self.current_page_index;
        let clean: String = sanitize_text(text).chars().take(MAX_STICKY_TEXT).collect();
        let Some(asset) = self.pages[page_index]
            .assets
            .iter_mut()
            .find(|a| a.id == id && a.kind == AssetKind::Sticky)
        else {
            return false;
        };
        let prev_text = asset.text.take();
        asset.text = Some(clean.clone());
        self.history.record(HistoryEntry::SetStickyText {
            page_index,
            id: id.to_string(),
            prev_text,
            new_text: clean,
        });
        self.notify(&BoardEvent::Mutated);
        true
    }

    // ── Locking ─────────────────────────────────────────────────────

    /// Lock flag of an item on the current page.
    #[must_use]
    pub fn is_item_locked(&self, id: &str) -> bool {
        self.current_page().item_locked(id)
    }

    /// Whether the local user may edit the item: unlocked, or locked by us.
    #[must_use]
    pub fn can_modify(&self, id: &str) -> bool {
        let page = self.current_page();
        !page.item_locked(id) || page.item_lock_owner(id) == Some(self.node_id.as_str())
    }

    /// Lock the given items for `owner`. Items that do not exist or are
    /// already locked are skipped; if nothing changes, nothing is recorded
    /// and `false` is returned. A successful lock clears the selection.
    pub fn lock_items(&mut self, ids: &[ItemId], owner: &str) -> bool {
        let page_index = self.current_page_index;
        let mut changes = Vec::new();
        for id in ids {
            let page = &self.pages[page_index];
            if !page.contains_item(id) || page.item_locked(id) {
                continue;
            }
            changes.push(LockChange {
                id: id.clone(),
                prev_locked: false,
                prev_owner: page.item_lock_owner(id).map(str::to_string),
            });
            self.pages[page_index].set_item_lock(id, true, Some(owner.to_string()));
        }
        if changes.is_empty() {
            return false;
        }
        self.history.record(HistoryEntry::Lock {
            page_index,
            owner: owner.to_string(),
            changes,
        });
        self.selected_ids.clear();
        self.notify(&BoardEvent::SelectionChanged);
        self.notify(&BoardEvent::Mutated);
        true
    }

    /// Unlock the given items. Items that are not locked are skipped; a pass
    /// that changes nothing records nothing and returns `false`.
    pub fn unlock_items(&mut self, ids: &[ItemId]) -> bool {
        let page_index = self.current_page_index;
        let mut changes = Vec::new();
        for id in ids {
            let page = &self.pages[page_index];
            if !page.item_locked(id) {
                continue;
            }
            changes.push(LockChange {
                id: id.clone(),
                prev_locked: true,
                prev_owner: page.item_lock_owner(id).map(str::to_string),
            });
            self.pages[page_index].set_item_lock(id, false, None);
        }
        if changes.is_empty() {
            return false;
        }
        self.history.record(HistoryEntry::Unlock { page_index, changes });
        self.notify(&BoardEvent::Mutated);
        true
    }

    // ── Grouping ────────────────────────────────────────────────────

    /// Group two or more items on the current page. Ids that are missing,
    /// duplicated, or already grouped are dropped first; if fewer than two
    /// remain the board is left untouched and `None` is returned.
    pub fn create_group(&mut self, ids: &[ItemId]) -> Option<Group> {
        let page_index = self.current_page_index;
        let mut members: Vec<ItemId> = Vec::new();
        for id in ids {
            let page = &self.pages[page_index];
            if !page.contains_item(id) || page.group_of(id).is_some() || members.contains(id) {
                continue;
            }
            members.push(id.clone());
        }
        if members.len() < 2 {
            return None;
        }
        let group = Group { id: Uuid::new_v4().to_string(), item_ids: members };
        self.pages[page_index].groups.push(group.clone());
        self.history.record(HistoryEntry::CreateGroup {
            page_index,
            group: group.clone(),
        });
        self.notify(&BoardEvent::Mutated);
        Some(group)
    }

    /// Dissolve a group, leaving its items in place. Returns `false` if no
    /// such group exists on the current page.
    pub fn delete_group(&mut self, group_id: &str) -> bool {
        let page_index = self.current_page_index;
        let Some(position) = self.pages[page_index]
            .groups
            .iter()
            .position(|g| g.id == group_id)
        else {
            return false;
        };
        let group = self.pages[page_index].groups.remove(position);
        self.history.record(HistoryEntry::DeleteGroup { page_index, group });
        self.notify(&BoardEvent::Mutated);
        true
    }

    /// Remove ids from any group membership on a page, dissolving groups that
    /// drop below two members. Part of the enclosing transaction; records no
    /// history of its own. Returns `true` if any group changed.
    pub(crate) fn remove_items_from_groups(page: &mut Page, ids: &[ItemId]) -> bool {
        let mut changed = false;
        for group in &mut page.groups {
            let before = group.item_ids.len();
            group.item_ids.retain(|member| !ids.contains(member));
            changed |= group.item_ids.len() != before;
        }
        let before = page.groups.len();
        page.groups.retain(|g| g.item_ids.len() >= 2);
        changed | (page.groups.len() != before)
    }

    // ── Selection ───────────────────────────────────────────────────

    #[must_use]
    pub fn selected_ids(&self) -> &[ItemId] {
        &self.selected_ids
    }

    /// Replace the selection. Selecting a grouped item pulls in its whole
    /// group; the group moves, locks, and deletes as a unit.
    pub fn select_items(&mut self, ids: &[ItemId]) {
        self.selected_ids.clear();
        for id in ids {
            self.extend_selection_with(id);
        }
        self.notify(&BoardEvent::SelectionChanged);
    }

    /// Add one item (and its group, if any) to the selection.
    pub fn add_to_selection(&mut self, id: &str) {
        self.extend_selection_with(id);
        self.notify(&BoardEvent::SelectionChanged);
    }

    /// Toggle one item in the selection. Toggling a grouped item toggles the
    /// whole group.
    pub fn toggle_selection(&mut self, id: &str) {
        let unit = self.selection_unit(id);
        if unit.iter().all(|member| self.selected_ids.contains(member)) {
            self.selected_ids.retain(|selected| !unit.contains(selected));
        } else {
            for member in unit {
                if !self.selected_ids.contains(&member) {
                    self.selected_ids.push(member);
                }
            }
        }
        self.notify(&BoardEvent::SelectionChanged);
    }

    pub fn clear_selection(&mut self) {
        if self.selected_ids.is_empty() {
            return;
        }
        self.selected_ids.clear();
        self.notify(&BoardEvent::SelectionChanged);
    }

    /// The item plus its group co-members, when it belongs to a group.
    fn selection_unit(&self, id: &str) -> Vec<ItemId> {
        match self.current_page().group_of(id) {
            Some(group) => group.item_ids.clone(),
            None => vec![id.to_string()],
        }
    }

    fn extend_selection_with(&mut self, id: &str) {
        if !self.current_page().contains_item(id) {
            return;
        }
        for member in self.selection_unit(id) {
            if !self.selected_ids.contains(&member) {
                self.selected_ids.push(member);
            }
        }
    }

    // ── Bulk operations on the selection ────────────────────────────

    /// Delete every selected item the local user may modify, trimming group
    /// membership in the same transaction. Locked items survive both the
    /// deletion and in the selection. Returns the number of items removed.
    pub fn delete_selected(&mut self) -> usize {
        let page_index = self.current_page_index;
        let doomed: Vec<ItemId> = self
            .selected_ids
            .iter()
            .filter(|id| self.can_modify(id))
            .cloned()
            .collect();
        if doomed.is_empty() {
            return 0;
        }

        let page = &mut self.pages[page_index];
        let groups_before = page.groups.clone();
        let mut strokes = Vec::new();
        let mut assets = Vec::new();
        for index in (0..page.strokes.len()).rev() {
            if doomed.contains(&page.strokes[index].id) {
                strokes.push((index, page.strokes.remove(index)));
            }
        }
        for index in (0..page.assets.len()).rev() {
            if doomed.contains(&page.assets[index].id) {
                assets.push((index, page.assets.remove(index)));
            }
        }
        let removed = strokes.len() + assets.len();
        // A selection of ids that no longer exist must not reach the stack.
        if removed == 0 {
            self.selected_ids.retain(|id| !doomed.contains(id));
            return 0;
        }
        // Restore ascending order so undo re-inserts positionally.
        strokes.reverse();
        assets.reverse();
        Self::remove_items_from_groups(page, &doomed);
        let groups_after = page.groups.clone();

        self.history.record(HistoryEntry::DeleteItems {
            page_index,
            strokes,
            assets,
            groups_before,
            groups_after,
        });
        self.selected_ids.retain(|id| !doomed.contains(id));
        self.notify(&BoardEvent::SelectionChanged);
        self.notify(&BoardEvent::Mutated);
        removed
    }

    /// Translate every modifiable selected item by a delta. Locked items are
    /// skipped. Returns the number of items moved.
    pub fn move_selected(&mut self, dx: f64, dy: f64) -> usize {
        let page_index = self.current_page_index;
        let movable: Vec<ItemId> = self
            .selected_ids
            .iter()
            .filter(|id| self.can_modify(id))
            .cloned()
            .collect();
        if movable.is_empty() || (dx == 0.0 && dy == 0.0) {
            return 0;
        }
        let mut moved_ids = Vec::new();
        for id in movable {
            if self.pages[page_index].translate_item(&id, dx, dy) {
                moved_ids.push(id);
            }
        }
        if moved_ids.is_empty() {
            return 0;
        }
        let moved = moved_ids.len();
        self.history.record(HistoryEntry::MoveItems {
            page_index,
            ids: moved_ids,
            dx,
            dy,
        });
        self.notify(&BoardEvent::Mutated);
        moved
    }

    /// Clone every selected item with fresh ids, offset diagonally, unlocked.
    /// The clones become the new selection. Returns the new ids.
    pub fn duplicate_selected(&mut self) -> Vec<ItemId> {
        let page_index = self.current_page_index;
        let original_ids = self.selected_ids.clone();
        if original_ids.is_empty() {
            return Vec::new();
        }

        let mut new_ids = Vec::new();
        let mut strokes = Vec::new();
        let mut assets = Vec::new();
        {
            let page = &mut self.pages[page_index];
            for index in 0..page.strokes.len() {
                if !original_ids.contains(&page.strokes[index].id) {
                    continue;
                }
                let mut copy = page.strokes[index].clone();
                copy.id = Uuid::new_v4().to_string();
                copy.locked = false;
                copy.locked_by = None;
                for point in &mut copy.points {
                    point.x += DUPLICATE_OFFSET;
                    point.y += DUPLICATE_OFFSET;
                }
                new_ids.push(copy.id.clone());
                strokes.push(copy);
            }
            for index in 0..page.assets.len() {
                if !original_ids.contains(&page.assets[index].id) {
                    continue;
                }
                let mut copy = page.assets[index].clone();
                copy.id = Uuid::new_v4().to_string();
                copy.locked = false;
                copy.locked_by = None;
                copy.x += DUPLICATE_OFFSET;
                copy.y += DUPLICATE_OFFSET;
                new_ids.push(copy.id.clone());
                assets.push(copy);
            }
            page.strokes.extend(strokes.iter().cloned());
            page.assets.extend(assets.iter().cloned());
        }
        if new_ids.is_empty() {
            return Vec::new();
        }

        self.history.record(HistoryEntry::Duplicate {
            page_index,
            new_ids: new_ids.clone(),
            original_ids,
            strokes,
            assets,
        });
        self.selected_ids = new_ids.clone();
        self.notify(&BoardEvent::SelectionChanged);
        self.notify(&BoardEvent::Mutated);
        new_ids
    }

    /// Remove every unlocked item from the current page; locked items stay.
    /// Groups are trimmed to surviving membership in the same transaction.
    /// Returns `false` when the page held nothing removable.
    pub fn clear_current_page(&mut self) -> bool {
        let page_index = self.current_page_index;
        let page = &mut self.pages[page_index];
        let groups_before = page.groups.clone();

        let mut strokes = Vec::new();
        let mut kept_strokes = Vec::new();
        for stroke in page.strokes.drain(..) {
            if stroke.locked {
                kept_strokes.push(stroke);
            } else {
                strokes.push(stroke);
            }
        }
        page.strokes = kept_strokes;

        let mut assets = Vec::new();
        let mut kept_assets = Vec::new();
        for asset in page.assets.drain(..) {
            if asset.locked {
                kept_assets.push(asset);
            } else {
                assets.push(asset);
            }
        }
        page.assets = kept_assets;

        if strokes.is_empty() && assets.is_empty() {
            return false;
        }

        let removed_ids: Vec<ItemId> = strokes
            .iter()
            .map(|s| s.id.clone())
            .chain(assets.iter().map(|a| a.id.clone()))
            .collect();
        Self::remove_items_from_groups(page, &removed_ids);
        let groups_after = page.groups.clone();

        self.history.record(HistoryEntry::ClearPage {
            page_index,
            strokes,
            assets,
            groups_before,
            groups_after,
        });
        self.selected_ids.retain(|id| !removed_ids.contains(id));
        self.notify(&BoardEvent::Mutated);
        true
    }

    // ── Offline queue ───────────────────────────────────────────────

    /// Buffer an outbound operation while the transport is down. On refusal
    /// (queue at capacity) subscribers get a [`BoardEvent::QueueOverflow`].
    pub fn queue_operation(&mut self, op: PendingOperation) -> bool {
        if self.queue.queue_operation(op) {
            return true;
        }
        let count = self.queue.overflow_status().count;
        self.notify(&BoardEvent::QueueOverflow { count });
        false
    }

    #[must_use]
    pub fn overflow_status(&self) -> OverflowStatus {
        self.queue.overflow_status()
    }

    pub fn clear_overflow(&mut self) {
        self.queue.clear_overflow();
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Take every buffered operation, oldest first, for replay on reconnect.
    pub fn drain_pending(&mut self) -> Vec<PendingOperation> {
        self.queue.drain().collect()
    }

    // ── Wire ────────────────────────────────────────────────────────

    /// Stamp an outbound delta: bump the local clock counter and attach the
    /// full counter map. The caller sends it (or queues it when offline).
    pub fn prepare_delta(
        &mut self,
        op: impl Into<String>,
        page_id: Option<String>,
        payload: Value,
        ts: u64,
    ) -> Delta {
        self.clock.increment();
        Delta {
            id: Uuid::new_v4().to_string(),
            ts,
            from: Some(self.node_id.clone()),
            op: op.into(),
            page_id,
            clock: self.clock.to_string_counters(),
            payload,
        }
    }

    /// Fold a remote delta into the replica. The sender's clock is merged
    /// first; concurrency with our own history is reported, not resolved —
    /// arrival order decides the visible state, identically on every replica
    /// that receives the same server-ordered stream.
    pub fn apply_remote(&mut self, delta: &Delta) -> RemoteOutcome {
        if delta.from.as_deref() == Some(self.node_id.as_str()) {
            return RemoteOutcome::Ignored;
        }
        let sender = delta.from.as_deref().unwrap_or("");
        let Some(remote_clock) = VectorClock::from_counters(sender, &delta.clock) else {
            tracing::warn!(op = %delta.op, "remote delta with malformed clock ignored");
            return RemoteOutcome::Ignored;
        };
        let concurrent = self.clock.is_concurrent(&remote_clock);
        self.clock.merge(&remote_clock);

        let changed = self.apply_remote_op(delta);
        if !changed {
            return RemoteOutcome::Ignored;
        }
        if concurrent {
            tracing::debug!(op = %delta.op, from = sender, "concurrent remote delta applied");
            RemoteOutcome::AppliedConcurrent
        } else {
            RemoteOutcome::Applied
        }
    }

    /// Dispatch one remote operation. Returns `true` if the document changed.
    fn apply_remote_op(&mut self, delta: &Delta) -> bool {
        match delta.op.as_str() {
            "stroke.add" => {
                let Some(stroke) = parse::<Stroke>(&delta.payload) else {
                    return false;
                };
                let Some(page_index) = self.page_index_for(delta) else {
                    return false;
                };
                if self.pages[page_index].contains_item(&stroke.id) {
                    return false;
                }
                self.pages[page_index].strokes.push(stroke);
                self.notify(&BoardEvent::Mutated);
                true
            }
            "asset.add" => {
                let Some(mut asset) = parse::<Asset>(&delta.payload) else {
                    return false;
                };
                let Some(page_index) = self.page_index_for(delta) else {
                    return false;
                };
                if self.pages[page_index].contains_item(&asset.id) {
                    return false;
                }
                // Remote content is as untrusted as local paste.
                if let Some(src) = asset.src.take() {
                    asset.src = Some(validate_image_url(&src));
                }
                if let Some(text) = asset.text.take() {
                    let clean = sanitize_text(&text);
                    asset.text = Some(clean.chars().take(MAX_STICKY_TEXT).collect());
                }
                self.pages[page_index].assets.push(asset);
                self.notify(&BoardEvent::Mutated);
                true
            }
            "items.delete" => {
                let Some(payload) = parse::<IdsPayload>(&delta.payload) else {
                    return false;
                };
                let Some(page_index) = self.page_index_for(delta) else {
                    return false;
                };
                let page = &mut self.pages[page_index];
                let before = page.strokes.len() + page.assets.len();
                page.strokes.retain(|s| !payload.ids.contains(&s.id));
                page.assets.retain(|a| !payload.ids.contains(&a.id));
                let changed = page.strokes.len() + page.assets.len() != before;
                if changed {
                    Self::remove_items_from_groups(page, &payload.ids);
                    self.selected_ids.retain(|id| !payload.ids.contains(id));
                    self.notify(&BoardEvent::Mutated);
                }
                changed
            }
            "items.move" => {
                let Some(payload) = parse::<MovePayload>(&delta.payload) else {
                    return false;
                };
                let Some(page_index) = self.page_index_for(delta) else {
                    return false;
                };
                let mut changed = false;
                for id in &payload.ids {
                    changed |= self.pages[page_index].translate_item(id, payload.dx, payload.dy);
                }
                if changed {
                    self.notify(&BoardEvent::Mutated);
                }
                changed
            }
            "items.lock" => {
                let Some(payload) = parse::<LockPayload>(&delta.payload) else {
                    return false;
                };
                let Some(page_index) = self.page_index_for(delta) else {
                    return false;
                };
                let mut changed = false;
                for id in &payload.ids {
                    let page = &self.pages[page_index];
                    // Redelivery of an identical lock is not a change.
                    if page.item_locked(id)
                        && page.item_lock_owner(id) == Some(payload.owner.as_str())
                    {
                        continue;
                    }
                    changed |= self.pages[page_index].set_item_lock(
                        id,
                        true,
                        Some(payload.owner.clone()),
                    );
                }
                if changed {
                    self.notify(&BoardEvent::Mutated);
                }
                changed
            }
            "items.unlock" => {
                let Some(payload) = parse::<IdsPayload>(&delta.payload) else {
                    return false;
                };
                let Some(page_index) = self.page_index_for(delta) else {
                    return false;
                };
                let mut changed = false;
                for id in &payload.ids {
                    if !self.pages[page_index].item_locked(id) {
                        continue;
                    }
                    changed |= self.pages[page_index].set_item_lock(id, false, None);
                }
                if changed {
                    self.notify(&BoardEvent::Mutated);
                }
                changed
            }
            "group.create" => {
                let Some(group) = parse::<Group>(&delta.payload) else {
                    return false;
                };
                let Some(page_index) = self.page_index_for(delta) else {
                    return false;
                };
                if group.item_ids.len() < 2
                    || self.pages[page_index].groups.iter().any(|g| g.id == group.id)
                {
                    return false;
                }
                self.pages[page_index].groups.push(group);
                self.notify(&BoardEvent::Mutated);
                true
            }
            "group.delete" => {
                let Some(payload) = parse::<IdPayload>(&delta.payload) else {
                    return false;
                };
                let Some(page_index) = self.page_index_for(delta) else {
                    return false;
                };
                let before = self.pages[page_index].groups.len();
                self.pages[page_index].groups.retain(|g| g.id != payload.id);
                let changed = self.pages[page_index].groups.len() != before;
                if changed {
                    self.notify(&BoardEvent::Mutated);
                }
                changed
            }
            "sticky.text" => {
                let Some(payload) = parse::<TextPayload>(&delta.payload) else {
                    return false;
                };
                let Some(page_index) = self.page_index_for(delta) else {
                    return false;
                };
                let clean: String = sanitize_text(&payload.text)
                    .chars()
                    .take(MAX_STICKY_TEXT)
                    .collect();
                let Some(asset) = self.pages[page_index]
                    .assets
                    .iter_mut()
                    .find(|a| a.id == payload.id && a.kind == AssetKind::Sticky)
                else {
                    return false;
                };
                asset.text = Some(clean);
                self.notify(&BoardEvent::Mutated);
                true
            }
            "page.add" => {
                let Some(page) = parse::<Page>(&delta.payload) else {
                    return false;
                };
                if self.pages.len() >= MAX_PAGES
                    || self.pages.iter().any(|p| p.id == page.id)
                {
                    return false;
                }
                self.pages.push(page);
                self.notify(&BoardEvent::PagesChanged);
                true
            }
            "page.delete" => {
                let Some(payload) = parse::<IdPayload>(&delta.payload) else {
                    return false;
                };
                if self.pages.len() <= 1 {
                    return false;
                }
                let changed = self.remove_page_by_id(&payload.id);
                if changed {
                    self.notify(&BoardEvent::PagesChanged);
                }
                changed
            }
            "page.rename" => {
                let Some(payload) = parse::<RenamePayload>(&delta.payload) else {
                    return false;
                };
                let Some(page) = self.pages.iter_mut().find(|p| p.id == payload.id) else {
                    return false;
                };
                page.name = sanitize_text(&payload.name);
                self.notify(&BoardEvent::PagesChanged);
                true
            }
            "page.reorder" => {
                let Some(payload) = parse::<OrderPayload>(&delta.payload) else {
                    return false;
                };
                // Notifies PagesChanged itself when the order changes.
                self.handle_remote_page_reorder(&payload.ordered_ids)
            }
            "page.clear" => {
                let Some(payload) = parse::<IdPayload>(&delta.payload) else {
                    return false;
                };
                let Some(page) = self.pages.iter_mut().find(|p| p.id == payload.id) else {
                    return false;
                };
                let before = page.strokes.len() + page.assets.len();
                let removed_ids: Vec<ItemId> = page
                    .strokes
                    .iter()
                    .filter(|s| !s.locked)
                    .map(|s| s.id.clone())
                    .chain(page.assets.iter().filter(|a| !a.locked).map(|a| a.id.clone()))
                    .collect();
                page.strokes.retain(|s| s.locked);
                page.assets.retain(|a| a.locked);
                let changed = page.strokes.len() + page.assets.len() != before;
                if changed {
                    Self::remove_items_from_groups(page, &removed_ids);
                    self.selected_ids.retain(|id| !removed_ids.contains(id));
                    self.notify(&BoardEvent::Mutated);
                }
                changed
            }
            other => {
                tracing::warn!(op = other, "unknown remote operation ignored");
                false
            }
        }
    }

    /// Resolve the page a delta targets: its `page_id` when present, the
    /// current page otherwise. `None` when the id names no page here.
    fn page_index_for(&self, delta: &Delta) -> Option<usize> {
        match &delta.page_id {
            Some(page_id) => self.pages.iter().position(|p| &p.id == page_id),
            None => Some(self.current_page_index),
        }
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Capture the persistable document state.
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            pages: self.pages.clone(),
            current_page_index: self.current_page_index,
            clock: self.clock.clone(),
        }
    }

    /// Replace the document from a snapshot. History, selection, and the
    /// offline queue reset; the snapshot clock is merged, not replaced, so
    /// local causal progress is never rolled back.
    pub fn hydrate(&mut self, snapshot: BoardSnapshot) {
        self.clock.merge(&snapshot.clock);
        self.pages = if snapshot.pages.is_empty() {
            vec![Page::new("Page 1")]
        } else {
            snapshot.pages
        };
        self.current_page_index = snapshot.current_page_index.min(self.pages.len() - 1);
        self.selected_ids.clear();
        self.history.clear();
        self.queue.clear();
        self.notify(&BoardEvent::PagesChanged);
        self.notify(&BoardEvent::Mutated);
    }
}

fn parse<T: DeserializeOwned>(payload: &Value) -> Option<T> {
    match serde_json::from_value(payload.clone()) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(%err, "malformed remote payload ignored");
            None
        }
    }
}

#[derive(Deserialize)]
struct IdsPayload {
    ids: Vec<ItemId>,
}

#[derive(Deserialize)]
struct IdPayload {
    id: String,
}

#[derive(Deserialize)]
struct LockPayload {
    ids: Vec<ItemId>,
    owner: String,
}

#[derive(Deserialize)]
struct MovePayload {
    ids: Vec<ItemId>,
    dx: f64,
    dy: f64,
}

#[derive(Deserialize)]
struct TextPayload {
    id: ItemId,
    text: String,
}

#[derive(Deserialize)]
struct RenamePayload {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct OrderPayload {
    ordered_ids: Vec<String>,
}
