//! Page-list operations: add, delete, rename, navigate, reorder.
//!
//! The page list is an ordered `Vec`; array position is display order and
//! the active page is tracked by index. Reorders re-resolve the active page
//! by identity so the user stays on the page they were looking at, and the
//! last page can never be deleted.

#[cfg(test)]
#[path = "pages_test.rs"]
mod pages_test;

use crate::consts::MAX_PAGES;
use crate::doc::Page;
use crate::history::HistoryEntry;
use crate::sanitize::sanitize_text;
use crate::session::{BoardEvent, BoardSession};

/// Optional attributes for a new page; unset fields take defaults.
#[derive(Debug, Default, Clone)]
pub struct PageOptions {
    pub name: Option<String>,
    pub background: Option<String>,
}

impl BoardSession {
    /// Append a new page and make it current. At the page cap the document
    /// is untouched and `""` is returned; otherwise the new page's id.
    pub fn add_page(&mut self, options: PageOptions) -> String {
        if self.pages.len() >= MAX_PAGES {
            tracing::warn!(max = MAX_PAGES, "page cap reached, add refused");
            return String::new();
        }
        let name = match options.name {
            Some(name) => sanitize_text(&name),
            None => format!("Page {}", self.pages.len() + 1),
        };
        let mut page = Page::new(name);
        if let Some(background) = options.background {
            page.background = background;
        }
        let id = page.id.clone();
        self.pages.push(page.clone());
        self.current_page_index = self.pages.len() - 1;
        self.history.record(HistoryEntry::AddPage { page });
        self.notify(&BoardEvent::PagesChanged);
        id
    }

    /// Delete the page at `index`. Refused (returns `false`) for the last
    /// remaining page or an out-of-range index. The active index shifts down
    /// when a preceding page is removed and clamps when the active page
    /// itself is removed.
    pub fn delete_page(&mut self, index: usize) -> bool {
        if self.pages.len() <= 1 || index >= self.pages.len() {
            return false;
        }
        let was_current = self.current_page_index;
        let page = self.pages.remove(index);
        if index < self.current_page_index {
            self.current_page_index -= 1;
        } else {
            self.current_page_index = self.current_page_index.min(self.pages.len() - 1);
        }
        self.selected_ids.clear();
        self.history.record(HistoryEntry::DeletePage { page, index, was_current });
        self.notify(&BoardEvent::PagesChanged);
        true
    }

    /// Switch the active page. Out-of-range indices are ignored. Navigation
    /// clears the selection and is not a history entry.
    pub fn go_to_page(&mut self, index: usize) -> bool {
        if index >= self.pages.len() || index == self.current_page_index {
            return false;
        }
        self.current_page_index = index;
        self.selected_ids.clear();
        self.notify(&BoardEvent::SelectionChanged);
        self.notify(&BoardEvent::PagesChanged);
        true
    }

    /// Rename a page; the name is entity-escaped. Not a history entry.
    pub fn rename_page(&mut self, index: usize, name: &str) -> bool {
        let Some(page) = self.pages.get_mut(index) else {
            return false;
        };
        page.name = sanitize_text(name);
        self.notify(&BoardEvent::PagesChanged);
        true
    }

    /// Move the page at `from` to position `to`. Equal or out-of-range
    /// positions are a no-op. The active page is re-resolved by identity
    /// afterwards, so reordering never silently changes what the user sees.
    pub fn reorder_pages(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.pages.len() || to >= self.pages.len() {
            return false;
        }
        let previous_order: Vec<String> = self.pages.iter().map(|p| p.id.clone()).collect();
        let previous_page_index = self.current_page_index;
        let active_id = self.pages[self.current_page_index].id.clone();

        let page = self.pages.remove(from);
        self.pages.insert(to, page);

        let new_order: Vec<String> = self.pages.iter().map(|p| p.id.clone()).collect();
        self.current_page_index = self
            .pages
            .iter()
            .position(|p| p.id == active_id)
            .unwrap_or(0);

        self.history.record(HistoryEntry::ReorderPages {
            previous_order,
            new_order,
            previous_page_index,
        });
        self.notify(&BoardEvent::PagesChanged);
        true
    }

    /// Adopt a page order decided elsewhere. Ids not present locally are
    /// skipped; local pages missing from `ordered_ids` keep their relative
    /// order at the end. No history entry. Returns `true` if order changed.
    pub fn handle_remote_page_reorder(&mut self, ordered_ids: &[String]) -> bool {
        let before: Vec<String> = self.pages.iter().map(|p| p.id.clone()).collect();
        let active_id = self.pages[self.current_page_index].id.clone();
        self.apply_page_order(ordered_ids);
        let after: Vec<String> = self.pages.iter().map(|p| p.id.clone()).collect();
        if before == after {
            return false;
        }
        self.current_page_index = self
            .pages
            .iter()
            .position(|p| p.id == active_id)
            .unwrap_or(0);
        self.notify(&BoardEvent::PagesChanged);
        true
    }

    /// Reorder `self.pages` to follow `order`; unknown ids in `order` are
    /// ignored and unmentioned pages retain their relative order at the end.
    pub(crate) fn apply_page_order(&mut self, order: &[String]) {
        let mut reordered = Vec::with_capacity(self.pages.len());
        for id in order {
            if let Some(position) = self.pages.iter().position(|p| &p.id == id) {
                reordered.push(self.pages.remove(position));
            }
        }
        reordered.append(&mut self.pages);
        self.pages = reordered;
    }

    /// Remove a page by id, keeping the active index sane. Refuses to remove
    /// the last page. Removing the active page drops the selection with it.
    /// Returns `true` if a page was removed.
    pub(crate) fn remove_page_by_id(&mut self, id: &str) -> bool {
        if self.pages.len() <= 1 {
            return false;
        }
        let Some(index) = self.pages.iter().position(|p| p.id == id) else {
            return false;
        };
        let removing_active = index == self.current_page_index;
        self.pages.remove(index);
        if index < self.current_page_index {
            self.current_page_index -= 1;
        } else {
            self.current_page_index = self.current_page_index.min(self.pages.len() - 1);
        }
        if removing_active {
            self.selected_ids.clear();
        }
        true
    }
}
