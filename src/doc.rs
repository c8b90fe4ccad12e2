//! Document model: pages, strokes, assets, and groups.
//!
//! Items live in flat per-page collections and are referenced everywhere
//! else — groups, locks, selection — by string id only, never by direct
//! reference. That keeps the ownership graph acyclic and makes the persisted
//! form trivial flat JSON.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a board item (stroke or asset) within a document.
pub type ItemId = String;

/// A single point of a freehand stroke, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
}

/// Drawing tool a stroke was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeTool {
    Pen,
    Marker,
    Highlighter,
}

/// A freehand stroke on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stroke {
    pub id: ItemId,
    pub points: Vec<StrokePoint>,
    pub color: String,
    pub size: f64,
    pub tool: StrokeTool,
    /// Locked items are off-limits to other users' edits.
    #[serde(default)]
    pub locked: bool,
    /// User holding the lock, when `locked`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
}

/// Kind of a non-stroke board item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// An uploaded or pasted image; `src` passes the sanitize gate.
    Image,
    /// A sticky note with editable text.
    Sticky,
}

/// A placed asset (image or sticky note) on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: ItemId,
    pub kind: AssetKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Image source URL; already validated when stored through the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Sticky-note text; already entity-escaped when stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
}

/// An association of two or more items treated as one selection unit.
/// Membership below two auto-dissolves the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub item_ids: Vec<ItemId>,
}

/// One page of the document: an ordered position in the page list plus flat
/// item collections. Array order is display/tab order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub name: String,
    pub strokes: Vec<Stroke>,
    pub assets: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
    pub background: String,
}

impl Page {
    /// Create an empty page with a fresh id and white background.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            strokes: Vec::new(),
            assets: Vec::new(),
            groups: Vec::new(),
            background: "white".to_string(),
        }
    }

    /// Whether an item with this id exists on the page.
    #[must_use]
    pub fn contains_item(&self, id: &str) -> bool {
        self.strokes.iter().any(|s| s.id == id) || self.assets.iter().any(|a| a.id == id)
    }

    /// Lock flag of the item, `false` when the item does not exist.
    #[must_use]
    pub fn item_locked(&self, id: &str) -> bool {
        if let Some(stroke) = self.strokes.iter().find(|s| s.id == id) {
            return stroke.locked;
        }
        if let Some(asset) = self.assets.iter().find(|a| a.id == id) {
            return asset.locked;
        }
        false
    }

    /// Current lock owner of the item, if any.
    #[must_use]
    pub fn item_lock_owner(&self, id: &str) -> Option<&str> {
        if let Some(stroke) = self.strokes.iter().find(|s| s.id == id) {
            return stroke.locked_by.as_deref();
        }
        if let Some(asset) = self.assets.iter().find(|a| a.id == id) {
            return asset.locked_by.as_deref();
        }
        None
    }

    /// The group the item belongs to, if any. An item is in at most one group.
    #[must_use]
    pub fn group_of(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.item_ids.iter().any(|m| m == id))
    }

    /// Set the lock state of an item. Returns `false` if no such item exists.
    pub(crate) fn set_item_lock(&mut self, id: &str, locked: bool, by: Option<String>) -> bool {
        if let Some(stroke) = self.strokes.iter_mut().find(|s| s.id == id) {
            stroke.locked = locked;
            stroke.locked_by = by;
            return true;
        }
        if let Some(asset) = self.assets.iter_mut().find(|a| a.id == id) {
            asset.locked = locked;
            asset.locked_by = by;
            return true;
        }
        false
    }

    /// Translate an item's geometry by a delta. Returns `false` if no such
    /// item exists.
    pub(crate) fn translate_item(&mut self, id: &str, dx: f64, dy: f64) -> bool {
        if let Some(stroke) = self.strokes.iter_mut().find(|s| s.id == id) {
            for point in &mut stroke.points {
                point.x += dx;
                point.y += dy;
            }
            return true;
        }
        if let Some(asset) = self.assets.iter_mut().find(|a| a.id == id) {
            asset.x += dx;
            asset.y += dy;
            return true;
        }
        false
    }
}
