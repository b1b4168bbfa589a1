//! Playlist items, visibility filtering and incremental row reconciliation.
//!
//! ```text
//!  full item list ──► VisibilityClassifier ──► PlaylistReconciler ──► RowSink
//!  (source order)      (sets `hidden` only)     (create/move/remove)    (host rows)
//!                                                      │
//!                                                      └──► AutoScroller ──► scroll_by
//! ```
//!
//! The engine owns the rows behind [`RowSink`] exclusively; everything else
//! in the host view tree is only ever read through
//! [`GeometryProvider`](crate::geometry::GeometryProvider).

mod autoscroll;
mod reconciler;
mod seasonal;
mod visibility;

pub use autoscroll::{AutoScrollSettings, AutoScroller, HorizontalAlign, ScrollBlockers, VerticalAlign};
pub use reconciler::{PlaylistReconciler, ReconcileReport};
pub use seasonal::{SeasonalCategory, SeasonalSettings};
pub use visibility::{HiddenReason, VisibilityClassifier, VisibilitySettings, title_key, version_key};

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable, unique identity of a playlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One playable entry.
///
/// Identity is `id`; every other field may change between updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub duration_text: String,
    #[serde(default)]
    pub thumbnail: String,
    /// Derived by the visibility classifier on every update
    #[serde(skip)]
    hidden: bool,
}

impl PlaylistItem {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: String::new(),
            duration_text: String::new(),
            thumbnail: String::new(),
            hidden: false,
        }
    }

    pub fn by(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn duration(mut self, text: impl Into<String>) -> Self {
        self.duration_text = text.into();
        self
    }

    pub fn thumbnail(mut self, reference: impl Into<String>) -> Self {
        self.thumbnail = reference.into();
        self
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub(crate) fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// Whether the displayed fields match (identity and `hidden` ignored).
    pub fn same_content(&self, other: &PlaylistItem) -> bool {
        self.title == other.title
            && self.artist == other.artist
            && self.duration_text == other.duration_text
            && self.thumbnail == other.thumbnail
    }
}

/// Axis of a scroll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAxis {
    Vertical,
    Horizontal,
}

/// Relative scroll of the list viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub axis: ScrollAxis,
    pub delta: f64,
}

/// The rows this engine owns inside the host view tree.
///
/// Indices are positions in the sink's current row sequence at the time of
/// the call: after `create_row(i, ..)` or `move_row(id, i)` the row sits at
/// index `i`.
pub trait RowSink {
    fn create_row(&mut self, index: usize, item: &PlaylistItem);
    fn update_row(&mut self, item: &PlaylistItem);
    fn move_row(&mut self, id: &ItemId, index: usize);
    fn remove_row(&mut self, id: &ItemId);
    /// Highlight one row, or none.
    fn set_active(&mut self, id: Option<&ItemId>);
    fn scroll_by(&mut self, request: ScrollRequest);
}
