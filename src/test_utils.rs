//! Test utilities and fixtures for playlist-drawer tests.
//!
//! Fakes for every host seam the engine talks to, so components can be
//! driven without a real view tree.
//!
//! # Example
//!
//! ```ignore
//! use playlist_drawer::test_utils::{FakeGeometry, RecordingRows, items};
//!
//! let geometry = FakeGeometry::player(800.0, 225.0, 100.0);
//! let mut rows = RecordingRows::default();
//! reconciler.update(items(&["a", "b"]), &classifier, &mut rows);
//! assert_eq!(rows.ids(), vec!["a", "b"]);
//! ```

use chrono::NaiveDate;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::engine::Clock;
use crate::geometry::{ElementRef, GeometryProvider, Rect};
use crate::gesture::{Action, ActionDispatch, Gesture};
use crate::playlist::{ItemId, PlaylistItem, RowSink, ScrollRequest};

/// Items `id` titled "Song <id>", in the given order.
pub fn items(ids: &[&str]) -> Vec<PlaylistItem> {
    ids.iter()
        .map(|id| PlaylistItem::new(*id, format!("Song {id}")).by("Test Artist"))
        .collect()
}

/// A fixed date outside every seasonal window.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
}

// ============================================================================
// Geometry
// ============================================================================

/// Host layout with settable rects.
#[derive(Debug, Clone, Default)]
pub struct FakeGeometry {
    pub container: Option<Rect>,
    pub video: Option<Rect>,
    pub controls: Option<Rect>,
    pub button_group: Option<Rect>,
    pub list_viewport: Option<Rect>,
    pub rows: HashMap<ItemId, Rect>,
    pub window_height: f64,
}

impl FakeGeometry {
    /// A player: video at the top, controls at the bottom, list between.
    ///
    /// `player(800.0, 225.0, 100.0)` gives max 700 and mid 475.
    pub fn player(container_height: f64, video_height: f64, controls_height: f64) -> Self {
        let controls_top = container_height - controls_height;
        Self {
            container: Some(Rect::new(0.0, 0.0, 400.0, container_height)),
            video: Some(Rect::new(0.0, 0.0, 400.0, video_height)),
            controls: Some(Rect::new(controls_top, 0.0, 400.0, controls_height)),
            button_group: Some(Rect::new(controls_top, 50.0, 300.0, controls_height.min(40.0))),
            list_viewport: Some(Rect::new(
                video_height,
                0.0,
                400.0,
                (controls_top - video_height).max(0.0),
            )),
            rows: HashMap::new(),
            window_height: container_height,
        }
    }

    /// Nothing laid out yet.
    pub fn unlaid() -> Self {
        Self::default()
    }

    pub fn set_container_height(&mut self, height: f64) {
        if let Some(container) = &mut self.container {
            container.height = height;
        }
        if let Some(controls) = &mut self.controls {
            controls.top = height - controls.height;
        }
        self.window_height = height;
    }

    pub fn set_controls_height(&mut self, height: f64) {
        let container_height = self.container.map(|c| c.height).unwrap_or(0.0);
        if let Some(controls) = &mut self.controls {
            controls.height = height;
            controls.top = container_height - height;
        }
    }

    pub fn set_list_viewport(&mut self, rect: Rect) {
        self.list_viewport = Some(rect);
    }

    pub fn set_row(&mut self, id: &str, rect: Rect) {
        self.rows.insert(ItemId::from(id), rect);
    }
}

impl GeometryProvider for FakeGeometry {
    fn bounding_box(&self, element: &ElementRef) -> Option<Rect> {
        match element {
            ElementRef::Container => self.container,
            ElementRef::VideoArea => self.video,
            ElementRef::Controls => self.controls,
            ElementRef::ButtonGroup => self.button_group,
            ElementRef::ListViewport => self.list_viewport,
            ElementRef::Row(id) => self.rows.get(id).copied(),
        }
    }

    fn viewport_height(&self) -> f64 {
        self.window_height
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One call made on a [`RecordingRows`].
#[derive(Debug, Clone, PartialEq)]
pub enum RowOp {
    Create(ItemId, usize),
    Update(ItemId),
    Move(ItemId, usize),
    Remove(ItemId),
    Active(Option<ItemId>),
    Scroll(ScrollRequest),
}

/// Row sink that applies every call to an in-memory row list and logs it.
#[derive(Debug, Default)]
pub struct RecordingRows {
    rows: Vec<PlaylistItem>,
    pub active: Option<String>,
    ops: Vec<RowOp>,
}

impl RecordingRows {
    pub fn ids(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.id.as_str()).collect()
    }

    pub fn row(&self, id: &str) -> Option<&PlaylistItem> {
        self.rows.iter().find(|r| r.id.as_str() == id)
    }

    /// Calls since the last `take_ops`.
    pub fn take_ops(&mut self) -> Vec<RowOp> {
        std::mem::take(&mut self.ops)
    }

    fn position(&self, id: &ItemId) -> usize {
        self.rows
            .iter()
            .position(|r| r.id == *id)
            .unwrap_or_else(|| panic!("no row for {id}"))
    }
}

impl RowSink for RecordingRows {
    fn create_row(&mut self, index: usize, item: &PlaylistItem) {
        assert!(index <= self.rows.len(), "create_row index {index} out of range");
        assert!(self.row(item.id.as_str()).is_none(), "row {} already exists", item.id);
        self.rows.insert(index, item.clone());
        self.ops.push(RowOp::Create(item.id.clone(), index));
    }

    fn update_row(&mut self, item: &PlaylistItem) {
        let pos = self.position(&item.id);
        self.rows[pos] = item.clone();
        self.ops.push(RowOp::Update(item.id.clone()));
    }

    fn move_row(&mut self, id: &ItemId, index: usize) {
        let pos = self.position(id);
        let row = self.rows.remove(pos);
        assert!(index <= self.rows.len(), "move_row index {index} out of range");
        self.rows.insert(index, row);
        self.ops.push(RowOp::Move(id.clone(), index));
    }

    fn remove_row(&mut self, id: &ItemId) {
        let pos = self.position(id);
        self.rows.remove(pos);
        self.ops.push(RowOp::Remove(id.clone()));
    }

    fn set_active(&mut self, id: Option<&ItemId>) {
        self.active = id.map(|id| id.to_string());
        self.ops.push(RowOp::Active(id.cloned()));
    }

    fn scroll_by(&mut self, request: ScrollRequest) {
        self.ops.push(RowOp::Scroll(request));
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// One host callback received by a [`RecordingDispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Seek(f64),
    Previous,
    Skip,
    PlayPause,
    TogglePlaylist,
    ToggleVoiceSearch,
    SelectItem(ItemId),
    DrawerToggled(bool, f64),
    Feedback(Gesture, Action),
}

/// Dispatch sink that records every call.
#[derive(Debug, Default)]
pub struct RecordingDispatch {
    pub calls: Vec<Dispatched>,
}

impl RecordingDispatch {
    /// Calls since the last `take`.
    pub fn take(&mut self) -> Vec<Dispatched> {
        std::mem::take(&mut self.calls)
    }
}

impl ActionDispatch for RecordingDispatch {
    fn seek(&mut self, offset_secs: f64) {
        self.calls.push(Dispatched::Seek(offset_secs));
    }

    fn previous(&mut self) {
        self.calls.push(Dispatched::Previous);
    }

    fn skip(&mut self) {
        self.calls.push(Dispatched::Skip);
    }

    fn play_pause(&mut self) {
        self.calls.push(Dispatched::PlayPause);
    }

    fn toggle_playlist(&mut self) {
        self.calls.push(Dispatched::TogglePlaylist);
    }

    fn toggle_voice_search(&mut self) {
        self.calls.push(Dispatched::ToggleVoiceSearch);
    }

    fn select_item(&mut self, id: &ItemId) {
        self.calls.push(Dispatched::SelectItem(id.clone()));
    }

    fn drawer_toggled(&mut self, is_open: bool, height: f64) {
        self.calls.push(Dispatched::DrawerToggled(is_open, height));
    }

    fn gesture_feedback(&mut self, gesture: Gesture, action: Action) {
        self.calls.push(Dispatched::Feedback(gesture, action));
    }
}

// ============================================================================
// Time
// ============================================================================

/// Clock advanced by hand. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
    today: Rc<Cell<NaiveDate>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
            today: Rc::new(Cell::new(today())),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set_today(&self, date: NaiveDate) {
        self.today.set(date);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn today(&self) -> NaiveDate {
        self.today.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_rows_applies_calls() {
        let mut rows = RecordingRows::default();
        let list = items(&["a", "b", "c"]);
        for (i, item) in list.iter().enumerate() {
            rows.create_row(i, item);
        }
        rows.move_row(&ItemId::from("c"), 0);
        rows.remove_row(&ItemId::from("a"));
        assert_eq!(rows.ids(), vec!["c", "b"]);
        assert_eq!(rows.take_ops().len(), 5);
        assert!(rows.take_ops().is_empty());
    }

    #[test]
    fn test_player_geometry() {
        let g = FakeGeometry::player(800.0, 225.0, 100.0);
        assert_eq!(g.bounding_box(&ElementRef::Controls).unwrap().top, 700.0);
        assert_eq!(g.bounding_box(&ElementRef::ListViewport).unwrap().height, 475.0);
        assert!(FakeGeometry::unlaid().bounding_box(&ElementRef::Container).is_none());
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::default();
        let handle = clock.clone();
        let start = clock.now();
        handle.advance(Duration::from_millis(250));
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }
}
