//! Keeps the active row in view without fighting the user.
//!
//! A scroll is requested after reconciliation or when the active item
//! changes, and performed on the next frame unless something blocks it.
//! Requests made while blocked are dropped, not queued.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{ItemId, RowSink, ScrollAxis, ScrollRequest};
use crate::geometry::{ElementRef, GeometryProvider, Rect};

bitflags! {
    /// Conditions that suppress auto-scroll.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScrollBlockers: u8 {
        /// A context menu is open over the list
        const CONTEXT_MENU = 1 << 0;
        /// A finger is on the list
        const TOUCH = 1 << 1;
        /// The user scrolled recently; clears after the re-arm delay
        const MANUAL_SCROLL = 1 << 2;
        /// Our own scroll is still in flight; clears on finish or timeout
        const BUSY = 1 << 3;
    }
}

/// Where the active row lands in a vertical list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    /// Top-aligned with one row of the previous item left visible above
    RevealPrevious,
}

/// Where the active row lands in a horizontal list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
}

/// Auto-scroll preferences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoScrollSettings {
    pub enabled: bool,
    pub vertical: VerticalAlign,
    pub horizontal: HorizontalAlign,
    /// The list is laid out horizontally
    pub horizontal_layout: bool,
    /// Host viewports shorter than this force the horizontal layout
    pub limited_height_threshold: f64,
    /// Quiet period after a manual scroll before auto-scroll re-arms
    pub rearm: Duration,
    /// Longest time a scroll of ours may stay in flight
    pub busy_timeout: Duration,
}

impl Default for AutoScrollSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            vertical: VerticalAlign::default(),
            horizontal: HorizontalAlign::default(),
            horizontal_layout: false,
            limited_height_threshold: 500.0,
            rearm: Duration::from_millis(2500),
            busy_timeout: Duration::from_millis(1000),
        }
    }
}

/// Active-row auto-scroll scheduler.
#[derive(Debug, Clone, Default)]
pub struct AutoScroller {
    settings: AutoScrollSettings,
    blockers: ScrollBlockers,
    pending: bool,
    rearm_at: Option<Instant>,
    busy_until: Option<Instant>,
}

impl AutoScroller {
    pub fn new(settings: AutoScrollSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &AutoScrollSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AutoScrollSettings) {
        self.settings = settings;
        if !settings.enabled {
            self.pending = false;
        }
    }

    pub fn blockers(&self) -> ScrollBlockers {
        self.blockers
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether `tick` needs to keep calling [`poll`](Self::poll).
    pub fn has_timers(&self) -> bool {
        self.pending || self.rearm_at.is_some() || self.busy_until.is_some()
    }

    /// Ask for the active row to be brought into view on the next poll.
    ///
    /// Returns false when the request was dropped.
    pub fn request(&mut self, now: Instant) -> bool {
        self.expire(now);
        if !self.settings.enabled {
            return false;
        }
        if !self.blockers.is_empty() {
            tracing::trace!(target: "playlist::autoscroll", "Request dropped, blocked by {:?}", self.blockers);
            return false;
        }
        self.pending = true;
        true
    }

    pub fn set_context_menu(&mut self, open: bool) {
        self.blockers.set(ScrollBlockers::CONTEXT_MENU, open);
    }

    pub fn set_touch(&mut self, active: bool) {
        self.blockers.set(ScrollBlockers::TOUCH, active);
    }

    /// The list scrolled. Scrolls while ours is in flight are our own.
    pub fn user_scrolled(&mut self, now: Instant) {
        if self.blockers.contains(ScrollBlockers::BUSY) {
            return;
        }
        self.blockers.insert(ScrollBlockers::MANUAL_SCROLL);
        self.rearm_at = Some(now + self.settings.rearm);
        self.pending = false;
    }

    /// The host finished applying our scroll.
    pub fn scroll_finished(&mut self) {
        self.blockers.remove(ScrollBlockers::BUSY);
        self.busy_until = None;
    }

    /// Horizontal layout, either configured or forced by a short viewport.
    pub fn is_horizontal(&self, viewport_height: f64) -> bool {
        self.settings.horizontal_layout
            || (viewport_height > 0.0 && viewport_height < self.settings.limited_height_threshold)
    }

    /// Relative scroll that aligns `row` inside `viewport`, or `None` when
    /// the row is already fully visible.
    pub fn plan(&self, row: Rect, viewport: Rect, horizontal: bool) -> Option<ScrollRequest> {
        if viewport.contains(&row) {
            return None;
        }
        let (axis, delta) = if horizontal {
            let delta = match self.settings.horizontal {
                HorizontalAlign::Left => row.left - viewport.left,
                HorizontalAlign::Center => {
                    (row.left + row.width / 2.0) - (viewport.left + viewport.width / 2.0)
                }
            };
            (ScrollAxis::Horizontal, delta)
        } else {
            let delta = match self.settings.vertical {
                VerticalAlign::Top => row.top - viewport.top,
                VerticalAlign::Center => {
                    (row.top + row.height / 2.0) - (viewport.top + viewport.height / 2.0)
                }
                VerticalAlign::RevealPrevious => row.top - row.height - viewport.top,
            };
            (ScrollAxis::Vertical, delta)
        };
        (delta.abs() >= 0.5).then_some(ScrollRequest { axis, delta })
    }

    /// Perform a pending scroll if it is still allowed.
    ///
    /// Returns true when a scroll was issued.
    pub fn poll<G, R>(&mut self, now: Instant, active: Option<&ItemId>, geometry: &G, rows: &mut R) -> bool
    where
        G: GeometryProvider + ?Sized,
        R: RowSink + ?Sized,
    {
        self.expire(now);
        if !std::mem::take(&mut self.pending) {
            return false;
        }
        if !self.blockers.is_empty() {
            tracing::trace!(target: "playlist::autoscroll", "Pending scroll dropped, blocked by {:?}", self.blockers);
            return false;
        }
        let Some(active) = active else {
            return false;
        };
        let (Some(row), Some(viewport)) = (
            geometry.bounding_box(&ElementRef::Row(active.clone())),
            geometry.bounding_box(&ElementRef::ListViewport),
        ) else {
            tracing::trace!(target: "playlist::autoscroll", "Row {} not laid out", active);
            return false;
        };

        let horizontal = self.is_horizontal(geometry.viewport_height());
        let Some(request) = self.plan(row, viewport, horizontal) else {
            return false;
        };
        tracing::debug!(
            target: "playlist::autoscroll",
            "Scrolling {} into view ({:?} {:+.1})",
            active,
            request.axis,
            request.delta
        );
        rows.scroll_by(request);
        self.blockers.insert(ScrollBlockers::BUSY);
        self.busy_until = Some(now + self.settings.busy_timeout);
        true
    }

    /// Drop the pending request and every timer.
    pub fn cancel(&mut self) {
        self.pending = false;
        self.rearm_at = None;
        self.busy_until = None;
        self.blockers.remove(ScrollBlockers::MANUAL_SCROLL | ScrollBlockers::BUSY);
    }

    fn expire(&mut self, now: Instant) {
        if self.rearm_at.is_some_and(|at| now >= at) {
            self.rearm_at = None;
            self.blockers.remove(ScrollBlockers::MANUAL_SCROLL);
        }
        if self.busy_until.is_some_and(|at| now >= at) {
            tracing::trace!(target: "playlist::autoscroll", "Scroll did not report completion, clearing busy");
            self.busy_until = None;
            self.blockers.remove(ScrollBlockers::BUSY);
        }
    }
}
