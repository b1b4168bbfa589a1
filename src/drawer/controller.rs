//! Drawer height state machine.

use std::time::{Duration, Instant};

use super::{DrawerEvent, DrawerFrame, DrawerMode};
use crate::error::{Error, Result};
use crate::events::{SubscriptionId, Subscriptions};
use crate::geometry::{DrawerState, SnapPointSet};

/// Heights closer than this are treated as equal.
const HEIGHT_EPSILON: f64 = 0.5;

/// Timing knobs for the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawerTiming {
    /// Duration of animated height transitions
    pub animation: Duration,
    /// Minimum spacing between state commits while dragging
    pub commit_interval: Duration,
}

impl Default for DrawerTiming {
    fn default() -> Self {
        Self {
            animation: Duration::from_millis(300),
            commit_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DragSession {
    start_y: f64,
    start_height: f64,
}

/// Owns the drawer height and turns drags and clicks into transitions.
pub struct DrawerController {
    mode: DrawerMode,
    timing: DrawerTiming,
    snap: SnapPointSet,
    height: f64,
    /// Set once a playlist first provided real geometry
    established: bool,
    transition: Option<Duration>,
    /// First render: transitions stay off until the next frame
    animation_suppressed: bool,
    animating_until: Option<Instant>,
    drag: Option<DragSession>,
    suppress_next_click: bool,
    committed: DrawerState,
    last_commit: Option<Instant>,
    commit_pending: bool,
    events: Subscriptions<DrawerEvent>,
}

impl std::fmt::Debug for DrawerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawerController")
            .field("mode", &self.mode)
            .field("height", &self.height)
            .field("snap", &self.snap)
            .field("dragging", &self.drag.is_some())
            .finish()
    }
}

impl DrawerController {
    pub fn new(mode: DrawerMode, timing: DrawerTiming) -> Self {
        Self {
            mode,
            timing,
            snap: SnapPointSet::closed_only(),
            height: 0.0,
            established: false,
            transition: Some(timing.animation),
            animation_suppressed: false,
            animating_until: None,
            drag: None,
            suppress_next_click: false,
            committed: DrawerState::Closed,
            last_commit: None,
            commit_pending: false,
            events: Subscriptions::new(),
        }
    }

    // ------------------------------------------------------------------
    // Read-only accessors
    // ------------------------------------------------------------------

    pub fn mode(&self) -> DrawerMode {
        self.mode
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn snap_points(&self) -> &SnapPointSet {
        &self.snap
    }

    /// State derived from the current height.
    pub fn state(&self) -> DrawerState {
        self.snap.state_for(self.height)
    }

    /// Last state announced to listeners (lags [`state`](Self::state) while
    /// a drag is being throttled).
    pub fn committed_state(&self) -> DrawerState {
        self.committed
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_established(&self) -> bool {
        self.established
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.animating_until.is_some_and(|until| now < until)
    }

    pub fn frame(&self) -> DrawerFrame {
        DrawerFrame {
            height: self.height,
            transition: self.transition,
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&DrawerEvent) + 'static) -> Option<SubscriptionId> {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn set_timing(&mut self, timing: DrawerTiming) {
        self.timing = timing;
    }

    /// Replace the snap points after a re-measurement.
    ///
    /// An established drawer keeps its resting state: a Full drawer stays
    /// at the new full height. Losing the playlist collapses it to 0.
    pub fn set_snap_points(&mut self, snap: SnapPointSet, now: Instant) {
        if snap == self.snap {
            return;
        }
        tracing::debug!(target: "drawer::controller", "Snap points {} -> {}", self.snap, snap);
        let previous_state = self.committed;
        let regained_playlist = self.snap.is_closed_only() && !snap.is_closed_only();
        self.snap = snap;

        if !self.established {
            return;
        }
        if self.drag.is_some() {
            self.height = self.height.clamp(0.0, self.snap.full());
            return;
        }
        if regained_playlist {
            // The collapse to 0 was forced, so start over from the mode
            let target = self.mode.resting_height(&self.snap);
            self.apply_height(target, Some(self.timing.animation), now);
            return;
        }
        let target = match previous_state {
            DrawerState::Closed => 0.0,
            DrawerState::Mid => self.snap.mid().unwrap_or_else(|| self.snap.full()),
            DrawerState::Full => self.snap.full(),
        };
        self.apply_height(target, None, now);
    }

    /// Switch mode and move to its resting height.
    pub fn set_mode(&mut self, mode: DrawerMode, now: Instant) {
        if mode == self.mode {
            return;
        }
        tracing::info!(target: "drawer::controller", "Drawer mode {} -> {}", self.mode, mode);
        self.mode = mode;
        if self.drag.take().is_some() {
            tracing::debug!(target: "drawer::controller", "Mode change cancelled drag");
        }
        if self.established {
            let target = mode.resting_height(&self.snap);
            self.set_height(target, true, false, now);
        }
    }

    // ------------------------------------------------------------------
    // Programmatic transitions
    // ------------------------------------------------------------------

    /// Move to the mode's resting height the first time a playlist is
    /// available. Later calls are ignored.
    pub fn establish(&mut self, now: Instant) -> Result<()> {
        if self.established {
            return Ok(());
        }
        if self.snap.is_closed_only() {
            return Err(Error::transition("no playlist to establish the drawer with"));
        }
        let target = self.mode.resting_height(&self.snap);
        self.set_height(target, true, true, now);
        Ok(())
    }

    /// Set the height, clamped to `[0, full]`.
    ///
    /// On the first render an opening drawer jumps without animating, and
    /// transitions come back on the next [`poll`](Self::poll).
    pub fn set_height(&mut self, target: f64, animate: bool, first_render: bool, now: Instant) {
        let target = target.clamp(0.0, self.snap.full());
        let transition = if first_render && target > 0.0 {
            self.animation_suppressed = true;
            None
        } else if animate && !self.animation_suppressed {
            Some(self.timing.animation)
        } else {
            None
        };
        self.established = true;
        self.drag = None;
        self.apply_height(target, transition, now);
    }

    /// Programmatic height request from the host, honoring mode locks.
    ///
    /// Disabled never opens and Fixed modes only accept their resting height.
    pub fn request_height(&mut self, target: f64, animate: bool, now: Instant) -> Result<()> {
        if !target.is_finite() {
            return Err(Error::transition(format!("invalid height {target}")));
        }
        if self.snap.is_closed_only() {
            return Err(Error::transition("no playlist"));
        }
        let clamped = target.clamp(0.0, self.snap.full());
        if self.mode == DrawerMode::Disabled && clamped > 0.0 {
            return Err(Error::transition("drawer is disabled"));
        }
        if self.mode.is_fixed() && (clamped - self.mode.resting_height(&self.snap)).abs() > HEIGHT_EPSILON {
            return Err(Error::transition(format!("drawer is locked in {} mode", self.mode)));
        }
        let first_render = !self.established;
        self.set_height(clamped, animate, first_render, now);
        Ok(())
    }

    /// Close the drawer. Fixed modes stay open.
    pub fn close(&mut self, now: Instant) -> Result<()> {
        if self.mode.is_fixed() {
            return Err(Error::transition(format!("drawer is locked open in {} mode", self.mode)));
        }
        self.set_height(0.0, true, false, now);
        Ok(())
    }

    /// Open to the mode's default height.
    pub fn open_to_default(&mut self, now: Instant) -> Result<()> {
        if self.snap.is_closed_only() {
            return Err(Error::transition("no playlist to open"));
        }
        let target = self
            .mode
            .open_height(&self.snap)
            .ok_or_else(|| Error::transition("drawer is disabled"))?;
        self.set_height(target, true, false, now);
        Ok(())
    }

    // ------------------------------------------------------------------
    // User interaction
    // ------------------------------------------------------------------

    fn check_interactive(&self) -> Result<()> {
        if !self.mode.is_interactive() {
            return Err(Error::transition(format!("drawer is locked in {} mode", self.mode)));
        }
        if self.snap.is_closed_only() {
            return Err(Error::transition("no playlist"));
        }
        Ok(())
    }

    /// Begin a drag at vertical pointer position `y`.
    ///
    /// Cancels any running snap animation; transitions stay off until the
    /// drag ends.
    pub fn start_drag(&mut self, y: f64, now: Instant) -> Result<()> {
        self.check_interactive()?;
        if !y.is_finite() {
            return Err(Error::transition(format!("invalid pointer position {y}")));
        }
        self.animating_until = None;
        self.transition = None;
        self.suppress_next_click = false;
        self.drag = Some(DragSession {
            start_y: y,
            start_height: self.height,
        });
        self.last_commit = Some(now);
        tracing::trace!(target: "drawer::controller", "Drag started at y={:.1} h={:.1}", y, self.height);
        Ok(())
    }

    /// Follow the pointer. Upward movement grows the drawer.
    ///
    /// Each call supersedes the previous position; the state is recomputed
    /// at most once per commit interval.
    pub fn drag_to(&mut self, y: f64, now: Instant) -> Result<f64> {
        if !y.is_finite() {
            return Err(Error::transition(format!("invalid pointer position {y}")));
        }
        let drag = self
            .drag
            .ok_or_else(|| Error::transition("drag_to without start_drag"))?;
        let delta = drag.start_y - y;
        let height = (drag.start_height + delta).clamp(0.0, self.snap.full());
        if (height - self.height).abs() > f64::EPSILON {
            self.height = height;
            self.events.emit(&DrawerEvent::HeightChanged {
                height,
                transition: None,
            });
        }

        let due = self
            .last_commit
            .is_none_or(|last| now.duration_since(last) >= self.timing.commit_interval);
        if due {
            self.commit_state(now);
        } else {
            self.commit_pending = true;
        }
        Ok(height)
    }

    /// Release the drag: snap to the nearest point and animate there.
    ///
    /// If the drawer moved at all, the click the release synthesizes is
    /// suppressed.
    pub fn end_drag(&mut self, now: Instant) -> Result<DrawerState> {
        let drag = self
            .drag
            .take()
            .ok_or_else(|| Error::transition("end_drag without start_drag"))?;
        let moved = (self.height - drag.start_height).abs() > f64::EPSILON;
        let target = self.snap.nearest(self.height);
        tracing::debug!(
            target: "drawer::controller",
            "Drag released at {:.1}, snapping to {:.1}",
            self.height,
            target
        );

        self.suppress_next_click = moved;
        self.apply_height(target, Some(self.timing.animation), now);
        self.animating_until = Some(now + self.timing.animation);

        if (target - drag.start_height).abs() > HEIGHT_EPSILON {
            self.events.emit(&DrawerEvent::UserToggled {
                is_open: target > 0.0,
                height: target,
            });
        }
        Ok(self.committed)
    }

    /// Handle a click on the drag handle: advance to the next snap point.
    pub fn click(&mut self, now: Instant) -> Result<f64> {
        if std::mem::take(&mut self.suppress_next_click) {
            return Err(Error::transition("click suppressed after drag"));
        }
        self.check_interactive()?;
        let target = self.snap.next_after(self.height);
        self.set_height(target, true, false, now);
        self.animating_until = Some(now + self.timing.animation);
        self.events.emit(&DrawerEvent::UserToggled {
            is_open: target > 0.0,
            height: target,
        });
        Ok(target)
    }

    // ------------------------------------------------------------------
    // Frame driver
    // ------------------------------------------------------------------

    /// Advance time-based bookkeeping. Call once per animation frame.
    pub fn poll(&mut self, now: Instant) {
        if self.animation_suppressed {
            self.animation_suppressed = false;
            if self.drag.is_none() {
                self.transition = Some(self.timing.animation);
            }
        }
        if self.animating_until.is_some_and(|until| now >= until) {
            self.animating_until = None;
        }
        if self.commit_pending
            && self
                .last_commit
                .is_none_or(|last| now.duration_since(last) >= self.timing.commit_interval)
        {
            self.commit_state(now);
        }
    }

    /// Drop pending work and every listener. The controller stays readable.
    pub fn dispose(&mut self) {
        self.drag = None;
        self.animating_until = None;
        self.commit_pending = false;
        self.animation_suppressed = false;
        self.events.dispose();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn apply_height(&mut self, target: f64, transition: Option<Duration>, now: Instant) {
        self.transition = transition;
        if (target - self.height).abs() > f64::EPSILON {
            self.height = target;
            self.events.emit(&DrawerEvent::HeightChanged {
                height: target,
                transition,
            });
        }
        self.commit_state(now);
    }

    fn commit_state(&mut self, now: Instant) {
        self.commit_pending = false;
        self.last_commit = Some(now);
        let state = self.snap.state_for(self.height);
        if state != self.committed {
            let from = std::mem::replace(&mut self.committed, state);
            tracing::debug!(target: "drawer::controller", "Drawer state {} -> {}", from, state);
            self.events.emit(&DrawerEvent::StateChanged { from, to: state });
        }
    }
}
