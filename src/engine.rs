//! The playlist drawer engine: one facade over every component.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                    Host (view tree, event loop)                   │
//! │  pointer events · button presses · item lists · animation frames  │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 │ PlaylistDrawer API + tick()
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │ MeasurementCache ─► SnapPointPlanner ─► DrawerController          │
//! │ GestureRecognizer / ButtonCompositor ─► dispatch()                │
//! │ VisibilityClassifier ─► PlaylistReconciler ─► AutoScroller        │
//! └──────┬──────────────────────┬─────────────────────────┬───────────┘
//!        │ GeometryProvider     │ ActionDispatch          │ RowSink
//!        ▼ (read only)          ▼ (fire and forget)       ▼ (owned rows)
//! ```
//!
//! Everything runs on the caller's thread. Time comes from a [`Clock`], so
//! timers (debounce, hold, retries, animation) only advance inside calls,
//! most of them in [`PlaylistDrawer::tick`].
//!
//! No operation here returns an error to the host. Component errors are
//! logged and the engine keeps its last good state.

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::drawer::{DrawerController, DrawerEvent, DrawerFrame, DrawerMode};
use crate::error::{Error, Result};
use crate::events::SubscriptionId;
use crate::geometry::{
    DrawerState, GeometryProvider, MeasurementCache, MeasurementSnapshot, SnapPointPlanner, SnapPointSet,
};
use crate::gesture::{
    Action, ActionDispatch, ButtonBinding, ButtonCompositor, ButtonTiming, ControlButton, GestureActionMap,
    GestureRecognizer, InteractivePredicate, PointerEvent, Sensitivity, dispatch,
};
use crate::playlist::{
    AutoScrollSettings, AutoScroller, ItemId, PlaylistItem, PlaylistReconciler, ReconcileReport, RowSink,
    VisibilityClassifier, VisibilitySettings,
};

/// Source of time for the engine.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Local calendar date, for the seasonal filter.
    fn today(&self) -> NaiveDate;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Drawer operations that need valid geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DrawerOp {
    /// Move to the mode's resting height once a playlist exists
    Establish,
    /// Refresh snap points only
    Remeasure,
    SetHeight { target: f64, animate: bool },
    Close,
    OpenToDefault,
}

impl DrawerOp {
    /// Background ops never replace an explicit request waiting on geometry.
    fn is_background(self) -> bool {
        matches!(self, DrawerOp::Establish | DrawerOp::Remeasure)
    }
}

/// An operation waiting for geometry to be laid out.
#[derive(Debug, Clone, Copy)]
struct Deferred {
    op: DrawerOp,
    since: Instant,
    frames_left: u32,
    next_at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    frames: u32,
    interval: Duration,
    timeout: Duration,
}

#[derive(Debug)]
struct ScheduledUpdate {
    due: Instant,
    items: Vec<PlaylistItem>,
}

/// Resizable playlist drawer.
///
/// Generic over the host seams: geometry reads, action dispatch, the owned
/// row sub-tree and the clock.
pub struct PlaylistDrawer<G, D, R, C = SystemClock> {
    geometry: G,
    dispatch: D,
    rows: R,
    clock: C,

    measurements: MeasurementCache,
    planner: SnapPointPlanner,
    drawer: DrawerController,
    /// `UserToggled` events waiting to be forwarded to `dispatch`
    toggles: Rc<RefCell<Vec<(bool, f64)>>>,
    retry: RetryPolicy,
    deferred: Option<Deferred>,

    recognizer: GestureRecognizer,
    buttons: BTreeMap<ControlButton, ButtonCompositor>,
    button_timing: ButtonTiming,
    seek_step_secs: f64,

    visibility: VisibilitySettings,
    list_id: Option<String>,
    reconciler: PlaylistReconciler,
    update_debounce: Duration,
    scheduled: Option<ScheduledUpdate>,
    autoscroll: AutoScroller,

    disposed: bool,
}

impl<G, D, R, C> PlaylistDrawer<G, D, R, C>
where
    G: GeometryProvider,
    D: ActionDispatch,
    R: RowSink,
    C: Clock,
{
    /// Create an engine from a configuration snapshot.
    ///
    /// Nothing is measured until the first playlist arrives.
    pub fn new(config: &Config, geometry: G, dispatch: D, rows: R, clock: C) -> Self {
        let mut drawer = DrawerController::new(config.drawer.mode, config.drawer.timing());
        let toggles: Rc<RefCell<Vec<(bool, f64)>>> = Rc::default();
        let inbox = Rc::clone(&toggles);
        drawer.subscribe(move |event| {
            if let DrawerEvent::UserToggled { is_open, height } = event {
                inbox.borrow_mut().push((*is_open, *height));
            }
        });

        let mut recognizer = GestureRecognizer::new(
            config.gestures.sensitivity,
            config.gestures.actions.clone(),
            Box::new(|_| false),
        );
        recognizer.set_enabled(config.gestures.enabled);

        let button_timing = config.buttons.timing();
        let buttons = ControlButton::ALL
            .into_iter()
            .map(|b| (b, ButtonCompositor::new(config.buttons.binding(b), button_timing)))
            .collect();

        tracing::debug!(
            target: "engine",
            "Drawer engine created (mode={}, sensitivity={})",
            config.drawer.mode,
            config.gestures.sensitivity
        );

        Self {
            geometry,
            dispatch,
            rows,
            clock,
            measurements: MeasurementCache::new(),
            planner: SnapPointPlanner::new(config.drawer.min_snap_difference),
            drawer,
            toggles,
            retry: RetryPolicy {
                frames: config.drawer.measurement_retry_frames,
                interval: Duration::from_millis(config.drawer.measurement_retry_interval_ms),
                timeout: Duration::from_millis(config.drawer.measurement_timeout_ms),
            },
            deferred: None,
            recognizer,
            buttons,
            button_timing,
            seek_step_secs: config.buttons.seek_step_secs,
            visibility: config.playlist.visibility(),
            list_id: None,
            reconciler: PlaylistReconciler::new(),
            update_debounce: config.playlist.update_debounce(),
            scheduled: None,
            autoscroll: AutoScroller::new(config.autoscroll.settings()),
            disposed: false,
        }
    }

    // ========================================================================
    // Read-only state
    // ========================================================================

    /// Drawer state derived from the current height.
    pub fn current_state(&self) -> DrawerState {
        self.drawer.state()
    }

    pub fn height(&self) -> f64 {
        self.drawer.height()
    }

    pub fn frame(&self) -> DrawerFrame {
        self.drawer.frame()
    }

    pub fn mode(&self) -> DrawerMode {
        self.drawer.mode()
    }

    pub fn snap_points(&self) -> &SnapPointSet {
        self.drawer.snap_points()
    }

    /// Last measured snapshot.
    pub fn measurements(&self) -> MeasurementSnapshot {
        self.measurements.last()
    }

    pub fn is_item_visible(&self, id: &str) -> bool {
        self.reconciler.is_item_visible(id)
    }

    /// Last item list with `hidden` set.
    pub fn items(&self) -> &[PlaylistItem] {
        self.reconciler.items()
    }

    pub fn rendered(&self) -> &[ItemId] {
        self.reconciler.rendered()
    }

    /// Whether an operation is waiting for geometry.
    pub fn has_pending_measurement(&self) -> bool {
        self.deferred.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Geometry values for host styling.
    pub fn geometry_vars(&self) -> [(&'static str, f64); 5] {
        let m = self.measurements.last();
        [
            ("--drawer-height", self.drawer.height()),
            ("--drawer-max-height", m.max_drawer_height),
            ("--drawer-mid-height", m.mid_drawer_height),
            ("--controls-height", m.controls_height),
            ("--button-group-width", m.button_group_width),
        ]
    }

    /// Host layout, for hosts that own it through the engine.
    pub fn geometry_mut(&mut self) -> &mut G {
        &mut self.geometry
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatch
    }

    pub fn rows(&self) -> &R {
        &self.rows
    }

    #[cfg(test)]
    pub(crate) fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatch
    }

    #[cfg(test)]
    pub(crate) fn rows_mut(&mut self) -> &mut R {
        &mut self.rows
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Listen to drawer events. Returns `None` after [`dispose`](Self::dispose).
    pub fn subscribe(&mut self, listener: impl FnMut(&DrawerEvent) + 'static) -> Option<SubscriptionId> {
        self.drawer.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.drawer.unsubscribe(id)
    }

    // ========================================================================
    // Drawer operations
    // ========================================================================

    /// Set the drawer height (clamped to the full height).
    pub fn set_height(&mut self, target: f64, animate: bool) {
        self.run(DrawerOp::SetHeight { target, animate });
    }

    pub fn close(&mut self) {
        self.run(DrawerOp::Close);
    }

    pub fn open_to_default(&mut self) {
        self.run(DrawerOp::OpenToDefault);
    }

    /// Host layout changed; re-measure before the next drawer operation.
    pub fn invalidate_measurements(&mut self) {
        if self.disposed {
            return;
        }
        self.measurements.invalidate();
        self.run(DrawerOp::Remeasure);
    }

    pub fn set_mode(&mut self, mode: DrawerMode) {
        if self.disposed {
            return;
        }
        let now = self.clock.now();
        self.drawer.set_mode(mode, now);
        self.forward_toggles();
    }

    pub fn start_drag(&mut self, y: f64) -> bool {
        if self.disposed {
            return false;
        }
        let now = self.clock.now();
        let result = self
            .refresh_geometry(now)
            .and_then(|()| self.drawer.start_drag(y, now));
        ignored("start_drag", result).is_some()
    }

    /// Follow the pointer. Returns the new height.
    pub fn drag_to(&mut self, y: f64) -> Option<f64> {
        if self.disposed {
            return None;
        }
        let now = self.clock.now();
        ignored("drag_to", self.drawer.drag_to(y, now))
    }

    /// Release the drag. Returns the state the drawer snaps to.
    pub fn end_drag(&mut self) -> Option<DrawerState> {
        if self.disposed {
            return None;
        }
        let now = self.clock.now();
        let state = ignored("end_drag", self.drawer.end_drag(now));
        self.forward_toggles();
        state
    }

    /// Click on the drag handle. Returns whether the drawer moved.
    pub fn handle_click(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        let now = self.clock.now();
        if let Err(e) = self.refresh_geometry(now) {
            tracing::debug!(target: "engine", "click ignored: {}", e);
            return false;
        }
        let moved = ignored("click", self.drawer.click(now)).is_some();
        self.forward_toggles();
        moved
    }

    // ========================================================================
    // Gestures and buttons
    // ========================================================================

    /// Feed one pointer event from the media surface.
    ///
    /// Returns the action a completed gesture dispatched.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Option<Action> {
        if self.disposed {
            return None;
        }
        let (gesture, action) = self.recognizer.resolve(event)?;
        dispatch(action, self.seek_step_secs, &mut self.dispatch);
        self.dispatch.gesture_feedback(gesture, action);
        Some(action)
    }

    pub fn set_gesture_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.recognizer.set_sensitivity(sensitivity);
    }

    pub fn set_gesture_actions(&mut self, actions: GestureActionMap) {
        self.recognizer.set_actions(actions);
    }

    pub fn set_gestures_enabled(&mut self, enabled: bool) {
        if !self.disposed {
            self.recognizer.set_enabled(enabled);
        }
    }

    /// Decide which pointer targets are controls that never start gestures.
    pub fn set_interactive_predicate(&mut self, is_interactive: InteractivePredicate) {
        self.recognizer.set_interactive_predicate(is_interactive);
    }

    pub fn button_press(&mut self, button: ControlButton) {
        if self.disposed {
            return;
        }
        let now = self.clock.now();
        if let Some(compositor) = self.buttons.get_mut(&button) {
            compositor.press(now);
        }
    }

    pub fn button_release(&mut self, button: ControlButton) {
        if self.disposed {
            return;
        }
        let now = self.clock.now();
        let Some(compositor) = self.buttons.get_mut(&button) else {
            return;
        };
        for action in compositor.release(now) {
            tracing::debug!(target: "gesture::buttons", "{} -> {}", button, action);
            dispatch(action, self.seek_step_secs, &mut self.dispatch);
        }
    }

    /// The pointer left the button or the press was interrupted.
    pub fn button_cancel(&mut self, button: ControlButton) {
        if let Some(compositor) = self.buttons.get_mut(&button) {
            compositor.cancel();
        }
    }

    pub fn set_button_binding(&mut self, button: ControlButton, binding: ButtonBinding) {
        self.buttons
            .insert(button, ButtonCompositor::new(binding, self.button_timing));
    }

    // ========================================================================
    // Playlist
    // ========================================================================

    /// Replace the item list and reconcile the rows now.
    ///
    /// Cancels a pending [`schedule_update`](Self::schedule_update).
    pub fn update(&mut self, items: Vec<PlaylistItem>) -> ReconcileReport {
        if self.disposed {
            return ReconcileReport::default();
        }
        if self.scheduled.take().is_some() {
            tracing::trace!(target: "engine", "Pending debounced update superseded");
        }
        self.reconcile(items)
    }

    /// Reconcile after the update debounce. A newer call replaces this one.
    pub fn schedule_update(&mut self, items: Vec<PlaylistItem>) {
        if self.disposed {
            return;
        }
        let due = self.clock.now() + self.update_debounce;
        if self.scheduled.replace(ScheduledUpdate { due, items }).is_some() {
            tracing::trace!(target: "engine", "Debounced update replaced");
        }
    }

    /// Which list the items belong to, for per-list removals and seasonal
    /// bypass. Re-applies the filters to the current items.
    pub fn set_list(&mut self, list_id: Option<String>) {
        if self.list_id != list_id {
            self.list_id = list_id;
            self.reapply_filters();
        }
    }

    pub fn set_visibility_settings(&mut self, settings: VisibilitySettings) {
        if self.visibility != settings {
            self.visibility = settings;
            self.reapply_filters();
        }
    }

    /// Highlight the playing item and scroll it into view.
    pub fn set_active_item(&mut self, id: impl Into<ItemId>) {
        if self.disposed {
            return;
        }
        let now = self.clock.now();
        match self.reconciler.set_active_item(id.into(), &mut self.rows) {
            Ok(()) => {
                self.autoscroll.request(now);
            }
            Err(e) => tracing::debug!(target: "engine", "No row highlighted: {}", e),
        }
    }

    pub fn clear_active_item(&mut self) {
        if !self.disposed {
            self.reconciler.clear_active(&mut self.rows);
        }
    }

    /// The user picked a row.
    pub fn select_item(&mut self, id: &str) {
        if self.disposed {
            return;
        }
        if self.reconciler.is_item_visible(id) {
            self.dispatch.select_item(&ItemId::from(id));
        } else {
            tracing::debug!(target: "engine", "{}", Error::StaleIdentity(ItemId::from(id)));
        }
    }

    // ========================================================================
    // Auto-scroll signals
    // ========================================================================

    pub fn set_autoscroll_preference(&mut self, settings: AutoScrollSettings) {
        self.autoscroll.set_settings(settings);
    }

    /// The list viewport scrolled.
    pub fn list_scrolled(&mut self) {
        if !self.disposed {
            let now = self.clock.now();
            self.autoscroll.user_scrolled(now);
        }
    }

    /// The host finished a scroll requested through `RowSink::scroll_by`.
    pub fn scroll_finished(&mut self) {
        self.autoscroll.scroll_finished();
    }

    pub fn set_context_menu_open(&mut self, open: bool) {
        self.autoscroll.set_context_menu(open);
    }

    pub fn set_list_touch(&mut self, active: bool) {
        self.autoscroll.set_touch(active);
    }

    // ========================================================================
    // Frame driver
    // ========================================================================

    /// Advance timers. Call once per animation frame.
    pub fn tick(&mut self) {
        if self.disposed {
            return;
        }
        let now = self.clock.now();
        self.retry_deferred(now);
        self.drawer.poll(now);

        if self.scheduled.as_ref().is_some_and(|s| now >= s.due)
            && let Some(scheduled) = self.scheduled.take()
        {
            self.reconcile(scheduled.items);
        }

        for (button, compositor) in self.buttons.iter_mut() {
            for action in compositor.poll(now) {
                tracing::debug!(target: "gesture::buttons", "{} -> {}", button, action);
                dispatch(action, self.seek_step_secs, &mut self.dispatch);
            }
        }

        self.autoscroll
            .poll(now, self.reconciler.highlighted(), &self.geometry, &mut self.rows);
        self.forward_toggles();
    }

    /// Cancel every timer and revoke every subscription. Later calls are
    /// no-ops; the rows stay with the host.
    pub fn dispose(&mut self) {
        if std::mem::replace(&mut self.disposed, true) {
            return;
        }
        self.drawer.dispose();
        self.toggles.borrow_mut().clear();
        self.deferred = None;
        self.scheduled = None;
        self.autoscroll.cancel();
        for compositor in self.buttons.values_mut() {
            compositor.cancel();
        }
        self.recognizer.set_enabled(false);
        tracing::debug!(target: "engine", "Drawer engine disposed");
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn reconcile(&mut self, items: Vec<PlaylistItem>) -> ReconcileReport {
        let now = self.clock.now();
        let classifier = VisibilityClassifier::new(&self.visibility, self.list_id.as_deref(), self.clock.today());
        let report = self.reconciler.update(items, &classifier, &mut self.rows);

        if report.visibility_flipped {
            // Snap points depend on whether a list exists
            self.measurements.invalidate();
        }
        if self.reconciler.has_visible() && !self.drawer.is_established() {
            self.run(DrawerOp::Establish);
        } else if report.visibility_flipped {
            self.run(DrawerOp::Remeasure);
        }

        if !report.is_noop() && self.reconciler.highlighted().is_some() {
            self.autoscroll.request(now);
        }
        report
    }

    fn reapply_filters(&mut self) {
        if self.disposed || self.reconciler.items().is_empty() {
            return;
        }
        let items = self.reconciler.items().to_vec();
        self.reconcile(items);
    }

    /// Measure if needed and hand the current snap points to the drawer.
    fn refresh_geometry(&mut self, now: Instant) -> Result<()> {
        let snapshot = self.measurements.require_valid(&self.geometry)?;
        let snap = self.planner.plan(&snapshot, self.reconciler.has_visible());
        self.drawer.set_snap_points(snap, now);
        Ok(())
    }

    /// Apply `op` now, or keep it until geometry is available.
    fn run(&mut self, op: DrawerOp) {
        if self.disposed {
            return;
        }
        if op.is_background() && self.deferred.is_some() {
            // The pending op re-measures when it runs
            return;
        }
        let now = self.clock.now();
        match self.refresh_geometry(now) {
            Ok(()) => {
                self.deferred = None;
                self.apply(op, now);
            }
            Err(e) if !e.is_retryable() => {
                tracing::warn!(target: "engine", "{:?} dropped: {}", op, e);
            }
            Err(e) => {
                tracing::debug!(target: "engine", "{:?} deferred: {}", op, e);
                self.deferred = Some(Deferred {
                    op,
                    since: now,
                    frames_left: self.retry.frames,
                    next_at: now + self.retry.interval,
                });
            }
        }
    }

    fn apply(&mut self, op: DrawerOp, now: Instant) {
        let result = match op {
            // An establish dropped on timeout gets another chance here
            DrawerOp::Remeasure if self.reconciler.has_visible() && !self.drawer.is_established() => {
                self.drawer.establish(now)
            }
            DrawerOp::Remeasure => Ok(()),
            DrawerOp::Establish => self.drawer.establish(now),
            DrawerOp::SetHeight { target, animate } => self.drawer.request_height(target, animate, now),
            DrawerOp::Close => self.drawer.close(now),
            DrawerOp::OpenToDefault => self.drawer.open_to_default(now),
        };
        if let Err(e) = result {
            tracing::debug!(target: "engine", "{:?} ignored: {}", op, e);
        }
        self.forward_toggles();
    }

    /// Retry a deferred op: every frame for the first few frames, then on
    /// the retry interval, until the timeout.
    fn retry_deferred(&mut self, now: Instant) {
        let Some(deferred) = &mut self.deferred else {
            return;
        };
        if now.saturating_duration_since(deferred.since) >= self.retry.timeout {
            tracing::warn!(
                target: "engine",
                "Dropping {:?}: geometry still unavailable after {:?}",
                deferred.op,
                self.retry.timeout
            );
            self.deferred = None;
            return;
        }
        if deferred.frames_left > 0 {
            deferred.frames_left -= 1;
        } else if now >= deferred.next_at {
            deferred.next_at = now + self.retry.interval;
        } else {
            return;
        }

        let op = deferred.op;
        if self.refresh_geometry(now).is_ok() {
            tracing::debug!(target: "engine", "Geometry available, applying {:?}", op);
            self.deferred = None;
            self.apply(op, now);
        }
    }

    fn forward_toggles(&mut self) {
        let toggles = std::mem::take(&mut *self.toggles.borrow_mut());
        for (is_open, height) in toggles {
            self.dispatch.drawer_toggled(is_open, height);
        }
    }
}

/// Log a component error and turn it into `None`.
fn ignored<T>(what: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(target: "engine", "{} ignored: {}", what, e);
            None
        }
    }
}
