//! Pointer sequence classifier.

use std::time::Instant;

use super::{
    Action, Gesture, GestureActionMap, GestureKind, GestureThresholds, PointerEvent, PointerPhase,
    Sensitivity,
};

/// Decides whether a pointer target is an interactive control (button,
/// slider, ...) whose touches must never become gestures.
pub type InteractivePredicate = Box<dyn Fn(&str) -> bool>;

#[derive(Debug, Clone, Copy)]
struct Touch {
    x: f64,
    y: f64,
    time: Instant,
    fingers: u8,
}

/// Classifies pointer sequences into [`Gesture`]s.
pub struct GestureRecognizer {
    sensitivity: Sensitivity,
    thresholds: GestureThresholds,
    actions: GestureActionMap,
    is_interactive: InteractivePredicate,
    touch: Option<Touch>,
    enabled: bool,
}

impl std::fmt::Debug for GestureRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureRecognizer")
            .field("sensitivity", &self.sensitivity)
            .field("thresholds", &self.thresholds)
            .field("tracking", &self.touch.is_some())
            .finish()
    }
}

impl GestureRecognizer {
    pub fn new(sensitivity: Sensitivity, actions: GestureActionMap, is_interactive: InteractivePredicate) -> Self {
        Self {
            sensitivity,
            thresholds: GestureThresholds::for_sensitivity(sensitivity),
            actions,
            is_interactive,
            touch: None,
            enabled: true,
        }
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    pub fn thresholds(&self) -> GestureThresholds {
        self.thresholds
    }

    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.sensitivity = sensitivity;
        self.thresholds = GestureThresholds::for_sensitivity(sensitivity);
        tracing::debug!(target: "gesture", "Sensitivity set to {}", sensitivity);
    }

    pub fn set_actions(&mut self, actions: GestureActionMap) {
        self.actions = actions;
    }

    pub fn actions(&self) -> &GestureActionMap {
        &self.actions
    }

    pub fn set_interactive_predicate(&mut self, is_interactive: InteractivePredicate) {
        self.is_interactive = is_interactive;
        self.touch = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.touch = None;
        }
    }

    /// Feed one pointer event. Returns the gesture completed by it, if any.
    pub fn handle(&mut self, event: &PointerEvent) -> Option<Gesture> {
        if !self.enabled {
            return None;
        }
        match event.phase {
            PointerPhase::Down => {
                self.on_down(event);
                None
            }
            PointerPhase::Move => {
                // Late-landing fingers still count toward the sequence
                if let Some(touch) = &mut self.touch {
                    touch.fingers = touch.fingers.max(event.fingers);
                }
                None
            }
            PointerPhase::Up => {
                let touch = self.touch.take()?;
                self.classify(&touch, event)
            }
            PointerPhase::Cancel => {
                self.touch = None;
                None
            }
        }
    }

    /// Feed one event and resolve a completed gesture through the map.
    ///
    /// Unassigned gestures come back as `None` rather than `Action::None`.
    pub fn resolve(&mut self, event: &PointerEvent) -> Option<(Gesture, Action)> {
        let gesture = self.handle(event)?;
        let action = self.actions.lookup(gesture);
        if action.is_none() {
            tracing::trace!(target: "gesture", "{} is unassigned", gesture);
            return None;
        }
        tracing::debug!(target: "gesture", "{} -> {}", gesture, action);
        Some((gesture, action))
    }

    fn on_down(&mut self, event: &PointerEvent) {
        match &mut self.touch {
            // Another finger joined an ongoing sequence
            Some(touch) => touch.fingers = touch.fingers.max(event.fingers),
            None => {
                if (self.is_interactive)(&event.target) {
                    tracing::trace!(target: "gesture", "Ignoring touch on control '{}'", event.target);
                    return;
                }
                self.touch = Some(Touch {
                    x: event.x,
                    y: event.y,
                    time: event.time,
                    fingers: event.fingers.max(1),
                });
            }
        }
    }

    fn classify(&self, start: &Touch, end: &PointerEvent) -> Option<Gesture> {
        let elapsed = end.time.saturating_duration_since(start.time);
        if elapsed > self.thresholds.max_duration {
            tracing::trace!(target: "gesture", "Discarding long press ({:?})", elapsed);
            return None;
        }

        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let t = &self.thresholds;
        let horizontal = dx.abs() > t.distance && dy.abs() < dx.abs() * t.vertical_ratio;
        let vertical = dy.abs() > t.distance && dx.abs() < dy.abs() * t.vertical_ratio;
        let tap = dx.abs() < t.tap_distance && dy.abs() < t.tap_distance;

        let kind = match start.fingers {
            1 if horizontal => horizontal_kind(dx),
            2 if horizontal => horizontal_kind(dx),
            2 if vertical => {
                if dy < 0.0 {
                    GestureKind::SwipeUp
                } else {
                    GestureKind::SwipeDown
                }
            }
            2 if tap => GestureKind::Tap,
            _ => return None,
        };
        Some(Gesture {
            fingers: start.fingers,
            kind,
        })
    }
}

fn horizontal_kind(dx: f64) -> GestureKind {
    if dx < 0.0 {
        GestureKind::SwipeLeft
    } else {
        GestureKind::SwipeRight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn recognizer(sensitivity: Sensitivity) -> GestureRecognizer {
        GestureRecognizer::new(
            sensitivity,
            GestureActionMap::default(),
            Box::new(|target| target.starts_with("button")),
        )
    }

    /// Run a down/up pair and return the classification.
    fn swipe(r: &mut GestureRecognizer, fingers: u8, dx: f64, dy: f64, ms: u64) -> Option<Gesture> {
        let t0 = Instant::now();
        r.handle(&PointerEvent::new(PointerPhase::Down, 200.0, 200.0, t0, fingers));
        r.handle(&PointerEvent::new(
            PointerPhase::Up,
            200.0 + dx,
            200.0 + dy,
            t0 + Duration::from_millis(ms),
            fingers,
        ))
    }

    #[test]
    fn test_two_finger_swipe_left() {
        let mut r = recognizer(Sensitivity::Normal);
        let g = swipe(&mut r, 2, -90.0, 10.0, 200).unwrap();
        assert_eq!(g.to_string(), "two-finger-swipe-left");
    }

    #[test]
    fn test_vertical_ratio_rejects_diagonal() {
        let mut r = recognizer(Sensitivity::Normal);
        assert_eq!(swipe(&mut r, 2, -90.0, 80.0, 200), None);
    }

    #[test]
    fn test_one_finger_horizontal() {
        let mut r = recognizer(Sensitivity::Normal);
        assert_eq!(
            swipe(&mut r, 1, 100.0, 5.0, 150).map(|g| g.kind),
            Some(GestureKind::SwipeRight)
        );
        // One-finger vertical movement belongs to scrolling/dragging
        assert_eq!(swipe(&mut r, 1, 0.0, -200.0, 150), None);
    }

    #[test]
    fn test_two_finger_vertical_and_tap() {
        let mut r = recognizer(Sensitivity::Normal);
        assert_eq!(
            swipe(&mut r, 2, 5.0, -100.0, 150).map(|g| g.kind),
            Some(GestureKind::SwipeUp)
        );
        assert_eq!(
            swipe(&mut r, 2, 5.0, 100.0, 150).map(|g| g.kind),
            Some(GestureKind::SwipeDown)
        );
        assert_eq!(
            swipe(&mut r, 2, 3.0, -4.0, 100).map(|g| g.kind),
            Some(GestureKind::Tap)
        );
    }

    #[test]
    fn test_long_press_is_not_a_swipe() {
        let mut r = recognizer(Sensitivity::Normal);
        assert_eq!(swipe(&mut r, 2, -90.0, 10.0, 800), None);
    }

    #[test]
    fn test_sensitivity_changes_outcome() {
        let mut low = recognizer(Sensitivity::Low);
        assert_eq!(swipe(&mut low, 2, -70.0, 5.0, 200), None);
        let mut high = recognizer(Sensitivity::High);
        assert!(swipe(&mut high, 2, -70.0, 5.0, 200).is_some());
    }

    #[test]
    fn test_interactive_targets_are_ignored() {
        let mut r = recognizer(Sensitivity::Normal);
        let t0 = Instant::now();
        r.handle(&PointerEvent::new(PointerPhase::Down, 0.0, 0.0, t0, 2).on("button.play"));
        let up = PointerEvent::new(PointerPhase::Up, -120.0, 0.0, t0 + Duration::from_millis(100), 2);
        assert_eq!(r.handle(&up), None);
    }

    #[test]
    fn test_second_finger_joins_sequence() {
        let mut r = recognizer(Sensitivity::Normal);
        let t0 = Instant::now();
        r.handle(&PointerEvent::new(PointerPhase::Down, 200.0, 200.0, t0, 1));
        r.handle(&PointerEvent::new(PointerPhase::Down, 210.0, 200.0, t0 + Duration::from_millis(20), 2));
        let up = PointerEvent::new(PointerPhase::Up, 100.0, 205.0, t0 + Duration::from_millis(200), 1);
        assert_eq!(
            r.handle(&up),
            Some(Gesture {
                fingers: 2,
                kind: GestureKind::SwipeLeft
            })
        );
        // The trailing finger lift is not a new gesture
        let trailing = PointerEvent::new(PointerPhase::Up, 100.0, 205.0, t0 + Duration::from_millis(210), 0);
        assert_eq!(r.handle(&trailing), None);
    }

    #[test]
    fn test_cancel_discards_sequence() {
        let mut r = recognizer(Sensitivity::Normal);
        let t0 = Instant::now();
        r.handle(&PointerEvent::new(PointerPhase::Down, 200.0, 200.0, t0, 2));
        r.handle(&PointerEvent::new(PointerPhase::Cancel, 0.0, 0.0, t0, 0));
        let up = PointerEvent::new(PointerPhase::Up, 50.0, 200.0, t0 + Duration::from_millis(100), 2);
        assert_eq!(r.handle(&up), None);
    }

    #[test]
    fn test_resolve_skips_unassigned() {
        let mut r = GestureRecognizer::new(
            Sensitivity::Normal,
            GestureActionMap::unassigned(),
            Box::new(|_| false),
        );
        let t0 = Instant::now();
        r.handle(&PointerEvent::new(PointerPhase::Down, 200.0, 200.0, t0, 2));
        let up = PointerEvent::new(PointerPhase::Up, 100.0, 200.0, t0 + Duration::from_millis(100), 2);
        assert_eq!(r.resolve(&up), None);
    }
}
