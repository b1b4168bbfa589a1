//! Click / double-click / hold composition for discrete control buttons.
//!
//! A press either becomes a click (released before the hold delay) or a
//! hold (the hold action fired). A hold swallows the click of the same
//! press. With a double-click action bound, a single click waits out the
//! double-click window before firing so the two can be told apart.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::time::{Duration, Instant};

use super::Action;

/// Control-bar buttons the compositor can wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlButton {
    Previous,
    Next,
    Playlist,
    VoiceSearch,
}

impl ControlButton {
    pub const ALL: [ControlButton; 4] = [
        ControlButton::Previous,
        ControlButton::Next,
        ControlButton::Playlist,
        ControlButton::VoiceSearch,
    ];
}

impl fmt::Display for ControlButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControlButton::Previous => "previous",
            ControlButton::Next => "next",
            ControlButton::Playlist => "playlist",
            ControlButton::VoiceSearch => "voice-search",
        })
    }
}

/// Actions bound to one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonBinding {
    pub click: Action,
    pub double_click: Action,
    pub hold: Action,
    /// Keep firing `hold` while the button stays pressed
    pub repeat_hold: bool,
}

impl ButtonBinding {
    pub fn click(action: Action) -> Self {
        Self {
            click: action,
            ..Self::default()
        }
    }
}

/// Timing shared by all buttons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonTiming {
    /// Window in which a second click counts as a double click
    pub double_click: Duration,
    /// Press duration after which the hold action fires
    pub hold: Duration,
    /// Interval between repeated hold actions
    pub repeat: Duration,
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self {
            double_click: Duration::from_millis(250),
            hold: Duration::from_millis(500),
            repeat: Duration::from_millis(100),
        }
    }
}

/// Actions fired by a single compositor call (rarely more than one).
pub type Fired = SmallVec<[Action; 2]>;

/// Composes raw press/release events of one button into actions.
#[derive(Debug, Clone)]
pub struct ButtonCompositor {
    binding: ButtonBinding,
    timing: ButtonTiming,
    pressed_at: Option<Instant>,
    hold_fired: bool,
    next_repeat: Option<Instant>,
    pending_click: Option<Instant>,
}

impl ButtonCompositor {
    pub fn new(binding: ButtonBinding, timing: ButtonTiming) -> Self {
        Self {
            binding,
            timing,
            pressed_at: None,
            hold_fired: false,
            next_repeat: None,
            pending_click: None,
        }
    }

    pub fn binding(&self) -> &ButtonBinding {
        &self.binding
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    /// Whether `poll` still has something to do.
    pub fn has_pending(&self) -> bool {
        self.pressed_at.is_some() || self.pending_click.is_some()
    }

    pub fn press(&mut self, now: Instant) {
        self.pressed_at = Some(now);
        self.hold_fired = false;
        self.next_repeat = None;
    }

    pub fn release(&mut self, now: Instant) -> Fired {
        let mut fired = Fired::new();
        let Some(pressed_at) = self.pressed_at.take() else {
            return fired;
        };
        // A release can race the frame that would have fired the hold
        if !self.hold_fired && self.hold_due(pressed_at, now) {
            self.fire_hold(now, &mut fired);
        }
        self.next_repeat = None;
        if std::mem::take(&mut self.hold_fired) {
            tracing::trace!(target: "gesture::buttons", "Click suppressed after hold");
            return fired;
        }

        if self.binding.double_click.is_none() {
            push(&mut fired, self.binding.click);
        } else if let Some(deadline) = self.pending_click.take() {
            if now < deadline {
                push(&mut fired, self.binding.double_click);
            } else {
                // No poll ran since the window closed: the first click stands alone
                push(&mut fired, self.binding.click);
                self.pending_click = Some(now + self.timing.double_click);
            }
        } else {
            self.pending_click = Some(now + self.timing.double_click);
        }
        fired
    }

    /// Pointer left the button or the press was cancelled.
    pub fn cancel(&mut self) {
        self.pressed_at = None;
        self.hold_fired = false;
        self.next_repeat = None;
        self.pending_click = None;
    }

    /// Fire holds, repeats and delayed single clicks that are due.
    pub fn poll(&mut self, now: Instant) -> Fired {
        let mut fired = Fired::new();
        if let Some(deadline) = self.pending_click
            && now >= deadline
        {
            self.pending_click = None;
            push(&mut fired, self.binding.click);
        }

        let Some(pressed_at) = self.pressed_at else {
            return fired;
        };
        if !self.hold_fired {
            if self.hold_due(pressed_at, now) {
                self.fire_hold(now, &mut fired);
            }
        } else if let Some(mut next) = self.next_repeat {
            while now >= next {
                push(&mut fired, self.binding.hold);
                next += self.timing.repeat;
            }
            self.next_repeat = Some(next);
        }
        fired
    }

    fn hold_due(&self, pressed_at: Instant, now: Instant) -> bool {
        !self.binding.hold.is_none() && now.duration_since(pressed_at) >= self.timing.hold
    }

    fn fire_hold(&mut self, now: Instant, fired: &mut Fired) {
        self.hold_fired = true;
        self.pending_click = None;
        push(fired, self.binding.hold);
        if self.binding.repeat_hold && !self.timing.repeat.is_zero() {
            self.next_repeat = Some(now + self.timing.repeat);
        }
    }
}

fn push(fired: &mut Fired, action: Action) {
    if !action.is_none() {
        fired.push(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn seek_button() -> ButtonCompositor {
        ButtonCompositor::new(
            ButtonBinding {
                click: Action::Skip,
                double_click: Action::None,
                hold: Action::SeekForward,
                repeat_hold: true,
            },
            ButtonTiming::default(),
        )
    }

    #[test]
    fn test_click_fires_immediately_without_double_binding() {
        let mut b = seek_button();
        let t0 = Instant::now();
        b.press(t0);
        assert_eq!(b.release(t0 + ms(80)).as_slice(), &[Action::Skip]);
    }

    #[test]
    fn test_hold_repeats_and_suppresses_click() {
        let mut b = seek_button();
        let t0 = Instant::now();
        b.press(t0);
        assert!(b.poll(t0 + ms(400)).is_empty());
        assert_eq!(b.poll(t0 + ms(500)).as_slice(), &[Action::SeekForward]);
        assert_eq!(b.poll(t0 + ms(600)).as_slice(), &[Action::SeekForward]);
        // A late frame catches up on every missed repeat
        assert_eq!(b.poll(t0 + ms(800)).len(), 2);
        assert!(b.release(t0 + ms(820)).is_empty());
        assert!(b.poll(t0 + ms(2000)).is_empty());
    }

    #[test]
    fn test_double_click() {
        let mut b = ButtonCompositor::new(
            ButtonBinding {
                click: Action::PlayPause,
                double_click: Action::Skip,
                ..ButtonBinding::default()
            },
            ButtonTiming::default(),
        );
        let t0 = Instant::now();
        b.press(t0);
        assert!(b.release(t0 + ms(50)).is_empty());
        b.press(t0 + ms(120));
        assert_eq!(b.release(t0 + ms(170)).as_slice(), &[Action::Skip]);
        assert!(b.poll(t0 + ms(1000)).is_empty());
    }

    #[test]
    fn test_single_click_waits_for_double_window() {
        let mut b = ButtonCompositor::new(
            ButtonBinding {
                click: Action::PlayPause,
                double_click: Action::Skip,
                ..ButtonBinding::default()
            },
            ButtonTiming::default(),
        );
        let t0 = Instant::now();
        b.press(t0);
        assert!(b.release(t0 + ms(50)).is_empty());
        assert!(b.poll(t0 + ms(200)).is_empty());
        assert_eq!(b.poll(t0 + ms(300)).as_slice(), &[Action::PlayPause]);
    }

    #[test]
    fn test_hold_without_repeat_fires_once() {
        let mut b = ButtonCompositor::new(
            ButtonBinding {
                click: Action::TogglePlaylist,
                hold: Action::ToggleVoiceSearch,
                ..ButtonBinding::default()
            },
            ButtonTiming::default(),
        );
        let t0 = Instant::now();
        b.press(t0);
        assert_eq!(b.poll(t0 + ms(510)).as_slice(), &[Action::ToggleVoiceSearch]);
        assert!(b.poll(t0 + ms(900)).is_empty());
        assert!(b.release(t0 + ms(950)).is_empty());
    }

    #[test]
    fn test_release_after_hold_delay_without_poll() {
        let mut b = seek_button();
        let t0 = Instant::now();
        b.press(t0);
        assert_eq!(b.release(t0 + ms(700)).as_slice(), &[Action::SeekForward]);
    }

    #[test]
    fn test_cancel_drops_everything() {
        let mut b = seek_button();
        let t0 = Instant::now();
        b.press(t0);
        b.cancel();
        assert!(b.poll(t0 + ms(600)).is_empty());
        assert!(b.release(t0 + ms(650)).is_empty());
        assert!(!b.has_pending());
    }

    #[test]
    fn test_late_second_click_is_not_a_double_click() {
        let mut b = ButtonCompositor::new(
            ButtonBinding {
                click: Action::PlayPause,
                double_click: Action::Skip,
                ..ButtonBinding::default()
            },
            ButtonTiming::default(),
        );
        let t0 = Instant::now();
        b.press(t0);
        assert!(b.release(t0 + ms(50)).is_empty());
        // No poll ran while the window was open
        b.press(t0 + ms(1000));
        assert_eq!(b.release(t0 + ms(1050)).as_slice(), &[Action::PlayPause]);
        assert!(b.poll(t0 + ms(1200)).is_empty());
        assert_eq!(b.poll(t0 + ms(1300)).as_slice(), &[Action::PlayPause]);
    }
}
