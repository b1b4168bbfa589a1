//! Touch gesture classification and control-button composition.
//!
//! Two independent input paths:
//!
//! - [`GestureRecognizer`] turns raw pointer sequences on the media surface
//!   into [`Gesture`]s, which a [`GestureActionMap`] resolves to an
//!   [`Action`].
//! - [`ButtonCompositor`] wraps a discrete control button and composes
//!   click / double click / press-and-hold into actions.
//!
//! Every resolved action reaches the host through [`ActionDispatch`].

mod actions;
mod buttons;
mod recognizer;

pub use actions::{Action, ActionDispatch, GestureActionMap, dispatch};
pub use buttons::{ButtonBinding, ButtonCompositor, ButtonTiming, ControlButton};
pub use recognizer::{GestureRecognizer, InteractivePredicate};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::error::Error;

/// One knob scaling every gesture threshold together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sensitivity {
    Low,
    #[default]
    Normal,
    High,
}

impl Sensitivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Normal => "normal",
            Sensitivity::High => "high",
        }
    }

    /// (distance, time, vertical ratio) multipliers.
    fn multipliers(self) -> (f64, f64, f64) {
        match self {
            Sensitivity::Low => (1.5, 0.75, 0.75),
            Sensitivity::Normal => (1.0, 1.0, 1.0),
            Sensitivity::High => (0.6, 1.5, 1.3),
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sensitivity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Sensitivity::Low),
            "normal" | "medium" => Ok(Sensitivity::Normal),
            "high" => Ok(Sensitivity::High),
            other => Err(Error::config(format!("unknown sensitivity '{other}'"))),
        }
    }
}

impl From<String> for Sensitivity {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|e: Error| {
            tracing::warn!(target: "config", "{}, using 'normal'", e);
            Sensitivity::Normal
        })
    }
}

impl From<Sensitivity> for String {
    fn from(s: Sensitivity) -> Self {
        s.as_str().to_string()
    }
}

/// Classification thresholds, always derived from a [`Sensitivity`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureThresholds {
    /// Minimum travel along the swipe axis
    pub distance: f64,
    /// Longest press still counted as a swipe or tap
    pub max_duration: Duration,
    /// Allowed off-axis travel as a fraction of on-axis travel
    pub vertical_ratio: f64,
    /// Maximum travel for a tap
    pub tap_distance: f64,
}

impl GestureThresholds {
    const BASE_DISTANCE: f64 = 60.0;
    const BASE_DURATION: Duration = Duration::from_millis(500);
    const BASE_VERTICAL_RATIO: f64 = 0.7;
    const BASE_TAP_DISTANCE: f64 = 15.0;

    pub fn for_sensitivity(sensitivity: Sensitivity) -> Self {
        let (distance, time, ratio) = sensitivity.multipliers();
        Self {
            distance: Self::BASE_DISTANCE * distance,
            max_duration: Self::BASE_DURATION.mul_f64(time),
            vertical_ratio: Self::BASE_VERTICAL_RATIO * ratio,
            tap_distance: Self::BASE_TAP_DISTANCE * distance,
        }
    }
}

/// Phase of a raw pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A raw pointer/touch sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub x: f64,
    pub y: f64,
    pub time: Instant,
    /// Fingers touching the surface when the event fired
    pub fingers: u8,
    /// Host identifier of the element under the pointer
    pub target: String,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, x: f64, y: f64, time: Instant, fingers: u8) -> Self {
        Self {
            phase,
            x,
            y,
            time,
            fingers,
            target: String::new(),
        }
    }

    pub fn on(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

/// Shape of a recognized gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    SwipeLeft,
    SwipeRight,
    SwipeUp,
    SwipeDown,
    Tap,
}

/// A classified pointer sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gesture {
    pub fingers: u8,
    pub kind: GestureKind,
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fingers = match self.fingers {
            1 => "one-finger",
            2 => "two-finger",
            3 => "three-finger",
            _ => "multi-finger",
        };
        let kind = match self.kind {
            GestureKind::SwipeLeft => "swipe-left",
            GestureKind::SwipeRight => "swipe-right",
            GestureKind::SwipeUp => "swipe-up",
            GestureKind::SwipeDown => "swipe-down",
            GestureKind::Tap => "tap",
        };
        write!(f, "{fingers}-{kind}")
    }
}
