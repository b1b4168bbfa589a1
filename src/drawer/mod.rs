//! The resizable drawer: modes, events and the height state machine.
//!
//! # States
//!
//! ```text
//!            click / end_drag (nearest)         start_drag
//!  Closed ─────────────► Mid ─────────────► Full ─────────► Dragging
//!    ▲                                        │                │
//!    └──────────────── click (wraps) ─────────┘    end_drag ───┘
//! ```
//!
//! Closed/Mid/Full are never stored; they are derived from the height and
//! the current [`SnapPointSet`](crate::geometry::SnapPointSet).

mod controller;

pub use controller::{DrawerController, DrawerTiming};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;
use crate::geometry::{DrawerState, SnapPointSet};

/// Configured drawer behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DrawerMode {
    /// Starts closed, user may open it
    #[default]
    Closed,
    /// Starts fully open
    Opened,
    /// Starts at the height that fills the space below the video
    BelowVideo,
    /// Locked fully open
    FixedFullyOpen,
    /// Locked below the video
    FixedBelowVideo,
    /// No drawer at all
    Disabled,
}

impl DrawerMode {
    pub const ALL: [DrawerMode; 6] = [
        DrawerMode::Closed,
        DrawerMode::Opened,
        DrawerMode::BelowVideo,
        DrawerMode::FixedFullyOpen,
        DrawerMode::FixedBelowVideo,
        DrawerMode::Disabled,
    ];

    /// Whether the user may drag or click the drawer.
    pub fn is_interactive(self) -> bool {
        !matches!(
            self,
            DrawerMode::FixedFullyOpen | DrawerMode::FixedBelowVideo | DrawerMode::Disabled
        )
    }

    /// Whether the drawer is locked at a fixed open height.
    pub fn is_fixed(self) -> bool {
        matches!(self, DrawerMode::FixedFullyOpen | DrawerMode::FixedBelowVideo)
    }

    /// Height the drawer rests at when this mode is applied.
    pub fn resting_height(self, snap: &SnapPointSet) -> f64 {
        match self {
            DrawerMode::Closed | DrawerMode::Disabled => 0.0,
            DrawerMode::Opened | DrawerMode::FixedFullyOpen => snap.full(),
            DrawerMode::BelowVideo | DrawerMode::FixedBelowVideo => {
                snap.mid().unwrap_or_else(|| snap.full())
            }
        }
    }

    /// Height `open_to_default` targets. A closed-by-default drawer opens fully.
    pub fn open_height(self, snap: &SnapPointSet) -> Option<f64> {
        match self {
            DrawerMode::Disabled => None,
            DrawerMode::Closed => Some(snap.full()),
            other => Some(other.resting_height(snap)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrawerMode::Closed => "closed",
            DrawerMode::Opened => "opened",
            DrawerMode::BelowVideo => "below-video",
            DrawerMode::FixedFullyOpen => "fixed-fully-open",
            DrawerMode::FixedBelowVideo => "fixed-below-video",
            DrawerMode::Disabled => "disabled",
        }
    }
}

impl fmt::Display for DrawerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawerMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrawerMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::config(format!("unknown drawer mode '{s}'")))
    }
}

/// Unknown values fall back to the default mode instead of failing the load.
impl From<String> for DrawerMode {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|e: Error| {
            tracing::warn!(target: "config", "{}, using '{}'", e, DrawerMode::default());
            DrawerMode::default()
        })
    }
}

impl From<DrawerMode> for String {
    fn from(mode: DrawerMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Notifications emitted by [`DrawerController`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawerEvent {
    /// The derived state changed (throttled while dragging)
    StateChanged { from: DrawerState, to: DrawerState },
    /// New height to render, with the transition to apply
    HeightChanged {
        height: f64,
        transition: Option<Duration>,
    },
    /// The user opened or closed the drawer by clicking or dragging
    UserToggled { is_open: bool, height: f64 },
}

/// What the renderer should currently apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawerFrame {
    pub height: f64,
    /// `None` = jump to `height` without animating
    pub transition: Option<Duration>,
}
