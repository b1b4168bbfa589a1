//! Semantic actions, the gesture binding table and the dispatch seam.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Gesture, GestureKind};
use crate::error::Error;
use crate::playlist::ItemId;

/// Everything a gesture or control button can ask the host to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    /// Explicitly unassigned: no dispatch, no feedback
    #[default]
    None,
    SeekForward,
    SeekBackward,
    Previous,
    Skip,
    PlayPause,
    TogglePlaylist,
    ToggleVoiceSearch,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::None,
        Action::SeekForward,
        Action::SeekBackward,
        Action::Previous,
        Action::Skip,
        Action::PlayPause,
        Action::TogglePlaylist,
        Action::ToggleVoiceSearch,
    ];

    pub fn is_none(self) -> bool {
        self == Action::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::None => "none",
            Action::SeekForward => "seek-forward",
            Action::SeekBackward => "seek-backward",
            Action::Previous => "previous",
            Action::Skip => "skip",
            Action::PlayPause => "play-pause",
            Action::TogglePlaylist => "toggle-playlist",
            Action::ToggleVoiceSearch => "toggle-voice-search",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("unassigned") {
            return Ok(Action::None);
        }
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::config(format!("unknown action '{s}'")))
    }
}

/// Unknown ids load as [`Action::None`].
impl From<String> for Action {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|e: Error| {
            tracing::warn!(target: "config", "{}, treating as 'none'", e);
            Action::None
        })
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

/// Host callbacks, one per action kind. Fire-and-forget.
pub trait ActionDispatch {
    /// Seek relative to the current position.
    fn seek(&mut self, offset_secs: f64);
    fn previous(&mut self);
    fn skip(&mut self);
    fn play_pause(&mut self);
    fn toggle_playlist(&mut self);
    fn toggle_voice_search(&mut self);
    /// The user picked a playlist row.
    fn select_item(&mut self, id: &ItemId);
    /// The user opened or closed the drawer.
    fn drawer_toggled(&mut self, is_open: bool, height: f64);

    /// Optional visual feedback after a gesture resolved to an action.
    fn gesture_feedback(&mut self, _gesture: Gesture, _action: Action) {}
}

/// Route an action to its dispatch method.
///
/// Returns false for [`Action::None`], which dispatches nothing.
pub fn dispatch<D: ActionDispatch + ?Sized>(action: Action, seek_step_secs: f64, sink: &mut D) -> bool {
    match action {
        Action::None => return false,
        Action::SeekForward => sink.seek(seek_step_secs),
        Action::SeekBackward => sink.seek(-seek_step_secs),
        Action::Previous => sink.previous(),
        Action::Skip => sink.skip(),
        Action::PlayPause => sink.play_pause(),
        Action::TogglePlaylist => sink.toggle_playlist(),
        Action::ToggleVoiceSearch => sink.toggle_voice_search(),
    }
    true
}

/// Which action each recognizable gesture triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureActionMap {
    pub one_finger_swipe_left: Action,
    pub one_finger_swipe_right: Action,
    pub two_finger_swipe_left: Action,
    pub two_finger_swipe_right: Action,
    pub two_finger_swipe_up: Action,
    pub two_finger_swipe_down: Action,
    pub two_finger_tap: Action,
}

impl Default for GestureActionMap {
    fn default() -> Self {
        Self {
            one_finger_swipe_left: Action::Skip,
            one_finger_swipe_right: Action::Previous,
            two_finger_swipe_left: Action::SeekForward,
            two_finger_swipe_right: Action::SeekBackward,
            two_finger_swipe_up: Action::TogglePlaylist,
            two_finger_swipe_down: Action::ToggleVoiceSearch,
            two_finger_tap: Action::PlayPause,
        }
    }
}

impl GestureActionMap {
    /// A map with every gesture unassigned.
    pub fn unassigned() -> Self {
        Self {
            one_finger_swipe_left: Action::None,
            one_finger_swipe_right: Action::None,
            two_finger_swipe_left: Action::None,
            two_finger_swipe_right: Action::None,
            two_finger_swipe_up: Action::None,
            two_finger_swipe_down: Action::None,
            two_finger_tap: Action::None,
        }
    }

    /// Action bound to a gesture; unsupported combinations are `None`.
    pub fn lookup(&self, gesture: Gesture) -> Action {
        match (gesture.fingers, gesture.kind) {
            (1, GestureKind::SwipeLeft) => self.one_finger_swipe_left,
            (1, GestureKind::SwipeRight) => self.one_finger_swipe_right,
            (2, GestureKind::SwipeLeft) => self.two_finger_swipe_left,
            (2, GestureKind::SwipeRight) => self.two_finger_swipe_right,
            (2, GestureKind::SwipeUp) => self.two_finger_swipe_up,
            (2, GestureKind::SwipeDown) => self.two_finger_swipe_down,
            (2, GestureKind::Tap) => self.two_finger_tap,
            _ => Action::None,
        }
    }
}
