//! Playlist Drawer - a resizable playlist panel for media players.
//!
//! The drawer slides up from the control bar over the video. It rests at
//! snap points derived from the host layout, follows drags and clicks on its
//! handle, turns touch gestures on the media surface into playback actions,
//! and keeps its rows in sync with a changing, filtered item list.
//!
//! The host keeps its view tree. The engine reads layout through
//! [`GeometryProvider`], reports user intent through [`ActionDispatch`] and
//! mutates only the rows behind [`RowSink`]. Start at [`PlaylistDrawer`].

pub mod config;
pub mod drawer;
pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
pub mod gesture;
pub mod playlist;
#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use drawer::{DrawerController, DrawerEvent, DrawerFrame, DrawerMode};
pub use engine::{Clock, PlaylistDrawer, SystemClock};
pub use error::{Error, Result};
pub use events::SubscriptionId;
pub use geometry::{DrawerState, ElementRef, GeometryProvider, Rect, SnapPointSet};
pub use gesture::{Action, ActionDispatch, ControlButton, PointerEvent, PointerPhase, Sensitivity};
pub use playlist::{ItemId, PlaylistItem, ReconcileReport, RowSink, ScrollAxis, ScrollRequest, VisibilitySettings};
