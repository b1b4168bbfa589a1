//! Host geometry, cached drawer measurements and snap points.
//!
//! The host owns layout. This module only *reads* it through
//! [`GeometryProvider`], derives the drawer extents once per invalidation
//! ([`MeasurementCache`]) and turns them into resting heights
//! ([`SnapPointPlanner`]).
//!
//! ```text
//!  GeometryProvider ──► MeasurementCache ──► MeasurementSnapshot ──► SnapPointPlanner
//!   (host layout)        (owns snapshot)       (read-only copies)      (SnapPointSet)
//! ```

mod measurement;
mod snap;

pub use measurement::{MeasurementCache, MeasurementSnapshot};
pub use snap::{DEFAULT_MIN_SNAP_DIFFERENCE, DrawerState, SnapPointPlanner, SnapPointSet};

use serde::{Deserialize, Serialize};

use crate::playlist::ItemId;

/// Axis-aligned bounding box in host geometry units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Whether `other` lies entirely inside this rect.
    pub fn contains(&self, other: &Rect) -> bool {
        other.top >= self.top
            && other.bottom() <= self.bottom()
            && other.left >= self.left
            && other.right() <= self.right()
    }
}

/// Elements the engine may ask the host to measure.
///
/// Everything except [`ElementRef::Row`] is host chrome the engine never
/// mutates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementRef {
    /// The player container the drawer lives in
    Container,
    /// The video viewport the drawer is layered above
    VideoArea,
    /// The fixed control bar
    Controls,
    /// The button group inside the control bar
    ButtonGroup,
    /// Scrollable area holding the playlist rows
    ListViewport,
    /// A rendered playlist row
    Row(ItemId),
}

/// Read-only access to host layout.
///
/// Implement this trait to connect the engine to a real view tree, or
/// substitute a fake in tests.
pub trait GeometryProvider {
    /// Bounding box of an element, `None` if it is not laid out.
    fn bounding_box(&self, element: &ElementRef) -> Option<Rect>;

    /// Height of the host viewport (window), used for compact mode.
    fn viewport_height(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.bottom(), 60.0);
        assert_eq!(r.right(), 120.0);
    }

    #[test]
    fn test_rect_contains() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains(&Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&Rect::new(90.0, 10.0, 20.0, 20.0)));
        assert!(!outer.contains(&Rect::new(-1.0, 0.0, 10.0, 10.0)));
    }
}
