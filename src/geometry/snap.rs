//! Snap points and drawer state derivation.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use super::MeasurementSnapshot;

/// Minimum distance between two snap points for both to be kept.
pub const DEFAULT_MIN_SNAP_DIFFERENCE: f64 = 40.0;

/// Resting state of the drawer.
///
/// Never stored: always derived from a height via [`SnapPointSet::state_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawerState {
    Closed,
    Mid,
    Full,
}

impl fmt::Display for DrawerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DrawerState::Closed => "closed",
            DrawerState::Mid => "mid",
            DrawerState::Full => "full",
        })
    }
}

/// Ascending, deduplicated resting heights. Always starts with 0.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapPointSet {
    points: SmallVec<[f64; 3]>,
}

impl Default for SnapPointSet {
    fn default() -> Self {
        Self::closed_only()
    }
}

impl SnapPointSet {
    /// The degenerate set `[0]`: no playlist, nothing to open.
    pub fn closed_only() -> Self {
        let mut points = SmallVec::new();
        points.push(0.0);
        Self { points }
    }

    /// Build a set from arbitrary heights, keeping 0 and every point that is
    /// more than `min_difference` above the previously kept one.
    pub fn from_points(heights: impl IntoIterator<Item = f64>, min_difference: f64) -> Self {
        let mut sorted: Vec<f64> = heights
            .into_iter()
            .filter(|h| h.is_finite() && *h > 0.0)
            .collect();
        sorted.sort_by(f64::total_cmp);

        let mut set = Self::closed_only();
        for height in sorted {
            if height > set.full() + min_difference {
                set.points.push(height);
            }
        }
        set
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True for `[0]`: every drawer interaction is a no-op.
    pub fn is_closed_only(&self) -> bool {
        self.points.len() == 1
    }

    /// Largest resting height.
    pub fn full(&self) -> f64 {
        self.points.last().copied().unwrap_or(0.0)
    }

    /// The middle point, if the set has one.
    pub fn mid(&self) -> Option<f64> {
        (self.points.len() == 3).then(|| self.points[1])
    }

    /// Index of the point nearest to `height`.
    ///
    /// Equidistant points resolve to the *higher* one, so a drawer released
    /// exactly halfway always opens rather than closes.
    pub fn nearest_index(&self, height: f64) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, point) in self.points.iter().enumerate() {
            let distance = (point - height).abs();
            // `<=` while scanning ascending points makes the later (higher) point win ties
            if distance <= best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best
    }

    /// Point nearest to `height` (ties resolve upward).
    pub fn nearest(&self, height: f64) -> f64 {
        self.points[self.nearest_index(height)]
    }

    /// Point after the one nearest to `height`, wrapping to the first.
    pub fn next_after(&self, height: f64) -> f64 {
        let next = (self.nearest_index(height) + 1) % self.points.len();
        self.points[next]
    }

    /// State for a height: a pure function of `(height, self)`.
    pub fn state_for(&self, height: f64) -> DrawerState {
        let idx = self.nearest_index(height);
        if idx == 0 {
            DrawerState::Closed
        } else if idx == self.points.len() - 1 {
            DrawerState::Full
        } else {
            DrawerState::Mid
        }
    }
}

impl fmt::Display for SnapPointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.points.iter().map(|p| format!("{p:.1}")).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Derives the resting heights from a measurement snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SnapPointPlanner {
    min_difference: f64,
}

impl Default for SnapPointPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SNAP_DIFFERENCE)
    }
}

impl SnapPointPlanner {
    pub fn new(min_difference: f64) -> Self {
        Self {
            min_difference: min_difference.max(0.0),
        }
    }

    pub fn min_difference(&self) -> f64 {
        self.min_difference
    }

    /// Resting heights for a snapshot.
    ///
    /// Invalid snapshots and an absent playlist both produce `[0]`.
    pub fn plan(&self, snapshot: &MeasurementSnapshot, has_playlist: bool) -> SnapPointSet {
        let mut set = SnapPointSet::closed_only();
        if !snapshot.valid || !has_playlist {
            return set;
        }

        let full = snapshot.max_drawer_height;
        let mid = snapshot.mid_drawer_height;
        let threshold = self.min_difference;

        if mid > threshold && full - mid > threshold {
            set.points.push(mid);
        }
        if full > set.full() + threshold {
            set.points.push(full);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(max: f64, mid: f64) -> MeasurementSnapshot {
        MeasurementSnapshot {
            controls_height: 100.0,
            max_drawer_height: max,
            mid_drawer_height: mid,
            button_group_width: 0.0,
            valid: true,
        }
    }

    #[test]
    fn test_plan_full_set() {
        let set = SnapPointPlanner::default().plan(&snapshot(500.0, 300.0), true);
        assert_eq!(set.points(), &[0.0, 300.0, 500.0]);
        assert_eq!(set.mid(), Some(300.0));
    }

    #[test]
    fn test_plan_drops_mid_close_to_full() {
        let set = SnapPointPlanner::default().plan(&snapshot(500.0, 480.0), true);
        assert_eq!(set.points(), &[0.0, 500.0]);
        assert_eq!(set.mid(), None);
    }

    #[test]
    fn test_plan_drops_tiny_mid() {
        let set = SnapPointPlanner::default().plan(&snapshot(500.0, 30.0), true);
        assert_eq!(set.points(), &[0.0, 500.0]);
    }

    #[test]
    fn test_plan_drops_tiny_full() {
        let set = SnapPointPlanner::default().plan(&snapshot(35.0, 35.0), true);
        assert!(set.is_closed_only());
    }

    #[test]
    fn test_plan_invalid_or_no_playlist() {
        let planner = SnapPointPlanner::default();
        assert!(planner.plan(&MeasurementSnapshot::invalid(), true).is_closed_only());
        assert!(planner.plan(&snapshot(500.0, 300.0), false).is_closed_only());
    }

    #[test]
    fn test_state_for_heights() {
        let set = SnapPointSet::from_points([300.0, 500.0], 40.0);
        assert_eq!(set.state_for(0.0), DrawerState::Closed);
        assert_eq!(set.state_for(100.0), DrawerState::Closed);
        assert_eq!(set.state_for(260.0), DrawerState::Mid);
        assert_eq!(set.state_for(420.0), DrawerState::Full);
        assert_eq!(set.state_for(9000.0), DrawerState::Full);
    }

    #[test]
    fn test_tie_prefers_higher_point() {
        let set = SnapPointSet::from_points([300.0, 500.0], 40.0);
        assert_eq!(set.nearest(150.0), 300.0);
        assert_eq!(set.nearest(400.0), 500.0);
    }

    #[test]
    fn test_next_after_wraps() {
        let set = SnapPointSet::from_points([300.0, 500.0], 40.0);
        assert_eq!(set.next_after(0.0), 300.0);
        assert_eq!(set.next_after(300.0), 500.0);
        assert_eq!(set.next_after(500.0), 0.0);
    }

    #[test]
    fn test_closed_only_is_always_closed() {
        let set = SnapPointSet::closed_only();
        assert_eq!(set.state_for(250.0), DrawerState::Closed);
        assert_eq!(set.next_after(0.0), 0.0);
    }
}
