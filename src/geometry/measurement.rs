//! Cached drawer measurements.

use super::{ElementRef, GeometryProvider, Rect};
use crate::error::{Error, Result};

/// Drawer extents derived from host geometry.
///
/// Consumers get copies; only [`MeasurementCache`] produces them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeasurementSnapshot {
    /// Height of the fixed control bar
    pub controls_height: f64,
    /// Largest drawer height (container minus controls)
    pub max_drawer_height: f64,
    /// Drawer height that exactly fills the space below the video
    pub mid_drawer_height: f64,
    /// Width of the control bar's button group
    pub button_group_width: f64,
    /// False while dependencies are still zero-sized
    pub valid: bool,
}

impl MeasurementSnapshot {
    /// Snapshot used before anything has been measured.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Derive a snapshot from raw rects.
    ///
    /// A missing or zero-height container or control bar yields an invalid
    /// snapshot with every extent zeroed, so nothing downstream can mistake
    /// an unlaid-out tree for real geometry.
    pub fn derive(
        container: Option<Rect>,
        video: Option<Rect>,
        controls: Option<Rect>,
        button_group: Option<Rect>,
    ) -> Self {
        let (Some(container), Some(controls)) = (container, controls) else {
            return Self::invalid();
        };
        if container.height <= 0.0 || controls.height <= 0.0 {
            return Self {
                controls_height: controls.height.max(0.0),
                ..Self::invalid()
            };
        }

        let max_drawer_height = (container.height - controls.height).max(0.0);
        // Without a video area the "below video" extent is the whole drawer
        let mid_drawer_height = match video {
            Some(video) if video.height > 0.0 => {
                (container.bottom() - video.bottom() - controls.height).clamp(0.0, max_drawer_height)
            }
            _ => max_drawer_height,
        };

        Self {
            controls_height: controls.height,
            max_drawer_height,
            mid_drawer_height,
            button_group_width: button_group.map(|b| b.width.max(0.0)).unwrap_or(0.0),
            valid: true,
        }
    }
}

/// Owns the current [`MeasurementSnapshot`] and recomputes it on demand.
#[derive(Debug, Default)]
pub struct MeasurementCache {
    snapshot: MeasurementSnapshot,
    stale: bool,
}

impl MeasurementCache {
    /// Create an empty (stale) cache.
    pub fn new() -> Self {
        Self {
            snapshot: MeasurementSnapshot::invalid(),
            stale: true,
        }
    }

    /// Mark the cached snapshot stale. The next read re-measures.
    pub fn invalidate(&mut self) {
        tracing::trace!(target: "drawer::measure", "Measurements invalidated");
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Current snapshot, re-measuring through `geometry` if stale.
    ///
    /// An invalid result is never cached: the next call measures again.
    pub fn measurements<G: GeometryProvider + ?Sized>(&mut self, geometry: &G) -> MeasurementSnapshot {
        if self.stale {
            let snapshot = MeasurementSnapshot::derive(
                geometry.bounding_box(&ElementRef::Container),
                geometry.bounding_box(&ElementRef::VideoArea),
                geometry.bounding_box(&ElementRef::Controls),
                geometry.bounding_box(&ElementRef::ButtonGroup),
            );
            if snapshot.valid {
                tracing::debug!(
                    target: "drawer::measure",
                    "Measured drawer: max={:.1} mid={:.1} controls={:.1}",
                    snapshot.max_drawer_height,
                    snapshot.mid_drawer_height,
                    snapshot.controls_height
                );
                self.stale = false;
            } else {
                tracing::trace!(target: "drawer::measure", "Geometry not laid out yet");
            }
            self.snapshot = snapshot;
        }
        self.snapshot
    }

    /// Like [`measurements`](Self::measurements) but fails on an invalid
    /// snapshot so callers can schedule a retry.
    pub fn require_valid<G: GeometryProvider + ?Sized>(&mut self, geometry: &G) -> Result<MeasurementSnapshot> {
        let snapshot = self.measurements(geometry);
        if snapshot.valid {
            Ok(snapshot)
        } else {
            Err(Error::geometry("drawer dependencies are not laid out"))
        }
    }

    /// Last computed snapshot without re-measuring.
    pub fn last(&self) -> MeasurementSnapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeGeometry;

    #[test]
    fn test_derive_player_layout() {
        let snap = MeasurementSnapshot::derive(
            Some(Rect::new(0.0, 0.0, 400.0, 800.0)),
            Some(Rect::new(0.0, 0.0, 400.0, 225.0)),
            Some(Rect::new(700.0, 0.0, 400.0, 100.0)),
            Some(Rect::new(700.0, 50.0, 300.0, 40.0)),
        );
        assert!(snap.valid);
        assert_eq!(snap.controls_height, 100.0);
        assert_eq!(snap.max_drawer_height, 700.0);
        assert_eq!(snap.mid_drawer_height, 475.0);
        assert_eq!(snap.button_group_width, 300.0);
    }

    #[test]
    fn test_zero_controls_is_invalid() {
        let snap = MeasurementSnapshot::derive(
            Some(Rect::new(0.0, 0.0, 400.0, 800.0)),
            None,
            Some(Rect::new(0.0, 0.0, 400.0, 0.0)),
            None,
        );
        assert!(!snap.valid);
        assert_eq!(snap.max_drawer_height, 0.0);
    }

    #[test]
    fn test_missing_video_uses_full_extent() {
        let snap = MeasurementSnapshot::derive(
            Some(Rect::new(0.0, 0.0, 400.0, 600.0)),
            None,
            Some(Rect::new(500.0, 0.0, 400.0, 100.0)),
            None,
        );
        assert_eq!(snap.mid_drawer_height, snap.max_drawer_height);
    }

    #[test]
    fn test_cache_only_remeasures_when_stale() {
        let mut geometry = FakeGeometry::player(800.0, 225.0, 100.0);
        let mut cache = MeasurementCache::new();
        let first = cache.measurements(&geometry);
        assert!(first.valid);
        assert!(!cache.is_stale());

        // Layout changes are invisible until invalidated
        geometry.set_container_height(1000.0);
        assert_eq!(cache.measurements(&geometry), first);

        cache.invalidate();
        assert_eq!(cache.measurements(&geometry).max_drawer_height, 900.0);
    }

    #[test]
    fn test_invalid_snapshot_stays_stale() {
        let mut geometry = FakeGeometry::player(800.0, 225.0, 0.0);
        let mut cache = MeasurementCache::new();
        assert!(cache.require_valid(&geometry).is_err());
        assert!(cache.is_stale());

        geometry.set_controls_height(100.0);
        assert!(cache.require_valid(&geometry).is_ok());
    }
}
