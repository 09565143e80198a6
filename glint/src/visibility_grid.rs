use std::sync::atomic::{AtomicU32, Ordering};

use derivative::Derivative;
use glam::{UVec3, Vec3};
use log::{debug, warn};

use crate::gpu::VisibilityCache;
use crate::BoundingBox;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityGridSettings {
    /// Number of cells along each axis of the scene's bounding box.
    pub resolution: u32,

    /// Number of traced rays after which a pair of cells stops being
    /// updated.
    pub stop_update_samples: u32,
}

impl VisibilityGridSettings {
    pub const MAX_RESOLUTION: u32 = 16;

    pub fn validated(mut self) -> Self {
        if self.resolution == 0 || self.resolution > Self::MAX_RESOLUTION {
            warn!(
                "visibility grid resolution out of range ({}), clamping",
                self.resolution
            );

            self.resolution = self.resolution.clamp(1, Self::MAX_RESOLUTION);
        }

        if self.stop_update_samples == 0 {
            warn!("visibility grid must take at least one sample per pair");

            self.stop_update_samples = 1;
        }

        self
    }
}

impl Default for VisibilityGridSettings {
    fn default() -> Self {
        Self {
            resolution: 8,
            stop_update_samples: 64,
        }
    }
}

/// Estimate of the probability that points from two regions of the scene
/// see each other.
///
/// The scene's bounding box is split into a regular grid of cells; each
/// unordered pair of cells has a counter of traced and of unoccluded shadow
/// rays, stored in a half matrix (visibility is symmetric).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct VisibilityGrid {
    settings: VisibilityGridSettings,
    bounds: BoundingBox,

    #[derivative(Debug = "ignore")]
    visible: Vec<AtomicU32>,

    #[derivative(Debug = "ignore")]
    total: Vec<AtomicU32>,
}

impl VisibilityGrid {
    /// Probabilities never drop below this, so that a pair that happened to
    /// be occluded during the first samples still gets traced from time to
    /// time.
    pub const MIN_PROBABILITY: f32 = 0.01;

    pub fn new(settings: VisibilityGridSettings, bounds: BoundingBox) -> Self {
        let settings = settings.validated();
        let cells = settings.resolution.pow(3) as usize;
        let pairs = cells * (cells + 1) / 2;

        debug!(
            "Allocating visibility grid ({} cell(s), {pairs} pair(s))",
            cells
        );

        Self {
            settings,
            bounds,
            visible: (0..pairs).map(|_| AtomicU32::new(0)).collect(),
            total: (0..pairs).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Returns the cell containing given point; points outside of the grid
    /// get clamped into it.
    pub fn cell(&self, point: Vec3) -> Option<u32> {
        if !self.bounds.is_set() || !point.is_finite() {
            return None;
        }

        let res = self.settings.resolution;

        let pos = (self.bounds.map(point) * res as f32)
            .as_uvec3()
            .min(UVec3::splat(res - 1));

        Some(pos.x + pos.y * res + pos.z * res * res)
    }

    /// Forgets everything learned so far, e.g. after the scene has changed.
    pub fn clear(&self) {
        for counter in self.visible.iter().chain(&self.total) {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Returns the number of unoccluded and of all rays traced between the
    /// cells of given points.
    pub fn counters(&self, a: Vec3, b: Vec3) -> Option<(u32, u32)> {
        let pair = self.pair(a, b)?;

        Some((
            self.visible[pair].load(Ordering::Relaxed),
            self.total[pair].load(Ordering::Relaxed),
        ))
    }

    fn pair(&self, a: Vec3, b: Vec3) -> Option<usize> {
        let a = self.cell(a)? as usize;
        let b = self.cell(b)? as usize;
        let (i, j) = if a >= b { (a, b) } else { (b, a) };

        Some(i * (i + 1) / 2 + j)
    }
}

impl VisibilityCache for VisibilityGrid {
    fn unoccluded_probability(&self, a: Vec3, b: Vec3) -> f32 {
        let Some((visible, total)) = self.counters(a, b) else {
            return 1.0;
        };

        if total == 0 {
            return 1.0;
        }

        (visible as f32 / total as f32).clamp(Self::MIN_PROBABILITY, 1.0)
    }

    fn update(&self, a: Vec3, b: Vec3, visible: bool) {
        let Some(pair) = self.pair(a, b) else {
            return;
        };

        let stop = self.settings.stop_update_samples;

        // Reserves a sample slot; fails once the pair has seen enough rays
        let reserved = self.total[pair].fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |total| (total < stop).then_some(total + 1),
        );

        if reserved.is_ok() && visible {
            self.visible[pair].fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;
    use rayon::prelude::*;

    use super::*;

    fn target(stop_update_samples: u32) -> VisibilityGrid {
        VisibilityGrid::new(
            VisibilityGridSettings {
                resolution: 4,
                stop_update_samples,
            },
            BoundingBox::new(Vec3::ZERO, Vec3::splat(4.0)),
        )
    }

    #[test]
    fn cells() {
        let target = target(8);

        assert_eq!(Some(0), target.cell(vec3(0.5, 0.5, 0.5)));
        assert_eq!(Some(1 + 2 * 4 + 3 * 16), target.cell(vec3(1.5, 2.5, 3.5)));
        assert_eq!(Some(63), target.cell(vec3(4.0, 4.0, 4.0)));
        assert_eq!(Some(63), target.cell(vec3(9.0, 9.0, 9.0)));
        assert_eq!(None, target.cell(vec3(f32::NAN, 0.0, 0.0)));
    }

    #[test]
    fn unknown_pairs_are_visible() {
        let target = target(8);

        assert_eq!(
            1.0,
            target.unoccluded_probability(Vec3::ZERO, Vec3::splat(3.0))
        );

        let unset = VisibilityGrid::new(
            VisibilityGridSettings::default(),
            BoundingBox::default(),
        );

        unset.update(Vec3::ZERO, Vec3::ONE, false);

        assert_eq!(1.0, unset.unoccluded_probability(Vec3::ZERO, Vec3::ONE));
    }

    #[test]
    fn learning() {
        let target = target(8);
        let a = vec3(0.5, 0.5, 0.5);
        let b = vec3(3.5, 0.5, 0.5);

        target.update(a, b, true);
        target.update(b, a, false);
        target.update(a, b, false);
        target.update(a, b, false);

        assert_relative_eq!(0.25, target.unoccluded_probability(a, b));
        assert_relative_eq!(0.25, target.unoccluded_probability(b, a));

        // Other pairs remain unaffected
        assert_eq!(1.0, target.unoccluded_probability(a, a));
    }

    #[test]
    fn minimum_probability() {
        let target = target(8);
        let a = vec3(0.5, 0.5, 0.5);
        let b = vec3(0.5, 3.5, 0.5);

        for _ in 0..8 {
            target.update(a, b, false);
        }

        assert_eq!(
            VisibilityGrid::MIN_PROBABILITY,
            target.unoccluded_probability(a, b)
        );
    }

    #[test]
    fn updates_stop() {
        let target = target(4);
        let a = vec3(0.5, 0.5, 0.5);
        let b = vec3(0.5, 0.5, 3.5);

        for _ in 0..10 {
            target.update(a, b, true);
        }

        assert_eq!(Some((4, 4)), target.counters(a, b));

        target.clear();

        assert_eq!(Some((0, 0)), target.counters(a, b));
    }

    #[test]
    fn concurrent_updates() {
        let target = target(u32::MAX);
        let a = vec3(0.5, 0.5, 0.5);
        let b = vec3(1.5, 0.5, 0.5);

        (0..1000).into_par_iter().for_each(|i| {
            target.update(a, b, i % 2 == 0);
        });

        assert_eq!(Some((500, 1000)), target.counters(a, b));
    }

    #[test]
    fn concurrent_updates_stop() {
        let target = target(100);
        let a = vec3(0.5, 0.5, 0.5);
        let b = vec3(2.5, 3.5, 0.5);

        (0..10_000).into_par_iter().for_each(|_| {
            target.update(a, b, true);
        });

        assert_eq!(Some((100, 100)), target.counters(a, b));
    }
}
