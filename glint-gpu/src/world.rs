use glam::Vec3;

use crate::{Emitters, Envmap, Materials, Tracer};

/// Everything the per-pixel algorithms need to know about the scene.
pub trait World: Emitters + Materials + Tracer + Sync {
    fn envmap(&self) -> Option<&dyn Envmap> {
        None
    }

    /// Returns the axis-aligned bounds of the scene, as `(min, max)`; used to
    /// lay out the visibility cache.
    fn bounds(&self) -> Option<(Vec3, Vec3)> {
        None
    }
}
