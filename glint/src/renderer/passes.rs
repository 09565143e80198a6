mod initial_candidates;
mod light_presampling;
mod shading;
mod spatial_reuse;
mod temporal_reuse;

use glam::UVec2;

pub use self::initial_candidates::*;
pub use self::light_presampling::*;
pub use self::shading::*;
pub use self::spatial_reuse::*;
pub use self::temporal_reuse::*;
use crate::gpu::{self, DiReservoir, Neighbor, Surface, SurfaceMap};
use crate::Settings;

/// Everything a pass reads besides its reservoir buffers.
pub struct FrameContext<'a, W> {
    pub world: &'a W,
    pub settings: &'a Settings,
    pub reuse: gpu::ReuseSettings,
    pub surfaces: SurfaceMap<'a>,
    pub prev_surfaces: SurfaceMap<'a>,
}

impl<W> FrameContext<'_, W> {
    /// Returns the previous frame's reservoir of given pixel, unless the
    /// pixel saw a different surface back then.
    pub fn temporal_neighbor(
        &self,
        pixel: UVec2,
        here: &Surface,
        reservoirs: &[DiReservoir],
    ) -> Option<Neighbor> {
        let surface = self.prev_surfaces.get(pixel)?;

        if !here.is_similar_to(
            surface,
            self.reuse.normal_threshold,
            self.reuse.depth_threshold,
        ) {
            return None;
        }

        let reservoir = *reservoirs.get(self.prev_surfaces.index(pixel))?;

        Some(Neighbor {
            reservoir,
            surface: *surface,
        })
    }
}
