use log::trace;
use rayon::prelude::*;

use super::FrameContext;
use crate::gpu::{self, Neighbor, Noise, World, MAX_SPATIAL_NEIGHBORS};
use crate::BoundBuffers;

/// Merges each pixel's reservoir with reservoirs of random, similar-enough
/// pixels around it.
///
/// In the fused variant, both the pixel's own previous reservoir and the
/// neighbors are read from the previous frame, and the current reservoir
/// comes from the initial candidates.
pub fn run_spatial_reuse<W>(
    ctx: &FrameContext<'_, W>,
    buffers: BoundBuffers<'_>,
    params: &gpu::SpatialReusePassParams,
) where
    W: World,
{
    trace!(
        "Reusing spatially (frame {}, pass {}, fused: {})",
        params.frame,
        params.pass_index,
        params.is_fused()
    );

    let BoundBuffers {
        input,
        canonical,
        output,
    } = buffers;

    let fused = params.is_fused();

    let neighbor_surfaces = if fused {
        ctx.prev_surfaces
    } else {
        ctx.surfaces
    };

    output.par_iter_mut().enumerate().for_each(|(idx, out)| {
        let pixel = ctx.surfaces.pixel(idx);

        let Some(surface) = ctx.surfaces.get(pixel) else {
            *out = Default::default();
            return;
        };

        let mut noise = Noise::new(params.seed, pixel);
        let mut neighbors = [Neighbor::default(); MAX_SPATIAL_NEIGHBORS];

        let len = gpu::pick_spatial_neighbors(
            &ctx.reuse,
            pixel,
            surface,
            neighbor_surfaces,
            input,
            &mut noise,
            &mut neighbors,
        );

        let neighbors = &neighbors[..len];

        *out = if fused {
            let canonical = canonical.map_or(*out, |canonical| canonical[idx]);
            let temporal = ctx.temporal_neighbor(pixel, surface, input);

            gpu::reuse_spatiotemporal(
                ctx.world,
                &ctx.reuse,
                surface,
                &canonical,
                temporal,
                neighbors,
                &mut noise,
            )
        } else {
            gpu::reuse_spatial(
                ctx.world,
                &ctx.reuse,
                surface,
                &input[idx],
                neighbors,
                &mut noise,
            )
        };
    });
}
