use log::trace;
use rayon::prelude::*;

use super::FrameContext;
use crate::gpu::{self, Noise, World};
use crate::BoundBuffers;

/// Merges each pixel's initial candidates with its reservoir from the
/// previous frame.
pub fn run_temporal_reuse<W>(
    ctx: &FrameContext<'_, W>,
    buffers: BoundBuffers<'_>,
    params: &gpu::TemporalReusePassParams,
) where
    W: World,
{
    trace!("Reusing temporally (frame {})", params.frame);

    let BoundBuffers {
        input,
        canonical,
        output,
    } = buffers;

    output.par_iter_mut().enumerate().for_each(|(idx, out)| {
        let pixel = ctx.surfaces.pixel(idx);

        let Some(surface) = ctx.surfaces.get(pixel) else {
            *out = Default::default();
            return;
        };

        // When there's no separate canonical buffer, the pass runs in place
        let canonical = canonical.map_or(*out, |canonical| canonical[idx]);
        let temporal = ctx.temporal_neighbor(pixel, surface, input);
        let mut noise = Noise::new(params.seed, pixel);

        *out = gpu::reuse_temporal(
            ctx.world, &ctx.reuse, surface, &canonical, temporal, &mut noise,
        );
    });
}
