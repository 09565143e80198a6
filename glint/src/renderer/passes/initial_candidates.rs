use log::trace;
use rayon::prelude::*;

use super::FrameContext;
use crate::gpu::{self, BsdfRayReuse, DiReservoir, Noise, World};
use crate::PresampledLights;

/// Draws and resamples each pixel's initial light and BSDF candidates.
pub fn run_initial_candidates<W>(
    ctx: &FrameContext<'_, W>,
    presampled: Option<&PresampledLights>,
    output: &mut [DiReservoir],
    bounces: &mut [BsdfRayReuse],
    params: &gpu::InitialCandidatesPassParams,
) where
    W: World,
{
    trace!("Generating initial candidates (frame {})", params.frame);

    let ris = ctx.settings.ris();

    let presampled = presampled.filter(|_| params.uses_presampled_lights());

    output
        .par_iter_mut()
        .zip(bounces.par_iter_mut())
        .enumerate()
        .for_each(|(idx, (reservoir, bounce))| {
            let pixel = ctx.surfaces.pixel(idx);

            let Some(surface) = ctx.surfaces.get(pixel) else {
                *reservoir = Default::default();
                *bounce = Default::default();
                return;
            };

            let mut noise = Noise::new(params.seed, pixel);

            (*reservoir, *bounce) = match presampled {
                Some(presampled) => {
                    let lights = presampled.subset_for(
                        pixel,
                        params.presampling_tile_size,
                        params.seed,
                    );

                    gpu::generate_initial_reservoir(
                        ctx.world, &lights, &ris, surface, &mut noise,
                    )
                }

                None => gpu::generate_initial_reservoir(
                    ctx.world, ctx.world, &ris, surface, &mut noise,
                ),
            };
        });
}
