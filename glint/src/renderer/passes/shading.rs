use glam::Vec3;
use log::trace;
use rayon::prelude::*;

use super::FrameContext;
use crate::gpu::{
    self, BsdfRayReuse, DiReservoir, Noise, RouletteOutcome, VisibilityCache,
    World,
};
use crate::{PathBounce, ShadedPixel};

/// Shades each pixel with its final reservoir and decides whether its path
/// continues along the BSDF ray traced for the initial candidates.
///
/// Russian roulette runs at `params.depth` on the throughput relative to the
/// shaded surface, so it only kicks in once the caller follows paths past
/// [`gpu::RussianRouletteSettings::min_depth`].
pub fn run_shading<W>(
    ctx: &FrameContext<'_, W>,
    reservoirs: &mut [DiReservoir],
    bounces: &[BsdfRayReuse],
    cache: Option<&dyn VisibilityCache>,
    params: &gpu::ShadingPassParams,
) -> Vec<ShadedPixel>
where
    W: World,
{
    trace!("Shading (frame {})", params.frame);

    let shading = ctx.settings.shading();
    let russian_roulette = ctx.settings.russian_roulette;

    reservoirs
        .par_iter_mut()
        .zip(bounces.par_iter())
        .enumerate()
        .map(|(idx, (reservoir, bounce))| {
            let pixel = ctx.surfaces.pixel(idx);

            let Some(surface) = ctx.surfaces.get(pixel) else {
                return ShadedPixel::default();
            };

            let mut noise = Noise::new(params.seed, pixel);

            let radiance = gpu::finalize_and_shade(
                ctx.world, &shading, surface, reservoir, cache, &mut noise,
            );

            let bounce = bounce.scattering().and_then(|(dir, value, pdf)| {
                if pdf <= 0.0 {
                    return None;
                }

                let cos = dir.dot(surface.shading_normal).abs();
                let weight = value * cos / pdf;
                let mut throughput = Vec3::ONE;

                let outcome = gpu::russian_roulette(
                    &russian_roulette,
                    params.depth,
                    &mut throughput,
                    weight,
                    &mut noise,
                );

                match outcome {
                    RouletteOutcome::Continue => Some(PathBounce {
                        direction: dir,
                        throughput: throughput * weight,
                        depth: params.depth + 1,
                        ray: *bounce,
                    }),

                    RouletteOutcome::Terminate => None,
                }
            });

            ShadedPixel { radiance, bounce }
        })
        .collect()
}
