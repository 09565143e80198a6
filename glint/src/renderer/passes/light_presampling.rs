use log::trace;

use crate::gpu::{self, World};
use crate::PresampledLights;

pub fn run_light_presampling<W>(
    world: &W,
    presampled: &mut PresampledLights,
    params: &gpu::LightPresamplingPassParams,
) where
    W: World,
{
    trace!(
        "Presampling lights ({} x {})",
        params.subsets,
        params.subset_size
    );

    presampled.regenerate(world, params);
}
