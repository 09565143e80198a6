use glam::Vec3;

use crate::{
    ris, DiReservoir, DiSample, Noise, SampleOrigin, Surface, Technique,
    VisibilityCache, World,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadingSettings {
    /// Whether light-origin samples get a shadow ray.
    pub visibility: bool,

    pub use_envmap: bool,
}

impl Default for ShadingSettings {
    fn default() -> Self {
        Self {
            visibility: true,
            use_envmap: false,
        }
    }
}

/// Invalidates the reservoir if its sample comes from a technique that's
/// disabled in the current configuration.
pub fn validate_reservoir(
    settings: &ShadingSettings,
    reservoir: &mut DiReservoir,
) {
    if reservoir.sample.technique == Technique::Envmap && !settings.use_envmap {
        reservoir.invalidate();
    }
}

/// Validates given finalized reservoir (see [`validate_reservoir()`]) and
/// returns the radiance its sample reflects towards the viewer.
pub fn finalize_and_shade<W>(
    world: &W,
    settings: &ShadingSettings,
    surface: &Surface,
    reservoir: &mut DiReservoir,
    cache: Option<&dyn VisibilityCache>,
    noise: &mut Noise,
) -> Vec3
where
    W: World,
{
    validate_reservoir(settings, reservoir);
    evaluate_reservoir(world, settings, surface, reservoir, cache, noise)
}

/// Returns the radiance given finalized reservoir's sample reflects towards
/// the viewer.
pub fn evaluate_reservoir<W>(
    world: &W,
    settings: &ShadingSettings,
    surface: &Surface,
    reservoir: &DiReservoir,
    cache: Option<&dyn VisibilityCache>,
    noise: &mut Noise,
) -> Vec3
where
    W: World,
{
    if reservoir.ucw <= 0.0 {
        return Vec3::ZERO;
    }

    let sample = &reservoir.sample;
    let (dir, distance) = sample.direction_from(surface.point);

    if distance <= 0.0 {
        return Vec3::ZERO;
    }

    let Some(emission) = emission(world, sample, dir) else {
        return Vec3::ZERO;
    };

    let (bsdf, cosine, visibility) = match sample.origin {
        SampleOrigin::Bsdf(payload) => {
            let cosine = if payload.is_refraction {
                payload.cosine
            } else {
                surface.facing_normal().dot(dir)
            };

            (payload.value, cosine, 1.0)
        }

        SampleOrigin::Light => {
            let cosine = surface.facing_normal().dot(dir);

            if cosine <= 0.0 {
                return Vec3::ZERO;
            }

            let visibility = if settings.visibility {
                match trace_visibility(
                    world, surface, sample, dir, distance, cache, noise,
                ) {
                    Some(weight) => weight,
                    None => return Vec3::ZERO,
                }
            } else {
                1.0
            };

            let bsdf = world.eval_bsdf(surface, surface.view, dir);

            (bsdf.value, cosine, visibility)
        }
    };

    if cosine <= 0.0 {
        return Vec3::ZERO;
    }

    bsdf * reservoir.ucw * emission * cosine * visibility
}

fn emission<W>(world: &W, sample: &DiSample, dir: Vec3) -> Option<Vec3>
where
    W: World,
{
    match sample.technique {
        Technique::Emissive => Some(world.emission(sample.emitter)),
        Technique::Envmap => Some(world.envmap()?.eval(dir).0),
    }
}

/// Traces the shadow ray of a light-origin sample, returning `None` if it's
/// occluded or the weight to apply to the unoccluded contribution.
///
/// With a visibility cache, the ray is traced only with the cached unoccluded
/// probability (and counted as occluded otherwise); environment-map samples
/// bypass the cache.
fn trace_visibility<W>(
    world: &W,
    surface: &Surface,
    sample: &DiSample,
    dir: Vec3,
    distance: f32,
    cache: Option<&dyn VisibilityCache>,
    noise: &mut Noise,
) -> Option<f32>
where
    W: World,
{
    let cache = cache.filter(|_| sample.technique == Technique::Emissive);

    let Some(cache) = cache else {
        return if ris::occluded(world, surface, dir, distance) {
            None
        } else {
            Some(1.0)
        };
    };

    let p = cache
        .unoccluded_probability(surface.point, sample.point)
        .clamp(0.0, 1.0);

    if p <= 0.0 || noise.sample() >= p {
        return None;
    }

    let visible = !ris::occluded(world, surface, dir, distance);

    cache.update(surface.point, sample.point, visible);

    if visible {
        Some(1.0 / p)
    } else {
        None
    }
}
