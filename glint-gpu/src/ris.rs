use glam::Vec3;

use crate::{
    balance_heuristic, BsdfPayload, DiReservoir, DiSample, EmitterSampler,
    F32Ext, Noise, Ray, SampleOrigin, Surface, Technique, TraceHit, Vec3Ext,
    World, GLINT_EPSILON,
};

/// Configuration of the initial candidates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RisSettings {
    pub light_candidates: u32,
    pub bsdf_candidates: u32,

    /// Candidates whose estimated contribution (divided by its pdf) falls
    /// below this threshold get their target function zeroed; zero disables
    /// the cull.
    pub minimum_light_contribution: f32,

    /// Whether light candidates get a shadow ray folded into their target
    /// function.
    pub use_visibility: bool,

    pub use_envmap: bool,

    /// Probability that a light candidate gets drawn from the environment map
    /// instead of the emissive geometry.
    pub envmap_candidate_probability: f32,

    /// Interactive mode: one candidate of each kind, no visibility.
    pub low_resolution: bool,
}

impl Default for RisSettings {
    fn default() -> Self {
        Self {
            light_candidates: 8,
            bsdf_candidates: 1,
            minimum_light_contribution: 0.0,
            use_visibility: false,
            use_envmap: false,
            envmap_candidate_probability: 0.25,
            low_resolution: false,
        }
    }
}

impl RisSettings {
    /// Returns the number of light and BSDF candidates to draw.
    pub fn candidate_counts(&self, can_sample_lights: bool) -> (u32, u32) {
        let (light, bsdf) = if self.low_resolution {
            (1, 1)
        } else {
            (self.light_candidates, self.bsdf_candidates)
        };

        (if can_sample_lights { light } else { 0 }, bsdf)
    }

    fn envmap_probability<W>(&self, world: &W) -> f32
    where
        W: World,
    {
        if self.use_envmap && world.envmap().is_some() {
            self.envmap_candidate_probability.saturate()
        } else {
            0.0
        }
    }
}

/// Outcome of the BSDF-sampled ray traced while generating candidates,
/// kept around so that the next bounce doesn't have to trace it again.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum BsdfRayReuse {
    /// No BSDF candidate was drawn.
    #[default]
    Unavailable,

    /// The BSDF couldn't sample a direction.
    Invalid,

    /// The ray escaped the scene.
    Missed {
        direction: Vec3,
        value: Vec3,
        pdf: f32,
    },

    /// The ray hit something.
    Hit {
        hit: TraceHit,
        direction: Vec3,
        value: Vec3,
        pdf: f32,
    },
}

impl BsdfRayReuse {
    /// Returns the direction, BSDF value and pdf of the traced ray, if there
    /// was one.
    pub fn scattering(&self) -> Option<(Vec3, Vec3, f32)> {
        match *self {
            BsdfRayReuse::Missed {
                direction,
                value,
                pdf,
            }
            | BsdfRayReuse::Hit {
                direction,
                value,
                pdf,
                ..
            } => Some((direction, value, pdf)),

            _ => None,
        }
    }
}

/// Returns whether a candidate with given contribution and sampling pdf
/// survives the minimum-contribution cull.
///
/// A non-positive pdf never culls.
pub fn contributes_enough(
    threshold: f32,
    contribution: Vec3,
    pdf: f32,
) -> bool {
    if threshold <= 0.0 || pdf <= 0.0 {
        return true;
    }

    contribution.luma() / pdf >= threshold
}

/// Draws the initial light and BSDF candidates for given surface and
/// returns the finalized reservoir together with the BSDF ray's outcome.
///
/// `lights` is where light candidates come from: either the world itself or
/// a presampled subset of its emitters.
pub fn generate_initial_reservoir<W, L>(
    world: &W,
    lights: &L,
    settings: &RisSettings,
    surface: &Surface,
    noise: &mut Noise,
) -> (DiReservoir, BsdfRayReuse)
where
    W: World,
    L: EmitterSampler + ?Sized,
{
    let (light_candidates, bsdf_candidates) =
        settings.candidate_counts(world.can_sample_lights(surface.material));

    let ctx = CandidateContext {
        world,
        settings,
        surface,
        light_count: light_candidates as f32,
        bsdf_count: bsdf_candidates as f32,
        envmap_probability: settings.envmap_probability(world),
    };

    let mut reservoir = DiReservoir::default();
    let mut bsdf_ray = BsdfRayReuse::Unavailable;

    for _ in 0..light_candidates {
        let (sample, weight) = ctx.light_candidate(lights, noise);

        reservoir.add_candidate(noise, sample, weight);
    }

    for _ in 0..bsdf_candidates {
        let (sample, weight, ray) = ctx.bsdf_candidate(noise);

        reservoir.add_candidate(noise, sample, weight);
        bsdf_ray = ray;
    }

    reservoir.finalize();

    (reservoir, bsdf_ray)
}

struct CandidateContext<'a, W> {
    world: &'a W,
    settings: &'a RisSettings,
    surface: &'a Surface,
    light_count: f32,
    bsdf_count: f32,
    envmap_probability: f32,
}

impl<'a, W> CandidateContext<'a, W>
where
    W: World,
{
    fn light_candidate<L>(
        &self,
        lights: &L,
        noise: &mut Noise,
    ) -> (DiSample, f32)
    where
        L: EmitterSampler + ?Sized,
    {
        if self.envmap_probability > 0.0
            && noise.sample() < self.envmap_probability
        {
            return self.envmap_candidate(noise);
        }

        let light = lights.sample_emitter(noise);

        let mut sample = DiSample {
            point: light.point,
            light_normal: light.normal,
            emitter: light.emitter,
            technique: Technique::Emissive,
            origin: SampleOrigin::Light,
            target: 0.0,
        };

        // Zero-area emitters report a zero pdf
        if light.pdf <= 0.0 {
            return (sample, 0.0);
        }

        let (dir, distance) = sample.direction_from(self.surface.point);
        let cos_light = light.normal.dot(-dir).abs();
        let cos_here = self.surface.facing_normal().dot(dir).max(0.0);

        if distance <= 0.0 || cos_here <= 0.0 || cos_light <= GLINT_EPSILON {
            return (sample, 0.0);
        }

        let pdf = light.pdf * (1.0 - self.envmap_probability) * distance.sqr()
            / cos_light;

        let threshold = self.settings.minimum_light_contribution;

        if !contributes_enough(threshold, light.emission, pdf) {
            return (sample, 0.0);
        }

        let bsdf = self.world.eval_bsdf(self.surface, self.surface.view, dir);

        let contribution = bsdf.value * light.emission * cos_here;

        if !contributes_enough(threshold, contribution, bsdf.pdf * pdf) {
            return (sample, 0.0);
        }

        sample.target = contribution.luma().positive_or_zero();

        if sample.target > 0.0 && self.is_occluded(dir, distance) {
            sample.target = 0.0;
        }

        let mis = balance_heuristic(
            pdf,
            self.light_count,
            bsdf.pdf,
            self.bsdf_count,
        );

        (sample, (mis * sample.target / pdf).positive_or_zero())
    }

    fn envmap_candidate(&self, noise: &mut Noise) -> (DiSample, f32) {
        let mut sample = DiSample {
            technique: Technique::Envmap,
            ..Default::default()
        };

        let Some(envmap) = self.world.envmap() else {
            return (sample, 0.0);
        };

        let env = envmap.sample(noise);
        let pdf = env.pdf * self.envmap_probability;

        sample.point = env.direction;

        let cos_here =
            self.surface.facing_normal().dot(env.direction).max(0.0);

        if pdf <= 0.0 || cos_here <= 0.0 {
            return (sample, 0.0);
        }

        let threshold = self.settings.minimum_light_contribution;

        if !contributes_enough(threshold, env.radiance, pdf) {
            return (sample, 0.0);
        }

        let bsdf = self.world.eval_bsdf(
            self.surface,
            self.surface.view,
            env.direction,
        );

        let contribution = bsdf.value * env.radiance * cos_here;

        if !contributes_enough(threshold, contribution, bsdf.pdf * pdf) {
            return (sample, 0.0);
        }

        sample.target = contribution.luma().positive_or_zero();

        if sample.target > 0.0 && self.is_occluded(env.direction, f32::INFINITY)
        {
            sample.target = 0.0;
        }

        let mis = balance_heuristic(
            pdf,
            self.light_count,
            bsdf.pdf,
            self.bsdf_count,
        );

        (sample, (mis * sample.target / pdf).positive_or_zero())
    }

    fn bsdf_candidate(
        &self,
        noise: &mut Noise,
    ) -> (DiSample, f32, BsdfRayReuse) {
        let bsdf =
            self.world
                .sample_bsdf(self.surface, self.surface.view, noise);

        if bsdf.pdf <= 0.0 {
            return (DiSample::default(), 0.0, BsdfRayReuse::Invalid);
        }

        let dir = bsdf.direction;
        let cosine = self.surface.shading_normal.dot(dir).abs();
        let is_refraction = self.surface.facing_normal().dot(dir) < 0.0;

        let payload = BsdfPayload {
            value: bsdf.value,
            cosine,
            is_refraction,
        };

        let ray = Ray::new(self.surface.ray_origin(dir), dir);
        let hit = self.world.trace(ray, self.surface.primitive);

        let (mut sample, emission, light_pdf, reuse) = match hit {
            Some(hit) => {
                let reuse = BsdfRayReuse::Hit {
                    hit,
                    direction: dir,
                    value: bsdf.value,
                    pdf: bsdf.pdf,
                };

                let Some(emitter) = hit.emitter else {
                    return (DiSample::default(), 0.0, reuse);
                };

                if hit.emission.is_black() {
                    return (DiSample::default(), 0.0, reuse);
                }

                let cos_light = hit.normal.dot(-dir).abs();

                let light_pdf = if cos_light > GLINT_EPSILON {
                    self.world.emitter_pdf(emitter)
                        * (1.0 - self.envmap_probability)
                        * hit.distance.sqr()
                        / cos_light
                } else {
                    0.0
                };

                let sample = DiSample {
                    point: hit.point,
                    light_normal: hit.normal,
                    emitter,
                    technique: Technique::Emissive,
                    origin: SampleOrigin::Bsdf(payload),
                    target: 0.0,
                };

                (sample, hit.emission, light_pdf, reuse)
            }

            None => {
                let reuse = BsdfRayReuse::Missed {
                    direction: dir,
                    value: bsdf.value,
                    pdf: bsdf.pdf,
                };

                let envmap = match self.world.envmap() {
                    Some(envmap) if self.settings.use_envmap => envmap,
                    _ => return (DiSample::default(), 0.0, reuse),
                };

                let (radiance, env_pdf) = envmap.eval(dir);

                let sample = DiSample {
                    point: dir,
                    technique: Technique::Envmap,
                    origin: SampleOrigin::Bsdf(payload),
                    ..Default::default()
                };

                (sample, radiance, env_pdf * self.envmap_probability, reuse)
            }
        };

        // Light sampling never produces directions going through the surface
        let light_pdf = if is_refraction { 0.0 } else { light_pdf };

        let contribution = bsdf.value * emission * cosine;

        if !contributes_enough(
            self.settings.minimum_light_contribution,
            contribution,
            light_pdf * bsdf.pdf,
        ) {
            return (sample, 0.0, reuse);
        }

        sample.target = contribution.luma().positive_or_zero();

        let mis = balance_heuristic(
            bsdf.pdf,
            self.bsdf_count,
            light_pdf,
            self.light_count,
        );

        let weight = (mis * sample.target / bsdf.pdf).positive_or_zero();

        (sample, weight, reuse)
    }

    fn is_occluded(&self, dir: Vec3, distance: f32) -> bool {
        if !self.settings.use_visibility || self.settings.low_resolution {
            return false;
        }

        occluded(self.world, self.surface, dir, distance)
    }
}

/// Traces a shadow ray from the surface towards a sample at given
/// direction and distance.
pub(crate) fn occluded<W>(
    world: &W,
    surface: &Surface,
    dir: Vec3,
    distance: f32,
) -> bool
where
    W: World,
{
    let ray = Ray::new(surface.ray_origin(dir), dir);

    let max_distance = if distance.is_finite() {
        distance * (1.0 - SHADOW_RAY_SHORTENING)
    } else {
        distance
    };

    world.occluded(ray, max_distance, surface.primitive)
}

/// Relative amount by which shadow rays stop short of the light, so that
/// they don't hit the emitter itself.
const SHADOW_RAY_SHORTENING: f32 = 0.001;
