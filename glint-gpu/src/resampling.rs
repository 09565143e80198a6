use core::slice;

use glam::{IVec2, UVec2};

use crate::{
    BiasCorrection, DiReservoir, DiSample, F32Ext, Noise, Surface, SurfaceMap,
    Technique, Vec3Ext, World, GLINT_EPSILON,
};

/// Maximum number of spatial neighbors merged by a single pass.
pub const MAX_SPATIAL_NEIGHBORS: usize = 16;

/// Configuration of the temporal and spatial reuse passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReuseSettings {
    pub bias_correction: BiasCorrection,

    /// Maximum M of a reservoir coming from the previous frame, in multiples
    /// of the canonical reservoir's M; zero disables the cap.
    pub temporal_m_cap: f32,

    pub spatial_neighbors: u32,

    /// Radius (in pixels) of the disk spatial neighbors are picked from.
    pub spatial_radius: f32,

    /// Minimum cosine between the normals of reused surfaces.
    pub normal_threshold: f32,

    /// Maximum relative difference between the depths of reused surfaces.
    pub depth_threshold: f32,

    pub use_envmap: bool,
}

impl Default for ReuseSettings {
    fn default() -> Self {
        Self {
            bias_correction: BiasCorrection::default(),
            temporal_m_cap: 20.0,
            spatial_neighbors: 5,
            spatial_radius: 16.0,
            normal_threshold: 0.9,
            depth_threshold: 0.1,
            use_envmap: false,
        }
    }
}

/// Reservoir of another pixel (or of the previous frame), together with the
/// surface it was resampled for.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Neighbor {
    pub reservoir: DiReservoir,
    pub surface: Surface,
}

/// Evaluates the unshadowed target function of given sample on given
/// surface.
pub fn target_function<W>(
    world: &W,
    settings: &ReuseSettings,
    surface: &Surface,
    sample: &DiSample,
) -> f32
where
    W: World,
{
    let (dir, distance) = sample.direction_from(surface.point);

    if distance <= 0.0 {
        return 0.0;
    }

    let cos = surface.facing_normal().dot(dir);

    if cos <= 0.0 {
        return 0.0;
    }

    let emission = match sample.technique {
        Technique::Emissive => world.emission(sample.emitter),

        Technique::Envmap => match world.envmap() {
            Some(envmap) if settings.use_envmap => envmap.eval(dir).0,
            _ => return 0.0,
        },
    };

    let bsdf = world.eval_bsdf(surface, surface.view, dir);

    (bsdf.value * emission * cos).luma().positive_or_zero()
}

/// Returns the Jacobian determinant of moving given sample's light point
/// from `from`'s solid angle to `to`'s solid angle.
///
/// Environment-map samples are directions, so their Jacobian is 1;
/// degenerate configurations yield 0.
pub fn reconnection_jacobian(
    sample: &DiSample,
    from: &Surface,
    to: &Surface,
) -> f32 {
    if sample.technique == Technique::Envmap {
        return 1.0;
    }

    let (from_dir, from_distance) = sample.direction_from(from.point);
    let (to_dir, to_distance) = sample.direction_from(to.point);

    let from_cos = sample.light_normal.dot(-from_dir).abs();
    let to_cos = sample.light_normal.dot(-to_dir).abs();

    if from_cos <= GLINT_EPSILON || to_distance <= 0.0 {
        return 0.0;
    }

    let jacobian =
        (to_cos * from_distance.sqr()) / (from_cos * to_distance.sqr());

    jacobian.positive_or_zero()
}

/// Merges the canonical reservoir with the previous frame's reservoir of the
/// same pixel.
pub fn reuse_temporal<W>(
    world: &W,
    settings: &ReuseSettings,
    here: &Surface,
    canonical: &DiReservoir,
    temporal: Option<Neighbor>,
    noise: &mut Noise,
) -> DiReservoir
where
    W: World,
{
    let temporal = temporal.map(|temporal| cap(settings, canonical, temporal));

    let neighbors = match &temporal {
        Some(temporal) => slice::from_ref(temporal),
        None => &[],
    };

    resample(world, settings, here, canonical, neighbors, noise)
}

/// Merges the canonical reservoir with reservoirs of neighboring pixels.
pub fn reuse_spatial<W>(
    world: &W,
    settings: &ReuseSettings,
    here: &Surface,
    canonical: &DiReservoir,
    neighbors: &[Neighbor],
    noise: &mut Noise,
) -> DiReservoir
where
    W: World,
{
    resample(world, settings, here, canonical, neighbors, noise)
}

/// Merges the canonical reservoir with the previous frame's reservoir of the
/// same pixel and with previous frame's reservoirs of neighboring pixels, in
/// a single pass.
pub fn reuse_spatiotemporal<W>(
    world: &W,
    settings: &ReuseSettings,
    here: &Surface,
    canonical: &DiReservoir,
    temporal: Option<Neighbor>,
    spatial: &[Neighbor],
    noise: &mut Noise,
) -> DiReservoir
where
    W: World,
{
    let mut neighbors = [Neighbor::default(); MAX_SPATIAL_NEIGHBORS + 1];
    let mut len = 0;

    let spatial = spatial.iter().take(MAX_SPATIAL_NEIGHBORS);

    for neighbor in temporal.iter().chain(spatial) {
        neighbors[len] = cap(settings, canonical, *neighbor);
        len += 1;
    }

    resample(world, settings, here, canonical, &neighbors[..len], noise)
}

/// Picks up to [`ReuseSettings::spatial_neighbors`] reusable neighbors
/// around given pixel, storing them into `out` and returning how many were
/// found.
///
/// Neighbors that are off-screen, have no surface, have an empty reservoir
/// or whose surface is too different from `here` are skipped.
pub fn pick_spatial_neighbors(
    settings: &ReuseSettings,
    pixel: UVec2,
    here: &Surface,
    surfaces: SurfaceMap,
    reservoirs: &[DiReservoir],
    noise: &mut Noise,
    out: &mut [Neighbor; MAX_SPATIAL_NEIGHBORS],
) -> usize {
    let wanted =
        (settings.spatial_neighbors as usize).min(MAX_SPATIAL_NEIGHBORS);
    let mut len = 0;

    for _ in 0..wanted {
        let offset = (noise.sample_disk() * settings.spatial_radius)
            .round()
            .as_ivec2();

        if offset == IVec2::ZERO {
            continue;
        }

        let pos = pixel.as_ivec2() + offset;

        if !surfaces.contains(pos) {
            continue;
        }

        let pos = pos.as_uvec2();

        let Some(surface) = surfaces.get(pos) else {
            continue;
        };

        if !here.is_similar_to(
            surface,
            settings.normal_threshold,
            settings.depth_threshold,
        ) {
            continue;
        }

        let Some(reservoir) = reservoirs.get(surfaces.index(pos)) else {
            continue;
        };

        if reservoir.is_empty() {
            continue;
        }

        out[len] = Neighbor {
            reservoir: *reservoir,
            surface: *surface,
        };

        len += 1;
    }

    len
}

fn cap(
    settings: &ReuseSettings,
    canonical: &DiReservoir,
    mut neighbor: Neighbor,
) -> Neighbor {
    if settings.temporal_m_cap > 0.0 {
        neighbor
            .reservoir
            .clamp_m(settings.temporal_m_cap * canonical.m.max(1.0));
    }

    neighbor
}

fn resample<W>(
    world: &W,
    settings: &ReuseSettings,
    here: &Surface,
    canonical: &DiReservoir,
    neighbors: &[Neighbor],
    noise: &mut Noise,
) -> DiReservoir
where
    W: World,
{
    let mut out = DiReservoir::default();

    out.merge(noise, canonical, canonical.sample.target);

    for neighbor in neighbors {
        if neighbor.reservoir.is_empty() {
            continue;
        }

        let mut rhs = neighbor.reservoir.reconnected();

        let target = if rhs.has_sample() {
            rhs.ucw *=
                reconnection_jacobian(&rhs.sample, &neighbor.surface, here);

            target_function(world, settings, here, &rhs.sample)
        } else {
            0.0
        };

        out.merge(noise, &rhs, target);
    }

    let z = match settings.bias_correction {
        BiasCorrection::OneOverM => out.m,

        BiasCorrection::OneOverZ => {
            let sample = out.sample.reconnected();
            let mut z = canonical.m.max(0.0);

            for neighbor in neighbors {
                if neighbor.reservoir.is_empty() {
                    continue;
                }

                let target = target_function(
                    world,
                    settings,
                    &neighbor.surface,
                    &sample,
                );

                if target > 0.0 {
                    z += neighbor.reservoir.m;
                }
            }

            z
        }
    };

    out.finalize_normalized(1.0, z);
    out
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, vec3, Vec3};

    use super::*;
    use crate::testing::TriangleWorld;
    use crate::{
        evaluate_reservoir, generate_initial_reservoir, RisSettings,
        SampleOrigin, ShadingSettings,
    };

    fn initial(
        world: &TriangleWorld,
        surface: &Surface,
        noise: &mut Noise,
    ) -> DiReservoir {
        let ris = RisSettings {
            light_candidates: 1,
            bsdf_candidates: 1,
            ..Default::default()
        };

        generate_initial_reservoir(world, world, &ris, surface, noise).0
    }

    fn reservoir_with_m(m: f32) -> DiReservoir {
        let mut reservoir = DiReservoir::default();

        reservoir.m = m;
        reservoir
    }

    #[test]
    fn jacobian() {
        let sample = DiSample {
            point: vec3(0.0, 0.0, 1.0),
            light_normal: -Vec3::Z,
            ..Default::default()
        };

        let a = TriangleWorld::surface_at(Vec3::ZERO);
        let b = TriangleWorld::surface_at(vec3(1.0, 0.0, 0.0));

        assert_relative_eq!(reconnection_jacobian(&sample, &a, &a), 1.0);

        // Moving to `b` doubles the squared distance and scales the cosine at
        // the light by 1/sqrt(2)
        assert_relative_eq!(
            reconnection_jacobian(&sample, &a, &b),
            (0.5f32).sqrt() / 2.0,
            epsilon = 1e-5,
        );

        let envmap = DiSample {
            technique: Technique::Envmap,
            ..sample
        };

        assert_eq!(1.0, reconnection_jacobian(&envmap, &a, &b));

        // Grazing the light from the source pixel
        let grazing = DiSample {
            light_normal: Vec3::X,
            ..sample
        };

        assert_eq!(0.0, reconnection_jacobian(&grazing, &a, &b));
    }

    #[test]
    fn target_function_ignores_disabled_envmap() {
        let world = TriangleWorld::default().with_envmap(Vec3::ONE);
        let surface = TriangleWorld::surface_at(Vec3::ZERO);

        let sample = DiSample {
            point: Vec3::Z,
            technique: Technique::Envmap,
            ..Default::default()
        };

        let enabled = ReuseSettings {
            use_envmap: true,
            ..Default::default()
        };

        assert!(target_function(&world, &enabled, &surface, &sample) > 0.0);

        assert_eq!(
            0.0,
            target_function(
                &world,
                &ReuseSettings::default(),
                &surface,
                &sample,
            ),
        );
    }

    #[test]
    fn spatial_reuse_stays_unbiased() {
        let world = TriangleWorld::default();
        let here = TriangleWorld::surface_at(Vec3::ZERO);
        let expected = world.expected_radiance(&here);
        let shading = ShadingSettings::default();

        let neighbor_surfaces = [
            TriangleWorld::surface_at(vec3(0.3, 0.0, 0.0)),
            TriangleWorld::surface_at(vec3(-0.2, 0.25, 0.0)),
            TriangleWorld::surface_at(vec3(0.1, -0.3, 0.0)),
        ];

        for bias_correction in
            [BiasCorrection::OneOverM, BiasCorrection::OneOverZ]
        {
            let settings = ReuseSettings {
                bias_correction,
                ..Default::default()
            };

            let mut noise = Noise::new(17, uvec2(1, 2));
            let mut sum = Vec3::ZERO;
            let n = 50_000;

            for _ in 0..n {
                let canonical = initial(&world, &here, &mut noise);
                let mut neighbors = [Neighbor::default(); 3];

                for (neighbor, surface) in
                    neighbors.iter_mut().zip(&neighbor_surfaces)
                {
                    *neighbor = Neighbor {
                        reservoir: initial(&world, surface, &mut noise),
                        surface: *surface,
                    };
                }

                let reservoir = reuse_spatial(
                    &world,
                    &settings,
                    &here,
                    &canonical,
                    &neighbors,
                    &mut noise,
                );

                assert_eq!(8.0, reservoir.m);

                sum += evaluate_reservoir(
                    &world, &shading, &here, &reservoir, None, &mut noise,
                );
            }

            assert_relative_eq!(
                sum / (n as f32),
                expected,
                max_relative = 0.03,
            );
        }
    }

    #[test]
    fn temporal_reuse_stays_unbiased() {
        let world = TriangleWorld::default();
        let here = TriangleWorld::surface_at(Vec3::ZERO);
        let expected = world.expected_radiance(&here);
        let settings = ReuseSettings::default();
        let shading = ShadingSettings::default();
        let mut noise = Noise::new(3, uvec2(4, 5));
        let mut sum = Vec3::ZERO;
        let n = 40_000;
        let mut history: Option<DiReservoir> = None;

        for _ in 0..n {
            let canonical = initial(&world, &here, &mut noise);

            let temporal = history.map(|reservoir| Neighbor {
                reservoir,
                surface: here,
            });

            let reservoir = reuse_temporal(
                &world,
                &settings,
                &here,
                &canonical,
                temporal,
                &mut noise,
            );

            // M is capped at 20x the canonical M, plus the canonical M itself
            assert!(reservoir.m <= 2.0 + 20.0 * 2.0);

            sum += evaluate_reservoir(
                &world, &shading, &here, &reservoir, None, &mut noise,
            );

            history = Some(reservoir);
        }

        assert_relative_eq!(sum / (n as f32), expected, max_relative = 0.03);
    }

    #[test]
    fn temporal_m_is_capped() {
        let world = TriangleWorld::default();
        let here = TriangleWorld::surface_at(Vec3::ZERO);
        let mut noise = Noise::new(1, uvec2(0, 0));
        let canonical = initial(&world, &here, &mut noise);

        let temporal = Neighbor {
            reservoir: reservoir_with_m(1000.0),
            surface: here,
        };

        let settings = ReuseSettings {
            temporal_m_cap: 5.0,
            ..Default::default()
        };

        let reservoir = reuse_temporal(
            &world,
            &settings,
            &here,
            &canonical,
            Some(temporal),
            &mut noise,
        );

        assert_eq!(2.0 + 10.0, reservoir.m);

        let settings = ReuseSettings {
            temporal_m_cap: 0.0,
            ..Default::default()
        };

        let reservoir = reuse_temporal(
            &world,
            &settings,
            &here,
            &canonical,
            Some(temporal),
            &mut noise,
        );

        assert_eq!(2.0 + 1000.0, reservoir.m);

        let reservoir = reuse_spatiotemporal(
            &world,
            &ReuseSettings {
                temporal_m_cap: 5.0,
                ..Default::default()
            },
            &here,
            &canonical,
            Some(temporal),
            &[temporal, temporal],
            &mut noise,
        );

        assert_eq!(2.0 + 3.0 * 10.0, reservoir.m);
    }

    #[test]
    fn excess_spatial_neighbors_are_ignored() {
        let world = TriangleWorld::default();
        let here = TriangleWorld::surface_at(Vec3::ZERO);
        let mut noise = Noise::new(1, uvec2(0, 0));
        let canonical = initial(&world, &here, &mut noise);

        let settings = ReuseSettings {
            temporal_m_cap: 5.0,
            ..Default::default()
        };

        let neighbor = Neighbor {
            reservoir: reservoir_with_m(1000.0),
            surface: here,
        };

        let spatial = [neighbor; MAX_SPATIAL_NEIGHBORS + 4];

        let reservoir = reuse_spatiotemporal(
            &world,
            &settings,
            &here,
            &canonical,
            Some(neighbor),
            &spatial,
            &mut noise,
        );

        let merged = (MAX_SPATIAL_NEIGHBORS + 1) as f32;

        assert_eq!(2.0 + merged * 10.0, reservoir.m);

        let reservoir = reuse_spatiotemporal(
            &world,
            &settings,
            &here,
            &canonical,
            None,
            &spatial,
            &mut noise,
        );

        let merged = MAX_SPATIAL_NEIGHBORS as f32;

        assert_eq!(2.0 + merged * 10.0, reservoir.m);
    }

    #[test]
    fn one_over_z_skips_neighbors_that_cannot_see_the_sample() {
        let world = TriangleWorld::default();
        let here = TriangleWorld::surface_at(Vec3::ZERO);

        // Facing away from the light, so it couldn't have produced any sample
        // of ours
        let mut away = TriangleWorld::surface_at(vec3(0.1, 0.0, 0.0));

        away.shading_normal = -Vec3::Z;
        away.geometric_normal = -Vec3::Z;
        away.view = -Vec3::Z;

        let neighbor = Neighbor {
            reservoir: reservoir_with_m(6.0),
            surface: away,
        };

        for seed in 0..50 {
            let mut noise = Noise::new(seed, uvec2(0, 0));
            let canonical = initial(&world, &here, &mut noise);

            let run = |bias_correction| {
                let settings = ReuseSettings {
                    bias_correction,
                    ..Default::default()
                };

                reuse_spatial(
                    &world,
                    &settings,
                    &here,
                    &canonical,
                    &[neighbor],
                    &mut Noise::new(seed, uvec2(1, 1)),
                )
            };

            let over_m = run(BiasCorrection::OneOverM);
            let over_z = run(BiasCorrection::OneOverZ);

            assert_eq!(over_m.sample, over_z.sample);
            assert_eq!(over_m.m, over_z.m);

            assert_relative_eq!(
                over_z.ucw,
                over_m.ucw * (canonical.m + 6.0) / canonical.m,
                max_relative = 1e-5,
            );
        }
    }

    #[test]
    fn reused_samples_are_reconnected() {
        let world = TriangleWorld::default();
        let here = TriangleWorld::surface_at(Vec3::ZERO);
        let settings = ReuseSettings::default();
        let mut noise = Noise::new(8, uvec2(0, 0));
        let mut found = false;

        for _ in 0..1000 {
            let neighbor = initial(&world, &here, &mut noise);

            if !matches!(neighbor.sample.origin, SampleOrigin::Bsdf(_)) {
                continue;
            }

            found = true;

            let reservoir = reuse_spatial(
                &world,
                &settings,
                &here,
                &DiReservoir::default(),
                &[Neighbor {
                    reservoir: neighbor,
                    surface: here,
                }],
                &mut noise,
            );

            assert_eq!(SampleOrigin::Light, reservoir.sample.origin);
            assert_eq!(neighbor.sample.point, reservoir.sample.point);
        }

        assert!(found);
    }

    #[test]
    fn picking_spatial_neighbors() {
        let world = TriangleWorld::default();
        let size = uvec2(5, 5);
        let mut noise = Noise::new(1, uvec2(0, 0));
        let mut surfaces = Vec::new();
        let mut reservoirs = Vec::new();

        for y in 0..size.y {
            for x in 0..size.x {
                let surface =
                    TriangleWorld::surface_at(vec3(x as f32, y as f32, 0.0));

                reservoirs.push(initial(&world, &surface, &mut noise));

                // Left column has no surface, the top row is way further
                // away from the camera than the rest
                surfaces.push(match (x, y) {
                    (0, _) => None,
                    (_, 0) => Some(Surface {
                        depth: 100.0,
                        ..surface
                    }),
                    _ => Some(surface),
                });
            }
        }

        let map = SurfaceMap::new(&surfaces, size);

        let settings = ReuseSettings {
            spatial_neighbors: 16,
            spatial_radius: 3.0,
            ..Default::default()
        };

        let pixel = uvec2(2, 2);
        let here = map.get(pixel).copied().unwrap();
        let mut out = [Neighbor::default(); MAX_SPATIAL_NEIGHBORS];
        let mut total = 0;

        for _ in 0..100 {
            let len = pick_spatial_neighbors(
                &settings,
                pixel,
                &here,
                map,
                &reservoirs,
                &mut noise,
                &mut out,
            );

            for neighbor in &out[..len] {
                assert!(neighbor.surface.point.x >= 1.0);
                assert!(neighbor.surface.point.y >= 1.0);
                assert_eq!(2.0, neighbor.surface.depth);
                assert!(!neighbor.reservoir.is_empty());
                assert_ne!(here.point, neighbor.surface.point);
            }

            total += len;
        }

        assert!(total > 0);

        let settings = ReuseSettings {
            spatial_neighbors: 0,
            ..settings
        };

        let len = pick_spatial_neighbors(
            &settings,
            pixel,
            &here,
            map,
            &reservoirs,
            &mut noise,
            &mut out,
        );

        assert_eq!(0, len);
    }
}
