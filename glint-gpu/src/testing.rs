//! Tiny analytic scenes, used to check the estimators against closed-form
//! results.

use core::f32::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{vec3, Vec3};

use crate::{
    BsdfEval, BsdfSample, EmitterId, EmitterSample, EmitterSampler, Emitters,
    Envmap, EnvmapSample, LambertBrdf, MaterialId, Materials, Noise,
    PrimitiveId, Ray, Surface, TraceHit, Tracer, World,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    pub fn area(&self) -> f32 {
        (self.b - self.a).cross(self.c - self.a).length() * 0.5
    }

    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    /// Picks a uniformly distributed point on this triangle.
    pub fn sample(&self, noise: &mut Noise) -> Vec3 {
        let su = noise.sample().sqrt();
        let v = noise.sample();
        let b0 = 1.0 - su;
        let b1 = v * su;

        self.a * b0 + self.b * b1 + self.c * (1.0 - b0 - b1)
    }

    /// Returns the distance along the ray at which it hits this triangle
    /// (Möller-Trumbore).
    pub fn intersect(&self, ray: Ray) -> Option<f32> {
        let v0v1 = self.b - self.a;
        let v0v2 = self.c - self.a;

        // ---

        let pvec = ray.direction().cross(v0v2);
        let det = v0v1.dot(pvec);

        if det.abs() < f32::EPSILON {
            return None;
        }

        // ---

        let inv_det = 1.0 / det;
        let tvec = ray.origin() - self.a;
        let u = tvec.dot(pvec) * inv_det;
        let qvec = tvec.cross(v0v1);
        let v = ray.direction().dot(qvec) * inv_det;
        let distance = v0v2.dot(qvec) * inv_det;

        if (u < 0.0)
            | (u > 1.0)
            | (v < 0.0)
            | (u + v > 1.0)
            | (distance <= 0.0)
        {
            return None;
        }

        Some(distance)
    }

    /// Returns `∫ cos θ dω` over the solid angle this triangle subtends when
    /// seen from `point` with given normal; the triangle must lie entirely
    /// above the point's horizon.
    pub fn projected_solid_angle(&self, point: Vec3, normal: Vec3) -> f32 {
        let vertices = [
            (self.a - point).normalize(),
            (self.b - point).normalize(),
            (self.c - point).normalize(),
        ];

        let mut sum = 0.0;

        for i in 0..3 {
            let v0 = vertices[i];
            let v1 = vertices[(i + 1) % 3];
            let angle = v0.dot(v1).clamp(-1.0, 1.0).acos();

            sum += angle * normal.dot(v0.cross(v1).normalize());
        }

        (0.5 * sum).abs()
    }
}

/// Environment map emitting the same radiance in every direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantEnvmap {
    pub radiance: Vec3,
}

impl Envmap for ConstantEnvmap {
    fn eval(&self, _direction: Vec3) -> (Vec3, f32) {
        (self.radiance, 1.0 / (4.0 * PI))
    }

    fn sample(&self, noise: &mut Noise) -> EnvmapSample {
        EnvmapSample {
            direction: noise.sample_sphere(),
            radiance: self.radiance,
            pdf: 1.0 / (4.0 * PI),
        }
    }
}

/// How the floor of [`TriangleWorld`] scatters light.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scattering {
    /// Lambertian reflection above the floor.
    #[default]
    Reflective,

    /// Lambertian transmission through the floor; nothing gets reflected.
    Transmissive,

    /// Black floor whose BSDF never samples a direction.
    Absorbing,
}

/// A single two-sided emissive triangle hanging above a Lambertian floor,
/// optionally with an occluder in-between and an environment map around.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleWorld {
    pub light: Triangle,
    pub emission: Vec3,
    pub albedo: Vec3,
    pub occluder: Option<Triangle>,
    pub envmap: Option<ConstantEnvmap>,
    pub can_sample_lights: bool,
    pub scattering: Scattering,
}

impl Default for TriangleWorld {
    fn default() -> Self {
        Self {
            light: Triangle::new(
                vec3(-0.5, -0.5, 1.0),
                vec3(0.5, -0.5, 1.0),
                vec3(0.0, 0.5, 1.0),
            ),
            emission: vec3(4.0, 3.0, 2.0),
            albedo: vec3(0.8, 0.8, 0.8),
            occluder: None,
            envmap: None,
            can_sample_lights: true,
            scattering: Scattering::Reflective,
        }
    }
}

impl TriangleWorld {
    pub fn floor_primitive() -> PrimitiveId {
        PrimitiveId::new(0)
    }

    pub fn light_primitive() -> PrimitiveId {
        PrimitiveId::new(1)
    }

    pub fn occluder_primitive() -> PrimitiveId {
        PrimitiveId::new(2)
    }

    pub fn light_emitter() -> EmitterId {
        EmitterId::new(0)
    }

    /// Adds a large triangle halfway between the floor's origin and the
    /// light, hiding the light completely.
    pub fn with_occluder(mut self) -> Self {
        self.occluder = Some(Triangle::new(
            vec3(-5.0, -5.0, 0.5),
            vec3(5.0, -5.0, 0.5),
            vec3(0.0, 5.0, 0.5),
        ));

        self
    }

    pub fn with_envmap(mut self, radiance: Vec3) -> Self {
        self.envmap = Some(ConstantEnvmap { radiance });
        self
    }

    /// Mirrors the light to the other side of the floor.
    pub fn with_light_below(mut self) -> Self {
        let light = &mut self.light;

        for vertex in [&mut light.a, &mut light.b, &mut light.c] {
            vertex.z = -vertex.z;
        }

        self
    }

    pub fn with_scattering(mut self, scattering: Scattering) -> Self {
        self.scattering = scattering;
        self
    }

    /// Returns a floor surface at given point, looked at from above.
    pub fn surface_at(point: Vec3) -> Surface {
        Surface {
            point,
            shading_normal: Vec3::Z,
            geometric_normal: Vec3::Z,
            view: vec3(0.2, 0.1, 1.0).normalize(),
            depth: 2.0,
            material: MaterialId::new(0),
            primitive: Self::floor_primitive(),
        }
    }

    /// Returns the exact direct lighting scattered by given floor surface,
    /// assuming no occluder and the light being on the scattering side.
    pub fn expected_radiance(&self, surface: &Surface) -> Vec3 {
        let normal = match self.scattering {
            Scattering::Reflective => surface.shading_normal,
            Scattering::Transmissive => -surface.shading_normal,
            Scattering::Absorbing => return Vec3::ZERO,
        };

        let light = self.light.projected_solid_angle(surface.point, normal);

        let mut radiance = self.albedo / PI * self.emission * light;

        if let Some(envmap) = &self.envmap {
            radiance += self.albedo / PI * envmap.radiance * (PI - light);
        }

        radiance
    }

    fn light_pdf(&self) -> f32 {
        let area = self.light.area();

        if area > 0.0 {
            1.0 / area
        } else {
            0.0
        }
    }

    fn brdf(&self) -> LambertBrdf {
        LambertBrdf::new(self.albedo)
    }

    fn primitives(&self) -> impl Iterator<Item = (PrimitiveId, Triangle)> {
        [
            Some((Self::light_primitive(), self.light)),
            self.occluder.map(|tri| (Self::occluder_primitive(), tri)),
        ]
        .into_iter()
        .flatten()
    }
}

impl EmitterSampler for TriangleWorld {
    fn sample_emitter(&self, noise: &mut Noise) -> EmitterSample {
        EmitterSample {
            point: self.light.sample(noise),
            normal: self.light.normal(),
            emission: self.emission,
            emitter: Self::light_emitter(),
            pdf: self.light_pdf(),
        }
    }
}

impl Emitters for TriangleWorld {
    fn emitter_pdf(&self, _emitter: EmitterId) -> f32 {
        self.light_pdf()
    }

    fn emission(&self, _emitter: EmitterId) -> Vec3 {
        self.emission
    }
}

impl Materials for TriangleWorld {
    fn eval_bsdf(&self, surface: &Surface, _wo: Vec3, wi: Vec3) -> BsdfEval {
        match self.scattering {
            Scattering::Reflective => {
                self.brdf().eval(surface.facing_normal(), wi)
            }
            Scattering::Transmissive => {
                self.brdf().eval(-surface.facing_normal(), wi)
            }
            Scattering::Absorbing => BsdfEval::default(),
        }
    }

    fn sample_bsdf(
        &self,
        surface: &Surface,
        _wo: Vec3,
        noise: &mut Noise,
    ) -> BsdfSample {
        match self.scattering {
            Scattering::Reflective => {
                self.brdf().sample(surface.facing_normal(), noise)
            }
            Scattering::Transmissive => {
                self.brdf().sample(-surface.facing_normal(), noise)
            }
            Scattering::Absorbing => BsdfSample::default(),
        }
    }

    fn can_sample_lights(&self, _material: MaterialId) -> bool {
        self.can_sample_lights
    }
}

impl Tracer for TriangleWorld {
    fn occluded(
        &self,
        ray: Ray,
        max_distance: f32,
        excluded: PrimitiveId,
    ) -> bool {
        self.primitives()
            .filter(|(id, _)| *id != excluded)
            .filter_map(|(_, tri)| tri.intersect(ray))
            .any(|distance| distance < max_distance)
    }

    fn trace(&self, ray: Ray, excluded: PrimitiveId) -> Option<TraceHit> {
        let (id, tri, distance) = self
            .primitives()
            .filter(|(id, _)| *id != excluded)
            .filter_map(|(id, tri)| Some((id, tri, tri.intersect(ray)?)))
            .min_by(|a, b| a.2.total_cmp(&b.2))?;

        let is_light = id == Self::light_primitive();

        Some(TraceHit {
            distance,
            point: ray.at(distance),
            normal: tri.normal(),
            primitive: id,
            emitter: is_light.then(Self::light_emitter),
            emission: if is_light { self.emission } else { Vec3::ZERO },
        })
    }
}

impl World for TriangleWorld {
    fn envmap(&self) -> Option<&dyn Envmap> {
        self.envmap.as_ref().map(|envmap| envmap as &dyn Envmap)
    }

    fn bounds(&self) -> Option<(Vec3, Vec3)> {
        Some((vec3(-5.0, -5.0, -1.0), vec3(5.0, 5.0, 2.0)))
    }
}

/// Wrapper counting the shadow rays traced through it.
#[derive(Debug, Default)]
pub struct CountingWorld<W> {
    pub inner: W,
    pub occlusion_queries: AtomicUsize,
}

impl<W> CountingWorld<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            occlusion_queries: AtomicUsize::new(0),
        }
    }

    pub fn occlusion_queries(&self) -> usize {
        self.occlusion_queries.load(Ordering::Relaxed)
    }
}

impl<W> EmitterSampler for CountingWorld<W>
where
    W: EmitterSampler,
{
    fn sample_emitter(&self, noise: &mut Noise) -> EmitterSample {
        self.inner.sample_emitter(noise)
    }
}

impl<W> Emitters for CountingWorld<W>
where
    W: Emitters,
{
    fn emitter_pdf(&self, emitter: EmitterId) -> f32 {
        self.inner.emitter_pdf(emitter)
    }

    fn emission(&self, emitter: EmitterId) -> Vec3 {
        self.inner.emission(emitter)
    }
}

impl<W> Materials for CountingWorld<W>
where
    W: Materials,
{
    fn eval_bsdf(&self, surface: &Surface, wo: Vec3, wi: Vec3) -> BsdfEval {
        self.inner.eval_bsdf(surface, wo, wi)
    }

    fn sample_bsdf(
        &self,
        surface: &Surface,
        wo: Vec3,
        noise: &mut Noise,
    ) -> BsdfSample {
        self.inner.sample_bsdf(surface, wo, noise)
    }

    fn can_sample_lights(&self, material: MaterialId) -> bool {
        self.inner.can_sample_lights(material)
    }
}

impl<W> Tracer for CountingWorld<W>
where
    W: Tracer,
{
    fn occluded(
        &self,
        ray: Ray,
        max_distance: f32,
        excluded: PrimitiveId,
    ) -> bool {
        self.occlusion_queries.fetch_add(1, Ordering::Relaxed);
        self.inner.occluded(ray, max_distance, excluded)
    }

    fn trace(&self, ray: Ray, excluded: PrimitiveId) -> Option<TraceHit> {
        self.inner.trace(ray, excluded)
    }
}

impl<W> World for CountingWorld<W>
where
    W: World,
{
    fn envmap(&self) -> Option<&dyn Envmap> {
        self.inner.envmap()
    }

    fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.inner.bounds()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::UVec2;

    use super::*;

    #[test]
    fn small_triangle_projected_solid_angle() {
        let tri = Triangle::new(
            vec3(-0.01, -0.01, 10.0),
            vec3(0.01, -0.01, 10.0),
            vec3(0.0, 0.01, 10.0),
        );

        let expected = tri.area() / 100.0;

        assert_relative_eq!(
            tri.projected_solid_angle(Vec3::ZERO, Vec3::Z),
            expected,
            max_relative = 0.01,
        );
    }

    #[test]
    fn projected_solid_angle_matches_monte_carlo() {
        let world = TriangleWorld::default();
        let surface = TriangleWorld::surface_at(Vec3::ZERO);
        let mut noise = Noise::new(7, UVec2::ZERO);
        let n = 200_000;
        let mut hits = 0;

        // With cosine-weighted directions, the fraction hitting the light is
        // its projected solid angle divided by pi
        for _ in 0..n {
            let dir = noise.sample_cosine_hemisphere(Vec3::Z);

            if world.light.intersect(Ray::new(surface.point, dir)).is_some() {
                hits += 1;
            }
        }

        assert_relative_eq!(
            (hits as f32) / (n as f32) * PI,
            world.light.projected_solid_angle(Vec3::ZERO, Vec3::Z),
            max_relative = 0.02,
        );
    }

    #[test]
    fn tracing() {
        let world = TriangleWorld::default().with_occluder();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let hit = world.trace(ray, TriangleWorld::floor_primitive()).unwrap();

        assert_eq!(TriangleWorld::occluder_primitive(), hit.primitive);
        assert_eq!(None, hit.emitter);
        assert_relative_eq!(hit.distance, 0.5);

        let hit = world
            .trace(ray, TriangleWorld::occluder_primitive())
            .unwrap();

        assert_eq!(Some(TriangleWorld::light_emitter()), hit.emitter);
        assert!(world.occluded(ray, 0.75, TriangleWorld::floor_primitive()));
        assert!(!world.occluded(ray, 0.25, TriangleWorld::floor_primitive()));
    }
}
