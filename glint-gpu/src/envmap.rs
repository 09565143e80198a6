use glam::Vec3;

use crate::Noise;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnvmapSample {
    pub direction: Vec3,
    pub radiance: Vec3,

    /// Probability density in solid-angle measure.
    pub pdf: f32,
}

/// Environment map, provided by the caller.
pub trait Envmap {
    /// Returns radiance arriving from given direction and the solid-angle pdf
    /// with which [`Self::sample()`] would pick it.
    fn eval(&self, direction: Vec3) -> (Vec3, f32);

    fn sample(&self, noise: &mut Noise) -> EnvmapSample;
}
