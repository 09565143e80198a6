use glam::Vec3;

use crate::{Noise, Surface};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaterialId(u32);

impl MaterialId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BsdfEval {
    /// BSDF value (not multiplied by the cosine term).
    pub value: Vec3,

    /// Solid-angle pdf with which [`Materials::sample_bsdf()`] would pick the
    /// evaluated direction.
    pub pdf: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BsdfSample {
    pub direction: Vec3,
    pub value: Vec3,

    /// Solid-angle pdf; zero means that no valid direction got sampled.
    pub pdf: f32,
}

/// Surface scattering, provided by the caller.
///
/// `wo` points towards the viewer and `wi` towards the light; both are
/// normalized.
pub trait Materials {
    fn eval_bsdf(&self, surface: &Surface, wo: Vec3, wi: Vec3) -> BsdfEval;

    fn sample_bsdf(
        &self,
        surface: &Surface,
        wo: Vec3,
        noise: &mut Noise,
    ) -> BsdfSample;

    /// Returns whether light sampling is meaningful for given material;
    /// perfectly specular materials should return `false`.
    fn can_sample_lights(&self, _material: MaterialId) -> bool {
        true
    }
}
