use glam::Vec3;

use crate::Noise;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EmitterId(u32);

impl EmitterId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Point sampled on an emissive primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EmitterSample {
    pub point: Vec3,
    pub normal: Vec3,
    pub emission: Vec3,
    pub emitter: EmitterId,

    /// Probability density of having picked this point, in area measure;
    /// zero for degenerate (e.g. zero-area) emitters.
    pub pdf: f32,
}

/// Source of emitter samples.
///
/// Implemented by the world itself (sampling from the full, power-weighted
/// distribution of emitters) and by presampled subsets of it.
pub trait EmitterSampler {
    fn sample_emitter(&self, noise: &mut Noise) -> EmitterSample;
}

/// Emissive geometry of the scene, provided by the caller.
pub trait Emitters: EmitterSampler {
    /// Returns the area-measure pdf with which
    /// [`EmitterSampler::sample_emitter()`] picks a point on given emitter.
    fn emitter_pdf(&self, emitter: EmitterId) -> f32;

    fn emission(&self, emitter: EmitterId) -> Vec3;
}
