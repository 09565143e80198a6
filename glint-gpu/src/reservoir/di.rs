use core::ops::{Deref, DerefMut};

use glam::Vec3;

use crate::{EmitterId, Reservoir, ReservoirSample};

/// Reservoir used for direct illumination.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DiReservoir {
    pub reservoir: Reservoir<DiSample>,
}

impl DiReservoir {
    /// Returns this reservoir with its sample prepared for being reused on
    /// another pixel (see [`DiSample::reconnected()`]).
    pub fn reconnected(mut self) -> Self {
        self.reservoir.sample = self.reservoir.sample.reconnected();
        self
    }

    /// Marks this reservoir as having no sample, keeping its statistics.
    pub fn invalidate(&mut self) {
        self.reservoir.ucw = 0.0;
    }
}

impl Deref for DiReservoir {
    type Target = Reservoir<DiSample>;

    fn deref(&self) -> &Self::Target {
        &self.reservoir
    }
}

impl DerefMut for DiReservoir {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.reservoir
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DiSample {
    /// Point on the emitter or, for environment-map samples, the direction
    /// towards the environment
    pub point: Vec3,

    /// Emitter's geometric normal at `point`; unused for environment-map
    /// samples
    pub light_normal: Vec3,

    pub emitter: EmitterId,
    pub technique: Technique,
    pub origin: SampleOrigin,

    /// Target function of this sample on the pixel that owns the reservoir
    pub target: f32,
}

impl DiSample {
    pub fn is_envmap(&self) -> bool {
        self.technique == Technique::Envmap
    }

    /// Returns the normalized direction from `origin` towards this sample
    /// together with the distance to it (infinite for environment-map
    /// samples).
    ///
    /// Returns a zero distance if the sample coincides with `origin`.
    pub fn direction_from(&self, origin: Vec3) -> (Vec3, f32) {
        match self.technique {
            Technique::Envmap => (self.point, f32::INFINITY),

            Technique::Emissive => {
                let delta = self.point - origin;
                let distance = delta.length();

                if distance > 0.0 {
                    (delta / distance, distance)
                } else {
                    (Vec3::ZERO, 0.0)
                }
            }
        }
    }

    /// Returns this sample as seen from another shading point.
    ///
    /// BSDF payloads describe the ray traced from the pixel that generated
    /// the sample, so they get dropped and the sample becomes a plain
    /// light-origin one: its BSDF and visibility are re-evaluated wherever
    /// it gets used.
    pub fn reconnected(self) -> Self {
        Self {
            origin: SampleOrigin::Light,
            ..self
        }
    }
}

impl ReservoirSample for DiSample {
    fn target_function(&self) -> f32 {
        self.target
    }

    fn with_target_function(self, target: f32) -> Self {
        Self { target, ..self }
    }
}

/// Which light-sampling strategy can produce the sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Technique {
    #[default]
    Emissive,
    Envmap,
}

/// How the sample was found.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SampleOrigin {
    /// Sampled on a light (or the environment map) and not yet tested for
    /// visibility.
    #[default]
    Light,

    /// Found by tracing a BSDF-sampled ray, which makes it visible by
    /// construction.
    Bsdf(BsdfPayload),
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BsdfPayload {
    /// BSDF value towards the sample
    pub value: Vec3,

    /// Absolute cosine between the shading normal and the sampled direction
    pub cosine: f32,

    /// Whether the sampled direction goes through the surface
    pub is_refraction: bool,
}
