use glam::Vec3;

use crate::EmitterId;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PrimitiveId(u32);

impl PrimitiveId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Nearest intersection found by [`Tracer::trace()`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TraceHit {
    pub distance: f32,
    pub point: Vec3,

    /// Geometric normal at the hit point.
    pub normal: Vec3,

    pub primitive: PrimitiveId,

    /// Emitter hit by the ray, if the primitive is emissive.
    pub emitter: Option<EmitterId>,

    /// Radiance emitted towards the ray's origin.
    pub emission: Vec3,
}

/// Ray-scene intersection, provided by the caller.
pub trait Tracer {
    /// Returns whether anything lies along the ray closer than
    /// `max_distance`, ignoring `excluded` (the primitive the ray starts
    /// from).
    fn occluded(
        &self,
        ray: Ray,
        max_distance: f32,
        excluded: PrimitiveId,
    ) -> bool;

    /// Returns the nearest hit along the ray, ignoring `excluded`.
    fn trace(&self, ray: Ray, excluded: PrimitiveId) -> Option<TraceHit>;
}
