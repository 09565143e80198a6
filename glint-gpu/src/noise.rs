use core::f32::consts::PI;

use glam::{vec2, vec3, UVec2, Vec2, Vec3};

/// Per-pixel random number stream (PCG hash).
#[derive(Clone, Copy, Debug)]
pub struct Noise {
    state: u32,
}

impl Noise {
    pub fn new(seed: u32, id: UVec2) -> Self {
        Self {
            state: seed
                ^ 48619u32.wrapping_mul(id.x)
                ^ 95461u32.wrapping_mul(id.y),
        }
    }

    /// Generates a uniform sample in range `<0.0, 1.0)`.
    pub fn sample(&mut self) -> f32 {
        ((self.sample_int() >> 8) as f32) / ((1u32 << 24) as f32)
    }

    /// Generates a uniform sample in range `<0, u32::MAX>`.
    pub fn sample_int(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(747796405)
            .wrapping_add(2891336453);

        let word = ((self.state >> ((self.state >> 28) + 4)) ^ self.state)
            .wrapping_mul(277803737);

        (word >> 22) ^ word
    }

    /// Generates a uniform sample in range `<0, len)`; `len` must be
    /// positive.
    pub fn sample_index(&mut self, len: u32) -> u32 {
        debug_assert!(len > 0);

        ((self.sample() * (len as f32)) as u32).min(len - 1)
    }

    /// Generates a uniform sample on a circle.
    pub fn sample_circle(&mut self) -> Vec2 {
        let angle = self.sample() * PI * 2.0;

        vec2(angle.cos(), angle.sin())
    }

    /// Generates a uniform sample inside of a disk.
    pub fn sample_disk(&mut self) -> Vec2 {
        let radius = self.sample().sqrt();

        self.sample_circle() * radius
    }

    /// Generates a uniform sample on a unit sphere.
    pub fn sample_sphere(&mut self) -> Vec3 {
        let z = 1.0 - 2.0 * self.sample();
        let r = (1.0 - z * z).max(0.0).sqrt();
        let phi = 2.0 * PI * self.sample();

        vec3(r * phi.cos(), r * phi.sin(), z)
    }

    /// Generates a cosine-weighted sample on a hemisphere around given
    /// normal.
    pub fn sample_cosine_hemisphere(&mut self, normal: Vec3) -> Vec3 {
        let disk = self.sample_disk();
        let z = (1.0 - disk.length_squared()).max(0.0).sqrt();
        let (b, t) = normal.any_orthonormal_pair();

        (disk.x * b + disk.y * t + z * normal).normalize()
    }
}
