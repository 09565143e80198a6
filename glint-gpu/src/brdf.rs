use core::f32::consts::PI;

use glam::Vec3;

use crate::{BsdfEval, BsdfSample, Noise, GLINT_EPSILON};

/// Lambertian reflector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LambertBrdf {
    albedo: Vec3,
}

impl LambertBrdf {
    pub fn new(albedo: Vec3) -> Self {
        Self { albedo }
    }

    pub fn eval(self, normal: Vec3, wi: Vec3) -> BsdfEval {
        let cos = normal.dot(wi);

        if cos <= GLINT_EPSILON {
            return BsdfEval::default();
        }

        BsdfEval {
            value: self.albedo / PI,
            pdf: cos / PI,
        }
    }

    pub fn sample(self, normal: Vec3, noise: &mut Noise) -> BsdfSample {
        let direction = noise.sample_cosine_hemisphere(normal);
        let eval = self.eval(normal, direction);

        BsdfSample {
            direction,
            value: eval.value,
            pdf: eval.pdf,
        }
    }
}
