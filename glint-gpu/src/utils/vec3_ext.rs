use glam::{vec3, Vec3};

pub trait Vec3Ext
where
    Self: Sized,
{
    /// Returns luminance of this color-vector.
    fn luma(self) -> f32;

    /// Returns whether all components of this color-vector are zero.
    fn is_black(self) -> bool;
}

impl Vec3Ext for Vec3 {
    fn luma(self) -> f32 {
        self.dot(vec3(0.2126, 0.7152, 0.0722))
    }

    fn is_black(self) -> bool {
        self == Vec3::ZERO
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn luma_of_white_is_one() {
        assert_relative_eq!(Vec3::ONE.luma(), 1.0, epsilon = 0.0001);
    }
}
