use std::ops::AddAssign;

use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    min: Vec3,
    max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn extent(&self) -> Vec3 {
        self.max() - self.min()
    }

    pub fn is_set(&self) -> bool {
        self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }

    /// Maps `p` from `self.min() ..= self.max()` to `0.0 ..= 1.0`, clamping
    /// points lying outside of the box.
    pub fn map(&self, mut p: Vec3) -> Vec3 {
        p = (p - self.min()) / self.extent();

        // Flat boxes divide zero by zero on their flat axis; all points share
        // that coordinate anyway

        if p.x.is_nan() {
            p.x = 0.0;
        }

        if p.y.is_nan() {
            p.y = 0.0;
        }

        if p.z.is_nan() {
            p.z = 0.0;
        }

        p.clamp(Vec3::ZERO, Vec3::ONE)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(Vec3::MAX, Vec3::MIN)
    }
}

impl AddAssign<Vec3> for BoundingBox {
    fn add_assign(&mut self, rhs: Vec3) {
        self.min = self.min.min(rhs);
        self.max = self.max.max(rhs);
    }
}

impl FromIterator<Vec3> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Vec3>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    #[test]
    fn map() {
        let bb: BoundingBox =
            [vec3(-1.0, 0.0, 2.0), vec3(1.0, 4.0, 2.0)].into_iter().collect();

        assert!(bb.is_set());
        assert!(!BoundingBox::default().is_set());

        assert_eq!(vec3(0.5, 0.25, 0.0), bb.map(vec3(0.0, 1.0, 2.0)));
        assert_eq!(vec3(0.0, 1.0, 0.0), bb.map(vec3(-5.0, 9.0, 2.0)));
    }
}
