use glam::{IVec2, UVec2, Vec3};

use crate::{MaterialId, PrimitiveId};

/// Primary hit of a pixel, as produced by the caller's G-buffer pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Surface {
    pub point: Vec3,
    pub shading_normal: Vec3,
    pub geometric_normal: Vec3,

    /// Normalized direction from the surface towards the viewer.
    pub view: Vec3,

    /// Distance from the camera.
    pub depth: f32,

    pub material: MaterialId,
    pub primitive: PrimitiveId,
}

impl Surface {
    /// How far rays spawned from this surface are pushed away from it.
    pub const NUDGE_OFFSET: f32 = 0.0001;

    /// Returns whether we're looking at the back side of the surface (e.g.
    /// from inside of a glass object).
    pub fn is_backfacing(&self) -> bool {
        self.view.dot(self.geometric_normal) < 0.0
    }

    /// Returns the shading normal flipped towards the viewer.
    pub fn facing_normal(&self) -> Vec3 {
        if self.is_backfacing() {
            -self.shading_normal
        } else {
            self.shading_normal
        }
    }

    /// Returns the origin for rays leaving this surface in given direction.
    pub fn ray_origin(&self, direction: Vec3) -> Vec3 {
        let normal = if self.is_backfacing() {
            -self.geometric_normal
        } else {
            self.geometric_normal
        };

        let normal = if direction.dot(normal) < 0.0 {
            -normal
        } else {
            normal
        };

        self.point + normal * Self::NUDGE_OFFSET
    }

    /// Returns whether `other` is similar enough to this surface for their
    /// reservoirs to be reused between each other.
    ///
    /// `normal_threshold` is the minimum cosine between both normals and
    /// `depth_threshold` is the maximum relative difference of depths.
    pub fn is_similar_to(
        &self,
        other: &Self,
        normal_threshold: f32,
        depth_threshold: f32,
    ) -> bool {
        if self.shading_normal.dot(other.shading_normal) < normal_threshold {
            return false;
        }

        let depth = self.depth.max(other.depth);

        (self.depth - other.depth).abs() <= depth_threshold * depth
    }
}

/// Returns the number of pixels in an image of given size.
pub fn pixel_count(size: UVec2) -> usize {
    (size.x as usize) * (size.y as usize)
}

/// Screen-space view over per-pixel surfaces; pixels that didn't hit
/// anything are `None`.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceMap<'a> {
    items: &'a [Option<Surface>],
    size: UVec2,
}

impl<'a> SurfaceMap<'a> {
    pub fn new(items: &'a [Option<Surface>], size: UVec2) -> Self {
        assert_eq!(items.len(), pixel_count(size));

        Self { items, size }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn contains(&self, pos: IVec2) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && (pos.x as u32) < self.size.x
            && (pos.y as u32) < self.size.y
    }

    pub fn index(&self, pos: UVec2) -> usize {
        (pos.y as usize) * (self.size.x as usize) + (pos.x as usize)
    }

    pub fn pixel(&self, index: usize) -> UVec2 {
        let width = self.size.x as usize;

        UVec2::new((index % width) as u32, (index / width) as u32)
    }

    pub fn get(&self, pos: UVec2) -> Option<&'a Surface> {
        self.items.get(self.index(pos))?.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use glam::{ivec2, uvec2, vec3};

    use super::*;

    fn surface(normal: Vec3, depth: f32) -> Surface {
        Surface {
            shading_normal: normal,
            geometric_normal: normal,
            view: normal,
            depth,
            ..Default::default()
        }
    }

    #[test]
    fn similarity() {
        let a = surface(Vec3::Z, 10.0);

        assert!(a.is_similar_to(&surface(Vec3::Z, 10.5), 0.9, 0.1));
        assert!(!a.is_similar_to(&surface(Vec3::Z, 15.0), 0.9, 0.1));
        assert!(!a.is_similar_to(&surface(Vec3::X, 10.0), 0.9, 0.1));
    }

    #[test]
    fn facing_normal_flips_for_backfaces() {
        let mut s = surface(Vec3::Z, 1.0);

        s.view = -Vec3::Z;

        assert!(s.is_backfacing());
        assert_eq!(-Vec3::Z, s.facing_normal());
        assert!(s.ray_origin(vec3(0.0, 0.0, -1.0)).z < 0.0);
        assert!(s.ray_origin(vec3(0.0, 0.0, 1.0)).z > 0.0);
    }

    #[test]
    fn map_lookups() {
        let items = [Some(surface(Vec3::Z, 1.0)), None, None, None];
        let map = SurfaceMap::new(&items, uvec2(2, 2));

        assert!(map.get(uvec2(0, 0)).is_some());
        assert!(map.get(uvec2(1, 0)).is_none());
        assert!(map.contains(ivec2(1, 1)));
        assert!(!map.contains(ivec2(2, 0)));
        assert!(!map.contains(ivec2(0, -1)));
        assert_eq!(uvec2(1, 1), map.pixel(3));
    }

    #[test]
    fn pixel_counts_beyond_u32() {
        assert_eq!(0, pixel_count(uvec2(0, 100)));
        assert_eq!(6, pixel_count(uvec2(2, 3)));

        // 70000^2 doesn't fit in u32
        #[cfg(target_pointer_width = "64")]
        assert_eq!(4_900_000_000, pixel_count(uvec2(70_000, 70_000)));
    }
}
