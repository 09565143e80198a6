use glam::Vec3;

/// Persistent estimate of the probability that two points see each other,
/// shared by all pixels of a pass (implementations must be lock-free).
pub trait VisibilityCache: Sync {
    /// Returns the probability `<0.0, 1.0>` that the segment between `a` and
    /// `b` is unoccluded.
    fn unoccluded_probability(&self, a: Vec3, b: Vec3) -> f32;

    /// Records the outcome of a traced shadow ray between `a` and `b`.
    fn update(&self, a: Vec3, b: Vec3, visible: bool);
}
