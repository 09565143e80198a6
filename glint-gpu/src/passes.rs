use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct LightPresamplingPassParams {
    pub seed: u32,
    pub subsets: u32,
    pub subset_size: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct InitialCandidatesPassParams {
    pub seed: u32,
    pub frame: u32,

    /// Side of the square pixel tile sharing one presampled light subset;
    /// zero when light presampling is disabled.
    pub presampling_tile_size: u32,
}

impl InitialCandidatesPassParams {
    pub fn uses_presampled_lights(&self) -> bool {
        self.presampling_tile_size > 0
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TemporalReusePassParams {
    pub seed: u32,
    pub frame: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SpatialReusePassParams {
    pub seed: u32,
    pub frame: u32,
    pub pass_index: u32,

    /// 1 if this pass merges the previous frame's reservoir together with
    /// the spatial neighbors (fused spatiotemporal reuse), 0 otherwise.
    pub fused: u32,
}

impl SpatialReusePassParams {
    pub fn is_fused(&self) -> bool {
        self.fused == 1
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ShadingPassParams {
    pub seed: u32,
    pub frame: u32,

    /// Path depth of the shaded surfaces; 0 for primary hits.
    pub depth: u32,
}
