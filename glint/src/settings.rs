use log::warn;

use crate::gpu;
use crate::VisibilityGridSettings;

/// Renderer's configuration.
///
/// Can be changed between frames through [`crate::Renderer::update()`];
/// changes that affect the layout of reservoir buffers (see
/// [`Settings::is_invalidated_by()`]) reset the accumulated history.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub ris: RisSettings,
    pub temporal: TemporalSettings,
    pub spatial: SpatialSettings,

    /// Replaces the temporal pass and the first spatial pass with a single
    /// pass that reads both the temporal and the spatial neighbors from the
    /// previous frame; requires both temporal and spatial reuse to be
    /// enabled.
    pub fused_spatiotemporal: bool,

    pub light_presampling: LightPresamplingSettings,
    pub russian_roulette: gpu::RussianRouletteSettings,
    pub bias_correction: gpu::BiasCorrection,

    /// Interactive mode: one candidate of each kind and no visibility in the
    /// initial candidates.
    pub low_resolution: bool,

    /// Whether the final shading traces shadow rays; without them, light
    /// leaks through occluders.
    pub final_shading_visibility: bool,

    pub use_envmap: bool,
    pub use_visibility_cache: bool,
    pub visibility_cache: VisibilityGridSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ris: Default::default(),
            temporal: Default::default(),
            spatial: Default::default(),
            fused_spatiotemporal: false,
            light_presampling: Default::default(),
            russian_roulette: Default::default(),
            bias_correction: Default::default(),
            low_resolution: false,
            final_shading_visibility: true,
            use_envmap: false,
            use_visibility_cache: false,
            visibility_cache: Default::default(),
        }
    }
}

impl Settings {
    /// Returns these settings with invalid values clamped into their valid
    /// ranges.
    pub fn validated(mut self) -> Self {
        let ris = &mut self.ris;

        if !(0.0..=1.0).contains(&ris.envmap_candidate_probability) {
            warn!(
                "envmap_candidate_probability out of range ({}), clamping",
                ris.envmap_candidate_probability
            );

            ris.envmap_candidate_probability = if ris
                .envmap_candidate_probability
                .is_nan()
            {
                0.0
            } else {
                ris.envmap_candidate_probability.clamp(0.0, 1.0)
            };
        }

        if !(ris.minimum_light_contribution >= 0.0) {
            warn!(
                "minimum_light_contribution must be non-negative ({}), \
                 disabling",
                ris.minimum_light_contribution
            );

            ris.minimum_light_contribution = 0.0;
        }

        if !(self.temporal.m_cap >= 0.0) {
            warn!(
                "temporal m_cap must be non-negative ({}), disabling",
                self.temporal.m_cap
            );

            self.temporal.m_cap = 0.0;
        }

        let spatial = &mut self.spatial;

        if spatial.neighbors as usize > gpu::MAX_SPATIAL_NEIGHBORS {
            warn!(
                "too many spatial neighbors ({}), clamping to {}",
                spatial.neighbors,
                gpu::MAX_SPATIAL_NEIGHBORS
            );

            spatial.neighbors = gpu::MAX_SPATIAL_NEIGHBORS as u32;
        }

        if !(spatial.radius >= 1.0) {
            warn!("spatial radius too small ({}), clamping", spatial.radius);

            spatial.radius = 1.0;
        }

        if spatial.enabled && spatial.passes == 0 {
            warn!("spatial reuse enabled with zero passes, disabling");

            spatial.enabled = false;
        }

        if self.fused_spatiotemporal
            && !(self.temporal.enabled && self.spatial.enabled)
        {
            warn!(
                "fused spatiotemporal reuse requires both temporal and \
                 spatial reuse, disabling"
            );

            self.fused_spatiotemporal = false;
        }

        let presampling = &mut self.light_presampling;

        if presampling.subsets == 0
            || presampling.subset_size == 0
            || presampling.tile_size == 0
        {
            warn!("light presampling sizes must be positive, clamping");

            presampling.subsets = presampling.subsets.max(1);
            presampling.subset_size = presampling.subset_size.max(1);
            presampling.tile_size = presampling.tile_size.max(1);
        }

        if !(self.russian_roulette.throughput_clamp >= 0.0) {
            warn!(
                "russian roulette throughput clamp must be non-negative ({}), \
                 disabling",
                self.russian_roulette.throughput_clamp
            );

            self.russian_roulette.throughput_clamp = 0.0;
        }

        self.visibility_cache = self.visibility_cache.validated();
        self
    }

    /// Returns whether switching from `self` to `new` requires resetting
    /// the reservoir buffers and the frame history.
    pub fn is_invalidated_by(&self, new: &Self) -> bool {
        self.temporal.enabled != new.temporal.enabled
            || self.spatial.enabled != new.spatial.enabled
            || self.spatial.passes != new.spatial.passes
            || self.fused_spatiotemporal != new.fused_spatiotemporal
            || self.light_presampling.enabled != new.light_presampling.enabled
            || self.light_presampling.subsets != new.light_presampling.subsets
            || self.light_presampling.subset_size
                != new.light_presampling.subset_size
            || self.use_envmap != new.use_envmap
            || self.use_visibility_cache != new.use_visibility_cache
            || self.visibility_cache != new.visibility_cache
    }

    /// Returns whether temporal reuse and the first spatial pass get fused
    /// into a single pass.
    pub fn is_fused(&self) -> bool {
        self.fused_spatiotemporal
            && self.temporal.enabled
            && self.spatial_passes() > 0
    }

    pub(crate) fn ris(&self) -> gpu::RisSettings {
        gpu::RisSettings {
            light_candidates: self.ris.light_candidates,
            bsdf_candidates: self.ris.bsdf_candidates,
            minimum_light_contribution: self.ris.minimum_light_contribution,
            use_visibility: self.ris.use_visibility,
            use_envmap: self.use_envmap,
            envmap_candidate_probability: self.ris.envmap_candidate_probability,
            low_resolution: self.low_resolution,
        }
    }

    pub(crate) fn reuse(&self) -> gpu::ReuseSettings {
        gpu::ReuseSettings {
            bias_correction: self.bias_correction,
            temporal_m_cap: self.temporal.m_cap,
            spatial_neighbors: self.spatial.neighbors,
            spatial_radius: self.spatial.radius,
            normal_threshold: self.spatial.normal_threshold,
            depth_threshold: self.spatial.depth_threshold,
            use_envmap: self.use_envmap,
        }
    }

    pub(crate) fn shading(&self) -> gpu::ShadingSettings {
        gpu::ShadingSettings {
            visibility: self.final_shading_visibility,
            use_envmap: self.use_envmap,
        }
    }

    pub(crate) fn spatial_passes(&self) -> u32 {
        if self.spatial.enabled {
            self.spatial.passes
        } else {
            0
        }
    }
}

/// Configuration of the initial candidates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RisSettings {
    pub light_candidates: u32,
    pub bsdf_candidates: u32,

    /// Candidates contributing less than this get discarded; zero keeps all
    /// of them.
    pub minimum_light_contribution: f32,

    /// Whether light candidates get a shadow ray folded into their target
    /// function.
    pub use_visibility: bool,

    /// Probability of drawing a light candidate from the environment map
    /// (when it's enabled) instead of the emissive geometry.
    pub envmap_candidate_probability: f32,
}

impl Default for RisSettings {
    fn default() -> Self {
        let gpu = gpu::RisSettings::default();

        Self {
            light_candidates: gpu.light_candidates,
            bsdf_candidates: gpu.bsdf_candidates,
            minimum_light_contribution: gpu.minimum_light_contribution,
            use_visibility: gpu.use_visibility,
            envmap_candidate_probability: gpu.envmap_candidate_probability,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemporalSettings {
    pub enabled: bool,

    /// Maximum M of the previous frame's reservoirs, in multiples of the
    /// current frame's initial M; zero disables the cap.
    pub m_cap: f32,
}

impl Default for TemporalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            m_cap: gpu::ReuseSettings::default().temporal_m_cap,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialSettings {
    pub enabled: bool,
    pub passes: u32,
    pub neighbors: u32,

    /// Radius, in pixels, of the disk neighbors are picked from.
    pub radius: f32,

    /// Minimum cosine between the normals of reused surfaces.
    pub normal_threshold: f32,

    /// Maximum relative difference between the depths of reused surfaces.
    pub depth_threshold: f32,
}

impl Default for SpatialSettings {
    fn default() -> Self {
        let gpu = gpu::ReuseSettings::default();

        Self {
            enabled: true,
            passes: 1,
            neighbors: gpu.spatial_neighbors,
            radius: gpu.spatial_radius,
            normal_threshold: gpu.normal_threshold,
            depth_threshold: gpu.depth_threshold,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightPresamplingSettings {
    pub enabled: bool,
    pub subsets: u32,
    pub subset_size: u32,

    /// Side of the square tile of pixels sharing the same subset.
    pub tile_size: u32,
}

impl Default for LightPresamplingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            subsets: 128,
            subset_size: 1024,
            tile_size: 8,
        }
    }
}
