mod passes;

use derivative::Derivative;
use glam::{UVec2, Vec3};
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use self::passes::*;
use crate::gpu::{
    self, pixel_count, BsdfRayReuse, Surface, SurfaceMap, World,
};
use crate::{
    BoundingBox, DoubleBuffered, FrameState, Metrics, PassKind,
    PresampledLights, ReservoirBuffers, Schedule, Settings, VisibilityGrid,
};

/// Direct lighting of a single pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShadedPixel {
    /// Radiance reflected towards the camera.
    pub radiance: Vec3,

    /// Continuation of the path past the primary hit; `None` if there was
    /// no BSDF ray or the path got terminated.
    pub bounce: Option<PathBounce>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathBounce {
    pub direction: Vec3,

    /// Throughput of the path after this bounce relative to the shaded
    /// surface, already compensated for Russian roulette.
    pub throughput: Vec3,

    /// Path depth of the surface this bounce leads to; pass it to
    /// [`Renderer::render_at_depth()`] when shading that surface.
    pub depth: u32,

    /// The BSDF ray traced towards `direction` while generating candidates.
    pub ray: BsdfRayReuse,
}

/// Frame-level driver: owns the reservoir buffers and runs the passes of
/// each frame over them.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Renderer {
    settings: Settings,
    size: UVec2,
    buffers: ReservoirBuffers,

    #[derivative(Debug = "ignore")]
    surfaces: DoubleBuffered<Vec<Option<Surface>>>,

    #[derivative(Debug = "ignore")]
    bounces: Vec<BsdfRayReuse>,

    /// Allocated only while light presampling is enabled.
    presampled: Option<PresampledLights>,

    visibility: Option<VisibilityGrid>,
    state: FrameState,

    #[derivative(Debug = "ignore")]
    rng: SmallRng,

    metrics: Metrics,
}

impl Renderer {
    pub fn new(settings: Settings, size: UVec2) -> Self {
        Self::build(settings, size, SmallRng::from_entropy())
    }

    /// Creates a renderer whose frames are reproducible.
    pub fn with_seed(settings: Settings, size: UVec2, seed: u64) -> Self {
        Self::build(settings, size, SmallRng::seed_from_u64(seed))
    }

    fn build(settings: Settings, size: UVec2, rng: SmallRng) -> Self {
        info!("Creating renderer ({}x{})", size.x, size.y);

        let settings = settings.validated();
        let len = pixel_count(size);

        let mut this = Self {
            settings,
            size,
            buffers: ReservoirBuffers::new(len),
            surfaces: DoubleBuffered::new(vec![None; len], vec![None; len]),
            bounces: vec![Default::default(); len],
            presampled: None,
            visibility: None,
            state: Default::default(),
            rng,
            metrics: Default::default(),
        };

        this.sync_presampled_lights();
        this
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    pub fn visibility_grid(&self) -> Option<&VisibilityGrid> {
        self.visibility.as_ref()
    }

    pub fn presampled_lights(&self) -> Option<&PresampledLights> {
        self.presampled.as_ref()
    }

    /// Returns the reservoirs the last frame has been shaded with.
    pub fn final_reservoirs(&self) -> &[gpu::DiReservoir] {
        self.buffers.get(self.state.temporal_input)
    }

    pub fn update(&mut self, settings: Settings) {
        let settings = settings.validated();

        if settings == self.settings {
            return;
        }

        let invalidated = self.settings.is_invalidated_by(&settings);

        self.settings = settings;
        self.sync_presampled_lights();

        if invalidated {
            debug!("Settings changed in an incompatible way, resetting");

            self.reset();
        }
    }

    pub fn resize(&mut self, size: UVec2) {
        if size == self.size {
            return;
        }

        debug!(
            "Resizing renderer: {}x{} -> {}x{}",
            self.size.x, self.size.y, size.x, size.y
        );

        let len = pixel_count(size);

        self.size = size;
        self.buffers = ReservoirBuffers::new(len);
        self.surfaces = DoubleBuffered::new(vec![None; len], vec![None; len]);
        self.bounces = vec![Default::default(); len];
        self.state = Default::default();
    }

    /// Forgets all history, e.g. after a camera cut or scene change.
    pub fn reset(&mut self) {
        debug!("Resetting renderer");

        self.buffers.clear();
        self.surfaces.for_each_mut(|surfaces| surfaces.fill(None));
        self.bounces.fill(Default::default());
        self.visibility = None;
        self.state = Default::default();
    }

    /// Renders a frame of direct lighting for given primary hits (one per
    /// pixel, row-major; `None` for pixels that didn't hit anything).
    pub fn render<W>(
        &mut self,
        world: &W,
        gbuffer: &[Option<Surface>],
    ) -> Vec<ShadedPixel>
    where
        W: World,
    {
        self.render_at_depth(world, gbuffer, 0)
    }

    /// Renders a frame of direct lighting for surfaces found `depth` bounces
    /// into their paths; Russian roulette applies from
    /// [`gpu::RussianRouletteSettings::min_depth`] on.
    ///
    /// Reservoir history is shared by all calls, so a renderer should always
    /// be fed surfaces of the same depth.
    pub fn render_at_depth<W>(
        &mut self,
        world: &W,
        gbuffer: &[Option<Surface>],
        depth: u32,
    ) -> Vec<ShadedPixel>
    where
        W: World,
    {
        assert_eq!(
            gbuffer.len(),
            self.buffers.len(),
            "G-buffer doesn't match renderer's size"
        );

        let schedule = Schedule::plan(&self.settings, &self.state);

        debug!(
            "Rendering frame {} at depth {} ({} pass(es), final output: {:?})",
            self.state.frame,
            depth,
            schedule.passes.len(),
            schedule.final_output
        );

        if self.settings.use_visibility_cache {
            self.prepare_visibility_grid(world);
        } else {
            self.visibility = None;
        }

        let settings = &self.settings;
        let frame = self.state.frame;

        if let Some(presampled) = &mut self.presampled {
            let timer = Metrics::start();

            let params = gpu::LightPresamplingPassParams {
                seed: self.rng.gen(),
                subsets: settings.light_presampling.subsets,
                subset_size: settings.light_presampling.subset_size,
            };

            run_light_presampling(world, presampled, &params);

            self.metrics.record("light_presampling", timer);
        }

        let (surfaces, prev_surfaces) =
            self.surfaces.split_mut(frame % 2 == 1);

        surfaces.copy_from_slice(gbuffer);

        let ctx = FrameContext {
            world,
            settings,
            reuse: settings.reuse(),
            surfaces: SurfaceMap::new(surfaces, self.size),
            prev_surfaces: SurfaceMap::new(prev_surfaces, self.size),
        };

        let presampling_tile_size = if settings.light_presampling.enabled {
            settings.light_presampling.tile_size
        } else {
            0
        };

        for pass in &schedule.passes {
            let timer = Metrics::start();
            let seed = self.rng.gen();

            match pass.kind {
                PassKind::InitialCandidates => {
                    let params = gpu::InitialCandidatesPassParams {
                        seed,
                        frame,
                        presampling_tile_size,
                    };

                    run_initial_candidates(
                        &ctx,
                        self.presampled.as_ref(),
                        self.buffers.get_mut(pass.output),
                        &mut self.bounces,
                        &params,
                    );
                }

                PassKind::TemporalReuse => {
                    let Some(input) = pass.input else {
                        continue;
                    };

                    let params = gpu::TemporalReusePassParams { seed, frame };

                    run_temporal_reuse(
                        &ctx,
                        self.buffers.bind(input, pass.canonical, pass.output),
                        &params,
                    );
                }

                PassKind::SpatialReuse | PassKind::FusedSpatiotemporalReuse => {
                    let Some(input) = pass.input else {
                        continue;
                    };

                    let params = gpu::SpatialReusePassParams {
                        seed,
                        frame,
                        pass_index: pass.index,
                        fused: (pass.kind
                            == PassKind::FusedSpatiotemporalReuse)
                            as u32,
                    };

                    run_spatial_reuse(
                        &ctx,
                        self.buffers.bind(input, pass.canonical, pass.output),
                        &params,
                    );
                }
            }

            self.metrics.record(pass.kind.name(), timer);
        }

        let timer = Metrics::start();

        let params = gpu::ShadingPassParams {
            seed: self.rng.gen(),
            frame,
            depth,
        };

        let cache = self
            .visibility
            .as_ref()
            .map(|grid| grid as &dyn gpu::VisibilityCache);

        let shaded = run_shading(
            &ctx,
            self.buffers.get_mut(schedule.final_output),
            &self.bounces,
            cache,
            &params,
        );

        self.metrics.record("shading", timer);
        self.metrics.report();
        self.state.advance(&schedule);

        shaded
    }

    fn sync_presampled_lights(&mut self) {
        let settings = &self.settings.light_presampling;

        if !settings.enabled {
            self.presampled = None;
            return;
        }

        match &mut self.presampled {
            Some(presampled) => {
                presampled.resize(settings.subsets, settings.subset_size);
            }

            None => {
                self.presampled = Some(PresampledLights::new(settings));
            }
        }
    }

    fn prepare_visibility_grid<W>(&mut self, world: &W)
    where
        W: World,
    {
        let Some((min, max)) = world.bounds() else {
            self.visibility = None;
            return;
        };

        let bounds = BoundingBox::new(min, max);

        let is_stale = self
            .visibility
            .as_ref()
            .map_or(true, |grid| grid.bounds() != bounds);

        if is_stale {
            self.visibility = Some(VisibilityGrid::new(
                self.settings.visibility_cache,
                bounds,
            ));
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        info!("Deleting renderer ({}x{})", self.size.x, self.size.y);
    }
}
