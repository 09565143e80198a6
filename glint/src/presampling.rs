use derivative::Derivative;
use glam::{uvec2, UVec2};
use log::debug;
use rayon::prelude::*;

use crate::gpu::{self, EmitterSample, EmitterSampler, Noise};
use crate::LightPresamplingSettings;

/// Emitter samples drawn once per frame and shared by tiles of pixels, so
/// that neighboring pixels pick their light candidates from the same, small
/// set.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PresampledLights {
    #[derivative(Debug = "ignore")]
    samples: Vec<EmitterSample>,

    subsets: u32,
    subset_size: u32,
}

impl PresampledLights {
    pub fn new(settings: &LightPresamplingSettings) -> Self {
        let mut this = Self {
            samples: Vec::new(),
            subsets: 0,
            subset_size: 0,
        };

        this.resize(settings.subsets, settings.subset_size);
        this
    }

    pub fn resize(&mut self, subsets: u32, subset_size: u32) {
        if self.subsets == subsets && self.subset_size == subset_size {
            return;
        }

        debug!(
            "Allocating presampled lights ({subsets} subset(s) of \
             {subset_size} sample(s))"
        );

        self.subsets = subsets;
        self.subset_size = subset_size;

        self.samples.clear();
        self.samples.resize(
            (subsets as usize) * (subset_size as usize),
            Default::default(),
        );
    }

    pub fn subsets(&self) -> u32 {
        self.subsets
    }

    pub fn subset_size(&self) -> u32 {
        self.subset_size
    }

    /// Draws all samples anew from the world's emitter distribution.
    pub fn regenerate<L>(
        &mut self,
        lights: &L,
        params: &gpu::LightPresamplingPassParams,
    ) where
        L: EmitterSampler + Sync + ?Sized,
    {
        self.resize(params.subsets, params.subset_size);

        if self.samples.is_empty() {
            return;
        }

        self.samples
            .par_chunks_mut(self.subset_size as usize)
            .enumerate()
            .for_each(|(subset, samples)| {
                let mut noise =
                    Noise::new(params.seed, uvec2(subset as u32, 0));

                for sample in samples {
                    *sample = lights.sample_emitter(&mut noise);
                }
            });
    }

    pub fn subset(&self, index: u32) -> LightSubset<'_> {
        if self.subsets == 0 {
            return LightSubset { samples: &[] };
        }

        let size = self.subset_size as usize;
        let offset = (index % self.subsets) as usize * size;

        LightSubset {
            samples: &self.samples[offset..offset + size],
        }
    }

    /// Returns the subset given pixel draws its light candidates from; all
    /// pixels within the same `tile_size`×`tile_size` tile share it.
    pub fn subset_for(
        &self,
        pixel: UVec2,
        tile_size: u32,
        seed: u32,
    ) -> LightSubset<'_> {
        if self.subsets == 0 {
            return LightSubset { samples: &[] };
        }

        let tile = pixel / tile_size.max(1);
        let mut noise = Noise::new(seed, tile);

        self.subset(noise.sample_index(self.subsets))
    }
}

/// Subset of [`PresampledLights`], sampled uniformly.
///
/// Each sample keeps the area pdf it was originally drawn with: picking a
/// uniformly random element out of independent draws from a distribution is
/// still distributed according to it.
#[derive(Clone, Copy, Debug)]
pub struct LightSubset<'a> {
    samples: &'a [EmitterSample],
}

impl LightSubset<'_> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

impl EmitterSampler for LightSubset<'_> {
    fn sample_emitter(&self, noise: &mut Noise) -> EmitterSample {
        if self.samples.is_empty() {
            return Default::default();
        }

        let idx = noise.sample_index(self.samples.len() as u32) as usize;

        self.samples[idx]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;
    use crate::gpu::testing::TriangleWorld;
    use crate::gpu::Emitters;

    fn params(
        subsets: u32,
        subset_size: u32,
    ) -> gpu::LightPresamplingPassParams {
        gpu::LightPresamplingPassParams {
            seed: 1234,
            subsets,
            subset_size,
        }
    }

    #[test]
    fn regenerate() {
        let world = TriangleWorld::default();

        let mut target = PresampledLights::new(&LightPresamplingSettings {
            enabled: true,
            subsets: 4,
            subset_size: 16,
            tile_size: 8,
        });

        target.regenerate(&world, &params(4, 16));

        let pdf = world.emitter_pdf(TriangleWorld::light_emitter());

        for index in 0..4 {
            let subset = target.subset(index);

            assert_eq!(16, subset.len());

            for sample in subset.samples {
                assert_eq!(pdf, sample.pdf);
                assert_relative_eq!(1.0, sample.point.z);
            }
        }

        // Different subsets contain different samples
        assert_ne!(target.subset(0).samples, target.subset(1).samples);
    }

    #[test]
    fn regenerate_resizes() {
        let world = TriangleWorld::default();

        let mut target =
            PresampledLights::new(&LightPresamplingSettings::default());

        target.regenerate(&world, &params(2, 3));

        assert_eq!(2, target.subsets());
        assert_eq!(3, target.subset_size());
        assert_eq!(3, target.subset(1).len());
    }

    #[test]
    fn tiles_share_subsets() {
        let world = TriangleWorld::default();

        let mut target =
            PresampledLights::new(&LightPresamplingSettings::default());

        target.regenerate(&world, &params(64, 2));

        let a = target.subset_for(uvec2(0, 0), 8, 5);
        let b = target.subset_for(uvec2(7, 7), 8, 5);

        assert_eq!(a.samples, b.samples);
    }

    #[test]
    fn subset_sampling() {
        let samples = [
            EmitterSample {
                point: vec3(1.0, 0.0, 0.0),
                pdf: 1.0,
                ..Default::default()
            },
            EmitterSample {
                point: vec3(2.0, 0.0, 0.0),
                pdf: 1.0,
                ..Default::default()
            },
        ];

        let subset = LightSubset { samples: &samples };
        let mut noise = Noise::new(0, UVec2::ZERO);
        let mut hits = [0; 2];

        for _ in 0..1000 {
            let sample = subset.sample_emitter(&mut noise);

            hits[sample.point.x as usize - 1] += 1;
        }

        assert!(hits[0] > 400 && hits[1] > 400, "{hits:?}");
    }

    #[test]
    fn empty_subset() {
        let subset = LightSubset { samples: &[] };
        let sample = subset.sample_emitter(&mut Noise::new(0, UVec2::ZERO));

        assert_eq!(0.0, sample.pdf);
    }
}
