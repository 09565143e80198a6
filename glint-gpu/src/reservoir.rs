mod di;
mod mis;

pub use self::di::*;
pub use self::mis::*;
use crate::Noise;

/// Sample that can be kept inside a [`Reservoir`].
pub trait ReservoirSample: Copy {
    /// Returns the (unnormalized) target function this sample was resampled
    /// with.
    fn target_function(&self) -> f32;

    /// Returns this sample with its target function replaced, which is what
    /// happens when a sample gets resampled on another pixel.
    fn with_target_function(self, target: f32) -> Self;
}

/// Streaming weighted reservoir.
///
/// Keeps one of the candidates it was fed with, with probability proportional
/// to the candidate's weight, together with the statistics needed to turn
/// that sample into an unbiased estimator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reservoir<T> {
    pub sample: T,

    /// Sum of the weights of all candidates seen so far
    pub w_sum: f32,

    /// Number of candidates seen so far (including the zero-weight ones)
    pub m: f32,

    /// Unbiased contribution weight of `sample`; valid only after
    /// finalization, zero means "no sample"
    pub ucw: f32,
}

impl<T> Reservoir<T>
where
    T: ReservoirSample,
{
    /// Streams a candidate into this reservoir, returning whether it became
    /// the retained sample.
    ///
    /// Zero-weight candidates are never retained, but they still count
    /// towards `m`.
    pub fn add_candidate(
        &mut self,
        noise: &mut Noise,
        sample: T,
        weight: f32,
    ) -> bool {
        debug_assert!(weight >= 0.0, "negative candidate weight: {weight}");

        self.m += 1.0;
        self.w_sum += weight;

        debug_assert!(self.w_sum.is_finite(), "weight sum overflowed");

        if noise.sample() * self.w_sum < weight {
            self.sample = sample;
            true
        } else {
            false
        }
    }

    /// Streams another (finalized) reservoir into this one, as a single
    /// candidate whose weight is `target_here * rhs.ucw * rhs.m`.
    ///
    /// `target_here` is the target function of `rhs`'s sample evaluated on
    /// this reservoir's pixel; the sample is retargeted accordingly, so that
    /// finalization divides by the right value.
    ///
    /// Net effect on `m` is `+ rhs.m`.
    pub fn merge(
        &mut self,
        noise: &mut Noise,
        rhs: &Self,
        target_here: f32,
    ) -> bool {
        if rhs.m <= 0.0 {
            return false;
        }

        self.m += rhs.m - 1.0;

        self.add_candidate(
            noise,
            rhs.sample.with_target_function(target_here),
            target_here * rhs.ucw * rhs.m,
        )
    }

    /// Computes the unbiased contribution weight of the retained sample.
    pub fn finalize(&mut self) {
        let target = self.sample.target_function();

        self.ucw = if target > 0.0 { self.w_sum / target } else { 0.0 };
    }

    /// Computes the unbiased contribution weight of the retained sample,
    /// additionally scaled by `numerator / denominator`.
    ///
    /// Used after merging reservoirs, where the merge weights carry
    /// confidences and the result has to be normalized by the (possibly
    /// visibility-filtered) sum of them.
    pub fn finalize_normalized(&mut self, numerator: f32, denominator: f32) {
        let target = self.sample.target_function();

        self.ucw = if target > 0.0 && denominator > 0.0 {
            (self.w_sum / target) * (numerator / denominator)
        } else {
            0.0
        };
    }

    pub fn clamp_m(&mut self, max: f32) {
        self.m = self.m.min(max);
    }

    pub fn is_empty(&self) -> bool {
        self.m <= 0.0
    }

    pub fn has_sample(&self) -> bool {
        self.ucw > 0.0
    }
}
