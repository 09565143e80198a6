use glam::Vec3;

use crate::Noise;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RussianRouletteMethod {
    /// Survival probability equals the maximum channel of the throughput.
    #[default]
    MaxThroughput,

    /// Survival probability follows the throughput's relative change
    /// (Langlands, "Physically Based Shader Design in Arnold", 2014).
    Arnold2014,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RussianRouletteSettings {
    pub enabled: bool,

    /// Bounces below this one always survive.
    pub min_depth: u32,

    pub method: RussianRouletteMethod,

    /// Ceiling for the throughput boost of surviving paths; zero disables
    /// it.
    pub throughput_clamp: f32,
}

impl Default for RussianRouletteSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_depth: 3,
            method: RussianRouletteMethod::default(),
            throughput_clamp: 20.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouletteOutcome {
    Continue,
    Terminate,
}

/// Decides whether the path continues past given bounce.
///
/// `weight` is the shading weight about to be applied to `throughput`; on
/// survival, `throughput` gets compensated for the termination probability.
pub fn russian_roulette(
    settings: &RussianRouletteSettings,
    bounce: u32,
    throughput: &mut Vec3,
    weight: Vec3,
    noise: &mut Noise,
) -> RouletteOutcome {
    if !settings.enabled || bounce < settings.min_depth {
        return RouletteOutcome::Continue;
    }

    let p = survival_probability(settings.method, *throughput, weight);

    if p <= 0.0 || noise.sample() >= p {
        return RouletteOutcome::Terminate;
    }

    let mut boost = 1.0 / p;

    if settings.throughput_clamp > 0.0 {
        boost = boost.min(settings.throughput_clamp);
    }

    *throughput *= boost;

    RouletteOutcome::Continue
}

fn survival_probability(
    method: RussianRouletteMethod,
    throughput: Vec3,
    weight: Vec3,
) -> f32 {
    let p = match method {
        RussianRouletteMethod::MaxThroughput => throughput.max_element(),

        RussianRouletteMethod::Arnold2014 => {
            let max = throughput.max_element();

            if max > 0.0 {
                ((throughput * weight).max_element() / max).sqrt()
            } else {
                0.0
            }
        }
    };

    // NaNs terminate
    if p.is_nan() {
        0.0
    } else {
        p.min(1.0)
    }
}
