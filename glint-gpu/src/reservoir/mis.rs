/// Balance heuristic for combining `count_a` samples drawn from technique
/// `a` with `count_b` samples drawn from technique `b`.
///
/// Returns the weight for a sample drawn from `a`; the weights of both
/// techniques for the same sample sum up to one.
///
/// See: https://pbr-book.org/3ed-2018/Monte_Carlo_Integration/Importance_Sampling#MultipleImportanceSampling
pub fn balance_heuristic(
    pdf_a: f32,
    count_a: f32,
    pdf_b: f32,
    count_b: f32,
) -> f32 {
    let a = count_a * pdf_a;
    let denom = a + count_b * pdf_b;

    if denom > 0.0 {
        a / denom
    } else {
        0.0
    }
}

/// How merged reservoirs get normalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BiasCorrection {
    /// Divide by the total number of candidates; cheap, but biased when the
    /// merged pixels see different geometry or visibility.
    OneOverM,

    /// Divide by the number of candidates coming from pixels that could have
    /// produced the selected sample at all.
    #[default]
    OneOverZ,
}
