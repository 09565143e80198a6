use log::trace;

use crate::{BufferId, Settings};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    InitialCandidates,
    TemporalReuse,
    SpatialReuse,
    FusedSpatiotemporalReuse,
}

impl PassKind {
    pub fn name(self) -> &'static str {
        match self {
            PassKind::InitialCandidates => "initial_candidates",
            PassKind::TemporalReuse => "temporal_reuse",
            PassKind::SpatialReuse => "spatial_reuse",
            PassKind::FusedSpatiotemporalReuse => "fused_spatiotemporal_reuse",
        }
    }
}

/// Reservoir pass, together with the buffers it reads from and writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pass {
    pub kind: PassKind,

    /// Index of this pass among passes of the same kind.
    pub index: u32,

    /// Buffer with the reservoirs being reused; `None` for the initial
    /// candidates.
    pub input: Option<BufferId>,

    /// Buffer with the current frame's initial candidates, read only at
    /// the pixel being written.
    pub canonical: Option<BufferId>,

    pub output: BufferId,
}

/// Scheduling state carried between frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameState {
    /// Flips on each frame that ran any reuse pass.
    pub parity: bool,

    /// Buffer holding the previous frame's final reservoirs.
    pub temporal_input: BufferId,

    pub frame: u32,
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            parity: false,
            temporal_input: BufferId::B,
            frame: 0,
        }
    }
}

impl FrameState {
    /// Moves to the next frame, after `schedule` has been executed.
    pub fn advance(&mut self, schedule: &Schedule) {
        if schedule.reuse_ran {
            self.parity = !self.parity;
        }

        self.temporal_input = schedule.final_output;
        self.frame = self.frame.wrapping_add(1);
    }

    /// Returns whether the previous frame left reservoirs that can be reused
    /// temporally.
    ///
    /// Buffer `A` gets overwritten by initial candidates before anything
    /// else runs, so a frame that ended there leaves nothing behind.
    pub fn has_temporal_input(&self) -> bool {
        self.temporal_input != BufferId::A
    }
}

/// Sequence of reservoir passes of a single frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub passes: Vec<Pass>,

    /// Buffer holding the reservoirs to shade (and to reuse in the next
    /// frame).
    pub final_output: BufferId,

    /// Whether any reuse pass is part of this schedule.
    pub reuse_ran: bool,
}

impl Schedule {
    pub fn plan(settings: &Settings, state: &FrameState) -> Self {
        let spatial_passes = settings.spatial_passes();

        let temporal = settings.temporal.enabled && state.has_temporal_input();

        let mut passes = vec![Pass {
            kind: PassKind::InitialCandidates,
            index: 0,
            input: None,
            canonical: None,
            output: BufferId::A,
        }];

        let mut spatial_input = BufferId::A;
        let mut spatial_index = 0;

        if settings.is_fused() && temporal {
            let output = state.temporal_input.other_spatial();

            passes.push(Pass {
                kind: PassKind::FusedSpatiotemporalReuse,
                index: 0,
                input: Some(state.temporal_input),
                canonical: Some(BufferId::A),
                output,
            });

            spatial_input = output;
            spatial_index = 1;
        } else if temporal {
            let output = temporal_output(state, spatial_passes > 0);

            passes.push(Pass {
                kind: PassKind::TemporalReuse,
                index: 0,
                input: Some(state.temporal_input),
                canonical: Some(BufferId::A),
                output,
            });

            spatial_input = output;
        }

        for index in spatial_index..spatial_passes {
            let output = spatial_input.other_spatial();

            passes.push(Pass {
                kind: PassKind::SpatialReuse,
                index,
                input: Some(spatial_input),
                canonical: None,
                output,
            });

            spatial_input = output;
        }

        let final_output =
            passes.last().map_or(BufferId::A, |pass| pass.output);
        let reuse_ran = passes.len() > 1;

        for pass in &passes {
            trace!(
                "Planned {}#{}: {:?} + {:?} -> {:?}",
                pass.kind.name(),
                pass.index,
                pass.input,
                pass.canonical,
                pass.output
            );
        }

        Self {
            passes,
            final_output,
            reuse_ran,
        }
    }
}

/// Picks where the temporal pass writes to.
///
/// When a spatial pass follows, it's the initial-candidates buffer itself
/// (each pixel only reads its own canonical slot, so it's safe to overwrite);
/// otherwise one of the spatial buffers, chosen by frame parity, that's not
/// the one being read.
fn temporal_output(state: &FrameState, spatial_follows: bool) -> BufferId {
    if spatial_follows {
        return BufferId::A;
    }

    let output = if state.parity {
        BufferId::B
    } else {
        BufferId::C
    };

    if output == state.temporal_input {
        output.other_spatial()
    } else {
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(temporal: bool, spatial: u32, fused: bool) -> Settings {
        let mut settings = Settings::default();

        settings.temporal.enabled = temporal;
        settings.spatial.enabled = spatial > 0;
        settings.spatial.passes = spatial.max(1);
        settings.fused_spatiotemporal = fused;
        settings.validated()
    }

    fn all_settings() -> impl Iterator<Item = Settings> {
        [false, true].into_iter().flat_map(|temporal| {
            (0..4).flat_map(move |spatial| {
                [false, true]
                    .into_iter()
                    .map(move |fused| settings(temporal, spatial, fused))
            })
        })
    }

    fn all_states() -> impl Iterator<Item = FrameState> {
        [false, true].into_iter().flat_map(|parity| {
            [BufferId::A, BufferId::B, BufferId::C].into_iter().map(
                move |temporal_input| FrameState {
                    parity,
                    temporal_input,
                    frame: 1,
                },
            )
        })
    }

    #[test]
    fn passes_never_read_their_own_output() {
        for settings in all_settings() {
            for state in all_states() {
                let schedule = Schedule::plan(&settings, &state);

                for pass in &schedule.passes {
                    assert_ne!(
                        pass.input,
                        Some(pass.output),
                        "{settings:?} / {state:?}: {pass:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn canonical_is_initial_candidates() {
        for settings in all_settings() {
            for state in all_states() {
                let schedule = Schedule::plan(&settings, &state);

                assert_eq!(BufferId::A, schedule.passes[0].output);

                for pass in &schedule.passes {
                    if let Some(canonical) = pass.canonical {
                        assert_eq!(BufferId::A, canonical);
                    }
                }
            }
        }
    }

    #[test]
    fn spatial_reads_initial_candidates_without_temporal_reuse() {
        for state in all_states() {
            let schedule = Schedule::plan(&settings(false, 1, false), &state);

            assert_eq!(2, schedule.passes.len());

            let pass = schedule.passes[1];

            assert_eq!(PassKind::SpatialReuse, pass.kind);
            assert_eq!(Some(BufferId::A), pass.input);
            assert_eq!(BufferId::B, pass.output);
        }
    }

    #[test]
    fn temporal_followed_by_spatial() {
        let state = FrameState {
            parity: false,
            temporal_input: BufferId::C,
            frame: 1,
        };

        let schedule = Schedule::plan(&settings(true, 2, false), &state);
        let kinds: Vec<_> = schedule.passes.iter().map(|p| p.kind).collect();

        assert_eq!(
            vec![
                PassKind::InitialCandidates,
                PassKind::TemporalReuse,
                PassKind::SpatialReuse,
                PassKind::SpatialReuse,
            ],
            kinds
        );

        assert_eq!(Some(BufferId::C), schedule.passes[1].input);
        assert_eq!(BufferId::A, schedule.passes[1].output);
        assert_eq!(Some(BufferId::A), schedule.passes[2].input);
        assert_eq!(BufferId::B, schedule.passes[2].output);
        assert_eq!(Some(BufferId::B), schedule.passes[3].input);
        assert_eq!(BufferId::C, schedule.passes[3].output);
        assert_eq!(BufferId::C, schedule.final_output);
        assert!(schedule.reuse_ran);
    }

    #[test]
    fn temporal_only_alternates_spatial_buffers() {
        let settings = settings(true, 0, false);
        let mut state = FrameState::default();
        let mut outputs = Vec::new();

        for _ in 0..4 {
            let schedule = Schedule::plan(&settings, &state);

            assert_eq!(2, schedule.passes.len());
            assert_eq!(Some(state.temporal_input), schedule.passes[1].input);

            outputs.push(schedule.final_output);
            state.advance(&schedule);
        }

        assert_eq!(
            vec![BufferId::C, BufferId::B, BufferId::C, BufferId::B],
            outputs
        );
    }

    #[test]
    fn fused() {
        let state = FrameState {
            parity: true,
            temporal_input: BufferId::B,
            frame: 1,
        };

        let schedule = Schedule::plan(&settings(true, 2, true), &state);

        assert_eq!(3, schedule.passes.len());

        let pass = schedule.passes[1];

        assert_eq!(PassKind::FusedSpatiotemporalReuse, pass.kind);
        assert_eq!(Some(BufferId::B), pass.input);
        assert_eq!(Some(BufferId::A), pass.canonical);
        assert_eq!(BufferId::C, pass.output);

        let pass = schedule.passes[2];

        assert_eq!(PassKind::SpatialReuse, pass.kind);
        assert_eq!(1, pass.index);
        assert_eq!(Some(BufferId::C), pass.input);
        assert_eq!(BufferId::B, pass.output);
    }

    #[test]
    fn fused_without_history_falls_back_to_spatial() {
        let state = FrameState {
            parity: false,
            temporal_input: BufferId::A,
            frame: 1,
        };

        let schedule = Schedule::plan(&settings(true, 1, true), &state);

        assert_eq!(2, schedule.passes.len());
        assert_eq!(PassKind::SpatialReuse, schedule.passes[1].kind);
        assert_eq!(Some(BufferId::A), schedule.passes[1].input);
    }

    #[test]
    fn no_reuse() {
        let mut state = FrameState::default();
        let schedule = Schedule::plan(&settings(false, 0, false), &state);

        assert_eq!(1, schedule.passes.len());
        assert_eq!(BufferId::A, schedule.final_output);
        assert!(!schedule.reuse_ran);

        state.advance(&schedule);

        assert!(!state.parity);
        assert!(!state.has_temporal_input());
        assert_eq!(1, state.frame);
    }

    #[test]
    fn history_survives_until_read() {
        for settings in all_settings() {
            let mut state = FrameState::default();

            for _ in 0..6 {
                let schedule = Schedule::plan(&settings, &state);
                let history = state.temporal_input;
                let mut read =
                    !settings.temporal.enabled || !state.has_temporal_input();

                for pass in &schedule.passes {
                    if pass.input == Some(history) {
                        read = true;
                    }

                    if pass.output == history {
                        assert!(read, "{settings:?} / {state:?}");
                    }
                }

                state.advance(&schedule);
            }
        }
    }

    #[test]
    fn parity_flips_with_reuse() {
        let settings = settings(false, 1, false);
        let mut state = FrameState::default();

        for frame in 0..4 {
            assert_eq!(frame % 2 == 1, state.parity);

            let schedule = Schedule::plan(&settings, &state);

            state.advance(&schedule);
        }
    }
}
