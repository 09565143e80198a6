use derivative::Derivative;
use log::debug;

use crate::gpu::DiReservoir;

/// Identity of one of the three physical reservoir buffers.
///
/// `A` is where initial candidates land, while `B` and `C` are the spatial
/// ping-pong pair; which of them holds the previous frame's reservoirs is
/// tracked by [`crate::FrameState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferId {
    A,
    B,
    C,
}

impl BufferId {
    /// Returns the buffer a spatial pass reading from `self` writes to.
    pub fn other_spatial(self) -> Self {
        match self {
            BufferId::A => BufferId::B,
            BufferId::B => BufferId::C,
            BufferId::C => BufferId::B,
        }
    }
}

/// Reservoir buffers of a pass, resolved from their [`BufferId`]s.
///
/// The output is the only mutable one, so a pass can't ever read a slot
/// that's being written by another task.
#[derive(Debug)]
pub struct BoundBuffers<'a> {
    pub input: &'a [DiReservoir],
    pub canonical: Option<&'a [DiReservoir]>,
    pub output: &'a mut [DiReservoir],
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct ReservoirBuffers {
    #[derivative(Debug = "ignore")]
    a: Vec<DiReservoir>,

    #[derivative(Debug = "ignore")]
    b: Vec<DiReservoir>,

    #[derivative(Debug = "ignore")]
    c: Vec<DiReservoir>,

    len: usize,
}

impl ReservoirBuffers {
    pub fn new(len: usize) -> Self {
        debug!("Allocating reservoir buffers ({len} reservoir(s) each)");

        Self {
            a: vec![Default::default(); len],
            b: vec![Default::default(); len],
            c: vec![Default::default(); len],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Forgets all reservoirs, e.g. after a camera cut.
    pub fn clear(&mut self) {
        for buffer in [&mut self.a, &mut self.b, &mut self.c] {
            buffer.fill(Default::default());
        }
    }

    pub fn get(&self, id: BufferId) -> &[DiReservoir] {
        match id {
            BufferId::A => &self.a,
            BufferId::B => &self.b,
            BufferId::C => &self.c,
        }
    }

    pub fn get_mut(&mut self, id: BufferId) -> &mut [DiReservoir] {
        match id {
            BufferId::A => &mut self.a,
            BufferId::B => &mut self.b,
            BufferId::C => &mut self.c,
        }
    }

    /// Resolves buffers of a pass.
    ///
    /// Panics if `output` is also used as `input`; `canonical` may be equal
    /// to `output`, in which case it's not bound at all and the pass reads
    /// the canonical reservoir from its own output slot before overwriting
    /// it.
    pub fn bind(
        &mut self,
        input: BufferId,
        canonical: Option<BufferId>,
        output: BufferId,
    ) -> BoundBuffers<'_> {
        assert_ne!(
            input, output,
            "pass would read and write the same reservoir buffer"
        );

        let canonical = canonical.filter(|&canonical| canonical != output);

        let (output, others) = match output {
            BufferId::A => (
                self.a.as_mut_slice(),
                [(BufferId::B, self.b.as_slice()), (BufferId::C, &self.c[..])],
            ),
            BufferId::B => (
                self.b.as_mut_slice(),
                [(BufferId::A, self.a.as_slice()), (BufferId::C, &self.c[..])],
            ),
            BufferId::C => (
                self.c.as_mut_slice(),
                [(BufferId::A, self.a.as_slice()), (BufferId::B, &self.b[..])],
            ),
        };

        BoundBuffers {
            input: find(others, input).unwrap_or_default(),
            canonical: canonical.and_then(|canonical| find(others, canonical)),
            output,
        }
    }
}

fn find(
    buffers: [(BufferId, &[DiReservoir]); 2],
    id: BufferId,
) -> Option<&[DiReservoir]> {
    buffers
        .into_iter()
        .find_map(|(candidate, buffer)| (candidate == id).then_some(buffer))
}
