/// Pair of values alternating between frames: one holds the current frame's
/// data while the other keeps the previous frame's.
#[derive(Clone, Debug, Default)]
pub struct DoubleBuffered<T> {
    a: T,
    b: T,
}

impl<T> DoubleBuffered<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    pub fn get(&self, alternate: bool) -> &T {
        if alternate {
            &self.b
        } else {
            &self.a
        }
    }

    pub fn get_mut(&mut self, alternate: bool) -> &mut T {
        if alternate {
            &mut self.b
        } else {
            &mut self.a
        }
    }

    /// Returns the current value (mutably) and the past one.
    pub fn split_mut(&mut self, alternate: bool) -> (&mut T, &T) {
        if alternate {
            (&mut self.b, &self.a)
        } else {
            (&mut self.a, &self.b)
        }
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        f(&mut self.a);
        f(&mut self.b);
    }
}
