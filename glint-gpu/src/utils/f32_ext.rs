pub trait F32Ext
where
    Self: Sized,
{
    fn sqr(self) -> Self;
    fn saturate(self) -> Self;

    /// Returns this value if it's finite and positive, zero otherwise.
    fn positive_or_zero(self) -> Self;
}

impl F32Ext for f32 {
    fn sqr(self) -> Self {
        self * self
    }

    fn saturate(self) -> Self {
        self.clamp(0.0, 1.0)
    }

    fn positive_or_zero(self) -> Self {
        if self.is_finite() && self > 0.0 {
            self
        } else {
            0.0
        }
    }
}
