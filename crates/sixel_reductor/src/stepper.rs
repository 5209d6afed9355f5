//! Exact rational stepping for resampling.
//!
//! A [`FractionalStep`] holds `whole + numer / denom` with `0 <= numer < denom`.
//! Walking a source axis of length `S` in `D` output steps uses a step of
//! `S / D`; after `D` additions the accumulator lands on exactly `S`, so the
//! sample positions never drift regardless of image size.

/// Integer-only `I + N / D` accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FractionalStep {
    /// Integer part.
    pub whole: i32,
    /// Numerator, always in `0..denom`.
    pub numer: i32,
    /// Denominator, always positive.
    pub denom: i32,
}

impl FractionalStep {
    /// Create a normalized step.
    ///
    /// Any excess (or negative) numerator is folded into the integer part.
    ///
    /// # Panics
    /// Panics if `denom <= 0`.
    #[inline]
    pub fn new(whole: i32, numer: i32, denom: i32) -> Self {
        assert!(denom > 0, "fractional step denominator must be positive");
        Self {
            whole: whole + numer.div_euclid(denom),
            numer: numer.rem_euclid(denom),
            denom,
        }
    }

    /// The step `num / den`, e.g. source length over destination length.
    #[inline]
    pub fn ratio(num: i32, den: i32) -> Self {
        Self::new(0, num, den)
    }

    /// Add `step` to this accumulator.
    ///
    /// Both operands share the accumulator's denominator; the step must be
    /// normalized, so a single carry or borrow restores `0 <= numer < denom`.
    #[inline]
    pub fn add(&mut self, step: &FractionalStep) {
        debug_assert_eq!(self.denom, step.denom);
        self.whole += step.whole;
        self.numer += step.numer;
        if self.numer < 0 {
            self.whole -= 1;
            self.numer += self.denom;
        } else if self.numer >= self.denom {
            self.whole += 1;
            self.numer -= self.denom;
        }
    }

    /// Rewind to `0 + 0 / denom`.
    #[inline]
    pub fn reset(&mut self) {
        self.whole = 0;
        self.numer = 0;
    }
}
