//! One-pole low-pass on a saturating integrator.

use us_ir::sat_add32;

/// Integrator state of a one-pole filter, in 1/256 sample units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OnePole {
    state: i32,
}

impl OnePole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample through the filter with coefficient `k`.
    ///
    /// `k = 0` freezes the output. Positive coefficients raise the cutoff;
    /// 127 follows the input within a few samples.
    #[inline]
    pub fn feed(&mut self, k: i8, input: i16) -> i16 {
        let error = input as i32 - (self.state >> 8);
        self.state = sat_add32(self.state, error * k as i32);
        (self.state >> 8) as i16
    }

    /// Current output without feeding a sample.
    pub fn output(&self) -> i16 {
        (self.state >> 8) as i16
    }

    pub fn reset(&mut self) {
        self.state = 0;
    }
}
