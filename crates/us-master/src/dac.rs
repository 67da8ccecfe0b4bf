//! Output converter model.

/// An unsigned DAC of `bits` resolution fed from the engine's 16-bit sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dac {
    shift: u32,
}

impl Dac {
    /// `bits` is clamped to 1..=16.
    pub fn new(bits: u8) -> Self {
        Self { shift: 16 - bits.clamp(1, 16) as u32 }
    }

    pub fn bits(&self) -> u8 {
        (16 - self.shift) as u8
    }

    /// Code written to the converter.
    pub fn code(&self, sample: u16) -> u16 {
        sample >> self.shift
    }

    /// The converter's output expressed back on the 16-bit scale.
    pub fn quantize(&self, sample: u16) -> u16 {
        self.code(sample) << self.shift
    }
}
