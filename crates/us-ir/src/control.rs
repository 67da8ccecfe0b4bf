//! Controller table and controller index map.
//!
//! Most synthesis parameters are controllers in pairs: index `x` addresses
//! layer A and `x + 1` layer B.

/// Number of addressable controllers.
pub const CONTROLLER_COUNT: usize = 128;

/// Controller indices.
pub mod cc {
    pub const OSC_WAVETABLE: u8 = 20;
    pub const OSC_BASE_WAVE: u8 = 22;
    pub const OSC_DETUNE: u8 = 24;
    pub const OSC_VOLUME: u8 = 26;
    pub const OSC_PITCH: u8 = 28;

    pub const AMP_ATTACK: u8 = 30;
    pub const AMP_SUSTAIN: u8 = 32;
    pub const AMP_RELEASE: u8 = 34;
    pub const AMP_ASR: u8 = 36;

    pub const EG_ATTACK: u8 = 40;
    pub const EG_SUSTAIN: u8 = 42;
    pub const EG_RELEASE: u8 = 44;
    pub const EG_ASR: u8 = 46;
    pub const EG_MOD_INT: u8 = 48;
    pub const EG_PITCH_INT: u8 = 50;

    pub const LFO_RATE: u8 = 60;
    pub const LFO_WAVE: u8 = 62;
    pub const LFO_FADE: u8 = 64;
    pub const LFO_MOD_INT: u8 = 66;
    pub const LFO_PITCH_INT: u8 = 68;

    pub const LFO_SYNC: u8 = 100;
    pub const LFO_RESET: u8 = 101;
    pub const POLY: u8 = 102;
    pub const CUTOFF: u8 = 103;
    pub const CLUSTER_SIZE: u8 = 104;
    pub const CLUSTER_ID: u8 = 105;

    pub const DEBUG_CHANNEL: u8 = 111;
    pub const PING: u8 = 112;

    /// Index of a paired controller for the given layer.
    pub const fn pair(base: u8, layer: usize) -> u8 {
        if layer == 0 {
            base
        } else {
            base + 1
        }
    }
}

/// Controller value in `0..=127` widened to `0..=254`.
#[inline]
pub fn to_u8(value: u8) -> u8 {
    (value & 0x7f) << 1
}

/// Controller value centred on 64 and widened to `-128..=126`.
#[inline]
pub fn to_s8(value: u8) -> i8 {
    (((value & 0x7f) as i16 - 64) * 2) as i8
}

/// Controller value centred on 64 without widening (`-64..=63`).
#[inline]
pub fn to_offset(value: u8) -> i8 {
    (value & 0x7f) as i8 - 64
}

/// The 128 controller values of one MIDI channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlTable {
    values: [u8; CONTROLLER_COUNT],
}

impl ControlTable {
    /// All controllers at zero.
    pub const fn new() -> Self {
        Self { values: [0; CONTROLLER_COUNT] }
    }

    /// Read a controller. The index is masked to seven bits.
    pub fn get(&self, index: u8) -> u8 {
        self.values[(index & 0x7f) as usize]
    }

    /// Write a controller. Index and value are masked to seven bits.
    pub fn set(&mut self, index: u8, value: u8) {
        self.values[(index & 0x7f) as usize] = value & 0x7f;
    }

    /// Read the layer-specific member of a controller pair.
    pub fn layer(&self, base: u8, layer: usize) -> u8 {
        self.get(cc::pair(base, layer))
    }

    /// Raw view of all values.
    pub fn as_slice(&self) -> &[u8] {
        &self.values
    }
}

impl Default for ControlTable {
    fn default() -> Self {
        Self::new()
    }
}
