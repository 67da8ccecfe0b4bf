//! Precomputed response curves.
//!
//! Built once when the engine is created; the real-time path only indexes.

/// Pitch resolution of the note table.
pub const PITCH_STEPS_PER_SEMITONE: u16 = 32;

/// Entries in the note table (128 notes at 1/32 semitone).
pub const NOTE_TABLE_LEN: usize = 128 * PITCH_STEPS_PER_SEMITONE as usize;

/// Slowest envelope rate (per update) at the end of the rate curve.
const SLOWEST_RATE: f32 = 4.0;

/// LFO step range: `LFO_MIN_STEP * LFO_SPAN^(v/127)`.
const LFO_MIN_STEP: f32 = 2.0;
const LFO_SPAN: f32 = 400.0;

/// Lookup tables shared by every voice.
#[derive(Clone, Debug)]
pub struct Tables {
    note_steps: [u16; NOTE_TABLE_LEN],
    rates: [u16; 256],
    lfo_steps: [i16; 128],
}

impl Tables {
    /// Build all curves for the given output sample rate.
    pub fn new(sample_rate: u32) -> Self {
        let mut note_steps = [0u16; NOTE_TABLE_LEN];
        let fs = sample_rate.max(1) as f32;
        for (k, step) in note_steps.iter_mut().enumerate() {
            let semitones = k as f32 / PITCH_STEPS_PER_SEMITONE as f32 - 69.0;
            let freq = 440.0 * libm::exp2f(semitones / 12.0);
            let v = 65536.0 * freq / fs;
            *step = if v >= u16::MAX as f32 { u16::MAX } else { v as u16 };
        }

        let mut rates = [0u16; 256];
        let ratio = SLOWEST_RATE / u16::MAX as f32;
        for (i, rate) in rates.iter_mut().enumerate() {
            let v = u16::MAX as f32 * libm::powf(ratio, i as f32 / 255.0);
            *rate = (libm::roundf(v) as u16).max(1);
        }

        let mut lfo_steps = [0i16; 128];
        for (v, step) in lfo_steps.iter_mut().enumerate() {
            let s = LFO_MIN_STEP * libm::powf(LFO_SPAN, v as f32 / 127.0);
            *step = libm::roundf(s) as i16;
        }

        Self { note_steps, rates, lfo_steps }
    }

    /// Phase step for a pitch in 1/32 semitones, clamped to the table.
    pub fn phase_step(&self, pitch: i32) -> u16 {
        let index = pitch.clamp(0, NOTE_TABLE_LEN as i32 - 1) as usize;
        self.note_steps[index]
    }

    /// Envelope/fade rate for a widened controller value (`to_u8`).
    pub fn rate(&self, index: u8) -> u16 {
        self.rates[index as usize]
    }

    /// LFO triangle step for a raw controller value.
    pub fn lfo_step(&self, value: u8) -> i16 {
        self.lfo_steps[(value & 0x7f) as usize]
    }
}

/// Wavetable slot for a signed modulation amount.
pub fn wave_for_modulation(modulation: i8, table_size: usize) -> u8 {
    let slot = ((modulation as i16 + 128) >> 2) as usize;
    slot.min(table_size.saturating_sub(1)) as u8
}
