//! Controller table to engine parameter mapping.

use us_ir::{cc, to_offset, to_s8, to_u8, ControlTable, DataBank, Wavetable, LAYERS};

use crate::envelope::EnvelopeParams;
use crate::lfo::{LfoParams, LfoWaveform};
use crate::midi::PITCH_BEND_CENTER;
use crate::tables::{Tables, NOTE_TABLE_LEN, PITCH_STEPS_PER_SEMITONE};
use crate::wavetable_loader::{self, LoadError};

/// Engine-facing parameters of one voice, derived from one layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoiceParams {
    /// Layer the values were read from.
    pub layer: usize,
    pub amp: EnvelopeParams,
    pub mod_env: EnvelopeParams,
    pub lfo: LfoParams,
    /// Wavetable position before modulation.
    pub base_wave: i8,
    /// Mod envelope depth into wavetable position.
    pub eg_wave: i8,
    /// Mod envelope depth into pitch.
    pub eg_pitch: i8,
    pub lfo_wave: i8,
    pub lfo_pitch: i8,
    /// Fine tune in pitch steps.
    pub detune: i8,
    /// Coarse tune in semitones.
    pub coarse: i8,
    pub volume: u8,
}

impl VoiceParams {
    /// Modulated wavetable position.
    ///
    /// The mod envelope contributes `eg_wave * (env >> 9) >> 7` and the LFO
    /// `lfo_wave * (lfo >> 8) >> 7`, each added with saturation.
    pub fn wave_position(&self, mod_env: u16, lfo: i16) -> i8 {
        let eg = narrow((self.eg_wave as i16 * (mod_env >> 9) as i16) >> 7);
        let lf = narrow((self.lfo_wave as i16 * (lfo >> 8)) >> 7);
        us_ir::sat_add8(us_ir::sat_add8(self.base_wave, eg), lf)
    }

    /// Pitch in 1/32 semitones, clamped to the note table.
    pub fn pitch(&self, note: u8, mod_env: u16, lfo: i16, bend: u16) -> i32 {
        let steps = PITCH_STEPS_PER_SEMITONE as i32;
        let eg = (self.eg_pitch as i32 * (mod_env >> 9) as i32) >> 5;
        let lf = (self.lfo_pitch as i32 * (lfo >> 8) as i32) >> 7;
        // +-2 semitones over the full bend range
        let bend = (bend as i32 - PITCH_BEND_CENTER as i32) >> 7;
        let pitch = (note & 0x7f) as i32 * steps + self.coarse as i32 * steps + self.detune as i32 + eg + lf + bend;
        pitch.clamp(0, NOTE_TABLE_LEN as i32 - 1)
    }

    /// Gain applied after the amp envelope: `velocity * 2 * volume`.
    pub fn gain(&self, velocity: u8) -> u16 {
        to_u8(velocity) as u16 * self.volume as u16
    }
}

fn narrow(v: i16) -> i8 {
    v.clamp(i8::MIN as i16, i8::MAX as i16) as i8
}

/// A wavetable selection change made during resync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WavetableChange {
    Loaded { layer: usize, index: u8 },
    Rejected { layer: usize, index: u8, error: LoadError },
}

/// Maps controllers to voice parameters through the response curves and
/// tracks which wavetable each layer has loaded.
#[derive(Clone, Debug)]
pub struct ParameterMap {
    tables: Tables,
    applied: [Option<u8>; LAYERS],
}

impl ParameterMap {
    pub fn new(sample_rate: u32) -> Self {
        Self { tables: Tables::new(sample_rate), applied: [None; LAYERS] }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Wavetable index last applied to `layer`.
    pub fn applied_wavetable(&self, layer: usize) -> Option<u8> {
        self.applied.get(layer).copied().flatten()
    }

    /// Layer a voice reads its parameters from.
    pub fn layer_for(voice: usize, poly: bool) -> usize {
        if poly {
            0
        } else {
            voice % LAYERS
        }
    }

    /// Derive one voice's parameters from controller `layer`.
    pub fn derive(&self, controls: &ControlTable, layer: usize) -> VoiceParams {
        let c = |base: u8| controls.layer(base, layer);
        let rate = |base: u8| self.tables.rate(to_u8(c(base)));

        VoiceParams {
            layer,
            amp: EnvelopeParams {
                attack: rate(cc::AMP_ATTACK),
                release: rate(cc::AMP_RELEASE),
                sustain: to_u8(c(cc::AMP_SUSTAIN)),
                sustain_enabled: c(cc::AMP_ASR) != 0,
            },
            mod_env: EnvelopeParams {
                attack: rate(cc::EG_ATTACK),
                release: rate(cc::EG_RELEASE),
                sustain: to_u8(c(cc::EG_SUSTAIN)),
                sustain_enabled: c(cc::EG_ASR) != 0,
            },
            lfo: LfoParams {
                step: self.tables.lfo_step(c(cc::LFO_RATE)),
                waveform: if c(cc::LFO_WAVE) < 64 { LfoWaveform::Triangle } else { LfoWaveform::Square },
                fade_step: rate(cc::LFO_FADE),
            },
            base_wave: to_s8(c(cc::OSC_BASE_WAVE)),
            eg_wave: to_s8(c(cc::EG_MOD_INT)),
            eg_pitch: to_s8(c(cc::EG_PITCH_INT)),
            lfo_wave: to_s8(c(cc::LFO_MOD_INT)),
            lfo_pitch: to_s8(c(cc::LFO_PITCH_INT)),
            detune: to_offset(c(cc::OSC_DETUNE)),
            coarse: to_offset(c(cc::OSC_PITCH)),
            volume: to_u8(c(cc::OSC_VOLUME)),
        }
    }

    /// Filter coefficient from the cutoff controller.
    pub fn cutoff(controls: &ControlTable) -> i8 {
        controls.get(cc::CUTOFF) as i8
    }

    /// Bring `layer`'s loaded wavetable in line with its controller.
    ///
    /// Out-of-range selections are clamped to the last table and the
    /// clamped index is written back. The table is reloaded only when the
    /// index differs from the last applied one; a failed load keeps the
    /// previous table and is not retried until the selection changes.
    pub fn sync_wavetable(
        &mut self,
        controls: &mut ControlTable,
        bank: &DataBank<'_>,
        layer: usize,
        dest: &mut Wavetable,
    ) -> Option<WavetableChange> {
        let index_cc = cc::pair(cc::OSC_WAVETABLE, layer);
        let requested = controls.get(index_cc);
        let index = requested.min(bank.last_wavetable());
        if index != requested {
            controls.set(index_cc, index);
        }

        let applied = self.applied.get_mut(layer)?;
        if *applied == Some(index) {
            return None;
        }
        *applied = Some(index);

        Some(match wavetable_loader::load_from_bank(dest, bank, index) {
            Ok(_) => WavetableChange::Loaded { layer, index },
            Err(error) => WavetableChange::Rejected { layer, index, error },
        })
    }
}
