//! The synthesis context: every piece of engine state in one value.

use heapless::Vec;
use us_ir::{cc, mul_high_s16_u16, DataBank, Voice, Wavetable, LAYERS, MAX_VOICES};

use crate::envelope::Envelope;
use crate::filter::OnePole;
use crate::lfo::Lfo;
use crate::midi::{MidiEvent, MidiInterpreter, StealPolicy};
use crate::oscillator::Oscillator;
use crate::params::{ParameterMap, VoiceParams, WavetableChange};
use crate::patch::PatchTable;
use crate::scheduler::{Slot, VoiceScheduler};
use crate::tables::wave_for_modulation;

/// Maximum events reported by one tick.
pub const MAX_TICK_EVENTS: usize = 4;

/// Construction-time settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// MIDI channel (0-15) the interpreter accepts data on.
    pub listen_channel: u8,
    /// Voices in use, `1..=MAX_VOICES`.
    pub voices: usize,
    pub steal_policy: StealPolicy,
    /// Program applied at start-up.
    pub initial_program: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 28_000,
            listen_channel: 0,
            voices: MAX_VOICES,
            steal_policy: StealPolicy::Oldest,
            initial_program: 0,
        }
    }
}

/// Something the host may want to log or act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynthEvent {
    /// A complete MIDI message (or reset request) was interpreted.
    Midi(MidiEvent),
    ProgramLoaded(u8),
    /// Only the defaults were applied.
    ProgramMissing(u8),
    /// Byte to echo on the serial transmitter.
    Ping(u8),
    LfoSync,
    WavetableLoaded { layer: usize, index: u8 },
    WavetableRejected { layer: usize, index: u8 },
    /// The debug-marked scheduler slot ran.
    Marker(u8),
}

/// Result of one sample period.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// Unsigned output sample, mid-scale is silence.
    pub sample: u16,
    pub events: Vec<SynthEvent, MAX_TICK_EVENTS>,
}

/// Oscillator and modulators of one voice.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoiceUnit {
    pub osc: Oscillator,
    pub amp_env: Envelope,
    pub mod_env: Envelope,
    pub lfo: Lfo,
    pub params: VoiceParams,
}

/// A complete tone generator.
pub struct Synth<'a> {
    /// Read-only waveform, wavetable and patch data
    bank: DataBank<'a>,
    patches: PatchTable<'a>,
    /// Parser, voices and controller table
    midi: MidiInterpreter,
    map: ParameterMap,
    /// Decoded wavetable per layer
    wavetables: [Wavetable; LAYERS],
    units: [VoiceUnit; MAX_VOICES],
    filter: OnePole,
    scheduler: VoiceScheduler,
    /// Slot flagged by the debug controller
    marker: Option<u8>,
}

impl<'a> Synth<'a> {
    /// Build a synth over `bank` and apply the initial program.
    pub fn new(bank: DataBank<'a>, config: &EngineConfig) -> Self {
        let mut synth = Self {
            bank,
            patches: PatchTable::new(bank.patches),
            midi: MidiInterpreter::new(config.listen_channel, config.voices, config.steal_policy),
            map: ParameterMap::new(config.sample_rate),
            wavetables: [Wavetable::new(), Wavetable::new()],
            units: [VoiceUnit::default(); MAX_VOICES],
            filter: OnePole::new(),
            scheduler: VoiceScheduler::new(),
            marker: None,
        };

        let mut events = Vec::new();
        synth.load_program(config.initial_program, &mut events);
        synth.sync_wavetables(&mut events);
        for v in 0..MAX_VOICES {
            synth.update_params(v);
        }
        synth
    }

    pub fn midi(&self) -> &MidiInterpreter {
        &self.midi
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.midi.voices.get(index)
    }

    pub fn unit(&self, index: usize) -> Option<&VoiceUnit> {
        self.units.get(index)
    }

    pub fn wavetable(&self, layer: usize) -> Option<&Wavetable> {
        self.wavetables.get(layer)
    }

    pub fn program(&self) -> u8 {
        self.midi.program
    }

    /// Whether the byte stream asked for a full reinitialisation.
    pub fn reset_requested(&self) -> bool {
        self.midi.reset_requested()
    }

    pub fn scheduler(&self) -> &VoiceScheduler {
        &self.scheduler
    }

    /// Produce one output sample.
    ///
    /// Runs exactly one scheduler slot, which may pull one byte from `rx`,
    /// then advances every oscillator and mixes.
    #[cfg(not(feature = "alloc_check"))]
    pub fn tick<I: Iterator<Item = u8>>(&mut self, rx: &mut I) -> Tick {
        self.tick_inner(rx)
    }

    /// Produce one output sample, aborting if the tick allocates.
    #[cfg(feature = "alloc_check")]
    pub fn tick<I: Iterator<Item = u8>>(&mut self, rx: &mut I) -> Tick {
        assert_no_alloc::assert_no_alloc(|| self.tick_inner(rx))
    }

    fn tick_inner<I: Iterator<Item = u8>>(&mut self, rx: &mut I) -> Tick {
        let mut events = Vec::new();

        // 1. One bounded unit of control work
        let (index, slot) = self.scheduler.next_slot();
        self.run_slot(slot, rx, &mut events);
        if self.marker == Some(index as u8) {
            push(&mut events, SynthEvent::Marker(index as u8));
        }

        // 2. Audio path, every sample
        let sample = self.render_sample();
        Tick { sample, events }
    }

    fn run_slot<I: Iterator<Item = u8>>(&mut self, slot: Slot, rx: &mut I, events: &mut Vec<SynthEvent, MAX_TICK_EVENTS>) {
        match slot {
            Slot::Midi => {
                if let Some(event) = rx.next().and_then(|b| self.midi.process_byte(b)) {
                    push(events, SynthEvent::Midi(event));
                    self.handle_midi(event, events);
                }
            }
            Slot::Params(v) => self.update_params(v),
            Slot::Modulate(v) => self.modulate(v),
            Slot::Waveform(v) => self.update_waveform(v),
            Slot::Housekeeping => {
                self.midi.clear_triggers();
                self.sync_wavetables(events);
            }
        }
    }

    fn handle_midi(&mut self, event: MidiEvent, events: &mut Vec<SynthEvent, MAX_TICK_EVENTS>) {
        match event {
            MidiEvent::ProgramChange(id) => self.load_program(id, events),
            MidiEvent::ControlChange { index, value } => match index {
                cc::LFO_SYNC => {
                    for unit in &mut self.units {
                        unit.lfo.sync();
                    }
                    push(events, SynthEvent::LfoSync);
                }
                cc::PING => push(events, SynthEvent::Ping(value)),
                cc::DEBUG_CHANNEL => self.marker = value.checked_sub(1),
                _ => {}
            },
            _ => {}
        }
    }

    fn load_program(&mut self, id: u8, events: &mut Vec<SynthEvent, MAX_TICK_EVENTS>) {
        if self.patches.load_program(&mut self.midi.controls, id) {
            self.midi.program = id;
            push(events, SynthEvent::ProgramLoaded(id));
        } else {
            push(events, SynthEvent::ProgramMissing(id));
        }
    }

    fn sync_wavetables(&mut self, events: &mut Vec<SynthEvent, MAX_TICK_EVENTS>) {
        for (layer, table) in self.wavetables.iter_mut().enumerate() {
            let change = self.map.sync_wavetable(&mut self.midi.controls, &self.bank, layer, table);
            match change {
                Some(WavetableChange::Loaded { layer, index }) => {
                    push(events, SynthEvent::WavetableLoaded { layer, index })
                }
                Some(WavetableChange::Rejected { layer, index, .. }) => {
                    push(events, SynthEvent::WavetableRejected { layer, index })
                }
                None => {}
            }
        }
    }

    fn update_params(&mut self, v: usize) {
        let layer = ParameterMap::layer_for(v, self.midi.is_poly());
        self.units[v].params = self.map.derive(&self.midi.controls, layer);
    }

    fn modulate(&mut self, v: usize) {
        let voice = self.midi.voices[v];
        let lfo_reset = self.midi.controls.get(cc::LFO_RESET) >= 64;
        let unit = &mut self.units[v];

        if voice.gate.just_triggered() {
            unit.amp_env.reset();
            unit.mod_env.reset();
            unit.osc.reset_phase();
            if lfo_reset {
                unit.lfo.reset_fade();
            }
        }

        let gate = voice.gate.is_on();
        unit.amp_env.advance(&unit.params.amp, gate);
        unit.mod_env.advance(&unit.params.mod_env, gate);
        unit.lfo.advance(&unit.params.lfo, gate);
    }

    fn update_waveform(&mut self, v: usize) {
        let voice = self.midi.voices[v];
        let bend = self.midi.pitch_bend;
        let unit = &mut self.units[v];
        let size = self.wavetables[unit.params.layer].len();

        let position = unit.params.wave_position(unit.mod_env.output, unit.lfo.output);
        unit.osc.wave = wave_for_modulation(position, size);
        let pitch = unit.params.pitch(voice.note, unit.mod_env.output, unit.lfo.output, bend);
        unit.osc.phase_step = self.map.tables().phase_step(pitch);
    }

    /// Advance every oscillator, mix through the amp envelopes and filter.
    fn render_sample(&mut self) -> u16 {
        let waveforms = self.bank.waveforms;
        let mut sum: i32 = 0;
        for (unit, voice) in self.units.iter_mut().zip(self.midi.voices.iter()) {
            let table = &self.wavetables[unit.params.layer];
            unit.osc.step(table, &waveforms);
            let enveloped = mul_high_s16_u16(unit.osc.signed_output(), unit.amp_env.output);
            sum += mul_high_s16_u16(enveloped, unit.params.gain(voice.velocity)) as i32;
        }

        let mixed = (sum >> 2).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        let filtered = self.filter.feed(ParameterMap::cutoff(&self.midi.controls), mixed);
        (filtered as i32 + 0x8000) as u16
    }
}

/// Record an event; overflow past the per-tick capacity is dropped.
fn push(events: &mut Vec<SynthEvent, MAX_TICK_EVENTS>, event: SynthEvent) {
    let _ = events.push(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::DEFAULT_PATCHES;
    use crate::scheduler::CYCLE_LEN;
    use us_ir::{Waveforms, WAVEFORM_LEN};

    const STREAM: [u8; 10] = [0, 0, 0, 1, 60, 0, 1, 0, 0, 60];

    fn waves() -> [u8; WAVEFORM_LEN * 2] {
        let mut data = [0u8; WAVEFORM_LEN * 2];
        for i in 0..WAVEFORM_LEN {
            // rising half-cycle and a constant high one
            data[i] = 128 + (i as u8) * 2;
            data[WAVEFORM_LEN + i] = 250;
        }
        data
    }

    fn bank<'a>(data: &'a [u8]) -> DataBank<'a> {
        DataBank {
            waveforms: Waveforms::new(data),
            wavetables: &STREAM,
            offsets: &[0, 5],
            wavetable_count: 2,
            wavetable_size: 61,
            patches: DEFAULT_PATCHES,
        }
    }

    fn run(synth: &mut Synth<'_>, bytes: &[u8], ticks: usize) -> std::vec::Vec<Tick> {
        let mut rx = bytes.iter().copied();
        (0..ticks).map(|_| synth.tick(&mut rx)).collect()
    }

    #[test]
    fn starts_on_initial_program_in_silence() {
        let data = waves();
        let mut synth = Synth::new(bank(&data), &EngineConfig::default());
        assert_eq!(synth.program(), 0);
        // program 0 selects table 2, clamped to the last one
        assert_eq!(synth.midi().controls.get(cc::OSC_WAVETABLE), 1);
        let ticks = run(&mut synth, &[], 100);
        assert!(ticks.iter().all(|t| t.sample == 0x8000));
    }

    #[test]
    fn note_on_is_heard_within_a_few_cycles() {
        let data = waves();
        let mut synth = Synth::new(bank(&data), &EngineConfig::default());
        let ticks = run(&mut synth, &[0x90, 69, 127], CYCLE_LEN * 8);

        let note_on = ticks.iter().flat_map(|t| t.events.iter()).find(|e| matches!(e, SynthEvent::Midi(MidiEvent::NoteOn { .. })));
        assert_eq!(note_on, Some(&SynthEvent::Midi(MidiEvent::NoteOn { note: 69, velocity: 127, voices: 1 })));

        let voice = synth.voice(0).copied().unwrap_or_default();
        assert!(voice.is_active());
        assert!(!voice.gate.just_triggered());
        assert!(ticks.iter().any(|t| t.sample != 0x8000));
        assert_ne!(synth.unit(0).map(|u| u.osc.phase_step), Some(0));
    }

    #[test]
    fn trigger_resets_voice_once() {
        let data = waves();
        let mut synth = Synth::new(bank(&data), &EngineConfig::default());
        run(&mut synth, &[0x90, 60, 100], CYCLE_LEN);
        let voice = synth.voice(0).copied().unwrap_or_default();
        assert!(voice.is_active());
        assert!(!voice.gate.just_triggered());
        assert_ne!(synth.unit(0).map(|u| u.amp_env.stage), Some(crate::envelope::EnvelopeStage::Idle));
    }

    #[test]
    fn program_change_reports_load_or_miss() {
        let data = waves();
        let mut synth = Synth::new(bank(&data), &EngineConfig::default());
        let ticks = run(&mut synth, &[0xc0, 1, 0xc0, 42], CYCLE_LEN * 2);
        let events: std::vec::Vec<_> = ticks.iter().flat_map(|t| t.events.iter().copied()).collect();
        assert!(events.contains(&SynthEvent::ProgramLoaded(1)));
        assert!(events.contains(&SynthEvent::ProgramMissing(42)));
        assert_eq!(synth.program(), 1);
        // program 42 fell back to the defaults
        assert_eq!(synth.midi().controls.get(cc::CUTOFF), 127);
    }

    #[test]
    fn ping_and_lfo_sync_surface_as_events() {
        let data = waves();
        let mut synth = Synth::new(bank(&data), &EngineConfig::default());
        // the fifth byte waits for the next cycle's MIDI slots
        let ticks = run(&mut synth, &[0xb0, cc::PING, 0x55, cc::LFO_SYNC, 0], CYCLE_LEN * 2);
        let events: std::vec::Vec<_> = ticks.iter().flat_map(|t| t.events.iter().copied()).collect();
        assert!(events.contains(&SynthEvent::Ping(0x55)));
        assert!(events.contains(&SynthEvent::LfoSync));
    }

    #[test]
    fn debug_marker_flags_its_slot() {
        let data = waves();
        let mut synth = Synth::new(bank(&data), &EngineConfig::default());
        // mark slot 16 (housekeeping)
        let ticks = run(&mut synth, &[0xb0, cc::DEBUG_CHANNEL, 17], CYCLE_LEN * 2);
        let marks: std::vec::Vec<_> =
            ticks.iter().enumerate().filter(|(_, t)| t.events.contains(&SynthEvent::Marker(16))).map(|(i, _)| i).collect();
        assert_eq!(marks, vec![16, 16 + CYCLE_LEN]);
    }

    #[test]
    fn reset_byte_is_reported() {
        let data = waves();
        let mut synth = Synth::new(bank(&data), &EngineConfig::default());
        let ticks = run(&mut synth, &[0xff], 1);
        assert_eq!(ticks[0].events.as_slice(), &[SynthEvent::Midi(MidiEvent::Reset)]);
        assert!(synth.reset_requested());
    }

    #[test]
    fn out_of_range_wavetable_is_clamped_on_housekeeping() {
        let data = waves();
        let mut synth = Synth::new(bank(&data), &EngineConfig { initial_program: 1, ..EngineConfig::default() });
        // program 1 asks for table 3
        assert_eq!(synth.midi().controls.get(cc::OSC_WAVETABLE), 1);
        let ticks = run(&mut synth, &[0xb0, cc::OSC_WAVETABLE, 0], CYCLE_LEN);
        let last = &ticks[CYCLE_LEN - 1];
        assert!(last.events.contains(&SynthEvent::WavetableLoaded { layer: 0, index: 0 }));
        assert_eq!(synth.map.applied_wavetable(0), Some(0));
    }
}
