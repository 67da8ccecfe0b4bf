//! Real-time synthesis engine for the usynth tone generator.
//!
//! Interprets a MIDI byte stream, runs the per-voice modulation pipeline
//! and produces one sample per call to [`Synth::tick`]. Nothing here
//! allocates or blocks.

#![cfg_attr(not(feature = "std"), no_std)]

mod envelope;
mod filter;
mod lfo;
mod mailbox;
mod midi;
mod oscillator;
mod params;
mod patch;
pub mod scheduler;
mod synth;
mod tables;
pub mod wavetable_loader;

pub use envelope::{Envelope, EnvelopeParams, EnvelopeStage};
pub use filter::OnePole;
pub use lfo::{Lfo, LfoParams, LfoWaveform};
pub use mailbox::SampleMailbox;
pub use midi::{MidiEvent, MidiInterpreter, StealPolicy, PITCH_BEND_CENTER, RESET_BYTE};
pub use oscillator::Oscillator;
pub use params::{ParameterMap, VoiceParams, WavetableChange};
pub use patch::{PatchTable, DEFAULT_PATCHES};
pub use scheduler::{Slot, VoiceScheduler, CYCLE, CYCLE_LEN};
pub use synth::{EngineConfig, Synth, SynthEvent, Tick, VoiceUnit, MAX_TICK_EVENTS};
pub use tables::{wave_for_modulation, Tables, NOTE_TABLE_LEN, PITCH_STEPS_PER_SEMITONE};
pub use wavetable_loader::LoadError;
