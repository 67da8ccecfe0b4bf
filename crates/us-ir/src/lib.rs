//! Core types for the usynth tone generator.
//!
//! Shared by the real-time engine, the bank parsers and the host. Everything
//! here is fixed-size and allocation-free so it can live on a
//! microcontroller as well as on a desktop host.

#![cfg_attr(not(feature = "std"), no_std)]

mod bank;
mod control;
mod fixed;
mod patch;
mod voice;
mod wavetable;

pub use bank::DataBank;
pub use control::{cc, to_offset, to_s8, to_u8, ControlTable, CONTROLLER_COUNT};
pub use fixed::{mul_high_s16_u16, mul_high_u16_u16, mul_high_u16_u8, sat_add16, sat_add32, sat_add8};
pub use patch::{PatchRecord, RecordKind, DEFAULTS_PROGRAM};
pub use voice::{Gate, Voice, LAYERS, MAX_VOICES};
pub use wavetable::{
    Waveforms, Wavetable, WavetableEntry, DEFAULT_WAVETABLE_SIZE, MAX_WAVETABLE_SIZE,
    WAVEFORM_LEN, WAVEFORM_MIDPOINT,
};
