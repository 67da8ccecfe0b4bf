//! Headless host for the usynth tone generator.
//!
//! Models the board around the engine: a serial receive ring, the
//! sample-rate timer, the DAC and the main loop that services resets.
//! Both the offline renderer and realtime playback go through
//! [`Controller`].

mod config;
mod controller;
mod dac;
mod error;
mod serial;

pub use config::{StealPolicyName, SynthConfig};
pub use controller::{Controller, Rendered, Report};
pub use dac::Dac;
pub use error::{ConfigError, HostError};
pub use serial::{drain, rx_ring, SerialLine, TimerTask, RX_CAPACITY};

// Re-export common types so callers don't need the engine crates directly.
pub use us_engine::{EngineConfig, SampleMailbox};
pub use us_formats::{BankFile, FormatError};
