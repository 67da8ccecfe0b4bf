//! Host configuration.
//!
//! Read from an optional YAML file and overridden by `USYNTH_*`
//! environment variables (`USYNTH_LISTEN_CHANNEL=1`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use us_engine::{EngineConfig, StealPolicy};
use us_ir::{DEFAULT_WAVETABLE_SIZE, MAX_VOICES, MAX_WAVETABLE_SIZE};

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StealPolicyName {
    #[default]
    Oldest,
    Newest,
}

impl From<StealPolicyName> for StealPolicy {
    fn from(name: StealPolicyName) -> Self {
        match name {
            StealPolicyName::Oldest => StealPolicy::Oldest,
            StealPolicyName::Newest => StealPolicy::Newest,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub sample_rate: u32,
    pub listen_channel: u8,
    pub voices: usize,
    pub steal_policy: StealPolicyName,
    /// Serial link speed; one byte takes ten bit times.
    pub midi_baud: u32,
    pub dac_bits: u8,
    /// Slots per wavetable of the built-in bank.
    pub wavetable_size: usize,
    pub initial_program: u8,
    /// Bank file to use instead of the built-in bank.
    pub bank: Option<PathBuf>,
    /// Seconds rendered after the last input byte.
    pub tail_seconds: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 28_000,
            listen_channel: 0,
            voices: MAX_VOICES,
            steal_policy: StealPolicyName::Oldest,
            midi_baud: 31_250,
            dac_bits: 12,
            wavetable_size: DEFAULT_WAVETABLE_SIZE,
            initial_program: 0,
            bank: None,
            tail_seconds: 1.0,
        }
    }
}

impl SynthConfig {
    /// Defaults, overridden by `path` if given, then by `USYNTH_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder.add_source(Environment::with_prefix("USYNTH").try_parsing(true)).build()?;
        Self::from_settings(settings)
    }

    /// Parse YAML text, without consulting the environment.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder().add_source(File::from_str(text, FileFormat::Yaml)).build()?;
        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> Result<Self, ConfigError> {
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate < 1_000 {
            return Err(ConfigError::invalid("sample_rate", format!("{} Hz is too low", self.sample_rate)));
        }
        if self.listen_channel > 15 {
            return Err(ConfigError::invalid("listen_channel", "must be 0-15"));
        }
        if self.voices == 0 || self.voices > MAX_VOICES {
            return Err(ConfigError::invalid("voices", format!("must be 1-{}", MAX_VOICES)));
        }
        if self.midi_baud == 0 || self.midi_baud as u64 > self.sample_rate as u64 * 10 {
            return Err(ConfigError::invalid("midi_baud", format!("{} baud is out of range", self.midi_baud)));
        }
        if self.dac_bits == 0 || self.dac_bits > 16 {
            return Err(ConfigError::invalid("dac_bits", "must be 1-16"));
        }
        if self.wavetable_size == 0 || self.wavetable_size > MAX_WAVETABLE_SIZE {
            return Err(ConfigError::invalid("wavetable_size", format!("must be 1-{}", MAX_WAVETABLE_SIZE)));
        }
        if self.tail_seconds.is_nan() || self.tail_seconds < 0.0 {
            return Err(ConfigError::invalid("tail_seconds", "must not be negative"));
        }
        Ok(())
    }

    /// Sample periods per serial byte.
    pub fn samples_per_byte(&self) -> u32 {
        (self.sample_rate * 10 / self.midi_baud).max(1)
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            sample_rate: self.sample_rate,
            listen_channel: self.listen_channel,
            voices: self.voices,
            steal_policy: self.steal_policy.into(),
            initial_program: self.initial_program,
        }
    }
}
