//! Host error types.

use us_audio::AudioError;
use us_formats::FormatError;

/// Configuration could not be loaded or is out of range.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid { field, reason: reason.into() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("audio: {0}")]
    Audio(#[from] AudioError),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    /// A realtime worker thread panicked.
    #[error("{0} thread panicked")]
    Thread(&'static str),
}
