//! File formats for the usynth tone generator.
//!
//! The bank container bundles waveforms, the wavetable key-frame stream
//! and the patch table. Rendered audio is exported as WAV.

mod bank;
mod hex;
mod wav;

pub use bank::{BankFile, BANK_MAGIC, BANK_VERSION};
pub use hex::parse_hex;
pub use wav::{read_wav, write_wav, write_wav_file};

use us_engine::LoadError;

/// Error type for bank, byte-stream and WAV handling.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Container structure could not be parsed or written
    #[error("bank container: {0}")]
    Container(#[from] binrw::Error),
    #[error("unsupported bank version {0}")]
    UnsupportedVersion(u8),
    /// Container parsed but its contents are inconsistent
    #[error("invalid bank: {0}")]
    Invalid(String),
    #[error("wavetable {index}: {source}")]
    Wavetable {
        index: u8,
        #[source]
        source: LoadError,
    },
    #[error("invalid hex byte {0:?}")]
    Hex(String),
    #[error("WAV: {0}")]
    Wav(#[from] hound::Error),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}
