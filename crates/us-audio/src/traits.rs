//! Sink trait and error types.

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Failed to initialize audio device
    #[error("device init error: {0}")]
    DeviceInit(String),
    /// Failed to create audio stream
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio device available")]
    NoDevice,
}

/// Destination for DAC samples (unsigned 16-bit, centred on 0x8000).
pub trait SampleSink {
    /// Rate the samples are produced at.
    fn sample_rate(&self) -> u32;

    /// Accept one sample from the timer. Must not block.
    fn push(&mut self, sample: u16);

    fn start(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self) -> Result<(), AudioError>;
}
