//! Sample sinks for the usynth host: a capture buffer for offline renders
//! and a CPAL device for realtime playback.

mod buffer;
mod cpal_backend;
mod traits;

pub use buffer::BufferSink;
pub use cpal_backend::CpalSink;
pub use traits::{AudioError, SampleSink};
