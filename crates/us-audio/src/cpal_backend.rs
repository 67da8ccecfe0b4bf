//! CPAL-based audio output.
//!
//! The tone generator runs at its own rate (28 kHz by default), so the
//! stream callback steps through the ring at `source_rate / device_rate`
//! samples per device frame, holding the last sample in between.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, SampleSink};

/// Map an unsigned DAC sample onto the device's float range.
fn to_f32(sample: u16) -> f32 {
    ((sample ^ 0x8000) as i16) as f32 / 32768.0
}

pub struct CpalSink {
    source_rate: u32,
    stream: Stream,
    producer: HeapProd<f32>,
    running: Arc<AtomicBool>,
    dropped: u64,
}

impl CpalSink {
    /// Open the default output device for samples produced at `source_rate`.
    pub fn new(source_rate: u32) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config: StreamConfig = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?
            .into();

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            device_rate = config.sample_rate.0,
            source_rate,
            "opened audio output"
        );

        // about 100ms of source samples
        let rb = HeapRb::<f32>::new((source_rate as usize / 10).max(64));
        let (producer, consumer) = rb.split();
        let running = Arc::new(AtomicBool::new(false));
        let stream = build_stream(&device, &config, source_rate, consumer, running.clone())?;

        Ok(Self { source_rate, stream, producer, running, dropped: 0 })
    }

    /// Samples discarded because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Samples queued but not yet played.
    pub fn queued(&self) -> usize {
        self.producer.occupied_len()
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    source_rate: u32,
    mut consumer: HeapCons<f32>,
    running: Arc<AtomicBool>,
) -> Result<Stream, AudioError> {
    let channels = config.channels as usize;
    let step = source_rate as f32 / config.sample_rate.0 as f32;
    let mut phase = 0.0f32;
    let mut current = 0.0f32;

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }
                for frame in data.chunks_mut(channels) {
                    phase += step;
                    while phase >= 1.0 {
                        phase -= 1.0;
                        if let Some(s) = consumer.try_pop() {
                            current = s;
                        }
                    }
                    frame.fill(current);
                }
            },
            |err| tracing::error!(%err, "audio stream error"),
            None,
        )
        .map_err(|e| AudioError::StreamCreate(e.to_string()))?;
    Ok(stream)
}

impl SampleSink for CpalSink {
    fn sample_rate(&self) -> u32 {
        self.source_rate
    }

    fn push(&mut self, sample: u16) {
        if self.producer.try_push(to_f32(sample)).is_err() {
            self.dropped += 1;
        }
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        self.stream.play().map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if self.dropped > 0 {
            tracing::warn!(dropped = self.dropped, "audio ring overflowed");
        }
        self.stream.pause().map_err(|e| AudioError::Playback(e.to_string()))
    }
}
