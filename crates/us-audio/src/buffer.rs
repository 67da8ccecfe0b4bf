//! In-memory sink used by offline renders.

use crate::traits::{AudioError, SampleSink};

/// Collects every pushed sample while running.
#[derive(Debug, Default)]
pub struct BufferSink {
    sample_rate: u32,
    samples: Vec<u16>,
    running: bool,
}

impl BufferSink {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate, samples: Vec::new(), running: false }
    }

    pub fn with_capacity(sample_rate: u32, capacity: usize) -> Self {
        Self { sample_rate, samples: Vec::with_capacity(capacity), running: false }
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<u16> {
        self.samples
    }
}

impl SampleSink for BufferSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn push(&mut self, sample: u16) {
        if self.running {
            self.samples.push(sample);
        }
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_records_while_running() {
        let mut sink = BufferSink::new(28_000);
        sink.push(1);
        sink.start().unwrap();
        sink.push(2);
        sink.push(3);
        sink.stop().unwrap();
        sink.push(4);
        assert_eq!(sink.sample_rate(), 28_000);
        assert_eq!(sink.into_samples(), vec![2, 3]);
    }
}
