//! Serial receive path and the output timer.
//!
//! The receive side owns the producer half of a small byte ring; the
//! render loop drains the consumer half one byte per MIDI slot. Bytes
//! arrive at line rate: one per `fs * 10 / baud` sample periods.

use std::collections::VecDeque;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use us_audio::SampleSink;
use us_engine::SampleMailbox;

use crate::dac::Dac;

/// Receive ring capacity in bytes.
pub const RX_CAPACITY: usize = 64;

/// Create the receive ring, returning the line side and the render-loop side.
pub fn rx_ring(input: impl IntoIterator<Item = u8>, samples_per_byte: u32) -> (SerialLine, HeapCons<u8>) {
    let (producer, consumer) = HeapRb::<u8>::new(RX_CAPACITY).split();
    (SerialLine::new(producer, input, samples_per_byte), consumer)
}

/// Bytes still "on the wire", delivered into the ring at line rate.
pub struct SerialLine {
    producer: HeapProd<u8>,
    pending: VecDeque<u8>,
    samples_per_byte: u32,
    countdown: u32,
    overruns: usize,
}

impl SerialLine {
    fn new(producer: HeapProd<u8>, input: impl IntoIterator<Item = u8>, samples_per_byte: u32) -> Self {
        let samples_per_byte = samples_per_byte.max(1);
        Self {
            producer,
            pending: input.into_iter().collect(),
            samples_per_byte,
            countdown: samples_per_byte,
            overruns: 0,
        }
    }

    /// Advance one sample period; a full byte time moves one byte into the ring.
    pub fn clock(&mut self) {
        self.countdown -= 1;
        if self.countdown > 0 {
            return;
        }
        self.countdown = self.samples_per_byte;
        if let Some(byte) = self.pending.pop_front() {
            if self.producer.try_push(byte).is_err() {
                self.overruns += 1;
                tracing::warn!(byte, "serial receive overrun");
            }
        }
    }

    /// No bytes left to deliver.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Bytes lost because the ring was full.
    pub fn overruns(&self) -> usize {
        self.overruns
    }
}

/// Drain whatever the ring holds right now.
pub fn drain<'a>(consumer: &'a mut HeapCons<u8>) -> impl Iterator<Item = u8> + 'a {
    core::iter::from_fn(move || consumer.try_pop())
}

/// The periodic output interrupt: hands the mailbox sample to the DAC and
/// clocks the serial line.
pub struct TimerTask<'m> {
    mailbox: &'m SampleMailbox,
    dac: Dac,
    line: SerialLine,
    fired: u64,
}

impl<'m> TimerTask<'m> {
    pub fn new(mailbox: &'m SampleMailbox, dac: Dac, line: SerialLine) -> Self {
        Self { mailbox, dac, line, fired: 0 }
    }

    pub fn fire<S: SampleSink + ?Sized>(&mut self, sink: &mut S) {
        let sample = self.mailbox.consume();
        sink.push(self.dac.quantize(sample));
        self.line.clock();
        self.fired += 1;
    }

    /// Sample periods elapsed.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    pub fn line(&self) -> &SerialLine {
        &self.line
    }
}
