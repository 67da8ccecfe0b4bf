//! Single-slot sample handoff between the render loop and the output timer.

use core::sync::atomic::{AtomicU32, Ordering};

const SAMPLE: u32 = 0xffff;
const CONSUMED: u32 = 1 << 16;

/// Latest rendered sample plus a "consumed" flag, packed in one word.
///
/// The render loop publishes a sample and then polls
/// [`take_consumed`](Self::take_consumed) before publishing the next one.
/// The timer side calls [`consume`](Self::consume) once per period.
/// A consume either sees the new sample or is ordered before the publish
/// that replaces it, in which case the publish clears its flag.
#[derive(Debug)]
pub struct SampleMailbox {
    slot: AtomicU32,
}

impl SampleMailbox {
    /// An empty mailbox holding the mid-scale sample.
    pub const fn new() -> Self {
        Self { slot: AtomicU32::new(0x8000) }
    }

    /// Store the next sample and clear the consumed flag.
    pub fn publish(&self, sample: u16) {
        self.slot.store(sample as u32, Ordering::Release);
    }

    /// Read the current sample and raise the consumed flag.
    pub fn consume(&self) -> u16 {
        (self.slot.fetch_or(CONSUMED, Ordering::AcqRel) & SAMPLE) as u16
    }

    /// Whether the timer took the sample since the last check. Clears the flag.
    pub fn take_consumed(&self) -> bool {
        self.slot.fetch_and(!CONSUMED, Ordering::AcqRel) & CONSUMED != 0
    }

    /// Peek without signalling.
    pub fn peek(&self) -> u16 {
        (self.slot.load(Ordering::Acquire) & SAMPLE) as u16
    }
}

impl Default for SampleMailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handoff_sequence() {
        let mailbox = SampleMailbox::new();
        assert_eq!(mailbox.peek(), 0x8000);
        assert!(!mailbox.take_consumed());

        mailbox.publish(1234);
        assert_eq!(mailbox.consume(), 1234);
        assert!(mailbox.take_consumed());
        // flag is one-shot
        assert!(!mailbox.take_consumed());
    }

    #[test]
    fn consumer_repeats_last_sample_on_underrun() {
        let mailbox = SampleMailbox::new();
        mailbox.publish(7);
        assert_eq!(mailbox.consume(), 7);
        assert_eq!(mailbox.consume(), 7);
    }

    #[test]
    fn consume_before_publish_does_not_mark_new_sample() {
        let mailbox = SampleMailbox::new();
        mailbox.publish(1);
        assert_eq!(mailbox.consume(), 1);
        assert!(mailbox.take_consumed());
        // the timer repeats the old sample just before the next publish lands
        assert_eq!(mailbox.consume(), 1);
        mailbox.publish(2);
        assert!(!mailbox.take_consumed());
        assert_eq!(mailbox.consume(), 2);
        assert!(mailbox.take_consumed());
    }

    #[test]
    fn every_published_sample_is_consumed_once() {
        let mailbox = SampleMailbox::new();
        let mut seen = Vec::new();
        std::thread::scope(|s| {
            let mailbox = &mailbox;
            s.spawn(move || {
                for i in 1..=2000u16 {
                    mailbox.publish(i);
                    while !mailbox.take_consumed() {
                        std::hint::spin_loop();
                    }
                }
            });
            let mut last = 0x8000;
            while last != 2000 {
                let v = mailbox.consume();
                if v != last {
                    seen.push(v);
                    last = v;
                }
            }
        });
        // the producer only advances after its sample was taken
        assert_eq!(seen, (1..=2000).collect::<Vec<u16>>());
    }

    #[test]
    fn works_across_threads() {
        let mailbox = SampleMailbox::new();
        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..100u16 {
                    mailbox.publish(i);
                    while !mailbox.take_consumed() {
                        std::hint::spin_loop();
                    }
                }
            });
            let mut last = None;
            while last != Some(99) {
                let v = mailbox.peek();
                if Some(v) != last && v != 0x8000 {
                    // only consume fresh samples
                    last = Some(mailbox.consume());
                }
                std::hint::spin_loop();
            }
        });
    }
}
