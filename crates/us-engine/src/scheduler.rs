//! Round-robin slot cycle.
//!
//! Work other than the per-sample oscillator/mix path is split into
//! bounded slots, one slot per output sample. All MIDI slots come before
//! the voice slots so a note-on read in a cycle is seen by each voice
//! before the trigger bits are cleared at the end of that cycle.

use us_ir::MAX_VOICES;

/// One bounded unit of per-sample work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Read one byte from the receive ring.
    Midi,
    /// Re-derive voice parameters from the controller table.
    Params(usize),
    /// Advance the voice's envelopes and LFO.
    Modulate(usize),
    /// Recompute the voice's wavetable position and pitch.
    Waveform(usize),
    /// Clear triggers, resync wavetables, restart the cycle.
    Housekeeping,
}

/// Slots per cycle.
pub const CYCLE_LEN: usize = MAX_VOICES + 3 * MAX_VOICES + 1;

/// The slot sequence walked by [`VoiceScheduler`].
pub const CYCLE: [Slot; CYCLE_LEN] = build_cycle();

const fn build_cycle() -> [Slot; CYCLE_LEN] {
    let mut cycle = [Slot::Housekeeping; CYCLE_LEN];
    let mut i = 0;
    while i < MAX_VOICES {
        cycle[i] = Slot::Midi;
        i += 1;
    }
    let mut v = 0;
    while v < MAX_VOICES {
        cycle[MAX_VOICES + 3 * v] = Slot::Params(v);
        cycle[MAX_VOICES + 3 * v + 1] = Slot::Modulate(v);
        cycle[MAX_VOICES + 3 * v + 2] = Slot::Waveform(v);
        v += 1;
    }
    cycle
}

/// Position in the slot cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoiceScheduler {
    position: usize,
}

impl VoiceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the slot the next call to [`next_slot`](Self::next_slot) returns.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The slot to run for this sample. Housekeeping rewinds the cycle.
    pub fn next_slot(&mut self) -> (usize, Slot) {
        let index = self.position;
        let slot = CYCLE[index];
        self.position = if slot == Slot::Housekeeping { 0 } else { index + 1 };
        (index, slot)
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_layout() {
        assert_eq!(CYCLE_LEN, 17);
        assert!(CYCLE[..MAX_VOICES].iter().all(|s| *s == Slot::Midi));
        assert_eq!(CYCLE[4], Slot::Params(0));
        assert_eq!(CYCLE[5], Slot::Modulate(0));
        assert_eq!(CYCLE[6], Slot::Waveform(0));
        assert_eq!(CYCLE[15], Slot::Waveform(3));
        assert_eq!(CYCLE[16], Slot::Housekeeping);
    }

    #[test]
    fn every_voice_gets_each_stage_once() {
        for v in 0..MAX_VOICES {
            for slot in [Slot::Params(v), Slot::Modulate(v), Slot::Waveform(v)] {
                assert_eq!(CYCLE.iter().filter(|s| **s == slot).count(), 1);
            }
        }
    }

    #[test]
    fn wraps_after_housekeeping() {
        let mut sched = VoiceScheduler::new();
        for i in 0..CYCLE_LEN {
            assert_eq!(sched.next_slot().0, i);
        }
        assert_eq!(sched.position(), 0);
        assert_eq!(sched.next_slot(), (0, Slot::Midi));
    }
}
