//! Phase-accumulator wavetable oscillator.

use us_ir::{Waveforms, Wavetable};

/// One wavetable oscillator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Oscillator {
    /// 16-bit phase accumulator, wraps once per cycle.
    pub phase: u16,
    /// Phase increment per sample.
    pub phase_step: u16,
    /// Wavetable slot to play.
    pub wave: u8,
    /// Last unsigned output sample (`0..=65280`).
    pub output: u16,
}

impl Oscillator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one sample and resample the selected slot.
    #[inline]
    pub fn step(&mut self, table: &Wavetable, waveforms: &Waveforms<'_>) -> u16 {
        self.phase = self.phase.wrapping_add(self.phase_step);
        self.output = table.sample(waveforms, self.wave, self.phase);
        self.output
    }

    /// Restart the cycle (note retrigger).
    pub fn reset_phase(&mut self) {
        self.phase = 0;
    }

    /// Output centred on zero.
    pub fn signed_output(&self) -> i16 {
        (self.output as i32 - 32768) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use us_ir::{WavetableEntry, WAVEFORM_LEN};

    fn single_key_table() -> Wavetable {
        let mut table = Wavetable::new();
        table.entries.push(WavetableEntry::key(0));
        table
    }

    #[test]
    fn phase_wraps() {
        let data = [128u8; WAVEFORM_LEN];
        let bank = Waveforms::new(&data);
        let table = single_key_table();
        let mut osc = Oscillator { phase: 0xff00, phase_step: 0x200, ..Oscillator::new() };
        osc.step(&table, &bank);
        assert_eq!(osc.phase, 0x0100);
    }

    #[test]
    fn output_follows_waveform() {
        let mut data = [0u8; WAVEFORM_LEN];
        for (i, s) in data.iter_mut().enumerate() {
            *s = 128 + i as u8;
        }
        let bank = Waveforms::new(&data);
        let table = single_key_table();
        let mut osc = Oscillator { phase_step: 1 << 9, ..Oscillator::new() };
        // phase position 1
        assert_eq!(osc.step(&table, &bank), 129 << 8);
        osc.step(&table, &bank);
        assert_eq!(osc.output, 130 << 8);
        assert_eq!(osc.signed_output(), ((130i32 << 8) - 32768) as i16);
    }

    #[test]
    fn zero_step_holds_phase() {
        let data = [200u8; WAVEFORM_LEN];
        let bank = Waveforms::new(&data);
        let table = single_key_table();
        let mut osc = Oscillator { phase: 1234, ..Oscillator::new() };
        osc.step(&table, &bank);
        assert_eq!(osc.phase, 1234);
        osc.reset_phase();
        assert_eq!(osc.phase, 0);
    }
}
