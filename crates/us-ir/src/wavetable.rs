//! Wavetables: ordered slots cross-fading between authored key waveforms.

use arrayvec::ArrayVec;

/// Bytes per raw waveform (half a cycle; the other half is mirrored).
pub const WAVEFORM_LEN: usize = 64;

/// Slot count used by the bundled tables.
pub const DEFAULT_WAVETABLE_SIZE: usize = 61;

/// Upper bound on slots per wavetable.
pub const MAX_WAVETABLE_SIZE: usize = 64;

/// Unsigned sample value at the centre of the output range.
pub const WAVEFORM_MIDPOINT: u8 = 128;

/// Read-only bank of raw 64-byte waveforms, addressed by id.
#[derive(Clone, Copy, Debug)]
pub struct Waveforms<'a> {
    data: &'a [u8],
}

impl<'a> Waveforms<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Number of complete waveforms in the bank.
    pub fn len(&self) -> usize {
        self.data.len() / WAVEFORM_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw sample `index` (0-63) of waveform `id`. Missing data reads as silence.
    pub fn raw(&self, id: u8, index: u8) -> u8 {
        let offset = id as usize * WAVEFORM_LEN + (index as usize & (WAVEFORM_LEN - 1));
        self.data.get(offset).copied().unwrap_or(WAVEFORM_MIDPOINT)
    }

    /// Sample of waveform `id` at a 16-bit phase.
    ///
    /// The top seven phase bits select one of 128 positions. Positions
    /// below 64 read the stored half-cycle directly; the upper half is the
    /// point reflection `255 - w[63 - i]`.
    pub fn sample(&self, id: u8, phase: u16) -> u8 {
        let position = (phase >> 9) as u8;
        let index = position & 63;
        if position & 64 == 0 {
            self.raw(id, index)
        } else {
            255 - self.raw(id, 63 - index)
        }
    }
}

/// One slot of a wavetable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WavetableEntry {
    /// Waveform id of the nearest key at or before this slot.
    pub left: u8,
    /// Waveform id of the nearest key after this slot.
    pub right: u8,
    /// Cross-fade toward `right` (0 = all `left`).
    pub factor: u8,
    pub is_key: bool,
}

impl WavetableEntry {
    /// A key slot pointing at `waveform`.
    pub fn key(waveform: u8) -> Self {
        Self { left: waveform, right: waveform, factor: 0, is_key: true }
    }

    /// Blended sample at `phase`: `(256 - factor) * left + factor * right`.
    pub fn sample(&self, waveforms: &Waveforms<'_>, phase: u16) -> u16 {
        let left = waveforms.sample(self.left, phase) as u16;
        let right = waveforms.sample(self.right, phase) as u16;
        let factor = self.factor as u16;
        (256 - factor) * left + factor * right
    }
}

/// An interpolation-ready wavetable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Wavetable {
    pub entries: ArrayVec<WavetableEntry, MAX_WAVETABLE_SIZE>,
}

impl Wavetable {
    pub fn new() -> Self {
        Self { entries: ArrayVec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slot `index`, clamped to the last slot.
    pub fn entry(&self, index: u8) -> Option<&WavetableEntry> {
        let last = self.entries.len().checked_sub(1)?;
        self.entries.get((index as usize).min(last))
    }

    /// Sample slot `index` at `phase`. An empty table is silent.
    pub fn sample(&self, waveforms: &Waveforms<'_>, index: u8, phase: u16) -> u16 {
        match self.entry(index) {
            Some(entry) => entry.sample(waveforms, phase),
            None => (WAVEFORM_MIDPOINT as u16) << 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> [u8; WAVEFORM_LEN] {
        let mut wave = [0u8; WAVEFORM_LEN];
        for (i, s) in wave.iter_mut().enumerate() {
            *s = 128 + i as u8 * 2;
        }
        wave
    }

    #[test]
    fn lower_half_reads_directly() {
        let wave = ramp();
        let bank = Waveforms::new(&wave);
        assert_eq!(bank.sample(0, 0), 128);
        assert_eq!(bank.sample(0, 5 << 9), 138);
        assert_eq!(bank.sample(0, 63 << 9), 254);
    }

    #[test]
    fn upper_half_is_point_reflected() {
        let wave = ramp();
        let bank = Waveforms::new(&wave);
        // position 64 mirrors sample 63
        assert_eq!(bank.sample(0, 64 << 9), 255 - 254);
        assert_eq!(bank.sample(0, 127 << 9), 255 - 128);
        // half-select bit only; low phase bits are ignored
        assert_eq!(bank.sample(0, (70 << 9) | 0x1ff), 255 - wave[57]);
    }

    #[test]
    fn missing_waveform_is_midpoint() {
        let bank = Waveforms::new(&[]);
        assert_eq!(bank.sample(3, 0), WAVEFORM_MIDPOINT);
        assert!(bank.is_empty());
    }

    #[test]
    fn entry_blends_left_and_right() {
        let mut data = [0u8; WAVEFORM_LEN * 2];
        data[..WAVEFORM_LEN].fill(100);
        data[WAVEFORM_LEN..].fill(200);
        let bank = Waveforms::new(&data);

        let mut entry = WavetableEntry { left: 0, right: 1, factor: 0, is_key: false };
        assert_eq!(entry.sample(&bank, 0), 256 * 100);
        entry.factor = 128;
        assert_eq!(entry.sample(&bank, 0), 128 * 100 + 128 * 200);
        entry.factor = 255;
        assert_eq!(entry.sample(&bank, 0), 100 + 255 * 200);
    }

    #[test]
    fn table_index_is_clamped() {
        let data = [50u8; WAVEFORM_LEN];
        let bank = Waveforms::new(&data);
        let mut table = Wavetable::new();
        table.entries.push(WavetableEntry::key(0));
        assert_eq!(table.sample(&bank, 40, 0), 256 * 50);
        assert_eq!(Wavetable::new().sample(&bank, 0, 0), 128 << 8);
    }
}
