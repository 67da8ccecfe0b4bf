//! Read-only data the engine draws from: waveforms, wavetable stream, patches.

use crate::patch::PatchRecord;
use crate::wavetable::Waveforms;

/// Borrowed view of a data bank.
///
/// `wavetables` is the concatenated key-frame stream of every wavetable.
/// `offsets`, when non-empty, gives the byte offset of each wavetable in
/// that stream so selection does not need a linear walk.
#[derive(Clone, Copy, Debug)]
pub struct DataBank<'a> {
    pub waveforms: Waveforms<'a>,
    pub wavetables: &'a [u8],
    pub offsets: &'a [u16],
    pub wavetable_count: u8,
    pub wavetable_size: u8,
    pub patches: &'a [PatchRecord],
}

impl<'a> DataBank<'a> {
    /// Byte offset of wavetable `index` in the stream, if indexed.
    pub fn offset_of(&self, index: u8) -> Option<usize> {
        self.offsets.get(index as usize).map(|&o| o as usize)
    }

    /// Highest selectable wavetable index.
    pub fn last_wavetable(&self) -> u8 {
        self.wavetable_count.saturating_sub(1)
    }
}
