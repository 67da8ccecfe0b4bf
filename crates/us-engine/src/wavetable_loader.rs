//! Key-frame wavetable decoding.
//!
//! A wavetable stream starts with one ignored byte followed by
//! `(waveform, slot)` pairs. The pair whose slot is the last slot of the
//! table terminates it. Slots between keys get cross-fade factors toward
//! the following key.

use thiserror::Error;
use us_ir::{DataBank, Wavetable, WavetableEntry, MAX_WAVETABLE_SIZE};

/// Why a wavetable stream could not be decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The stream ended before the terminating slot.
    #[error("wavetable stream truncated at byte {0}")]
    Truncated(usize),
    /// A key addressed a slot past the end of the table.
    #[error("key slot {slot} outside table of {size} slots")]
    SlotOutOfRange { slot: u8, size: usize },
    /// The requested table size is zero or too large.
    #[error("unsupported wavetable size {0}")]
    BadSize(usize),
    /// The bank has no wavetable with this index.
    #[error("no wavetable {0} in bank")]
    MissingTable(u8),
}

// ---------------------------------------------------------------------------
// StreamReader: cursor over the key-frame stream
// ---------------------------------------------------------------------------

struct StreamReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StreamReader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn read_u8(&mut self) -> Result<u8, LoadError> {
        let v = *self.data.get(self.pos).ok_or(LoadError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(v)
    }

    /// Next `(waveform, slot)` pair, checked against the table size.
    fn read_key(&mut self, size: usize) -> Result<(u8, u8), LoadError> {
        let waveform = self.read_u8()?;
        let slot = self.read_u8()?;
        if slot as usize >= size {
            return Err(LoadError::SlotOutOfRange { slot, size });
        }
        Ok((waveform, slot))
    }
}

fn check_size(size: usize) -> Result<(), LoadError> {
    if size == 0 || size > MAX_WAVETABLE_SIZE {
        return Err(LoadError::BadSize(size));
    }
    Ok(())
}

/// Decode the wavetable starting at `start` into `dest`.
///
/// Returns the stream position just past the table. On error `dest` is
/// left unchanged.
pub fn load(dest: &mut Wavetable, size: usize, stream: &[u8], start: usize) -> Result<usize, LoadError> {
    check_size(size)?;
    let mut table = Wavetable::new();
    for _ in 0..size {
        table.entries.push(WavetableEntry::default());
    }

    let mut reader = StreamReader::new(stream, start);
    reader.read_u8()?;
    loop {
        let (waveform, slot) = reader.read_key(size)?;
        table.entries[slot as usize] = WavetableEntry::key(waveform);
        if slot as usize == size - 1 {
            break;
        }
    }

    interpolate(&mut table);
    *dest = table;
    Ok(reader.pos)
}

/// Skip one wavetable without decoding it, returning the position after it.
pub fn skip(size: usize, stream: &[u8], start: usize) -> Result<usize, LoadError> {
    check_size(size)?;
    let mut reader = StreamReader::new(stream, start);
    reader.read_u8()?;
    while reader.read_key(size)?.1 as usize != size - 1 {}
    Ok(reader.pos)
}

/// Load the `index`-th wavetable by walking the stream from the start.
pub fn load_nth(dest: &mut Wavetable, size: usize, stream: &[u8], index: u8) -> Result<usize, LoadError> {
    let mut pos = 0;
    for _ in 0..index {
        pos = skip(size, stream, pos)?;
    }
    load(dest, size, stream, pos)
}

/// Load wavetable `index` from a bank, using its offset index when present.
pub fn load_from_bank(dest: &mut Wavetable, bank: &DataBank<'_>, index: u8) -> Result<usize, LoadError> {
    if index >= bank.wavetable_count {
        return Err(LoadError::MissingTable(index));
    }
    let size = bank.wavetable_size as usize;
    match bank.offset_of(index) {
        Some(offset) => load(dest, size, bank.wavetables, offset),
        None => load_nth(dest, size, bank.wavetables, index),
    }
}

/// Fill pointers and cross-fade factors between keys.
///
/// Each slot points left at the nearest key at or before it and right at
/// the next key after that one. The factor is
/// `(65535 / distance_between_keys * distance_from_left) >> 8`, and zero
/// where the two keys coincide (the final slot).
fn interpolate(table: &mut Wavetable) {
    let size = table.entries.len();
    let Some(first_key) = table.entries.iter().position(|e| e.is_key) else {
        return;
    };

    let mut left = first_key;
    let mut right = first_key;
    for i in 0..size {
        if table.entries[i].is_key {
            left = i;
            right = (i + 1..size).find(|&j| table.entries[j].is_key).unwrap_or(i);
        }

        // Slots ahead of the first key hold that key unblended.
        let (l, r) = if i < first_key { (first_key, first_key) } else { (left, right) };
        let total = (r - l) as u32;
        let from_left = i.saturating_sub(l) as u32;

        let left_wave = table.entries[l].left;
        let right_wave = table.entries[r].left;
        let entry = &mut table.entries[i];
        entry.left = left_wave;
        entry.right = right_wave;
        entry.factor = if total == 0 { 0 } else { ((65535 / total * from_left) >> 8) as u8 };
    }
}
