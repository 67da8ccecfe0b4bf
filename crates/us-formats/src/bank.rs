//! Bank container (`.uswb`).
//!
//! Little-endian layout:
//!
//! ```text
//! "USWB" version:u8 waveform_count:u8 wavetable_count:u8 wavetable_size:u8
//! offsets:[u16; wavetable_count]
//! stream_len:u32 stream:[u8; stream_len]
//! waveforms:[u8; 64 * waveform_count]
//! patch_count:u16 patches:[(param:u8, value:u8); patch_count]
//! ```

use std::io::Cursor;
use std::path::Path;

use binrw::{binrw, BinRead, BinResult, BinWrite};
use us_engine::{wavetable_loader, DEFAULT_PATCHES};
use us_ir::{DataBank, PatchRecord, Waveforms, Wavetable, DEFAULT_WAVETABLE_SIZE, MAX_WAVETABLE_SIZE, WAVEFORM_LEN};

use crate::FormatError;

pub const BANK_MAGIC: &[u8; 4] = b"USWB";
pub const BANK_VERSION: u8 = 1;

/// An owned data bank as stored on disk.
#[binrw]
#[brw(little, magic = b"USWB")]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BankFile {
    pub version: u8,

    #[br(temp)]
    #[bw(calc = (waveforms.len() / WAVEFORM_LEN) as u8)]
    waveform_count: u8,

    #[br(temp)]
    #[bw(calc = offsets.len() as u8)]
    wavetable_count: u8,

    pub wavetable_size: u8,

    /// Byte offset of each wavetable in `stream`
    #[br(count = wavetable_count)]
    pub offsets: Vec<u16>,

    #[br(temp)]
    #[bw(calc = stream.len() as u32)]
    stream_len: u32,

    /// Concatenated key-frame wavetables
    #[br(count = stream_len)]
    pub stream: Vec<u8>,

    /// Raw 64-byte waveforms
    #[br(count = waveform_count as usize * WAVEFORM_LEN)]
    pub waveforms: Vec<u8>,

    #[br(temp)]
    #[bw(calc = patches.len() as u16)]
    patch_count: u16,

    #[br(parse_with = parse_patches, args(patch_count))]
    #[bw(write_with = write_patches)]
    pub patches: Vec<PatchRecord>,
}

#[binrw::parser(reader, endian)]
fn parse_patches(count: u16) -> BinResult<Vec<PatchRecord>> {
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let [param, value] = <[u8; 2]>::read_options(reader, endian, ())?;
        records.push(PatchRecord { param, value });
    }
    Ok(records)
}

#[binrw::writer(writer, endian)]
fn write_patches(records: &Vec<PatchRecord>) -> BinResult<()> {
    for record in records {
        [record.param, record.value].write_options(writer, endian, ())?;
    }
    Ok(())
}

impl BankFile {
    /// Assemble a bank from key-frame tables given as `(waveform, slot)` keys.
    ///
    /// Each table must end with a key in its last slot.
    pub fn from_tables(
        waveforms: Vec<u8>,
        tables: &[&[(u8, u8)]],
        wavetable_size: u8,
        patches: Vec<PatchRecord>,
    ) -> Result<Self, FormatError> {
        let mut stream = Vec::new();
        let mut offsets = Vec::with_capacity(tables.len());
        for keys in tables {
            let offset = u16::try_from(stream.len())
                .map_err(|_| FormatError::Invalid("wavetable stream exceeds 64 KiB".into()))?;
            offsets.push(offset);
            // leading byte is ignored by the loader
            stream.push(0);
            for &(waveform, slot) in keys.iter() {
                stream.push(waveform);
                stream.push(slot);
            }
        }

        let bank = Self { version: BANK_VERSION, wavetable_size, offsets, stream, waveforms, patches };
        bank.validate()?;
        Ok(bank)
    }

    /// The bank compiled into the binary: eight generated waveforms, four
    /// wavetables and the factory patches.
    pub fn builtin() -> Result<Self, FormatError> {
        let mut waveforms = Vec::with_capacity(8 * WAVEFORM_LEN);
        for shape in 0..8 {
            waveforms.extend_from_slice(&generate_waveform(shape));
        }

        let last = DEFAULT_WAVETABLE_SIZE as u8 - 1;
        let tables: [&[(u8, u8)]; 4] = [
            &[(0, 0), (1, last)],
            &[(0, 0), (2, 30), (3, last)],
            &[(0, 0), (5, 20), (6, 40), (4, last)],
            &[(3, 0), (4, 30), (7, last)],
        ];

        Self::from_tables(waveforms, &tables, DEFAULT_WAVETABLE_SIZE as u8, DEFAULT_PATCHES.to_vec())
    }

    /// Parse and validate a bank.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let bank = Self::read(&mut Cursor::new(data))?;
        bank.validate()?;
        Ok(bank)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        self.validate()?;
        let mut cursor = Cursor::new(Vec::new());
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn waveform_count(&self) -> usize {
        self.waveforms.len() / WAVEFORM_LEN
    }

    pub fn wavetable_count(&self) -> usize {
        self.offsets.len()
    }

    /// Borrowed view for the engine.
    pub fn as_bank(&self) -> DataBank<'_> {
        DataBank {
            waveforms: Waveforms::new(&self.waveforms),
            wavetables: &self.stream,
            offsets: &self.offsets,
            wavetable_count: self.offsets.len() as u8,
            wavetable_size: self.wavetable_size,
            patches: &self.patches,
        }
    }

    /// Check counts and decode every wavetable once.
    fn validate(&self) -> Result<(), FormatError> {
        if self.version != BANK_VERSION {
            return Err(FormatError::UnsupportedVersion(self.version));
        }
        let size = self.wavetable_size as usize;
        if size == 0 || size > MAX_WAVETABLE_SIZE {
            return Err(FormatError::Invalid(format!("wavetable size {}", size)));
        }
        if self.waveforms.len() % WAVEFORM_LEN != 0 || self.waveform_count() > u8::MAX as usize {
            return Err(FormatError::Invalid(format!("{} waveform bytes", self.waveforms.len())));
        }
        if self.offsets.len() > u8::MAX as usize || self.patches.len() > u16::MAX as usize {
            return Err(FormatError::Invalid("too many entries".into()));
        }

        let bank = self.as_bank();
        let mut table = Wavetable::new();
        for index in 0..bank.wavetable_count {
            wavetable_loader::load_from_bank(&mut table, &bank, index)
                .map_err(|source| FormatError::Wavetable { index, source })?;
            let count = self.waveform_count();
            if let Some(entry) = table.entries.iter().find(|e| e.left as usize >= count || e.right as usize >= count) {
                return Err(FormatError::Invalid(format!(
                    "wavetable {} references waveform {}",
                    index,
                    entry.left.max(entry.right)
                )));
            }
        }
        Ok(())
    }
}

/// One half-cycle of built-in waveform `shape`.
fn generate_waveform(shape: u8) -> [u8; WAVEFORM_LEN] {
    let mut wave = [0u8; WAVEFORM_LEN];
    let mut noise: u32 = 0x1234_5678;
    for (i, sample) in wave.iter_mut().enumerate() {
        let x = i as f32 / WAVEFORM_LEN as f32;
        let theta = std::f32::consts::PI * x;
        let v = match shape {
            0 => theta.sin(),
            1 => 1.0 - (2.0 * x - 1.0).abs(),
            2 => x,
            3 => 1.0,
            // 25% pulse
            4 => {
                if x < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            5 => 0.6 * theta.sin() + 0.4 * (2.0 * theta).sin(),
            6 => 0.7 * theta.sin() + 0.3 * (3.0 * theta).sin(),
            _ => {
                noise = noise.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((noise >> 16) & 0x7fff) as f32 / 16384.0 - 1.0
            }
        };
        *sample = (128.0 + 127.0 * v).round().clamp(0.0, 255.0) as u8;
    }
    wave
}
