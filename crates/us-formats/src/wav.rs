//! WAV export of rendered output.
//!
//! The engine produces unsigned 16-bit samples centred on 0x8000; WAV
//! stores signed PCM, so flipping the top bit converts between the two.

use std::io::{Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::FormatError;

fn spec(sample_rate: u32) -> WavSpec {
    WavSpec { channels: 1, sample_rate, bits_per_sample: 16, sample_format: SampleFormat::Int }
}

/// Write mono 16-bit PCM.
pub fn write_wav<W: Write + Seek>(writer: W, sample_rate: u32, samples: &[u16]) -> Result<(), FormatError> {
    let mut wav = WavWriter::new(writer, spec(sample_rate))?;
    for &s in samples {
        wav.write_sample((s ^ 0x8000) as i16)?;
    }
    wav.finalize()?;
    Ok(())
}

pub fn write_wav_file(path: impl AsRef<Path>, sample_rate: u32, samples: &[u16]) -> Result<(), FormatError> {
    let mut wav = WavWriter::create(path, spec(sample_rate))?;
    for &s in samples {
        wav.write_sample((s ^ 0x8000) as i16)?;
    }
    wav.finalize()?;
    Ok(())
}

/// Read a mono 16-bit file back as engine samples. Returns `(sample_rate, samples)`.
pub fn read_wav<R: Read>(reader: R) -> Result<(u32, Vec<u16>), FormatError> {
    let wav = WavReader::new(reader)?;
    let s = wav.spec();
    if s.channels != 1 || s.bits_per_sample != 16 || s.sample_format != SampleFormat::Int {
        return Err(FormatError::Invalid(format!(
            "expected mono 16-bit PCM, got {} ch {} bit",
            s.channels, s.bits_per_sample
        )));
    }
    let samples = wav
        .into_samples::<i16>()
        .map(|r| r.map(|v| (v as u16) ^ 0x8000))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((s.sample_rate, samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn midpoint_is_digital_silence() {
        let mut cursor = Cursor::new(Vec::new());
        write_wav(&mut cursor, 28_000, &[0x8000, 0xffff, 0x0000]).unwrap();

        let bytes = cursor.into_inner();
        let mut reader = WavReader::new(Cursor::new(&bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 28_000);
        let raw: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(raw, vec![0, i16::MAX, i16::MIN]);

        let (rate, back) = read_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(rate, 28_000);
        assert_eq!(back, vec![0x8000, 0xffff, 0x0000]);
    }

    #[test]
    fn stereo_input_is_rejected() {
        let mut cursor = Cursor::new(Vec::new());
        let stereo = WavSpec { channels: 2, ..spec(44_100) };
        let mut w = WavWriter::new(&mut cursor, stereo).unwrap();
        w.write_sample(0i16).unwrap();
        w.write_sample(0i16).unwrap();
        w.finalize().unwrap();
        assert!(matches!(read_wav(Cursor::new(cursor.into_inner())), Err(FormatError::Invalid(_))));
    }
}
