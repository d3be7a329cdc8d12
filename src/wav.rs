// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Canonical RIFF/WAVE container for mono 16-bit PCM.
//!
//! Layout written by `write_to`:
//!
//! ```text
//! "RIFF" <36 + data_len:u32> "WAVE"
//! "fmt " <16:u32> <1:u16 PCM> <channels:u16> <rate:u32> <byte_rate:u32> <block_align:u16> <16:u16>
//! "data" <data_len:u32> <samples as i16 little-endian>
//! ```
//!
//! All integers are little-endian whatever the host order.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::output::OutputFile;

/// Sample rate of the bench audio path.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

const PCM_FORMAT: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const FMT_CHUNK_LEN: u32 = 16;
/// Bytes of header before the sample data.
pub const HEADER_LEN: usize = 44;

/// Format parameters of a WAVE file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavSpec {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavSpec {
    pub fn mono(sample_rate: u32) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
        }
    }

    /// Bytes per sample frame, or `None` if it does not fit the header field.
    pub fn block_align(&self) -> Option<u16> {
        self.channels.checked_mul(self.bits_per_sample / 8)
    }

    /// Bytes per second, or `None` if it does not fit the header field.
    pub fn byte_rate(&self) -> Option<u32> {
        self.block_align()
            .and_then(|align| self.sample_rate.checked_mul(u32::from(align)))
    }
}

/// Write `samples` as a mono WAVE file at `path`.
///
/// The file appears only once it is complete. An empty buffer yields a valid header-only file;
/// callers that want to refuse empty output check before calling.
pub fn write_wav<P: AsRef<Path>>(samples: &[i16], sample_rate: u32, path: P) -> Result<()> {
    let mut out = OutputFile::create(path.as_ref())?;
    write_to(&mut out, samples, sample_rate)?;
    let path = out.commit()?;
    debug!(path = %path.display(), samples = samples.len(), sample_rate, "wrote WAVE file");
    Ok(())
}

/// Serialize a mono WAVE file into `out`.
pub fn write_to<W: Write>(out: &mut W, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = WavSpec::mono(sample_rate);
    let data_len = samples
        .len()
        .checked_mul(2)
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| len.checked_add(HEADER_LEN as u32 - 8).is_some())
        .ok_or_else(|| Error::InvalidWave(format!("{} samples do not fit", samples.len())))?;
    let (block_align, byte_rate) = spec
        .block_align()
        .zip(spec.byte_rate())
        .ok_or_else(|| {
            Error::InvalidWave(format!("sample rate of {} Hz does not fit", sample_rate))
        })?;

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&(data_len + HEADER_LEN as u32 - 8).to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    header.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    header.extend_from_slice(&spec.channels.to_le_bytes());
    header.extend_from_slice(&spec.sample_rate.to_le_bytes());
    header.extend_from_slice(&byte_rate.to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&spec.bits_per_sample.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_len.to_le_bytes());
    out.write_all(&header)?;

    let mut data = Vec::with_capacity(data_len as usize);
    for sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    out.write_all(&data)?;
    out.flush()?;
    Ok(())
}

/// Read back a 16-bit PCM WAVE file written by `write_wav` or any conforming encoder.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(WavSpec, Vec<i16>)> {
    let file = File::open(path)?;
    read_from(BufReader::new(file))
}

/// Parse a 16-bit PCM WAVE stream. Chunks other than `fmt ` and `data` are skipped.
pub fn read_from<R: Read>(mut input: R) -> Result<(WavSpec, Vec<i16>)> {
    let mut riff = [0u8; 12];
    read_exact(&mut input, &mut riff, "RIFF header")?;
    if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err(Error::InvalidWave("missing RIFF/WAVE signature".into()));
    }

    let mut spec = None;
    loop {
        let mut chunk = [0u8; 8];
        read_exact(&mut input, &mut chunk, "chunk header")?;
        let id = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let len = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]) as usize;

        match &id {
            b"fmt " => {
                if len < FMT_CHUNK_LEN as usize {
                    return Err(Error::InvalidWave(format!("fmt chunk of {} bytes", len)));
                }
                let body = read_chunk(&mut input, len + len % 2, "fmt chunk")?;
                let u16_at = |i: usize| u16::from_le_bytes([body[i], body[i + 1]]);
                let format = u16_at(0);
                let parsed = WavSpec {
                    channels: u16_at(2),
                    sample_rate: u32::from_le_bytes([body[4], body[5], body[6], body[7]]),
                    bits_per_sample: u16_at(14),
                };
                if format != PCM_FORMAT || parsed.bits_per_sample != BITS_PER_SAMPLE {
                    return Err(Error::InvalidWave(format!(
                        "unsupported format {} with {} bits per sample",
                        format, parsed.bits_per_sample
                    )));
                }
                spec = Some(parsed);
            }
            b"data" => {
                let spec = spec.ok_or_else(|| Error::InvalidWave("data before fmt".into()))?;
                let data = read_chunk(&mut input, len, "sample data")?;
                let samples = data
                    .chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                return Ok((spec, samples));
            }
            _ => {
                let skip = (len + len % 2) as u64;
                let skipped = io::copy(&mut (&mut input).take(skip), &mut io::sink())?;
                if skipped != skip {
                    return Err(Error::InvalidWave("truncated chunk".into()));
                }
            }
        }
    }
}

/// Read a chunk body of `len` bytes without trusting `len` for the allocation.
fn read_chunk<R: Read>(input: &mut R, len: usize, what: &str) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    input.by_ref().take(len as u64).read_to_end(&mut body)?;
    if body.len() != len {
        return Err(Error::InvalidWave(format!("truncated {}", what)));
    }
    Ok(body)
}

fn read_exact<R: Read>(input: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::InvalidWave(format!("truncated {}", what)),
        _ => Error::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(samples: &[i16], rate: u32) -> Vec<u8> {
        let mut out = Vec::new();
        write_to(&mut out, samples, rate).unwrap();
        out
    }

    #[test]
    fn canonical_header() {
        let bytes = encoded(&[0x0102, -1], 48000);
        assert_eq!(bytes.len(), 44 + 4);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[4..8], &40u32.to_le_bytes());
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(&bytes[16..20], &16u32.to_le_bytes());
        assert_eq!(&bytes[20..22], &1u16.to_le_bytes());
        assert_eq!(&bytes[22..24], &1u16.to_le_bytes());
        assert_eq!(&bytes[24..28], &48000u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &96000u32.to_le_bytes());
        assert_eq!(&bytes[32..34], &2u16.to_le_bytes());
        assert_eq!(&bytes[34..36], &16u16.to_le_bytes());
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(&bytes[40..44], &4u32.to_le_bytes());
        assert_eq!(&bytes[44..], &[0x02, 0x01, 0xff, 0xff]);
    }

    #[test]
    fn header_only_for_empty_buffer() {
        let bytes = encoded(&[], 48000);
        assert_eq!(bytes.len(), 44);
        assert_eq!(&bytes[4..8], &36u32.to_le_bytes());
        assert_eq!(&bytes[40..44], &0u32.to_le_bytes());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        for len in [0usize, 1, 600] {
            let samples: Vec<i16> = (0..len)
                .map(|i| (i as i16).wrapping_mul(97).wrapping_sub(300))
                .collect();
            let path = dir.path().join(format!("out-{}.wav", len));
            write_wav(&samples, 48000, &path).unwrap();

            let (spec, read) = read_wav(&path).unwrap();
            assert_eq!(spec, WavSpec::mono(48000));
            assert_eq!(read, samples);
            assert_eq!(std::fs::metadata(&path).unwrap().len(), 44 + 2 * len as u64);
        }
    }

    #[test]
    fn files_open_in_an_independent_reader() {
        let dir = tempfile::tempdir().unwrap();
        for len in [0usize, 1, 600] {
            let samples: Vec<i16> = (0..len)
                .map(|i| (i as i16).wrapping_mul(-211).wrapping_add(17))
                .collect();
            let path = dir.path().join(format!("hound-{}.wav", len));
            write_wav(&samples, 48000, &path).unwrap();

            let mut reader = hound::WavReader::open(&path).unwrap();
            let spec = reader.spec();
            assert_eq!(spec.channels, 1);
            assert_eq!(spec.sample_rate, 48000);
            assert_eq!(spec.bits_per_sample, 16);
            assert_eq!(spec.sample_format, hound::SampleFormat::Int);
            assert_eq!(reader.len() as usize, len);
            let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
            assert_eq!(read, samples);
        }
    }

    #[test]
    fn byte_rate_overflow_is_refused() {
        assert_eq!(WavSpec::mono(48000).byte_rate(), Some(96000));
        assert_eq!(WavSpec::mono(u32::MAX).byte_rate(), None);

        let mut out = Vec::new();
        assert!(matches!(
            write_to(&mut out, &[1, 2], u32::MAX),
            Err(Error::InvalidWave(_))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn oversized_chunk_length_is_truncation() {
        let mut bytes = encoded(&[], 48000);
        bytes[40..44].copy_from_slice(&0xffff_fff0u32.to_le_bytes());
        bytes.extend_from_slice(&[0x01, 0x00]);
        assert!(matches!(read_from(&bytes[..]), Err(Error::InvalidWave(_))));

        let mut fmt = encoded(&[1], 48000);
        fmt[16..20].copy_from_slice(&0xffff_fff0u32.to_le_bytes());
        assert!(matches!(read_from(&fmt[..]), Err(Error::InvalidWave(_))));
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let plain = encoded(&[7, 8], 8000);
        // A LIST chunk with an odd length (plus pad byte) between fmt and data.
        let list = [b"LIST".as_ref(), &3u32.to_le_bytes(), b"abc\0"].concat();
        let bytes = [&plain[..36], &list[..], &plain[36..]].concat();
        let (spec, samples) = read_from(&bytes[..]).unwrap();
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(samples, vec![7, 8]);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            read_from(&b"RIFX\0\0\0\0WAVE"[..]),
            Err(Error::InvalidWave(_))
        ));
        let truncated = encoded(&[1, 2, 3], 48000);
        assert!(matches!(
            read_from(&truncated[..truncated.len() - 1]),
            Err(Error::InvalidWave(_))
        ));
        let mut float = encoded(&[1], 48000);
        float[20] = 3;
        assert!(matches!(read_from(&float[..]), Err(Error::InvalidWave(_))));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        assert!(matches!(write_wav(&[1], 48000, &path), Err(Error::Io(_))));
    }
}
