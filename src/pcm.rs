// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reinterpreting a reassembled byte stream as signed 16-bit PCM.

use std::ops::Deref;

/// Byte order of a multi-byte sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    /// Byte order of the machine this code runs on.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Endianness = Endianness::Big;
    #[cfg(target_endian = "little")]
    pub const NATIVE: Endianness = Endianness::Little;

    /// Order the bench transmitter puts samples on the wire in.
    pub const WIRE: Endianness = Endianness::Big;
}

/// Reconstructed mono PCM audio, in host numeric representation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleBuffer(Vec<i16>);

impl SampleBuffer {
    pub fn new(samples: Vec<i16>) -> SampleBuffer {
        SampleBuffer(samples)
    }

    pub fn as_slice(&self) -> &[i16] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<i16> {
        self.0
    }
}

impl Deref for SampleBuffer {
    type Target = [i16];

    fn deref(&self) -> &[i16] {
        &self.0
    }
}

impl From<Vec<i16>> for SampleBuffer {
    fn from(samples: Vec<i16>) -> SampleBuffer {
        SampleBuffer(samples)
    }
}

/// Decode a stream of big-endian samples as sent by the transmitter.
///
/// A trailing odd byte is dropped, so the result always holds `stream.len() / 2` samples.
pub fn reconstruct(stream: &[u8]) -> SampleBuffer {
    reconstruct_from(stream, Endianness::WIRE, Endianness::NATIVE)
}

/// Decode `stream`, whose samples are in `wire` order, for a host using `host` order.
///
/// Each pair is first read in host order and swapped only when the two orders differ.
pub fn reconstruct_from(stream: &[u8], wire: Endianness, host: Endianness) -> SampleBuffer {
    let swap = wire != host;
    stream
        .chunks_exact(2)
        .map(|pair| {
            let raw = match host {
                Endianness::Big => i16::from_be_bytes([pair[0], pair[1]]),
                Endianness::Little => i16::from_le_bytes([pair[0], pair[1]]),
            };
            if swap {
                raw.swap_bytes()
            } else {
                raw
            }
        })
        .collect::<Vec<i16>>()
        .into()
}
