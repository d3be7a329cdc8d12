// Copyright (c) 2014, 2015 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The link-layer frame: `destination ∥ source ∥ type ∥ payload`.
//!
//! There is no IP or UDP envelope. The codec itself never strips a trailer; removing the
//! physical-layer checksum from captured frames is left to `capture`.

use std::convert::TryFrom;
use std::fmt;

use crate::error::FrameError;
use crate::{LinkAddress, ProtocolType, LINK_ADDR_LEN, PROTOCOL_TYPE_LEN};

/// Bytes of fixed header in front of the payload.
pub const HEADER_LEN: usize = 2 * LINK_ADDR_LEN + PROTOCOL_TYPE_LEN;

/// Length of the frame check sequence a capture carries after the payload.
pub const DEFAULT_TRAILER_LEN: usize = 4;

/// Largest payload a standard Ethernet link carries.
pub const DEFAULT_MTU: usize = 1500;

/// One encoded link-layer frame, owned by whoever built it.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Build a frame from typed header fields.
    pub fn new(
        destination: LinkAddress,
        source: LinkAddress,
        protocol_type: ProtocolType,
        payload: &[u8],
    ) -> Frame {
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(destination.as_bytes());
        bytes.extend_from_slice(source.as_bytes());
        bytes.extend_from_slice(&protocol_type.to_bytes());
        bytes.extend_from_slice(payload);
        Frame { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total length, header included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn view(&self) -> DecodedFrame<'_> {
        DecodedFrame { raw: &self.bytes }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}

/// Encode raw header fields, checking each one's width.
///
/// Fails with `InvalidFieldWidth` unless both addresses are 6 bytes and the type is 2 bytes.
pub fn encode(
    destination: &[u8],
    source: &[u8],
    protocol_type: &[u8],
    payload: &[u8],
) -> Result<Frame, FrameError> {
    let width = |field: &'static str| {
        move |e: ethpcm_base::FieldWidthError| FrameError::InvalidFieldWidth {
            field,
            expected: e.expected,
            actual: e.actual,
        }
    };
    let destination = LinkAddress::try_from(destination).map_err(width("destination"))?;
    let source = LinkAddress::try_from(source).map_err(width("source"))?;
    let protocol_type = ProtocolType::try_from(protocol_type).map_err(width("protocol type"))?;
    Ok(Frame::new(destination, source, protocol_type, payload))
}

/// Split a raw frame into its header fields and payload.
///
/// The payload is everything after the header, trailer included.
pub fn decode(raw: &[u8]) -> Result<DecodedFrame<'_>, FrameError> {
    if raw.len() < HEADER_LEN {
        return Err(FrameError::FrameTooShort {
            len: raw.len(),
            min: HEADER_LEN,
        });
    }
    Ok(DecodedFrame { raw })
}

/// A borrowed view of a frame known to hold a full header.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    raw: &'a [u8],
}

impl<'a> DecodedFrame<'a> {
    /// Wrap bytes already known to hold a full header.
    pub(crate) fn from_raw(raw: &'a [u8]) -> DecodedFrame<'a> {
        debug_assert!(raw.len() >= HEADER_LEN);
        DecodedFrame { raw }
    }

    pub fn destination(&self) -> LinkAddress {
        let mut octets = [0u8; LINK_ADDR_LEN];
        octets.copy_from_slice(&self.raw[..LINK_ADDR_LEN]);
        LinkAddress(octets)
    }

    pub fn source(&self) -> LinkAddress {
        let mut octets = [0u8; LINK_ADDR_LEN];
        octets.copy_from_slice(&self.raw[LINK_ADDR_LEN..2 * LINK_ADDR_LEN]);
        LinkAddress(octets)
    }

    pub fn protocol_type(&self) -> ProtocolType {
        ProtocolType::from_bytes([self.raw[2 * LINK_ADDR_LEN], self.raw[2 * LINK_ADDR_LEN + 1]])
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.raw[HEADER_LEN..]
    }

    /// The whole frame, header included.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }
}

impl<'a> fmt::Debug for DecodedFrame<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Frame")
            .field("destination", &self.destination())
            .field("source", &self.source())
            .field("protocol_type", &self.protocol_type())
            .field("payload_len", &self.payload().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DST: [u8; 6] = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x00];
    const SRC: [u8; 6] = [0xd8, 0xbb, 0xc1, 0x57, 0xaa, 0x16];
    const TYPE: [u8; 2] = [0x00, 0x40];

    #[test]
    fn bench_frame_layout() {
        let payload: Vec<u8> = b"01".iter().cycle().take(34).cloned().collect();
        let frame = encode(&DST, &SRC, &TYPE, &payload).unwrap();

        assert_eq!(frame.len(), 14 + 34);
        let ref_header = [
            0xde, 0xad, 0xbe, 0xef, 0x00, 0x00, /* destination */
            0xd8, 0xbb, 0xc1, 0x57, 0xaa, 0x16, /* source */
            0x00, 0x40, /* type */
        ];
        assert_eq!(&frame.as_bytes()[..14], &ref_header[..]);
        assert_eq!(&frame.as_bytes()[14..], &payload[..]);
        assert_eq!(&frame.as_bytes()[14..16], &[0x30, 0x31]);
    }

    #[test]
    fn decode_inverts_encode() {
        for payload in [&b""[..], &b"\x01"[..], &[0xffu8; 1500][..]] {
            let frame = encode(&DST, &SRC, &TYPE, payload).unwrap();
            let decoded = decode(frame.as_bytes()).unwrap();
            assert_eq!(decoded.destination(), DST);
            assert_eq!(decoded.source(), SRC);
            assert_eq!(decoded.protocol_type().to_bytes(), TYPE);
            assert_eq!(decoded.payload(), payload);
        }
    }

    #[test]
    fn field_widths_are_checked() {
        for len in [5usize, 7] {
            let addr = vec![0u8; len];
            assert_eq!(
                encode(&addr, &SRC, &TYPE, b""),
                Err(FrameError::InvalidFieldWidth {
                    field: "destination",
                    expected: 6,
                    actual: len
                })
            );
            assert_eq!(
                encode(&DST, &addr, &TYPE, b""),
                Err(FrameError::InvalidFieldWidth {
                    field: "source",
                    expected: 6,
                    actual: len
                })
            );
        }
        for len in [1usize, 3] {
            let ty = vec![0u8; len];
            assert_eq!(
                encode(&DST, &SRC, &ty, b""),
                Err(FrameError::InvalidFieldWidth {
                    field: "protocol type",
                    expected: 2,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn decode_needs_a_full_header() {
        assert_eq!(
            decode(&[0u8; 13]),
            Err(FrameError::FrameTooShort { len: 13, min: 14 })
        );
        let header_only = decode(&[0u8; 14]).unwrap();
        assert!(header_only.payload().is_empty());
    }

    #[test]
    fn decode_keeps_trailer() {
        let raw = [0u8; 18];
        assert_eq!(decode(&raw).unwrap().payload().len(), 4);
    }
}
