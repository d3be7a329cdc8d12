// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Concatenating captured payloads into one stream, with a hex trace on the side.
//!
//! The transport carries no sequence numbers, so segments are joined strictly in arrival
//! order: no reordering, no deduplication, no gap filling.

use std::io::{self, Write};

/// Payload bytes of a capture session, in arrival order.
pub type PayloadStream = Vec<u8>;

/// Builds a `PayloadStream` one segment at a time while tracing each segment to `trace`.
pub struct Reassembler<W: Write> {
    stream: PayloadStream,
    trace: W,
    segments: usize,
}

impl<W: Write> Reassembler<W> {
    pub fn new(trace: W) -> Reassembler<W> {
        Reassembler {
            stream: Vec::new(),
            trace,
            segments: 0,
        }
    }

    /// Append one frame's payload and write its trace line.
    pub fn push(&mut self, payload: &[u8]) -> io::Result<()> {
        write_trace_line(&mut self.trace, payload)?;
        self.stream.extend_from_slice(payload);
        self.segments += 1;
        Ok(())
    }

    /// Number of segments appended so far.
    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    /// Flush the trace and hand back the stream together with the trace writer.
    pub fn finish(mut self) -> io::Result<(PayloadStream, W)> {
        self.trace.flush()?;
        Ok((self.stream, self.trace))
    }
}

/// Concatenate `payloads` in order, tracing each to `trace`.
pub fn reassemble<'a, I, W>(payloads: I, trace: W) -> io::Result<PayloadStream>
where
    I: IntoIterator<Item = &'a [u8]>,
    W: Write,
{
    let mut reassembler = Reassembler::new(trace);
    for payload in payloads {
        reassembler.push(payload)?;
    }
    reassembler.finish().map(|(stream, _)| stream)
}

/// Write `payload` as lowercase hex, two bytes per group.
///
/// Every full group is followed by a space; an odd final byte is written bare. The line ends
/// with `\n`, so an empty payload gives an empty line.
pub fn write_trace_line<W: Write>(out: &mut W, payload: &[u8]) -> io::Result<()> {
    let mut line = String::with_capacity(payload.len() / 2 * 5 + 3);
    for group in payload.chunks(2) {
        line.push_str(&hex::encode(group));
        if group.len() == 2 {
            line.push(' ');
        }
    }
    line.push('\n');
    out.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_of(payloads: &[&[u8]]) -> (PayloadStream, String) {
        let mut trace = Vec::new();
        let stream = reassemble(payloads.iter().copied(), &mut trace).unwrap();
        (stream, String::from_utf8(trace).unwrap())
    }

    #[test]
    fn segments_join_in_arrival_order() {
        let (stream, _) = trace_of(&[&[3, 4], &[1, 2], &[3, 4]]);
        assert_eq!(stream, vec![3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn trace_groups_bytes_in_pairs() {
        let (_, trace) = trace_of(&[&[0x30, 0x31, 0xab, 0xcd]]);
        assert_eq!(trace, "3031 abcd \n");
    }

    #[test]
    fn odd_byte_has_no_trailing_space() {
        let (_, trace) = trace_of(&[&[0x00, 0x0f, 0xf0], &[0x7e]]);
        assert_eq!(trace, "000f f0\n7e\n");
    }

    #[test]
    fn every_byte_value_is_two_lowercase_digits() {
        let payload: Vec<u8> = (0..=255).collect();
        let (_, trace) = trace_of(&[&payload]);
        let expected: String = payload
            .chunks(2)
            .map(|pair| format!("{:02x}{:02x} ", pair[0], pair[1]))
            .chain(std::iter::once("\n".to_string()))
            .collect();
        assert_eq!(trace, expected);
        assert!(trace.starts_with("0001 0203 "));
        assert!(trace.ends_with("fcfd feff \n"));
    }

    #[test]
    fn empty_payload_gives_empty_line() {
        let (stream, trace) = trace_of(&[&[], &[], &[0x01, 0x02]]);
        assert!(stream.len() == 2);
        assert_eq!(trace, "\n\n0102 \n");
    }

    #[test]
    fn reassembler_counts_segments() {
        let mut reassembler = Reassembler::new(Vec::new());
        reassembler.push(&[1, 2, 3]).unwrap();
        reassembler.push(&[]).unwrap();
        assert_eq!(reassembler.segments(), 2);
        assert_eq!(reassembler.len(), 3);
        let (stream, trace) = reassembler.finish().unwrap();
        assert_eq!(stream, vec![1, 2, 3]);
        assert_eq!(trace, b"0102 03\n\n".to_vec());
    }
}
