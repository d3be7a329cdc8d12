// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pulling a bounded number of frames off a raw receive channel.

use std::io;
use std::iter::FusedIterator;

use ethpcm_datalink::DataLinkReceiver;
use tracing::{debug, trace, warn};

use crate::error::{Error, FrameError, Result};
use crate::frame::{DecodedFrame, DEFAULT_TRAILER_LEN, HEADER_LEN};
use crate::shutdown::Shutdown;
use crate::ProtocolType;

/// One frame as it came off the wire, trailer still attached.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    raw: Vec<u8>,
    trailer_len: usize,
}

impl CapturedFrame {
    /// Check that `raw` holds a header and a `trailer_len`-byte trailer, and take a copy.
    pub fn parse(raw: &[u8], trailer_len: usize) -> std::result::Result<CapturedFrame, FrameError> {
        let min = HEADER_LEN + trailer_len;
        if raw.len() < min {
            return Err(FrameError::FrameTooShort {
                len: raw.len(),
                min,
            });
        }
        Ok(CapturedFrame {
            raw: raw.to_vec(),
            trailer_len,
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Header view over the raw bytes.
    pub fn header(&self) -> DecodedFrame<'_> {
        DecodedFrame::from_raw(&self.raw)
    }

    pub fn protocol_type(&self) -> ProtocolType {
        self.header().protocol_type()
    }

    /// Bytes between the header and the trailer: `raw[14..len - trailer_len]`.
    pub fn payload(&self) -> &[u8] {
        &self.raw[HEADER_LEN..self.raw.len() - self.trailer_len]
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl std::fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("header", &self.header())
            .field("payload_len", &self.payload().len())
            .field("trailer_len", &self.trailer_len)
            .finish()
    }
}

/// What to collect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Receives before stopping. Short frames count; frames skipped by `ethertype` do not.
    pub count: usize,
    pub trailer_len: usize,
    /// Frames of any other type are skipped without counting.
    pub ethertype: Option<ProtocolType>,
}

impl Default for CaptureOptions {
    fn default() -> CaptureOptions {
        CaptureOptions {
            count: 600,
            trailer_len: DEFAULT_TRAILER_LEN,
            ethertype: None,
        }
    }
}

/// A lazy, finite sequence of captured frames.
///
/// Ends after `count` successful receives unless the channel fails or the run is cancelled, in
/// which case the error is yielded once and the iterator ends. Frames too short to carry a
/// header and trailer use up a receive but are logged and skipped, so `count` receives yield
/// `count - dropped` frames.
pub struct Capture {
    rx: Box<dyn DataLinkReceiver>,
    interface: String,
    options: CaptureOptions,
    shutdown: Option<Shutdown>,
    received: usize,
    captured: usize,
    dropped: usize,
    filtered: usize,
    done: bool,
}

impl Capture {
    pub fn new(rx: Box<dyn DataLinkReceiver>, interface: &str, options: CaptureOptions) -> Capture {
        Capture {
            rx,
            interface: interface.to_owned(),
            options,
            shutdown: None,
            received: 0,
            captured: 0,
            dropped: 0,
            filtered: 0,
            done: false,
        }
    }

    /// Stop with `Cancelled` once `shutdown` is triggered.
    ///
    /// The flag is checked between receives, so the channel needs a read timeout for an idle
    /// link to notice it.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Capture {
        self.shutdown = Some(shutdown);
        self
    }

    /// Open a capture on the interface called `interface`.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn open(
        interface: &str,
        config: ethpcm_datalink::Config,
        options: CaptureOptions,
    ) -> Result<Capture> {
        let (_, rx) = crate::link::open(interface, config)?;
        Ok(Capture::new(rx, interface, options))
    }

    /// Receives counted toward `count`, dropped frames included.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Frames yielded so far.
    pub fn captured(&self) -> usize {
        self.captured
    }

    /// Frames discarded for being too short.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Frames skipped by the protocol type filter.
    pub fn filtered(&self) -> usize {
        self.filtered
    }

    fn cancelled(&self) -> bool {
        self.shutdown.as_ref().map_or(false, Shutdown::is_triggered)
    }
}

impl Iterator for Capture {
    type Item = Result<CapturedFrame>;

    fn next(&mut self) -> Option<Result<CapturedFrame>> {
        loop {
            if self.done || self.received >= self.options.count {
                self.done = true;
                return None;
            }
            if self.cancelled() {
                self.done = true;
                debug!(captured = self.captured, "capture cancelled");
                return Some(Err(Error::Cancelled));
            }
            match self.rx.next() {
                Ok(raw) => match CapturedFrame::parse(raw, self.options.trailer_len) {
                    Ok(frame) => {
                        if let Some(wanted) = self.options.ethertype {
                            if frame.protocol_type() != wanted {
                                self.filtered += 1;
                                trace!(protocol_type = %frame.protocol_type(), "skipping frame");
                                continue;
                            }
                        }
                        self.received += 1;
                        self.captured += 1;
                        debug!(
                            n = self.captured,
                            len = frame.len(),
                            payload = frame.payload().len(),
                            "captured frame"
                        );
                        return Some(Ok(frame));
                    }
                    Err(e) => {
                        self.received += 1;
                        self.dropped += 1;
                        warn!(n = self.received, error = %e, "dropping frame");
                    }
                },
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(Error::from_socket_error(e, &self.interface)));
                }
            }
        }
    }
}

impl FusedIterator for Capture {}
