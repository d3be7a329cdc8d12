// Copyright (c) 2014 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # ethpcm
//!
//! `ethpcm` streams 16-bit PCM audio as raw link-layer frames, with no IP or UDP envelope, and
//! turns a capture of those frames back into a WAVE file.
//!
//! The pieces, leaf first:
//!
//!  * `frame`: the `destination ∥ source ∥ type ∥ payload` codec
//!  * `sender`: serialized sends, a periodic transmitter and its operator command listener
//!  * `speed`: forcing the physical link speed through an external tool
//!  * `capture`: a bounded, lazy sequence of captured frames with the checksum trailer removed
//!  * `reassembly`: arrival-order concatenation of payloads plus a hex trace
//!  * `pcm`: big-endian byte stream to host-order samples
//!  * `wav`: the canonical RIFF/WAVE container
//!
//! `pipeline` chains capture through to the WAVE writer. Raw sockets come from the
//! `ethpcm_datalink` crate, re-exported here as `datalink`.
//!
//! ## Example
//!
//! Send one frame carrying two samples:
//!
//! ```rust,no_run
//! use ethpcm::sender::send_frame;
//!
//! let dst = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x00];
//! let src = [0xd8, 0xbb, 0xc1, 0x57, 0xaa, 0x16];
//! let sent = send_frame(&dst, &src, &[0x00, 0x40], &[0x7f, 0xff, 0x80, 0x00], "enp3s0")?;
//! assert_eq!(sent, 18);
//! # Ok::<(), ethpcm::Error>(())
//! ```
//!
//! Opening raw channels requires `CAP_NET_RAW`; without it operations fail with
//! `Error::PermissionDenied`.

pub extern crate ethpcm_datalink as datalink;

pub use ethpcm_base::{
    FieldWidthError, LinkAddress, ParseLinkAddressErr, ParseProtocolTypeErr, ProtocolType,
    LINK_ADDR_LEN, PROTOCOL_TYPE_LEN,
};

pub use crate::error::{Error, FrameError, Result};

pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod link;
mod output;
pub mod pcm;
pub mod pipeline;
pub mod reassembly;
pub mod sender;
pub mod shutdown;
pub mod speed;
pub mod wav;
