// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Settings for the sender and the capture pipeline.
//!
//! Both can be loaded from a TOML file; every key is optional and falls back to the bench
//! defaults below.
//!
//! ```toml
//! interface = "enp3s0"
//! destination = "de:ad:be:ef:00:00"
//! protocol_type = 0x0040
//! interval_ms = 5000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::capture::CaptureOptions;
use crate::error::{Error, Result};
use crate::frame::{DEFAULT_MTU, DEFAULT_TRAILER_LEN};
use crate::wav::DEFAULT_SAMPLE_RATE;
use crate::{LinkAddress, ProtocolType};

/// Interface the bench FPGA board is wired to.
pub const DEFAULT_INTERFACE: &str = "enp3s0";

/// Read a configuration file, or return the defaults when `path` is `None`.
pub fn load<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        None => Ok(T::default()),
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
            parse(&text).map_err(|e| match e {
                Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
                other => other,
            })
        }
    }
}

/// Parse configuration from TOML text.
pub fn parse<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
}

/// Sender settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SenderConfig {
    pub interface: String,
    pub destination: LinkAddress,
    pub source: LinkAddress,
    pub protocol_type: ProtocolType,
    /// Payload sent in every frame, taken byte for byte.
    pub payload: String,
    /// Read the payload from this file instead, e.g. raw big-endian PCM.
    pub payload_file: Option<PathBuf>,
    pub interval_ms: u64,
    /// Largest payload the link carries.
    pub mtu: usize,
    /// Program used to force the link speed.
    pub link_tool: String,
}

impl Default for SenderConfig {
    fn default() -> SenderConfig {
        SenderConfig {
            interface: DEFAULT_INTERFACE.to_owned(),
            destination: LinkAddress::new(0xde, 0xad, 0xbe, 0xef, 0x00, 0x00),
            source: LinkAddress::new(0xd8, 0xbb, 0xc1, 0x57, 0xaa, 0x16),
            protocol_type: ProtocolType::PCM_BENCH,
            payload: "01".repeat(32),
            payload_file: None,
            interval_ms: 5000,
            mtu: DEFAULT_MTU,
            link_tool: "ethtool".to_owned(),
        }
    }
}

impl SenderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// The bytes to put in each frame.
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        match self.payload_file {
            Some(ref path) => fs::read(path)
                .map_err(|e| Error::Config(format!("payload file {}: {}", path.display(), e))),
            None => Ok(self.payload.as_bytes().to_vec()),
        }
    }
}

/// Capture pipeline settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub interface: String,
    /// Frames to receive, short ones included, before writing the outputs.
    pub count: usize,
    /// Bytes of checksum trailing each captured frame.
    pub trailer_len: usize,
    pub sample_rate: u32,
    pub read_buffer_size: usize,
    /// How long a single receive may block. Also bounds how quickly a cancel is noticed.
    pub read_timeout_ms: Option<u64>,
    /// Only keep frames carrying this protocol type.
    pub ethertype: Option<ProtocolType>,
    pub promiscuous: bool,
    pub trace_path: PathBuf,
    pub wav_path: PathBuf,
    /// Fail instead of writing a header-only file when nothing was captured.
    pub reject_empty: bool,
}

impl Default for CaptureConfig {
    fn default() -> CaptureConfig {
        CaptureConfig {
            interface: DEFAULT_INTERFACE.to_owned(),
            count: 600,
            trailer_len: DEFAULT_TRAILER_LEN,
            sample_rate: DEFAULT_SAMPLE_RATE,
            read_buffer_size: 65535,
            read_timeout_ms: Some(500),
            ethertype: None,
            promiscuous: true,
            trace_path: PathBuf::from("payload.txt"),
            wav_path: PathBuf::from("output.wav"),
            reject_empty: false,
        }
    }
}

impl CaptureConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            count: self.count,
            trailer_len: self.trailer_len,
            ethertype: self.ethertype,
        }
    }

    /// Channel settings for the raw receive socket.
    pub fn datalink_config(&self) -> ethpcm_datalink::Config {
        ethpcm_datalink::Config {
            read_buffer_size: self.read_buffer_size,
            read_timeout: self.read_timeout(),
            promiscuous: self.promiscuous,
            ..Default::default()
        }
    }
}
