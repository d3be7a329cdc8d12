// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the transport and reconstruction pipelines.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed data at the frame encode/decode boundary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// A header field does not have its fixed width.
    #[error("invalid {field} width: expected {expected} bytes, got {actual}")]
    InvalidFieldWidth {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Not enough bytes for the header (plus trailer, at the capture layer).
    #[error("frame too short: need {min} bytes, have {len}")]
    FrameTooShort { len: usize, min: usize },
}

/// Main error type for sending, capturing and writing audio.
#[derive(Error, Debug)]
pub enum Error {
    /// The process may not open raw link-layer sockets.
    #[error("permission denied opening a raw socket on {interface} (run as root or grant CAP_NET_RAW)")]
    PermissionDenied { interface: String },

    /// No interface with this name exists.
    #[error("network interface not found: {interface}")]
    InterfaceNotFound { interface: String },

    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The encoded frame does not fit in the link MTU.
    #[error("frame of {len} bytes exceeds the link limit of {max} bytes")]
    FrameTooLong { len: usize, max: usize },

    /// A link speed outside the supported set was requested.
    #[error("invalid link speed option: {0:?}")]
    InvalidSpeedOption(String),

    /// The link accepted fewer bytes than the frame holds.
    #[error("truncated send: {sent} of {expected} bytes accepted")]
    Truncated { sent: usize, expected: usize },

    /// The external link configuration tool failed.
    #[error("link configuration command `{command}` failed: {status}")]
    LinkControl { command: String, status: String },

    /// No samples were captured and empty output was refused.
    #[error("no samples to write")]
    EmptySampleBuffer,

    /// The run was interrupted before it completed.
    #[error("cancelled")]
    Cancelled,

    /// A file is not a canonical 16-bit PCM WAVE file.
    #[error("invalid WAVE data: {0}")]
    InvalidWave(String),

    /// Bad configuration file or option.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether the error ends the pipeline that raised it.
    ///
    /// Per-frame problems, rejected commands and short writes are recoverable; the caller logs
    /// them and carries on.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Frame(_)
                | Error::FrameTooLong { .. }
                | Error::InvalidSpeedOption(_)
                | Error::Truncated { .. }
                | Error::LinkControl { .. }
        )
    }

    /// Classify an OS error raised while opening or using a raw socket on `interface`.
    pub fn from_socket_error(err: io::Error, interface: &str) -> Error {
        match err.raw_os_error() {
            Some(libc::EPERM) | Some(libc::EACCES) => Error::PermissionDenied {
                interface: interface.to_owned(),
            },
            Some(libc::ENODEV) | Some(libc::ENXIO) => Error::InterfaceNotFound {
                interface: interface.to_owned(),
            },
            _ if err.kind() == io::ErrorKind::PermissionDenied => Error::PermissionDenied {
                interface: interface.to_owned(),
            },
            _ => Error::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_errors_are_classified() {
        let eperm = io::Error::from_raw_os_error(libc::EPERM);
        assert!(matches!(
            Error::from_socket_error(eperm, "enp3s0"),
            Error::PermissionDenied { ref interface } if interface == "enp3s0"
        ));

        let enodev = io::Error::from_raw_os_error(libc::ENODEV);
        assert!(matches!(
            Error::from_socket_error(enodev, "eth9"),
            Error::InterfaceNotFound { .. }
        ));

        let other = io::Error::new(io::ErrorKind::Other, "boom");
        assert!(matches!(
            Error::from_socket_error(other, "eth0"),
            Error::Io(_)
        ));
    }

    #[test]
    fn recoverable_errors() {
        assert!(!Error::Truncated {
            sent: 10,
            expected: 48
        }
        .is_fatal());
        assert!(!Error::from(FrameError::FrameTooShort { len: 12, min: 18 }).is_fatal());
        assert!(!Error::InvalidSpeedOption("1000".into()).is_fatal());
        assert!(Error::PermissionDenied {
            interface: "eth0".into()
        }
        .is_fatal());
        assert!(Error::Cancelled.is_fatal());
    }

    #[test]
    fn messages() {
        let err = FrameError::InvalidFieldWidth {
            field: "destination",
            expected: 6,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "invalid destination width: expected 6 bytes, got 5"
        );
        assert_eq!(
            Error::Truncated {
                sent: 16,
                expected: 48
            }
            .to_string(),
            "truncated send: 16 of 48 bytes accepted"
        );
    }
}
