// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::convert::TryFrom;
use std::error::Error;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::FieldWidthError;

/// The number of bytes in the protocol-type field of a link-layer header.
pub const PROTOCOL_TYPE_LEN: usize = 2;

/// The 16-bit discriminator following the addresses in a link-layer header.
///
/// Stored as the host value; on the wire it is always big-endian.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolType(pub u16);

impl ProtocolType {
    /// The type used by the FPGA audio bench (`0x0040`).
    pub const PCM_BENCH: ProtocolType = ProtocolType(0x0040);

    pub fn new(val: u16) -> ProtocolType {
        ProtocolType(val)
    }

    /// Wire representation.
    pub fn to_bytes(self) -> [u8; PROTOCOL_TYPE_LEN] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; PROTOCOL_TYPE_LEN]) -> ProtocolType {
        ProtocolType(u16::from_be_bytes(bytes))
    }
}

impl<'a> TryFrom<&'a [u8]> for ProtocolType {
    type Error = FieldWidthError;

    fn try_from(bytes: &'a [u8]) -> Result<ProtocolType, FieldWidthError> {
        <[u8; PROTOCOL_TYPE_LEN]>::try_from(bytes)
            .map(ProtocolType::from_bytes)
            .map_err(|_| FieldWidthError {
                expected: PROTOCOL_TYPE_LEN,
                actual: bytes.len(),
            })
    }
}

impl From<u16> for ProtocolType {
    fn from(val: u16) -> ProtocolType {
        ProtocolType(val)
    }
}

impl fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl fmt::Debug for ProtocolType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Error returned when a protocol type string is not a 16-bit number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProtocolTypeErr(ParseIntError);

impl Error for ParseProtocolTypeErr {}

impl fmt::Display for ParseProtocolTypeErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid protocol type: {}", self.0)
    }
}

impl FromStr for ProtocolType {
    type Err = ParseProtocolTypeErr;

    /// Accepts `0x0040` style hex or plain decimal.
    fn from_str(s: &str) -> Result<ProtocolType, ParseProtocolTypeErr> {
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16),
            None => s.parse::<u16>(),
        };
        parsed.map(ProtocolType).map_err(ParseProtocolTypeErr)
    }
}

#[cfg(feature = "serde")]
impl Serialize for ProtocolType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for ProtocolType {
    /// Deserializes from an integer or a `"0x0040"` style string.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ProtocolTypeVisitor;
        impl<'de> de::Visitor<'de> for ProtocolTypeVisitor {
            type Value = ProtocolType;

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ProtocolType, E> {
                u16::try_from(v)
                    .map(ProtocolType)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ProtocolType, E> {
                u16::try_from(v)
                    .map(ProtocolType)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ProtocolType, E> {
                value.parse().map_err(E::custom)
            }

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a 16-bit protocol type")
            }
        }

        deserializer.deserialize_any(ProtocolTypeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_order_is_big_endian() {
        assert_eq!(ProtocolType::PCM_BENCH.to_bytes(), [0x00, 0x40]);
        assert_eq!(ProtocolType::from_bytes([0x86, 0xdd]), ProtocolType(0x86dd));
    }

    #[test]
    fn width_checked_conversion() {
        assert_eq!(
            ProtocolType::try_from(&[0x00, 0x40][..]),
            Ok(ProtocolType::PCM_BENCH)
        );
        for len in [1usize, 3] {
            let raw = vec![0u8; len];
            assert_eq!(
                ProtocolType::try_from(&raw[..]),
                Err(FieldWidthError {
                    expected: 2,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("0x0040".parse(), Ok(ProtocolType(0x40)));
        assert_eq!("64".parse(), Ok(ProtocolType(0x40)));
        assert!("0x10000".parse::<ProtocolType>().is_err());
        assert!("ipv4".parse::<ProtocolType>().is_err());
        assert_eq!(ProtocolType(0x88b5).to_string(), "0x88b5");
    }
}
