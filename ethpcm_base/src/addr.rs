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
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// The number of bytes in a link-layer hardware address.
pub const LINK_ADDR_LEN: usize = 6;

const LOCAL_ADDR_BIT: u8 = 0x02;
const MULTICAST_ADDR_BIT: u8 = 0x01;

/// A 48-bit link-layer hardware address.
#[derive(PartialEq, Eq, Clone, Copy, Default, Hash, Ord, PartialOrd)]
pub struct LinkAddress(pub [u8; LINK_ADDR_LEN]);

impl LinkAddress {
    /// Construct a new `LinkAddress` from its six octets.
    pub fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> LinkAddress {
        LinkAddress([a, b, c, d, e, f])
    }

    /// Construct an all-zero `LinkAddress`.
    pub fn zero() -> LinkAddress {
        Default::default()
    }

    /// Construct the broadcast address.
    pub fn broadcast() -> LinkAddress {
        LinkAddress([0xff; LINK_ADDR_LEN])
    }

    pub fn octets(&self) -> [u8; LINK_ADDR_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Returns true for a locally administered address.
    pub fn is_local(&self) -> bool {
        (self.0[0] & LOCAL_ADDR_BIT) == LOCAL_ADDR_BIT
    }

    pub fn is_multicast(&self) -> bool {
        (self.0[0] & MULTICAST_ADDR_BIT) == MULTICAST_ADDR_BIT
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::broadcast()
    }
}

impl From<[u8; LINK_ADDR_LEN]> for LinkAddress {
    fn from(addr: [u8; LINK_ADDR_LEN]) -> LinkAddress {
        LinkAddress(addr)
    }
}

impl From<LinkAddress> for [u8; LINK_ADDR_LEN] {
    fn from(addr: LinkAddress) -> Self {
        addr.0
    }
}

impl<'a> TryFrom<&'a [u8]> for LinkAddress {
    type Error = FieldWidthError;

    fn try_from(bytes: &'a [u8]) -> Result<LinkAddress, FieldWidthError> {
        <[u8; LINK_ADDR_LEN]>::try_from(bytes)
            .map(LinkAddress)
            .map_err(|_| FieldWidthError {
                expected: LINK_ADDR_LEN,
                actual: bytes.len(),
            })
    }
}

impl PartialEq<[u8; LINK_ADDR_LEN]> for LinkAddress {
    fn eq(&self, other: &[u8; LINK_ADDR_LEN]) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let o = &self.0;
        write!(
            fmt,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl fmt::Debug for LinkAddress {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, fmt)
    }
}

#[cfg(feature = "serde")]
impl Serialize for LinkAddress {
    /// Serializes to the colon-separated string for human readable formats, raw bytes otherwise.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for LinkAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LinkAddressVisitor;
        impl<'de> de::Visitor<'de> for LinkAddressVisitor {
            type Value = LinkAddress;

            fn visit_str<E: de::Error>(self, value: &str) -> Result<LinkAddress, E> {
                value.parse().map_err(E::custom)
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<LinkAddress, E> {
                LinkAddress::try_from(v).map_err(|_| E::invalid_length(v.len(), &self))
            }

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "either a string representation of a link address or 6-element byte array"
                )
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(LinkAddressVisitor)
        } else {
            deserializer.deserialize_bytes(LinkAddressVisitor)
        }
    }
}

/// A raw header field did not have the width its type requires.
#[derive(Copy, Debug, PartialEq, Eq, Clone)]
pub struct FieldWidthError {
    pub expected: usize,
    pub actual: usize,
}

impl Error for FieldWidthError {}

impl fmt::Display for FieldWidthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "expected a field of {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

/// Represents an error which occurred whilst parsing a link address.
#[derive(Copy, Debug, PartialEq, Eq, Clone)]
pub enum ParseLinkAddressErr {
    /// Too many components, eg. 00:11:22:33:44:55:66.
    TooManyComponents,
    /// Too few components, eg. 00:11.
    TooFewComponents,
    /// One of the components is not a hex octet, eg. 00:GG:22:33:44:55.
    InvalidComponent,
}

impl Error for ParseLinkAddressErr {}

impl fmt::Display for ParseLinkAddressErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            ParseLinkAddressErr::TooManyComponents => {
                "Too many components in a link address string"
            }
            ParseLinkAddressErr::TooFewComponents => "Too few components in a link address string",
            ParseLinkAddressErr::InvalidComponent => "Invalid component in a link address string",
        })
    }
}

impl FromStr for LinkAddress {
    type Err = ParseLinkAddressErr;

    /// Accepts `aa:bb:cc:dd:ee:ff`; `-` is allowed as a separator too.
    fn from_str(s: &str) -> Result<LinkAddress, ParseLinkAddressErr> {
        let mut parts = [0u8; LINK_ADDR_LEN];
        let mut i = 0;
        for split in s.split(|c| c == ':' || c == '-') {
            if i == LINK_ADDR_LEN {
                return Err(ParseLinkAddressErr::TooManyComponents);
            }
            match u8::from_str_radix(split, 16) {
                Ok(b) if !split.is_empty() && split.len() <= 2 => parts[i] = b,
                _ => return Err(ParseLinkAddressErr::InvalidComponent),
            }
            i += 1;
        }

        if i == LINK_ADDR_LEN {
            Ok(LinkAddress(parts))
        } else {
            Err(ParseLinkAddressErr::TooFewComponents)
        }
    }
}
