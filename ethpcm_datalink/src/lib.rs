// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sending and receiving whole link-layer frames on a named interface.
//!
//! The real backend is Linux's `AF_PACKET`; `dummy` replaces it with in-memory queues so the
//! layers above can be tested without privileges.

extern crate ethpcm_base;
extern crate ethpcm_sys;
extern crate ipnetwork;
extern crate libc;

use std::fmt;
use std::io;
use std::time::Duration;

use ipnetwork::IpNetwork;

pub use ethpcm_base::LinkAddress;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod bindings;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod linux;

pub mod dummy;

/// `ETH_P_ALL`: receive every protocol on the interface.
pub const ETH_P_ALL: u16 = 0x0003;

/// A channel for sending and receiving at the data link layer.
#[non_exhaustive]
pub enum Channel {
    /// A datalink channel which sends and receives Ethernet frames, header included.
    Ethernet(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>),
}

/// A generic configuration type, encapsulating the options supported by each backend.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Config {
    /// The size of buffer to use when reading frames. Defaults to 65536.
    pub read_buffer_size: usize,

    /// The read timeout. Defaults to None (block until a frame arrives).
    pub read_timeout: Option<Duration>,

    /// The write timeout. Defaults to None.
    pub write_timeout: Option<Duration>,

    /// Protocol the socket is opened for, in host order. Defaults to `ETH_P_ALL`.
    pub protocol: u16,

    /// Receive frames not addressed to this interface. Defaults to true.
    pub promiscuous: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            read_buffer_size: 65536,
            read_timeout: None,
            write_timeout: None,
            protocol: ETH_P_ALL,
            promiscuous: true,
        }
    }
}

/// Create a new datalink channel for sending and receiving frames on `network_interface`.
///
/// Opening a raw channel normally needs `CAP_NET_RAW`; without it this returns an error of kind
/// `PermissionDenied`. The underlying socket is released when both halves have been dropped.
#[cfg(any(target_os = "linux", target_os = "android"))]
#[inline]
pub fn channel(network_interface: &NetworkInterface, configuration: Config) -> io::Result<Channel> {
    linux::channel(network_interface, (&configuration).into())
}

/// Sending half of a datalink channel.
pub trait DataLinkSender: Send {
    /// Transmit `frame` as a single write.
    ///
    /// Returns the number of bytes the link accepted, which callers should compare with
    /// `frame.len()`.
    fn send(&mut self, frame: &[u8]) -> io::Result<usize>;
}

/// Receiving half of a datalink channel.
pub trait DataLinkReceiver: Send {
    /// Get the next frame in the channel, blocking up to the configured read timeout.
    fn next(&mut self) -> io::Result<&[u8]>;
}

/// Represents a network interface and its associated addresses.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct NetworkInterface {
    /// The name of the interface.
    pub name: String,
    /// The interface index (operating system specific).
    pub index: u32,
    /// The hardware address of the interface.
    pub mac: Option<LinkAddress>,
    /// IP addresses and netmasks for the interface.
    pub ips: Vec<IpNetwork>,
    /// Operating system specific flags for the interface.
    pub flags: u32,
}

impl NetworkInterface {
    pub fn is_up(&self) -> bool {
        self.flags & (ethpcm_sys::IFF_UP as u32) != 0
    }

    pub fn is_broadcast(&self) -> bool {
        self.flags & (ethpcm_sys::IFF_BROADCAST as u32) != 0
    }

    /// Is the interface a loopback interface?
    pub fn is_loopback(&self) -> bool {
        self.flags & (ethpcm_sys::IFF_LOOPBACK as u32) != 0
    }

    pub fn is_multicast(&self) -> bool {
        self.flags & (ethpcm_sys::IFF_MULTICAST as u32) != 0
    }

    pub fn is_running(&self) -> bool {
        self.flags & (ethpcm_sys::IFF_RUNNING as u32) != 0
    }
}

impl fmt::Display for NetworkInterface {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const FLAGS: [&str; 5] = ["UP", "BROADCAST", "LOOPBACK", "MULTICAST", "RUNNING"];
        let set = [
            self.is_up(),
            self.is_broadcast(),
            self.is_loopback(),
            self.is_multicast(),
            self.is_running(),
        ];
        let names = set
            .iter()
            .zip(FLAGS.iter())
            .filter(|&(on, _)| *on)
            .map(|(_, name)| *name)
            .collect::<Vec<&str>>()
            .join(",");

        let mac = self
            .mac
            .map(|mac| mac.to_string())
            .unwrap_or_else(|| "N/A".to_owned());

        write!(
            f,
            "{}: flags={:X}<{}>\n      index: {}\n      ether: {}",
            self.name, self.flags, names, self.index, mac
        )?;
        for ip in &self.ips {
            let label = if ip.is_ipv4() { "inet" } else { "inet6" };
            write!(f, "\n      {:>5}: {}", label, ip)?;
        }
        Ok(())
    }
}

/// Get a list of available network interfaces for the current machine.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn interfaces() -> Vec<NetworkInterface> {
    linux::interfaces()
}

/// Find the interface called `name`, if the machine has one.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn interface_by_name(name: &str) -> Option<NetworkInterface> {
    interfaces().into_iter().find(|iface| iface.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_set_flags() {
        let iface = NetworkInterface {
            name: "enp3s0".to_string(),
            index: 2,
            mac: Some(LinkAddress::new(0xd8, 0xbb, 0xc1, 0x57, 0xaa, 0x16)),
            ips: vec!["192.168.1.10/24".parse().unwrap()],
            flags: (ethpcm_sys::IFF_UP | ethpcm_sys::IFF_RUNNING) as u32,
        };
        let text = iface.to_string();
        assert!(text.starts_with("enp3s0: flags=41<UP,RUNNING>"), "{}", text);
        assert!(text.contains("ether: d8:bb:c1:57:aa:16"));
        assert!(text.contains(" inet: 192.168.1.10/24"));
    }

    #[test]
    fn interface_without_mac() {
        let iface = dummy::dummy_interface(0);
        let bare = NetworkInterface { mac: None, ..iface };
        assert!(bare.to_string().contains("ether: N/A"));
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn unknown_interface_is_not_resolved() {
        assert_eq!(interface_by_name("ethpcm-no-such-if0"), None);
    }
}
