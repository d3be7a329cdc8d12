// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Support for sending and receiving link-layer frames using Linux's `AF_PACKET`.

extern crate libc;

use crate::bindings::linux;
use crate::{DataLinkReceiver, DataLinkSender, NetworkInterface};

use ethpcm_sys::{self, FileDesc};

use std::io;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

fn network_addr_to_sockaddr(ni: &NetworkInterface, proto: u16) -> libc::sockaddr_ll {
    let mut sll: libc::sockaddr_ll = unsafe { mem::zeroed() };
    sll.sll_family = libc::AF_PACKET as libc::sa_family_t;
    if let Some(mac) = ni.mac {
        sll.sll_addr[..6].copy_from_slice(mac.as_bytes());
    }
    sll.sll_protocol = proto.to_be();
    sll.sll_halen = 6;
    sll.sll_ifindex = ni.index as i32;
    sll
}

/// Configuration for the Linux datalink backend.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Config {
    /// The size of buffer to use when reading frames.
    pub read_buffer_size: usize,

    /// The read timeout. None blocks until a frame arrives.
    pub read_timeout: Option<Duration>,

    /// The write timeout.
    pub write_timeout: Option<Duration>,

    /// Protocol passed to `socket(2)` and `bind(2)`, in host order.
    pub protocol: u16,

    /// Promiscuous mode.
    pub promiscuous: bool,
}

impl<'a> From<&'a super::Config> for Config {
    fn from(config: &super::Config) -> Config {
        Config {
            read_buffer_size: config.read_buffer_size,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            protocol: config.protocol,
            promiscuous: config.promiscuous,
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        (&super::Config::default()).into()
    }
}

/// Create a data link channel using the Linux's `AF_PACKET` socket type.
///
/// The socket is owned by a `FileDesc` from the moment it is created, so every early return
/// below closes it.
#[inline]
pub fn channel(network_interface: &NetworkInterface, config: Config) -> io::Result<super::Channel> {
    let socket = FileDesc::socket(
        libc::AF_PACKET,
        libc::SOCK_RAW,
        config.protocol.to_be() as libc::c_int,
    )?;

    let addr = network_addr_to_sockaddr(network_interface, config.protocol);
    let len = mem::size_of::<libc::sockaddr_ll>();

    // Bind to interface
    socket.bind(
        (&addr as *const libc::sockaddr_ll) as *const libc::sockaddr,
        len as libc::socklen_t,
    )?;

    if config.promiscuous {
        let mut pmr: linux::packet_mreq = unsafe { mem::zeroed() };
        pmr.mr_ifindex = network_interface.index as i32;
        pmr.mr_type = linux::PACKET_MR_PROMISC as u16;
        socket.set_option(linux::SOL_PACKET, linux::PACKET_ADD_MEMBERSHIP, &pmr)?;
    }

    // Enable nonblocking; readiness is awaited with pselect.
    if unsafe { libc::fcntl(socket.fd, libc::F_SETFL, libc::O_NONBLOCK) } == -1 {
        return Err(io::Error::last_os_error());
    }

    let fd = Arc::new(socket);
    let sender = Box::new(DataLinkSenderImpl {
        socket: fd.clone(),
        send_addr: addr,
        send_addr_len: len,
        timeout: config.write_timeout,
    });
    let receiver = Box::new(DataLinkReceiverImpl {
        socket: fd,
        read_buffer: vec![0; config.read_buffer_size],
        timeout: config.read_timeout,
    });

    Ok(super::Channel::Ethernet(sender, receiver))
}

struct DataLinkSenderImpl {
    socket: Arc<FileDesc>,
    send_addr: libc::sockaddr_ll,
    send_addr_len: usize,
    timeout: Option<Duration>,
}

impl DataLinkSender for DataLinkSenderImpl {
    #[inline]
    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        ethpcm_sys::wait(self.socket.fd, true, self.timeout)?;
        ethpcm_sys::send_to(
            self.socket.fd,
            frame,
            (&self.send_addr as *const libc::sockaddr_ll) as *const _,
            self.send_addr_len as libc::socklen_t,
        )
    }
}

struct DataLinkReceiverImpl {
    socket: Arc<FileDesc>,
    read_buffer: Vec<u8>,
    timeout: Option<Duration>,
}

impl DataLinkReceiver for DataLinkReceiverImpl {
    fn next(&mut self) -> io::Result<&[u8]> {
        let mut caddr: libc::sockaddr_storage = unsafe { mem::zeroed() };
        ethpcm_sys::wait(self.socket.fd, false, self.timeout)?;
        let len = ethpcm_sys::recv_from(self.socket.fd, &mut self.read_buffer, &mut caddr)?;
        Ok(&self.read_buffer[0..len])
    }
}

/// Get a list of available network interfaces for the current machine.
pub fn interfaces() -> Vec<NetworkInterface> {
    #[path = "unix_interfaces.rs"]
    mod interfaces;
    interfaces::interfaces()
}
