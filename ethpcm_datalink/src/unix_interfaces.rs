// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Interface listing via `getifaddrs(3)`.

use crate::{LinkAddress, NetworkInterface};

use ipnetwork::{ip_mask_to_prefix, IpNetwork};

use std::ffi::{CStr, CString};
use std::net::IpAddr;
use std::ptr;

/// Get a list of available network interfaces for the current machine.
///
/// `getifaddrs` reports one entry per address family, so entries sharing a name are merged.
pub fn interfaces() -> Vec<NetworkInterface> {
    fn merge(old: &mut NetworkInterface, new: NetworkInterface) {
        old.mac = new.mac.or(old.mac);
        old.ips.extend(new.ips);
        old.flags |= new.flags;
    }

    let mut ifaces: Vec<NetworkInterface> = Vec::new();
    unsafe {
        let mut addrs: *mut libc::ifaddrs = ptr::null_mut();
        if libc::getifaddrs(&mut addrs) != 0 {
            return ifaces;
        }
        let mut addr = addrs;
        while !addr.is_null() {
            let name = CStr::from_ptr((*addr).ifa_name)
                .to_string_lossy()
                .into_owned();
            let (mac, ip) = sockaddr_to_network_addr((*addr).ifa_addr);
            let (_, netmask) = sockaddr_to_network_addr((*addr).ifa_netmask);
            let prefix = netmask
                .and_then(|netmask| ip_mask_to_prefix(netmask).ok())
                .unwrap_or(0);
            let network = ip.and_then(|ip| IpNetwork::new(ip, prefix).ok());
            let ni = NetworkInterface {
                name,
                index: 0,
                mac,
                ips: network.into_iter().collect(),
                flags: (*addr).ifa_flags,
            };
            match ifaces.iter_mut().find(|iface| iface.name == ni.name) {
                Some(iface) => merge(iface, ni),
                None => ifaces.push(ni),
            }

            addr = (*addr).ifa_next;
        }
        libc::freeifaddrs(addrs);

        for iface in &mut ifaces {
            if let Ok(name) = CString::new(iface.name.as_bytes()) {
                iface.index = libc::if_nametoindex(name.as_ptr());
            }
        }
    }
    ifaces
}

/// # Safety
///
/// `sa` must be null or point to a valid socket address returned by `getifaddrs`.
unsafe fn sockaddr_to_network_addr(
    sa: *const libc::sockaddr,
) -> (Option<LinkAddress>, Option<IpAddr>) {
    if sa.is_null() {
        (None, None)
    } else if (*sa).sa_family as libc::c_int == libc::AF_PACKET {
        let sll = &*(sa as *const libc::sockaddr_ll);
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&sll.sll_addr[..6]);
        (Some(LinkAddress(octets)), None)
    } else {
        (None, ethpcm_sys::sockaddr_to_ip(sa))
    }
}
