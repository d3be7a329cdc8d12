// Copyright (c) 2014 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Thin wrappers over the socket syscalls needed to move raw link-layer frames.

extern crate libc;

use std::io;
use std::mem;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ptr;
use std::time::Duration;

#[cfg(unix)]
#[path = "unix.rs"]
mod imp;

pub use self::imp::public::*;

/// An owned socket descriptor, closed when dropped.
#[derive(Debug)]
pub struct FileDesc {
    pub fd: CSocket,
}

impl FileDesc {
    /// Create a socket and take ownership of its descriptor.
    pub fn socket(domain: libc::c_int, ty: libc::c_int, proto: libc::c_int) -> io::Result<FileDesc> {
        let fd = unsafe { imp::socket(domain, ty, proto) };
        if fd == INVALID_SOCKET {
            Err(io::Error::last_os_error())
        } else {
            Ok(FileDesc { fd })
        }
    }

    pub fn bind(&self, addr: *const SockAddr, len: SockLen) -> io::Result<()> {
        if unsafe { libc::bind(self.fd, addr, len) } == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Set a socket option from a plain value.
    pub fn set_option<T>(&self, level: libc::c_int, name: libc::c_int, value: &T) -> io::Result<()> {
        let r = unsafe {
            imp::setsockopt(
                self.fd,
                level,
                name,
                (value as *const T) as Buf,
                mem::size_of::<T>() as SockLen,
            )
        };
        if r == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

impl Drop for FileDesc {
    fn drop(&mut self) {
        unsafe {
            imp::close(self.fd);
        }
    }
}

/// Send `buffer` as one datagram, returning the number of bytes the kernel accepted.
pub fn send_to(
    socket: CSocket,
    buffer: &[u8],
    dst: *const SockAddr,
    slen: SockLen,
) -> io::Result<usize> {
    let send_len = imp::retry(&mut || unsafe {
        imp::sendto(
            socket,
            buffer.as_ptr() as Buf,
            buffer.len() as BufLen,
            0,
            dst,
            slen,
        )
    });

    if send_len < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(send_len as usize)
    }
}

pub fn recv_from(
    socket: CSocket,
    buffer: &mut [u8],
    caddr: *mut SockAddrStorage,
) -> io::Result<usize> {
    let mut caddrlen = mem::size_of::<SockAddrStorage>() as SockLen;
    let len = imp::retry(&mut || unsafe {
        imp::recvfrom(
            socket,
            buffer.as_mut_ptr() as MutBuf,
            buffer.len() as BufLen,
            0,
            caddr as *mut SockAddr,
            &mut caddrlen,
        )
    });

    if len < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(len as usize)
    }
}

/// Block until `socket` is readable (or writable, when `write` is set).
///
/// Returns `Err` of kind `TimedOut` if `timeout` elapses first; `None` waits forever.
pub fn wait(socket: CSocket, write: bool, timeout: Option<Duration>) -> io::Result<()> {
    let timeout = timeout.map(duration_to_timespec);
    let mut fd_set: libc::fd_set = unsafe { mem::zeroed() };
    unsafe {
        libc::FD_ZERO(&mut fd_set);
        libc::FD_SET(socket, &mut fd_set);
    }
    let set = &mut fd_set as *mut libc::fd_set;
    let (readfds, writefds) = if write {
        (ptr::null_mut(), set)
    } else {
        (set, ptr::null_mut())
    };
    let ret = unsafe {
        libc::pselect(
            socket + 1,
            readfds,
            writefds,
            ptr::null_mut(),
            timeout
                .as_ref()
                .map(|to| to as *const libc::timespec)
                .unwrap_or(ptr::null()),
            ptr::null(),
        )
    };
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else if ret == 0 {
        Err(io::Error::new(io::ErrorKind::TimedOut, "Timed out"))
    } else {
        Ok(())
    }
}

/// Extract the IP address carried by an `AF_INET`/`AF_INET6` socket address.
///
/// # Safety
///
/// `sa` must be null or point to a socket address whose storage is large enough for its family.
pub unsafe fn sockaddr_to_ip(sa: *const SockAddr) -> Option<IpAddr> {
    if sa.is_null() {
        return None;
    }
    match (*sa).sa_family as libc::c_int {
        AF_INET => {
            let sin = &*(sa as *const SockAddrIn);
            Some(IpAddr::V4(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr))))
        }
        AF_INET6 => {
            let sin6 = &*(sa as *const SockAddrIn6);
            Some(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
        }
        _ => None,
    }
}
