// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Opening raw channels on named interfaces.

use std::io;

use ethpcm_datalink::{Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use tracing::debug;

use crate::error::{Error, Result};

/// The two halves of an open raw channel.
pub type LinkHalves = (Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>);

/// Look up `name` among the machine's interfaces.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn find_interface(name: &str) -> Result<NetworkInterface> {
    ethpcm_datalink::interface_by_name(name).ok_or_else(|| Error::InterfaceNotFound {
        interface: name.to_owned(),
    })
}

/// Open a raw `AF_PACKET` channel on the interface called `name`.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn open(name: &str, config: ethpcm_datalink::Config) -> Result<LinkHalves> {
    let interface = find_interface(name)?;
    debug!(interface = %interface.name, index = interface.index, "opening raw channel");
    split(ethpcm_datalink::channel(&interface, config), &interface)
}

/// Split a freshly opened channel, classifying any error against `interface`.
pub fn split(channel: io::Result<Channel>, interface: &NetworkInterface) -> Result<LinkHalves> {
    match channel {
        Ok(Channel::Ethernet(tx, rx)) => Ok((tx, rx)),
        Ok(_) => Err(Error::Io(io::Error::new(
            io::ErrorKind::Other,
            "unsupported channel type",
        ))),
        Err(e) => Err(Error::from_socket_error(e, &interface.name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethpcm_datalink::dummy;

    #[test]
    fn split_dummy_channel() {
        let iface = dummy::dummy_interface(0);
        let mut config = dummy::Config::default();
        let frames = config.read_handle().unwrap();
        let (mut tx, _rx) = split(dummy::channel(&iface, config), &iface).unwrap();
        assert_eq!(tx.send(&[1, 2, 3]).unwrap(), 3);
        assert_eq!(&*frames.recv().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn open_errors_are_classified() {
        let iface = dummy::dummy_interface(1);
        let denied = split(Err(io::Error::from_raw_os_error(libc::EPERM)), &iface);
        assert!(matches!(
            denied,
            Err(Error::PermissionDenied { ref interface }) if interface == "eth1"
        ));
        let missing = split(Err(io::Error::from_raw_os_error(libc::ENODEV)), &iface);
        assert!(matches!(missing, Err(Error::InterfaceNotFound { .. })));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unknown_interface_name() {
        let err = find_interface("no-such-iface0").unwrap_err();
        assert!(matches!(
            err,
            Error::InterfaceNotFound { ref interface } if interface == "no-such-iface0"
        ));
    }
}
