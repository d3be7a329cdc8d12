// Copyright (c) 2016 Linus Färnstrand <faern@faern.net>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Support for sending and receiving link-layer frames on a fake network managed
//! by in memory FIFO queues. Useful for writing tests.

use crate::{DataLinkReceiver, DataLinkSender, LinkAddress, NetworkInterface};

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Configuration for the dummy datalink backend. Contains `std::sync::mpsc`
/// channels that are used to communicate with the fake network.
#[derive(Debug)]
pub struct Config {
    receiver: Receiver<io::Result<Box<[u8]>>>,
    inject_handle: Option<Sender<io::Result<Box<[u8]>>>>,

    sender: Sender<Box<[u8]>>,
    read_handle: Option<Receiver<Box<[u8]>>>,

    /// How long `next()` waits before failing with `TimedOut`. None waits forever.
    pub read_timeout: Option<Duration>,

    /// Largest number of bytes the fake link accepts per write; longer frames are cut short and
    /// the shorter length is reported, like a link that truncates.
    pub max_send_len: Option<usize>,
}

impl Config {
    /// Creates a new `Config` with the given channels as the backing network.
    /// When using this constructor `inject_handle` and `read_handle` will return `None`.
    ///
    /// The receiver reads frames (or simulated errors) from `receiver`. Once every sender of
    /// that channel is dropped the network goes idle: `next()` blocks forever, or fails with
    /// `TimedOut` after each `read_timeout` if one is set.
    ///
    /// Every frame written through the sender is forwarded to `sender`.
    pub fn new(receiver: Receiver<io::Result<Box<[u8]>>>, sender: Sender<Box<[u8]>>) -> Config {
        Config {
            receiver,
            inject_handle: None,
            sender,
            read_handle: None,
            read_timeout: None,
            max_send_len: None,
        }
    }

    /// Get the `Sender` handle that can inject frames in the fake network.
    /// Only usable with `Config`s generated from `default()`.
    pub fn inject_handle(&mut self) -> Option<Sender<io::Result<Box<[u8]>>>> {
        self.inject_handle.take()
    }

    /// Get the `Receiver` handle where frames sent to the fake network can be read.
    /// Only usable with `Config`s generated from `default()`.
    pub fn read_handle(&mut self) -> Option<Receiver<Box<[u8]>>> {
        self.read_handle.take()
    }
}

impl Default for Config {
    /// Creates a default config with one input and one output channel. The handles used to inject
    /// to and read from the network can be fetched with `inject_handle()` and `read_handle()`.
    fn default() -> Config {
        let (in_tx, in_rx) = mpsc::channel();
        let (out_tx, out_rx) = mpsc::channel();
        Config {
            receiver: in_rx,
            inject_handle: Some(in_tx),
            sender: out_tx,
            read_handle: Some(out_rx),
            read_timeout: None,
            max_send_len: None,
        }
    }
}

/// Create a data link channel backed by FIFO queues.
/// See `Config` for how to inject and read frames on this fake network.
pub fn channel(_: &NetworkInterface, config: Config) -> io::Result<super::Channel> {
    let sender = Box::new(MockDataLinkSender {
        sender: config.sender,
        max_send_len: config.max_send_len,
    });
    let receiver = Box::new(MockDataLinkReceiver {
        receiver: config.receiver,
        timeout: config.read_timeout,
        current: None,
    });

    Ok(super::Channel::Ethernet(sender, receiver))
}

struct MockDataLinkSender {
    sender: Sender<Box<[u8]>>,
    max_send_len: Option<usize>,
}

impl DataLinkSender for MockDataLinkSender {
    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        let len = self
            .max_send_len
            .map_or(frame.len(), |max| max.min(frame.len()));
        // Don't care if the read side is gone
        self.sender
            .send(frame[..len].to_vec().into_boxed_slice())
            .unwrap_or(());
        Ok(len)
    }
}

struct MockDataLinkReceiver {
    receiver: Receiver<io::Result<Box<[u8]>>>,
    timeout: Option<Duration>,
    current: Option<Box<[u8]>>,
}

impl DataLinkReceiver for MockDataLinkReceiver {
    fn next(&mut self) -> io::Result<&[u8]> {
        let event = match self.timeout {
            None => self.receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(t) => self.receiver.recv_timeout(t),
        };
        match event {
            // A network event happened. Might be a frame or a simulated error
            Ok(Ok(buffer)) => Ok(&**self.current.insert(buffer)),
            Ok(Err(e)) => Err(e),
            Err(RecvTimeoutError::Timeout) => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "Timed out"))
            }
            Err(RecvTimeoutError::Disconnected) => match self.timeout {
                // Nothing can be injected any more; behave like an idle network.
                Some(t) => {
                    thread::sleep(t);
                    Err(io::Error::new(io::ErrorKind::TimedOut, "Timed out"))
                }
                None => loop {
                    thread::sleep(Duration::new(10, 0));
                },
            },
        }
    }
}

/// Get three fake interfaces generated with `dummy_interface(0..3)`.
pub fn interfaces() -> Vec<NetworkInterface> {
    (0..3).map(dummy_interface).collect()
}

/// Generates a fake `NetworkInterface`.
/// The name of the interface will be `ethX` where X is the integer `i`.
/// The index will be `i`.
/// The MAC will be `01:02:03:04:05:i`.
pub fn dummy_interface(i: u8) -> NetworkInterface {
    NetworkInterface {
        name: format!("eth{}", i),
        index: i as u32,
        mac: Some(LinkAddress::new(1, 2, 3, 4, 5, i)),
        ips: Vec::new(),
        flags: 0,
    }
}

#[cfg(test)]
mod tests {
    use crate::{DataLinkReceiver, DataLinkSender};

    use std::io;
    use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
    use std::thread::{sleep, spawn};
    use std::time::Duration;

    #[test]
    fn send_one_frame() {
        let (_, read_handle, mut tx, _) = create_net(super::Config::default());
        let mut buffer = vec![0; 20];
        buffer[1] = 34;
        buffer[18] = 76;

        assert_eq!(tx.send(&buffer).unwrap(), 20);
        let frame = read_handle
            .try_recv()
            .expect("Expected one frame to be sent");
        assert!(read_handle.try_recv().is_err());
        assert_eq!(frame.len(), 20);
        assert_eq!(frame[1], 34);
        assert_eq!(frame[18], 76);
    }

    #[test]
    fn truncating_link_reports_short_write() {
        let mut config = super::Config::default();
        config.max_send_len = Some(16);
        let (_, read_handle, mut tx, _) = create_net(config);

        assert_eq!(tx.send(&[7u8; 48]).unwrap(), 16);
        assert_eq!(read_handle.try_recv().unwrap().len(), 16);
        assert_eq!(tx.send(&[7u8; 10]).unwrap(), 10);
    }

    #[test]
    fn read_nothing() {
        let (_inject, _, _, mut rx) = create_net(super::Config::default());
        let (control_tx, control_rx) = mpsc::channel();
        spawn(move || {
            rx.next().expect("Should not happen 1");
            control_tx.send(()).expect("Should not happen 2");
        });
        sleep(Duration::new(0, 1_000_000));
        match control_rx.try_recv() {
            Ok(_) => panic!("Nothing should have arrived"),
            Err(TryRecvError::Disconnected) => panic!("Thread should not have quit"),
            Err(TryRecvError::Empty) => (),
        }
    }

    #[test]
    fn read_times_out_when_configured() {
        let mut config = super::Config::default();
        config.read_timeout = Some(Duration::from_millis(10));
        let (_inject, _, _, mut rx) = create_net(config);
        let err = rx.next().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn read_multiple_frames_in_order() {
        let (inject_handle, _, _, mut rx) = create_net(super::Config::default());

        for i in 0..3 {
            let buffer = vec![i; 20];
            inject_handle.send(Ok(buffer.into_boxed_slice())).unwrap();
        }
        inject_handle
            .send(Err(io::Error::new(io::ErrorKind::Other, "link down")))
            .unwrap();

        for i in 0..3 {
            let frame = rx.next().expect("Expected a frame");
            assert_eq!(frame[0], i);
        }
        assert_eq!(rx.next().unwrap_err().to_string(), "link down");
    }

    fn create_net(
        mut config: super::Config,
    ) -> (
        Sender<io::Result<Box<[u8]>>>,
        Receiver<Box<[u8]>>,
        Box<dyn DataLinkSender>,
        Box<dyn DataLinkReceiver>,
    ) {
        let interface = super::dummy_interface(56);
        let inject_handle = config.inject_handle().unwrap();
        let read_handle = config.read_handle().unwrap();

        let channel = super::channel(&interface, config);
        let (tx, rx) = match channel {
            Ok(super::super::Channel::Ethernet(tx, rx)) => (tx, rx),
            _ => panic!("Not a valid channel returned"),
        };
        (inject_handle, read_handle, tx, rx)
    }
}
