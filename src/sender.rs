// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Transmitting frames: one-shot, periodic, and on operator command.
//!
//! All transmissions on a channel go through `FrameSender::send`, which holds the channel's
//! lock for the whole write. A command-triggered send therefore never interleaves with a timed
//! one, and a send that has started always finishes before the channel can be released.

use std::io::BufRead;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ethpcm_datalink::DataLinkSender;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::{Frame, DEFAULT_MTU, HEADER_LEN};
use crate::shutdown::Shutdown;
use crate::speed::{self, LinkControl};
use crate::{LinkAddress, ProtocolType};

/// Serializes writes to one raw channel.
pub struct FrameSender {
    link: Mutex<Box<dyn DataLinkSender>>,
    interface: String,
    mtu: usize,
}

impl FrameSender {
    /// Wrap the sending half of an already open channel.
    pub fn new(link: Box<dyn DataLinkSender>, interface: &str, mtu: usize) -> FrameSender {
        FrameSender {
            link: Mutex::new(link),
            interface: interface.to_owned(),
            mtu,
        }
    }

    /// Open a raw channel on `interface` for sending.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn open(interface: &str, mtu: usize) -> Result<FrameSender> {
        let config = ethpcm_datalink::Config {
            promiscuous: false,
            ..Default::default()
        };
        let (tx, _) = crate::link::open(interface, config)?;
        Ok(FrameSender::new(tx, interface, mtu))
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Block until no send is in flight.
    pub fn wait_idle(&self) {
        drop(self.link.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Largest frame this sender will put on the wire.
    pub fn max_frame_len(&self) -> usize {
        HEADER_LEN + self.mtu
    }

    /// Transmit `frame` as a single write.
    ///
    /// Fails with `FrameTooLong` before touching the link if the frame exceeds the MTU, and
    /// with `Truncated` if the link accepted fewer bytes than the frame holds.
    pub fn send(&self, frame: &Frame) -> Result<usize> {
        let max = self.max_frame_len();
        if frame.len() > max {
            return Err(Error::FrameTooLong {
                len: frame.len(),
                max,
            });
        }

        let sent = {
            let mut link = self.link.lock().unwrap_or_else(PoisonError::into_inner);
            link.send(frame.as_bytes())
                .map_err(|e| Error::from_socket_error(e, &self.interface))?
        };
        if sent != frame.len() {
            return Err(Error::Truncated {
                sent,
                expected: frame.len(),
            });
        }
        debug!(interface = %self.interface, len = sent, "sent frame");
        Ok(sent)
    }
}

/// Encode one frame from raw header fields and send it on `interface`.
///
/// The channel is opened for this call only and closed again on every path out.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn send_frame(
    destination: &[u8],
    source: &[u8],
    protocol_type: &[u8],
    payload: &[u8],
    interface: &str,
) -> Result<usize> {
    let frame = crate::frame::encode(destination, source, protocol_type, payload)?;
    FrameSender::open(interface, DEFAULT_MTU)?.send(&frame)
}

/// Header fields and payload shared by every frame a `Transmitter` sends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameParams {
    pub destination: LinkAddress,
    pub source: LinkAddress,
    pub protocol_type: ProtocolType,
    pub payload: Vec<u8>,
}

impl FrameParams {
    pub fn build(&self) -> Frame {
        Frame::new(self.destination, self.source, self.protocol_type, &self.payload)
    }
}

/// An operator command read from the control input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Send one frame now, outside the timer.
    SendNow,
    /// Change the link speed; the value is validated when the command runs.
    SetSpeed(String),
}

impl Command {
    /// Parse one input line. `"0"` sends, `"1"` asks for 100 Mb/s, `"2"` for 10 Mb/s, and
    /// `speed <n>` for an explicit value. Anything else is not a command.
    pub fn parse(line: &str) -> Option<Command> {
        let line = line.trim();
        match line {
            "0" => Some(Command::SendNow),
            "1" => Some(Command::SetSpeed("100".to_owned())),
            "2" => Some(Command::SetSpeed("10".to_owned())),
            _ => line
                .strip_prefix("speed ")
                .map(|value| Command::SetSpeed(value.trim().to_owned())),
        }
    }
}

/// Periodic sender with an out-of-band command path.
pub struct Transmitter {
    sender: FrameSender,
    params: FrameParams,
    interval: Duration,
    control: Box<dyn LinkControl>,
}

impl Transmitter {
    pub fn new(
        sender: FrameSender,
        params: FrameParams,
        interval: Duration,
        control: Box<dyn LinkControl>,
    ) -> Transmitter {
        Transmitter {
            sender,
            params,
            interval,
            control,
        }
    }

    /// Build a fresh frame and send it.
    pub fn send_now(&self) -> Result<usize> {
        self.sender.send(&self.params.build())
    }

    /// Carry out one operator command.
    pub fn handle(&self, command: &Command) -> Result<()> {
        match *command {
            Command::SendNow => self.send_now().map(|_| ()),
            Command::SetSpeed(ref value) => {
                let speed = speed::set_link_speed(&*self.control, self.sender.interface(), value)?;
                info!(interface = %self.sender.interface(), %speed, "link speed changed");
                Ok(())
            }
        }
    }

    /// Send every interval until `shutdown` is triggered.
    ///
    /// Recoverable failures are logged and the next interval proceeds; privilege and interface
    /// errors end the loop.
    pub fn run(&self, shutdown: &Shutdown) -> Result<()> {
        info!(
            interface = %self.sender.interface(),
            interval_ms = self.interval.as_millis() as u64,
            len = HEADER_LEN + self.params.payload.len(),
            "starting transmission"
        );
        loop {
            if let Err(e) = self.send_now() {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!(error = %e, "send failed");
            }
            if shutdown.wait(self.interval) {
                self.sender.wait_idle();
                info!("stopping transmission");
                return Ok(());
            }
        }
    }

    /// Read commands from `input` until end of input or shutdown.
    pub fn listen<R: BufRead>(&self, input: R, shutdown: &Shutdown) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            if shutdown.is_triggered() {
                break;
            }
            match Command::parse(&line) {
                Some(command) => {
                    debug!(?command, "command received");
                    if let Err(e) = self.handle(&command) {
                        if e.is_fatal() {
                            return Err(e);
                        }
                        warn!(error = %e, "command failed");
                    }
                }
                None => debug!(input = %line.trim(), "ignoring input"),
            }
        }
        Ok(())
    }
}

/// Run `Transmitter::listen` on its own thread.
///
/// A fatal error from the listener also triggers `shutdown`, stopping the timer loop.
pub fn spawn_listener<R>(
    transmitter: Arc<Transmitter>,
    input: R,
    shutdown: Shutdown,
) -> JoinHandle<Result<()>>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        let result = transmitter.listen(input, &shutdown);
        if result.is_err() {
            shutdown.trigger();
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speed::LinkSpeed;
    use ethpcm_datalink::{dummy, Channel};
    use std::io::{self, Cursor};
    use std::sync::mpsc::Receiver;

    #[derive(Default)]
    struct FakeControl(Mutex<Vec<LinkSpeed>>);

    impl LinkControl for FakeControl {
        fn set_speed(&self, _interface: &str, speed: LinkSpeed) -> Result<()> {
            self.0.lock().unwrap().push(speed);
            Ok(())
        }
    }

    impl LinkControl for Arc<FakeControl> {
        fn set_speed(&self, interface: &str, speed: LinkSpeed) -> Result<()> {
            (**self).set_speed(interface, speed)
        }
    }

    fn sender(config: dummy::Config, mtu: usize) -> FrameSender {
        match dummy::channel(&dummy::dummy_interface(0), config) {
            Ok(Channel::Ethernet(tx, _)) => FrameSender::new(tx, "eth0", mtu),
            _ => panic!("not an ethernet channel"),
        }
    }

    fn bench_params(payload_len: usize) -> FrameParams {
        FrameParams {
            destination: LinkAddress::new(0xde, 0xad, 0xbe, 0xef, 0x00, 0x00),
            source: LinkAddress::new(0xd8, 0xbb, 0xc1, 0x57, 0xaa, 0x16),
            protocol_type: ProtocolType::PCM_BENCH,
            payload: b"01".iter().cycle().take(payload_len).cloned().collect(),
        }
    }

    fn transmitter(interval: Duration) -> (Transmitter, Receiver<Box<[u8]>>, Arc<FakeControl>) {
        let mut config = dummy::Config::default();
        let wire = config.read_handle().unwrap();
        let control = Arc::new(FakeControl::default());
        let tx = Transmitter::new(
            sender(config, DEFAULT_MTU),
            bench_params(34),
            interval,
            Box::new(control.clone()),
        );
        (tx, wire, control)
    }

    #[test]
    fn whole_frame_in_one_write() {
        let mut config = dummy::Config::default();
        let wire = config.read_handle().unwrap();
        let sender = sender(config, DEFAULT_MTU);

        let frame = bench_params(34).build();
        assert_eq!(sender.send(&frame).unwrap(), 48);
        let sent = wire.try_recv().unwrap();
        assert_eq!(&sent[..], frame.as_bytes());
        assert!(wire.try_recv().is_err());
    }

    #[test]
    fn short_write_is_truncated() {
        let mut config = dummy::Config::default();
        config.max_send_len = Some(20);
        let sender = sender(config, DEFAULT_MTU);

        let err = sender.send(&bench_params(34).build()).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                sent: 20,
                expected: 48
            }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn oversized_frame_never_reaches_the_link() {
        let mut config = dummy::Config::default();
        let wire = config.read_handle().unwrap();
        let sender = sender(config, 16);

        assert!(sender.send(&bench_params(16).build()).is_ok());
        assert!(matches!(
            sender.send(&bench_params(17).build()),
            Err(Error::FrameTooLong { len: 31, max: 30 })
        ));
        assert_eq!(wire.try_iter().count(), 1);
    }

    #[test]
    fn parse_commands() {
        assert_eq!(Command::parse("0"), Some(Command::SendNow));
        assert_eq!(Command::parse("1\n"), Some(Command::SetSpeed("100".into())));
        assert_eq!(Command::parse(" 2 "), Some(Command::SetSpeed("10".into())));
        assert_eq!(
            Command::parse("speed 1000"),
            Some(Command::SetSpeed("1000".into()))
        );
        for ignored in ["", "3", "00", "send", "speed"] {
            assert_eq!(Command::parse(ignored), None);
        }
    }

    #[test]
    fn listener_runs_commands() {
        let (tx, wire, control) = transmitter(Duration::from_secs(5));
        let input = Cursor::new("0\nhello\n1\nspeed 1000\n2\n0\n");
        tx.listen(input, &Shutdown::new()).unwrap();

        assert_eq!(wire.try_iter().count(), 2);
        assert_eq!(
            *control.0.lock().unwrap(),
            vec![LinkSpeed::Mbps100, LinkSpeed::Mbps10]
        );
    }

    #[test]
    fn listener_stops_on_shutdown() {
        let (tx, wire, _) = transmitter(Duration::from_secs(5));
        let shutdown = Shutdown::new();
        shutdown.trigger();
        tx.listen(Cursor::new("0\n0\n"), &shutdown).unwrap();
        assert_eq!(wire.try_iter().count(), 0);
    }

    #[test]
    fn run_sends_until_shutdown() {
        let (tx, wire, _) = transmitter(Duration::from_millis(10));
        let shutdown = Shutdown::new();
        let stopper = shutdown.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            stopper.trigger();
        });
        tx.run(&shutdown).unwrap();
        handle.join().unwrap();

        let frames: Vec<Box<[u8]>> = wire.try_iter().collect();
        assert!(frames.len() >= 2);
        assert!(frames.iter().all(|f| f.len() == 48));
    }

    #[test]
    fn run_survives_truncation() {
        let mut config = dummy::Config::default();
        config.max_send_len = Some(10);
        let wire = config.read_handle().unwrap();
        let tx = Transmitter::new(
            sender(config, DEFAULT_MTU),
            bench_params(34),
            Duration::from_millis(5),
            Box::new(Arc::new(FakeControl::default())),
        );
        let shutdown = Shutdown::new();
        let stopper = shutdown.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            stopper.trigger();
        });
        assert!(tx.run(&shutdown).is_ok());
        handle.join().unwrap();
        assert!(wire.try_iter().count() >= 2);
    }

    struct DeniedLink;

    impl DataLinkSender for DeniedLink {
        fn send(&mut self, _frame: &[u8]) -> io::Result<usize> {
            Err(io::Error::from_raw_os_error(libc::EPERM))
        }
    }

    #[test]
    fn run_stops_on_fatal_error() {
        let tx = Transmitter::new(
            FrameSender::new(Box::new(DeniedLink), "eth0", DEFAULT_MTU),
            bench_params(2),
            Duration::from_secs(60),
            Box::new(Arc::new(FakeControl::default())),
        );
        assert!(matches!(
            tx.run(&Shutdown::new()),
            Err(Error::PermissionDenied { .. })
        ));
    }

    #[test]
    fn timer_and_listener_share_the_link() {
        let (tx, wire, _) = transmitter(Duration::from_millis(5));
        let tx = Arc::new(tx);
        let shutdown = Shutdown::new();
        let input = Cursor::new("0\n".repeat(50));
        let listener = spawn_listener(tx.clone(), input, shutdown.clone());

        let stopper = shutdown.clone();
        let timer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stopper.trigger();
        });
        tx.run(&shutdown).unwrap();
        timer.join().unwrap();
        listener.join().unwrap().unwrap();

        let expected = bench_params(34).build();
        let frames: Vec<Box<[u8]>> = wire.try_iter().collect();
        assert!(frames.len() >= 2);
        assert!(frames.iter().all(|f| &f[..] == expected.as_bytes()));
    }
}
