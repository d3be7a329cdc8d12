// Copyright (c) 2014, 2015 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Stream a fixed payload as raw Ethernet frames.
//!
//! While running, lines on stdin act as commands: `0` sends a frame immediately, `1` forces the
//! link to 100 Mb/s and `2` to 10 Mb/s.

use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ethpcm::config::{self, SenderConfig};
use ethpcm::sender::{spawn_listener, FrameParams, FrameSender, Transmitter};
use ethpcm::shutdown::Shutdown;
use ethpcm::speed::{self, Ethtool};
use ethpcm::{datalink, LinkAddress, ProtocolType};

/// Send PCM payload frames on a raw Ethernet link.
#[derive(Parser, Debug)]
#[command(name = "ethpcm-send")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Interface to send on
    #[arg(short = 'i', long = "interface", value_name = "IFACE")]
    interface: Option<String>,

    /// Destination hardware address
    #[arg(long = "dst", value_name = "MAC")]
    destination: Option<LinkAddress>,

    /// Source hardware address
    #[arg(long = "src", value_name = "MAC")]
    source: Option<LinkAddress>,

    /// Protocol type, e.g. 0x0040
    #[arg(long = "type", value_name = "TYPE")]
    protocol_type: Option<ProtocolType>,

    /// Payload text sent in every frame
    #[arg(long = "payload", value_name = "TEXT", conflicts_with = "payload_file")]
    payload: Option<String>,

    /// Read the payload bytes from a file
    #[arg(long = "payload-file", value_name = "FILE")]
    payload_file: Option<PathBuf>,

    /// Milliseconds between frames
    #[arg(long = "interval-ms", value_name = "MS")]
    interval_ms: Option<u64>,

    /// Force the link speed (100 or 10 Mb/s) before sending
    #[arg(long = "speed", value_name = "MBPS")]
    speed: Option<String>,

    /// Send a single frame and exit
    #[arg(long = "once")]
    once: bool,

    /// Do not read commands from stdin
    #[arg(long = "no-commands")]
    no_commands: bool,

    /// List network interfaces and exit
    #[arg(long = "list-interfaces")]
    list_interfaces: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(&self, config: &mut SenderConfig) {
        if let Some(ref interface) = self.interface {
            config.interface = interface.clone();
        }
        if let Some(destination) = self.destination {
            config.destination = destination;
        }
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(protocol_type) = self.protocol_type {
            config.protocol_type = protocol_type;
        }
        if let Some(ref payload) = self.payload {
            config.payload = payload.clone();
            config.payload_file = None;
        }
        if let Some(ref path) = self.payload_file {
            config.payload_file = Some(path.clone());
        }
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }
    }
}

fn main() {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    if let Err(e) = run(args) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if args.list_interfaces {
        for interface in datalink::interfaces() {
            println!("{}", interface);
        }
        return Ok(());
    }

    let mut config: SenderConfig =
        config::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);

    let params = FrameParams {
        destination: config.destination,
        source: config.source,
        protocol_type: config.protocol_type,
        payload: config.payload_bytes()?,
    };
    let control = Ethtool::new(config.link_tool.clone());

    if let Some(ref value) = args.speed {
        speed::set_link_speed(&control, &config.interface, value)
            .with_context(|| format!("failed to set link speed on {}", config.interface))?;
    }

    let sender = FrameSender::open(&config.interface, config.mtu)
        .with_context(|| format!("failed to open {}", config.interface))?;

    if args.once {
        let sent = sender.send(&params.build())?;
        info!(interface = %config.interface, bytes = sent, "sent frame");
        return Ok(());
    }

    let shutdown = Shutdown::on_signals().context("failed to install signal handlers")?;
    let transmitter = Arc::new(Transmitter::new(
        sender,
        params,
        config.interval(),
        Box::new(control),
    ));
    let listener = if args.no_commands {
        None
    } else {
        Some(spawn_listener(
            transmitter.clone(),
            BufReader::new(io::stdin()),
            shutdown.clone(),
        ))
    };

    transmitter.run(&shutdown)?;

    // The listener is usually still blocked on stdin; only a finished one has anything to say.
    if let Some(listener) = listener.filter(|l| l.is_finished()) {
        match listener.join() {
            Ok(result) => result.context("command listener failed")?,
            Err(_) => bail!("command listener panicked"),
        }
    }
    Ok(())
}
