// Copyright (c) 2014, 2015 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Capture raw PCM frames and rebuild them into a WAVE file.

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ethpcm::config::{self, CaptureConfig};
use ethpcm::shutdown::Shutdown;
use ethpcm::{datalink, pipeline, wav, Error, ProtocolType};

/// Exit status for a run stopped by SIGINT/SIGTERM.
const EXIT_CANCELLED: i32 = 130;

/// Capture raw Ethernet PCM frames and write them out as WAVE audio.
#[derive(Parser, Debug)]
#[command(name = "ethpcm-capture")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Interface to capture on
    #[arg(short = 'i', long = "interface", value_name = "IFACE")]
    interface: Option<String>,

    /// Number of frames to receive, short ones included
    #[arg(short = 'n', long = "count", value_name = "N")]
    count: Option<usize>,

    /// Checksum bytes to strip from the end of each frame
    #[arg(long = "trailer-len", value_name = "BYTES")]
    trailer_len: Option<usize>,

    /// Sample rate written to the WAVE header
    #[arg(long = "sample-rate", value_name = "HZ")]
    sample_rate: Option<u32>,

    /// Only keep frames of this protocol type
    #[arg(long = "ethertype", value_name = "TYPE")]
    ethertype: Option<ProtocolType>,

    /// Hex trace output file
    #[arg(short = 't', long = "trace", value_name = "FILE")]
    trace: Option<PathBuf>,

    /// WAVE output file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Fail instead of writing an empty WAVE file
    #[arg(long = "reject-empty")]
    reject_empty: bool,

    /// Read the WAVE file back after writing and check it
    #[arg(long = "verify")]
    verify: bool,

    /// List network interfaces and exit
    #[arg(long = "list-interfaces")]
    list_interfaces: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(&self, config: &mut CaptureConfig) {
        if let Some(ref interface) = self.interface {
            config.interface = interface.clone();
        }
        if let Some(count) = self.count {
            config.count = count;
        }
        if let Some(trailer_len) = self.trailer_len {
            config.trailer_len = trailer_len;
        }
        if let Some(sample_rate) = self.sample_rate {
            config.sample_rate = sample_rate;
        }
        if self.ethertype.is_some() {
            config.ethertype = self.ethertype;
        }
        if let Some(ref trace) = self.trace {
            config.trace_path = trace.clone();
        }
        if let Some(ref output) = self.output {
            config.wav_path = output.clone();
        }
        if self.reject_empty {
            config.reject_empty = true;
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
        if let Some(Error::Cancelled) = e.downcast_ref::<Error>() {
            warn!("capture cancelled, no files written");
            process::exit(EXIT_CANCELLED);
        }
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

    let mut config: CaptureConfig =
        config::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);

    let shutdown = Shutdown::on_signals().context("failed to install signal handlers")?;
    let report = match pipeline::run_capture(&config, &shutdown) {
        Ok(report) => report,
        Err(Error::Cancelled) => return Err(Error::Cancelled.into()),
        Err(e) => {
            return Err(e).with_context(|| format!("capture on {} failed", config.interface))
        }
    };

    println!(
        "received {} frames ({} kept, {} dropped, {} filtered), {} payload bytes, {} samples",
        report.received,
        report.frames,
        report.dropped,
        report.filtered,
        report.payload_bytes,
        report.samples
    );
    println!("trace: {}", report.trace_path.display());
    println!("audio: {}", report.wav_path.display());

    if args.verify {
        let (spec, samples) = wav::read_wav(&report.wav_path)
            .with_context(|| format!("failed to read back {}", report.wav_path.display()))?;
        if spec.sample_rate != config.sample_rate || samples.len() != report.samples {
            bail!(
                "{} does not match the capture: {} samples at {} Hz",
                report.wav_path.display(),
                samples.len(),
                spec.sample_rate
            );
        }
        info!(samples = samples.len(), "output verified");
    }
    Ok(())
}
