// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Capture → reassemble → reconstruct → write, as one run.

use std::path::PathBuf;

use ethpcm_datalink::DataLinkReceiver;
use tracing::info;

use crate::capture::Capture;
use crate::config::CaptureConfig;
use crate::error::{Error, Result};
use crate::output::OutputFile;
use crate::pcm;
use crate::reassembly::Reassembler;
use crate::shutdown::Shutdown;
use crate::wav;

/// Summary of a completed capture run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureReport {
    /// Frames counted toward the configured count, `frames + dropped`.
    pub received: usize,
    /// Frames that contributed payload.
    pub frames: usize,
    /// Frames discarded as too short.
    pub dropped: usize,
    /// Frames skipped by the protocol type filter.
    pub filtered: usize,
    pub payload_bytes: usize,
    pub samples: usize,
    pub trace_path: PathBuf,
    pub wav_path: PathBuf,
}

/// Capture from the interface named in `config` and write both outputs.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn run_capture(config: &CaptureConfig, shutdown: &Shutdown) -> Result<CaptureReport> {
    let (_, rx) = crate::link::open(&config.interface, config.datalink_config())?;
    run_capture_on(rx, config, shutdown)
}

/// Run the pipeline on an already open receive channel.
///
/// Neither output file exists until every frame has been collected and both files are fully
/// written. On error or cancellation nothing is left behind.
pub fn run_capture_on(
    rx: Box<dyn DataLinkReceiver>,
    config: &CaptureConfig,
    shutdown: &Shutdown,
) -> Result<CaptureReport> {
    let mut capture = Capture::new(rx, &config.interface, config.capture_options())
        .with_shutdown(shutdown.clone());
    info!(
        interface = %config.interface,
        count = config.count,
        trailer_len = config.trailer_len,
        "capturing"
    );

    let mut reassembler = Reassembler::new(OutputFile::create(&config.trace_path)?);
    for frame in capture.by_ref() {
        reassembler.push(frame?.payload())?;
    }
    let (stream, trace) = reassembler.finish()?;

    let samples = pcm::reconstruct(&stream);
    if samples.is_empty() && config.reject_empty {
        return Err(Error::EmptySampleBuffer);
    }

    let mut wav_out = OutputFile::create(&config.wav_path)?;
    wav::write_to(&mut wav_out, &samples, config.sample_rate)?;
    let wav_path = wav_out.commit()?;
    let trace_path = trace.commit()?;

    let report = CaptureReport {
        received: capture.received(),
        frames: capture.captured(),
        dropped: capture.dropped(),
        filtered: capture.filtered(),
        payload_bytes: stream.len(),
        samples: samples.len(),
        trace_path,
        wav_path,
    };
    info!(
        received = report.received,
        frames = report.frames,
        dropped = report.dropped,
        samples = report.samples,
        wav = %report.wav_path.display(),
        "capture complete"
    );
    Ok(report)
}
