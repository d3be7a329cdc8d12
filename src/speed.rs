// Copyright (c) 2014-2016 Robert Clipsham <robert@octarineparrot.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Physical link speed control, delegated to an external tool.

use std::fmt;
use std::process::Command;
use std::str::FromStr;

use tracing::info;

use crate::error::{Error, Result};

/// The link speeds the FPGA PHY can be forced to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkSpeed {
    Mbps100,
    Mbps10,
}

impl LinkSpeed {
    pub fn mbps(self) -> u32 {
        match self {
            LinkSpeed::Mbps100 => 100,
            LinkSpeed::Mbps10 => 10,
        }
    }
}

impl fmt::Display for LinkSpeed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} Mb/s", self.mbps())
    }
}

impl FromStr for LinkSpeed {
    type Err = Error;

    /// Accepts `"100"` or `"10"`, optionally suffixed with `M`.
    fn from_str(s: &str) -> Result<LinkSpeed> {
        match s.trim().trim_end_matches(|c| c == 'M' || c == 'm') {
            "100" => Ok(LinkSpeed::Mbps100),
            "10" => Ok(LinkSpeed::Mbps10),
            _ => Err(Error::InvalidSpeedOption(s.to_owned())),
        }
    }
}

/// Something that can force the speed of a named interface.
pub trait LinkControl: Send + Sync {
    fn set_speed(&self, interface: &str, speed: LinkSpeed) -> Result<()>;
}

/// Parse `value` and apply it; anything outside the supported set is rejected before the link
/// is touched.
pub fn set_link_speed(control: &dyn LinkControl, interface: &str, value: &str) -> Result<LinkSpeed> {
    let speed = value.parse::<LinkSpeed>()?;
    control.set_speed(interface, speed)?;
    Ok(speed)
}

/// Runs `ethtool -s <iface> speed <n> duplex full autoneg off`.
#[derive(Clone, Debug)]
pub struct Ethtool {
    program: String,
}

impl Ethtool {
    pub fn new<S: Into<String>>(program: S) -> Ethtool {
        Ethtool {
            program: program.into(),
        }
    }

    fn args(interface: &str, speed: LinkSpeed) -> Vec<String> {
        vec![
            "-s".to_owned(),
            interface.to_owned(),
            "speed".to_owned(),
            speed.mbps().to_string(),
            "duplex".to_owned(),
            "full".to_owned(),
            "autoneg".to_owned(),
            "off".to_owned(),
        ]
    }
}

impl Default for Ethtool {
    fn default() -> Ethtool {
        Ethtool::new("ethtool")
    }
}

impl LinkControl for Ethtool {
    fn set_speed(&self, interface: &str, speed: LinkSpeed) -> Result<()> {
        let args = Ethtool::args(interface, speed);
        let command = format!("{} {}", self.program, args.join(" "));
        info!(%command, "changing link speed");

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|e| Error::LinkControl {
                command: command.clone(),
                status: e.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::LinkControl {
                command,
                status: status.to_string(),
            })
        }
    }
}
