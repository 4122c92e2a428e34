//! System idle time from the HID driver.

use mac_trap_core::{IdleProbe, Result, TripwireError};

use super::command;

const HID_IDLE_TIME_KEY: &str = "HIDIdleTime";
const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Reads `HIDIdleTime` (nanoseconds) out of `ioreg -c IOHIDSystem`.
#[derive(Debug, Clone)]
pub struct IoregIdleProbe {
    argv: Vec<String>,
}

impl IoregIdleProbe {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl IdleProbe for IoregIdleProbe {
    fn read(&self) -> Result<f64> {
        let output = command::output(&self.argv)
            .map_err(|err| TripwireError::ProbeFailed(err.to_string()))?;
        parse_hid_idle_time(&output)
    }
}

pub fn parse_hid_idle_time(output: &str) -> Result<f64> {
    for line in output.lines() {
        if !line.contains(HID_IDLE_TIME_KEY) {
            continue;
        }
        let Some((_, value)) = line.split_once('=') else {
            continue;
        };
        let Some(token) = value.split_whitespace().next() else {
            continue;
        };
        let nanos: f64 = token.parse().map_err(|err| {
            TripwireError::ProbeFailed(format!(
                "unparseable {} {:?}: {}",
                HID_IDLE_TIME_KEY, token, err
            ))
        })?;
        return Ok(nanos / NANOS_PER_SEC);
    }
    Err(TripwireError::ProbeFailed(format!(
        "could not find {}",
        HID_IDLE_TIME_KEY
    )))
}
