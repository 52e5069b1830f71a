//! Configuration for an acquisition session.
//!
//! A session is declared in a JSON file; every field except the data port
//! has a default matching the reference device. Durations are parsed as
//! in [humantime](https://docs.rs/humantime/), e.g. `100ms` or `5ms`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One acquisition session: where the device is and how the pipeline
/// should run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Serial port carrying the binary interval stream
    pub data_port: String,
    /// Baud rate of the interval stream
    #[serde(default = "default_data_baud")]
    pub data_baud: u32,
    /// Optional separate port for the ASCII control channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_port: Option<String>,
    /// Baud rate of the control channel
    #[serde(default = "default_command_baud")]
    pub command_baud: u32,
    /// Batch delivery period
    #[serde(default = "default_dispatch_interval", with = "humantime_serde")]
    pub dispatch_interval: Duration,
    /// Bounded timeout for one transport read; also how long a shutdown
    /// may take to be honored
    #[serde(default = "default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Firmware debounce threshold in microseconds
    #[serde(default = "default_debounce_us")]
    pub debounce_us: u32,
    /// Cap on queued samples; unset leaves the queue unbounded. With a
    /// cap, overflow drops the oldest queued sample and is counted in
    /// the diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_cap: Option<usize>,
}

fn default_data_baud() -> u32 {
    500_000
}

fn default_command_baud() -> u32 {
    9_600
}

fn default_dispatch_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(5)
}

fn default_debounce_us() -> u32 {
    10
}

impl Default for Session {
    fn default() -> Self {
        Session {
            data_port: String::from("/dev/ttyACM0"),
            data_baud: default_data_baud(),
            command_port: None,
            command_baud: default_command_baud(),
            dispatch_interval: default_dispatch_interval(),
            read_timeout: default_read_timeout(),
            debounce_us: default_debounce_us(),
            queue_cap: None,
        }
    }
}
