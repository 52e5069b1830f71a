//! Host end of the ASCII control channel.

use anyhow::{bail, Result};
use pulsetools::cmd::{parse_status, Command, DeviceStatus, ReportMode};
use std::time::{Duration, Instant};

use crate::transport::Transport;

/// Drives the control sub-protocol on its own transport, so command
/// echoes can never reach the interval-stream decoder.
pub struct CommandChannel {
    transport: Box<dyn Transport>,
}

impl CommandChannel {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        CommandChannel { transport }
    }

    /// Send one command line.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        let mut line = command.encode();
        line.push('\n');
        tracing::debug!(command = %command.encode(), "sending");
        self.transport.write_all(line.as_bytes())
    }

    /// Request a one-shot status report and wait up to `timeout` for it.
    pub fn query_status(&mut self, timeout: Duration) -> Result<DeviceStatus> {
        self.send(&Command::Report(ReportMode::Now))?;

        let deadline = Instant::now() + timeout;
        let mut line = Vec::new();
        let mut buf = [0u8; 64];
        while Instant::now() < deadline {
            let n = self.transport.read(&mut buf)?;
            for &byte in &buf[..n] {
                match byte {
                    b'\r' => {}
                    b'\n' => {
                        let text = String::from_utf8_lossy(&line);
                        return parse_status(&text);
                    }
                    _ => line.push(byte),
                }
            }
        }
        bail!("no status report within {timeout:?}");
    }
}
