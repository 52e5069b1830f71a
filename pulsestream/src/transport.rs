//! Byte transports carrying the interval stream.
//!
//! The wire contract is byte-level only; nothing here knows about
//! frames. `SerialTransport` is the real device, `VirtualTransport` a
//! simulated one for demos and bench setups without hardware.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::time::Duration;

/// A full-duplex byte stream with bounded-timeout reads.
///
/// `read` returns `Ok(0)` when the timeout elapses with no data, so a
/// caller polling it stays responsive to its stop flag. An `Err` is a
/// fatal transport failure for the session.
pub trait Transport: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
}

/// The interval stream on a real serial port.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Open `path` with a bounded read timeout.
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .with_context(|| format!("opening serial port {path} at {baud} Bd"))?;
        Ok(SerialTransport { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(e) => Err(e).context("serial read failed"),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.port.write_all(buf).context("serial write failed")?;
        self.port.flush().context("serial flush failed")?;
        Ok(())
    }
}

/// A simulated counter: emits well-formed frames for randomized pulse
/// intervals, pacing itself on the read timeout like a real port would.
/// Writes (commands) are accepted and ignored.
pub struct VirtualTransport {
    rng: StdRng,
    pending: VecDeque<u8>,
    pace: Duration,
    min_us: u32,
    max_us: u32,
}

impl VirtualTransport {
    pub fn new(pace: Duration) -> Self {
        VirtualTransport {
            rng: StdRng::from_entropy(),
            pending: VecDeque::new(),
            pace,
            min_us: 200,
            max_us: 20_000,
        }
    }

    /// Override the simulated interval range.
    pub fn with_interval_range(mut self, min_us: u32, max_us: u32) -> Self {
        self.min_us = min_us.max(1);
        self.max_us = max_us.max(self.min_us);
        self
    }
}

impl Transport for VirtualTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pending.is_empty() {
            std::thread::sleep(self.pace);
            let burst = self.rng.gen_range(0..=4);
            for _ in 0..burst {
                let delta = self.rng.gen_range(self.min_us..=self.max_us);
                self.pending.extend(pulsewire::encode(delta));
            }
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, _buf: &[u8]) -> Result<()> {
        Ok(())
    }
}
