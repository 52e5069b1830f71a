//! Firmware-side capture logic for a pulse interval source.
//!
//! The hard real-time half of the system: an interrupt handler records a
//! microsecond timestamp per qualifying hardware edge into a fixed ring
//! buffer, and the firmware main loop drains the buffer, debounces the
//! resulting intervals and writes them to the serial link as wire frames.
//!
//! This crate is hardware-agnostic. The embedding firmware owns the
//! interrupt vector, the microsecond clock and the UART; it calls
//! [`PulseCapture::record`] from the interrupt context and [`pump`] from
//! the main loop. How the capture struct is shared between the two
//! contexts (critical section, single-core executor, ...) is the
//! embedding's choice; both sides run in bounded time and never block.

#![no_std]

pub mod cmd;

use embedded_io::Write;

/// Default debounce threshold in microseconds. Intervals at or below
/// this are treated as electrical re-triggers, not pulses.
pub const DEBOUNCE_US: u32 = 10;

/// Default ring capacity in timestamps.
pub const RING_CAPACITY: usize = 128;

/// Fixed-capacity timestamp ring written from interrupt context and
/// drained from the main loop.
///
/// The write and read cursors are free-running and wrap independently;
/// capacity must be a power of two so the slot index is a mask. When the
/// writer laps the reader the oldest unread timestamp is silently
/// overwritten: under overload the buffer keeps the newest `N` events
/// rather than stalling the interrupt handler.
pub struct PulseCapture<const N: usize = RING_CAPACITY> {
    slots: [u32; N],
    write: usize,
    read: usize,
}

impl<const N: usize> PulseCapture<N> {
    pub const fn new() -> Self {
        assert!(N.is_power_of_two());
        PulseCapture {
            slots: [0; N],
            write: 0,
            read: 0,
        }
    }

    /// Record one edge timestamp. Interrupt-context half: one store and
    /// two cursor updates, nothing else.
    #[inline]
    pub fn record(&mut self, timestamp_us: u32) {
        self.slots[self.write & (N - 1)] = timestamp_us;
        self.write = self.write.wrapping_add(1);
        if self.write.wrapping_sub(self.read) > N {
            // Lapped: drop the oldest unread entry.
            self.read = self.write.wrapping_sub(N);
        }
    }

    /// Non-blocking poll from the main loop; `None` when no unread
    /// timestamp is available.
    pub fn poll(&mut self) -> Option<u32> {
        if self.read == self.write {
            return None;
        }
        let timestamp = self.slots[self.read & (N - 1)];
        self.read = self.read.wrapping_add(1);
        Some(timestamp)
    }

    /// Unread timestamps currently buffered.
    pub fn len(&self) -> usize {
        self.write.wrapping_sub(self.read)
    }

    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }
}

impl<const N: usize> Default for PulseCapture<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns consecutive timestamps into validated intervals and serializes
/// them to the transport.
///
/// Owns the last-emitted timestamp across calls. The interval is computed
/// with wrapping subtraction, so a single wrap of the 32-bit microsecond
/// clock between two pulses still yields the correct value.
pub struct FrameEncoder {
    last: Option<u32>,
    debounce_us: u32,
}

impl FrameEncoder {
    pub const fn new(debounce_us: u32) -> Self {
        FrameEncoder {
            last: None,
            debounce_us,
        }
    }

    /// Validate one timestamp against the debounce rule.
    ///
    /// The first timestamp after reset only seeds the state. An interval
    /// at or below the threshold is discarded without updating the stored
    /// timestamp, so a burst of re-triggers collapses into the pulse that
    /// started it.
    pub fn offer(&mut self, timestamp_us: u32) -> Option<u32> {
        match self.last {
            None => {
                self.last = Some(timestamp_us);
                None
            }
            Some(last) => {
                let delta = timestamp_us.wrapping_sub(last);
                if delta <= self.debounce_us {
                    None
                } else {
                    self.last = Some(timestamp_us);
                    Some(delta)
                }
            }
        }
    }

    /// Offer a timestamp and, if it qualifies, write its frame to the
    /// port as one unit. Returns the interval that was sent, if any.
    pub fn encode_to<W: Write>(
        &mut self,
        timestamp_us: u32,
        port: &mut W,
    ) -> Result<Option<u32>, W::Error> {
        match self.offer(timestamp_us) {
            Some(delta) => {
                port.write_all(&pulsewire::encode(delta))?;
                Ok(Some(delta))
            }
            None => Ok(None),
        }
    }

    /// Forget the last timestamp, e.g. when a measurement is restarted.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Main-loop half: drain every captured timestamp through the encoder
/// into the port. Returns the number of frames written.
pub fn pump<const N: usize, W: Write>(
    capture: &mut PulseCapture<N>,
    encoder: &mut FrameEncoder,
    port: &mut W,
) -> Result<usize, W::Error> {
    let mut frames = 0;
    while let Some(timestamp) = capture.poll() {
        if encoder.encode_to(timestamp, port)?.is_some() {
            frames += 1;
        }
    }
    Ok(frames)
}
