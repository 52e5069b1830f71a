//! Command-channel line framing.
//!
//! The control sub-protocol is newline-terminated ASCII on its own serial
//! channel, kept apart from the binary interval stream so a command echo
//! can never be mistaken for a frame. The firmware only frames lines
//! here; interpreting them is the counter's (or the host's) job.

use heapless::{String, Vec};

/// Longest accepted command line, excluding the terminator.
pub const MAX_LINE: usize = 64;

/// A complete received command line.
pub type Line = String<MAX_LINE>;

/// Accumulates bytes from the command channel into complete lines.
///
/// Carriage returns are ignored. A line longer than [`MAX_LINE`] or one
/// that is not valid UTF-8 is discarded whole and counted; the reader
/// then stays silent until the next terminator.
pub struct LineReader {
    buf: Vec<u8, MAX_LINE>,
    overlong: bool,
    discarded: u32,
}

impl LineReader {
    pub const fn new() -> Self {
        LineReader {
            buf: Vec::new(),
            overlong: false,
            discarded: 0,
        }
    }

    /// Feed one byte; returns the completed line on a newline.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        match byte {
            b'\r' => None,
            b'\n' => {
                let line = if self.overlong {
                    self.overlong = false;
                    self.discarded = self.discarded.wrapping_add(1);
                    None
                } else {
                    match core::str::from_utf8(&self.buf) {
                        Ok(text) => {
                            let mut line = Line::new();
                            // Cannot overflow: same capacity as the buffer.
                            let _ = line.push_str(text);
                            Some(line)
                        }
                        Err(_) => {
                            self.discarded = self.discarded.wrapping_add(1);
                            None
                        }
                    }
                };
                self.buf.clear();
                line
            }
            _ => {
                if !self.overlong && self.buf.push(byte).is_err() {
                    self.overlong = true;
                    self.buf.clear();
                }
                None
            }
        }
    }

    /// Lines discarded for length or encoding since construction.
    pub fn discarded(&self) -> u32 {
        self.discarded
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}
