//! The transport read loop: bytes in, samples out.

use pulsewire::FrameDecoder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::data::{Sample, StreamMessage};
use crate::diag::Counters;
use crate::queue::AcquisitionQueue;
use crate::transport::Transport;

/// Spawn the acquisition thread.
///
/// Blocks only on the transport's bounded-timeout read and re-checks the
/// stop flag after every read, so a shutdown is honored within one
/// timeout interval. Decoder state is private to this thread; the queue
/// is the only shared hand-off. A transport failure is reported to the
/// consumer once and ends the thread.
pub fn spawn(
    mut transport: Box<dyn Transport>,
    queue: Arc<AcquisitionQueue>,
    counters: Arc<Counters>,
    stop: Arc<AtomicBool>,
    tx: flume::Sender<StreamMessage>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 512];
        while !stop.load(Ordering::Relaxed) {
            let n = match transport.read(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    tracing::error!("transport failed: {e:#}");
                    let _ = tx.send(StreamMessage::ConnectionLost);
                    break;
                }
            };
            if n == 0 {
                continue;
            }
            for &byte in &buf[..n] {
                if let Some(delta_us) = decoder.feed(byte) {
                    queue.push(Sample {
                        delta_us,
                        arrival: Instant::now(),
                    });
                }
            }
            counters
                .frames_decoded
                .store(decoder.decoded(), Ordering::Relaxed);
            counters
                .frames_dropped
                .store(decoder.dropped(), Ordering::Relaxed);
        }
        tracing::debug!(
            decoded = decoder.decoded(),
            dropped = decoder.dropped(),
            "acquisition thread ended"
        );
    })
}
