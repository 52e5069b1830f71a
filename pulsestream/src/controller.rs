//! Pipeline assembly and the dispatch loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use pulsetools::cfg::Session;

use crate::data::StreamMessage;
use crate::diag::{Counters, Diagnostics};
use crate::queue::AcquisitionQueue;
use crate::transport::Transport;
use crate::{acquisition, timer, Event};

/// Handle to a running acquisition pipeline.
///
/// Owns the acquisition and dispatch threads. Batches and connection
/// events arrive on the consumer channel passed to [`Pipeline::start`];
/// end-to-end, samples are delivered in firmware emission order.
pub struct Pipeline {
    ctrl: flume::Sender<Event>,
    stop: Arc<AtomicBool>,
    queue: Arc<AcquisitionQueue>,
    counters: Arc<Counters>,
    acquisition: Option<JoinHandle<()>>,
    dispatch: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Start acquiring over `transport`, delivering to `tx` on the
    /// session's dispatch interval.
    pub fn start(
        session: &Session,
        transport: Box<dyn Transport>,
        tx: flume::Sender<StreamMessage>,
    ) -> Pipeline {
        let queue = Arc::new(AcquisitionQueue::new(session.queue_cap));
        let counters = Arc::new(Counters::default());
        let stop = Arc::new(AtomicBool::new(false));

        let acquisition = acquisition::spawn(
            transport,
            queue.clone(),
            counters.clone(),
            stop.clone(),
            tx.clone(),
        );

        let (tx_ctrl, rx_ctrl) = flume::unbounded();
        timer::spawn(session.dispatch_interval, tx_ctrl.clone());
        let dispatch = dispatch(rx_ctrl, queue.clone(), tx);

        Pipeline {
            ctrl: tx_ctrl,
            stop,
            queue,
            counters,
            acquisition: Some(acquisition),
            dispatch: Some(dispatch),
        }
    }

    /// Stop delivering batches. Samples keep queueing while paused.
    pub fn pause(&self) {
        let _ = self.ctrl.send(Event::Pause);
    }

    /// Resume delivery; the next tick drains everything queued meanwhile.
    pub fn resume(&self) {
        let _ = self.ctrl.send(Event::Resume);
    }

    /// Cooperatively stop both threads and wait for them. The
    /// acquisition thread unblocks within one read timeout.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.ctrl.send(Event::Stop);
        if let Some(handle) = self.acquisition.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.dispatch.take() {
            let _ = handle.join();
        }
    }

    /// Snapshot of the pipeline counters.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            frames_decoded: self.counters.frames_decoded.load(Ordering::Relaxed),
            frames_dropped: self.counters.frames_dropped.load(Ordering::Relaxed),
            samples_dropped: self.queue.dropped(),
            queue_depth: self.queue.len(),
        }
    }
}

/// Dispatch loop: one atomic drain per tick, delivered as one batch.
/// Ticks with nothing queued deliver nothing.
fn dispatch(
    rx: flume::Receiver<Event>,
    queue: Arc<AcquisitionQueue>,
    tx: flume::Sender<StreamMessage>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut paused = false;
        loop {
            match rx.recv() {
                Ok(Event::Tick) => {
                    if paused {
                        continue;
                    }
                    let batch = queue.drain_all();
                    if batch.is_empty() {
                        continue;
                    }
                    tracing::trace!(samples = batch.len(), "dispatching batch");
                    if tx.send(StreamMessage::Batch(batch)).is_err() {
                        // Consumer went away.
                        break;
                    }
                }
                Ok(Event::Pause) => paused = true,
                Ok(Event::Resume) => paused = false,
                Ok(Event::Stop) | Err(_) => break,
            }
        }
        // Dropping the receiver here ends the timer thread on its next
        // send.
    })
}
