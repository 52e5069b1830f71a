use std::time::{Duration, Instant};

use crate::Event;

/// Tick source for the dispatch loop, compensating for drift against the
/// last tick. The thread ends when the dispatcher drops its receiver.
pub fn spawn(period: Duration, tx: flume::Sender<Event>) {
    std::thread::spawn(move || {
        let mut last_tick = Instant::now();
        loop {
            std::thread::sleep(
                period
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or_else(|| Duration::from_secs(0)),
            );
            match tx.send(Event::Tick) {
                Ok(()) => last_tick = Instant::now(),
                Err(_) => break,
            }
        }
    });
}
