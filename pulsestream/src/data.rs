use std::time::Instant;

/// One decoded interval with its host arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Interval between two qualifying pulses, in microseconds
    pub delta_us: u32,
    /// Monotonic host time the value left the decoder
    pub arrival: Instant,
}

/// Samples drained in one dispatch tick, in arrival order.
pub type Batch = Vec<Sample>;

/// What the pipeline hands to its consumer.
#[derive(Debug)]
pub enum StreamMessage {
    /// All samples that arrived since the previous tick, in order.
    /// Ticks with nothing queued deliver no message.
    Batch(Batch),
    /// The transport failed; acquisition has ended for this session.
    /// Reconnecting is the embedding application's decision.
    ConnectionLost,
}
