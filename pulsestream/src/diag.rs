use std::sync::atomic::AtomicU64;

/// Decoder counters shared between the acquisition thread and the
/// pipeline handle.
#[derive(Debug, Default)]
pub struct Counters {
    pub frames_decoded: AtomicU64,
    pub frames_dropped: AtomicU64,
}

/// Point-in-time snapshot of the pipeline's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diagnostics {
    /// Frames decoded from the byte stream
    pub frames_decoded: u64,
    /// Malformed frames discarded by the decoder's resync
    pub frames_dropped: u64,
    /// Samples discarded by a capped queue's overflow policy
    pub samples_dropped: u64,
    /// Samples currently waiting for the next dispatch tick
    pub queue_depth: usize,
}
