//! Per-tick output boundary.
//!
//! The loop emits one `ControlRecord` per tick and never reads it back.
//! Sinks must not exert backpressure: a slow consumer costs records, never
//! tick deadline.

use crossbeam_channel as xch;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// One tick's worth of observable state, ordered by tick index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRecord {
    /// Seconds since loop start (nominal tick time).
    pub t: f64,
    /// Joint angle (rad).
    pub position: f64,
    /// Joint velocity (rad/s).
    pub velocity: f64,
    /// Offset-corrected, filtered torque (Nm).
    pub filtered_torque: f64,
    /// Velocity actually sent to the actuator, after the safety clamp (rad/s).
    pub commanded_velocity: f64,
}

/// Output boundary for downstream plotting/logging. `push` must return
/// promptly; buffering and drop policy are the sink's concern.
pub trait SampleSink: Send + Sync {
    fn push(&self, record: ControlRecord);
}

/// Receiving end paired with a [`ChannelSink`].
pub type RecordReceiver = xch::Receiver<ControlRecord>;

/// Bounded channel sink: drops the newest record when the consumer lags,
/// counting what was lost.
pub struct ChannelSink {
    tx: xch::Sender<ControlRecord>,
    dropped: AtomicU64,
}

impl ChannelSink {
    pub fn bounded(capacity: usize) -> (Self, xch::Receiver<ControlRecord>) {
        let (tx, rx) = xch::bounded(capacity);
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Records lost to a full buffer or a departed consumer.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl SampleSink for ChannelSink {
    fn push(&self, record: ControlRecord) {
        if self.tx.try_send(record).is_err() {
            let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if n.is_power_of_two() {
                tracing::warn!(dropped = n, "record consumer lagging, dropping samples");
            }
        }
    }
}

/// In-memory sink for tests and short runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ControlRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<ControlRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleSink for MemorySink {
    fn push(&self, record: ControlRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

/// Discards everything.
pub struct NullSink;

impl SampleSink for NullSink {
    fn push(&self, _record: ControlRecord) {}
}
