//! Telemetry sinks for per-tick records
//!
//! Recording never blocks the control tick. The channel sink drops records
//! when its consumer falls behind and counts what it dropped.

use crate::messages::TickRecord;
use fieldnav_core::communication::Link;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Consumer of per-tick records
pub trait TelemetrySink: Send {
    fn record(&mut self, record: &TickRecord);

    fn flush(&mut self) {}
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn record(&mut self, _record: &TickRecord) {}
}

/// Forwards records over a bounded link to another thread
#[derive(Debug)]
pub struct ChannelTelemetry {
    link: Link<TickRecord>,
    dropped: u64,
}

impl ChannelTelemetry {
    /// Wrap the producer end of a link
    pub fn new(link: Link<TickRecord>) -> Self {
        Self { link, dropped: 0 }
    }

    /// Sink plus the consumer end it feeds
    pub fn channel(capacity: usize) -> (Self, Link<TickRecord>) {
        let (tx, rx) = Link::pair("telemetry", capacity);
        (Self::new(tx), rx)
    }

    /// Records lost because the link was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl TelemetrySink for ChannelTelemetry {
    fn record(&mut self, record: &TickRecord) {
        if self.link.send(record.clone(), None).is_err() {
            self.dropped += 1;
            if self.dropped == 1 || self.dropped % 100 == 0 {
                warn!(
                    topic = self.link.topic(),
                    dropped = self.dropped,
                    "telemetry consumer is not keeping up"
                );
            }
        }
    }
}

/// Keeps every record in shared memory, for tests and offline analysis
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    records: Arc<Mutex<Vec<TickRecord>>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that stays readable after the sink moves into a node
    pub fn handle(&self) -> Arc<Mutex<Vec<TickRecord>>> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn record(&mut self, record: &TickRecord) {
        self.records.lock().push(record.clone());
    }
}
