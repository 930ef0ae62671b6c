//! Reader events and the feedback port.
//!
//! Workers report what happened through [`FeedbackSink`]; what the user sees
//! or hears (LED colour, buzzer) is up to the implementation. Notification
//! must not block: the acquisition worker calls it inline between drains.

use log::{Level, log};

use crate::error::LinkError;

/// Why an outbound message never reached the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Outbound channel stayed full for the whole enqueue timeout.
    QueueFull,
    /// Publisher could not take the connection lock in time.
    LockTimeout,
    /// No link attached when the publisher got the lock.
    NotConnected,
}

/// Things the workers report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderEvent {
    /// A settled packet was encoded and queued.
    PacketCaptured { bits: u32, len: usize },
    /// A message was written to the link in full.
    MessageSent { len: usize },
    MessageDropped(DropReason),
    /// The link rejected a write part-way through.
    WriteFailed(LinkError),
    /// Bytes arrived from the host while polling the link.
    InboundData(usize),
}

/// Sink for [`ReaderEvent`]s. Shared by both workers.
pub trait FeedbackSink: Sync {
    fn notify(&self, event: &ReaderEvent);

    /// Advance time-based effects (buzzer hold and similar). Called once per
    /// acquisition cycle.
    fn tick(&self, _now_ms: u32) {}
}

impl<A: FeedbackSink, B: FeedbackSink> FeedbackSink for (A, B) {
    fn notify(&self, event: &ReaderEvent) {
        self.0.notify(event);
        self.1.notify(event);
    }

    fn tick(&self, now_ms: u32) {
        self.0.tick(now_ms);
        self.1.tick(now_ms);
    }
}

/// Writes every event to the serial console.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl LogFeedback {
    /// Level and log target an event is written under. Losses and faults
    /// are warnings; a queue drop belongs to the reader side.
    pub fn route(event: &ReaderEvent) -> (Level, &'static str) {
        match event {
            ReaderEvent::PacketCaptured { .. } | ReaderEvent::InboundData(_) => {
                (Level::Info, "rfid_reader")
            }
            ReaderEvent::MessageDropped(DropReason::QueueFull) => (Level::Warn, "rfid_reader"),
            ReaderEvent::MessageSent { .. } => (Level::Info, "publisher"),
            ReaderEvent::MessageDropped(_) | ReaderEvent::WriteFailed(_) => {
                (Level::Warn, "publisher")
            }
        }
    }
}

impl FeedbackSink for LogFeedback {
    fn notify(&self, event: &ReaderEvent) {
        let (level, target) = Self::route(event);
        match event {
            ReaderEvent::PacketCaptured { bits, len } => {
                log!(target: target, level, "CARD | {} bits -> {} chars", bits, len);
            }
            ReaderEvent::MessageSent { len } => {
                log!(target: target, level, "SENT | {} bytes", len);
            }
            ReaderEvent::MessageDropped(reason) => {
                log!(target: target, level, "DROP | {:?}", reason);
            }
            ReaderEvent::WriteFailed(err) => {
                log!(target: target, level, "FAULT | write failed: {}", err);
            }
            ReaderEvent::InboundData(n) => {
                log!(target: target, level, "RECV | {} bytes from host", n);
            }
        }
    }
}
