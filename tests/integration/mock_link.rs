//! Mock link, clock, and feedback sink for integration tests.
//!
//! `MockLink` records every byte written so tests can assert on exactly
//! what reached the host, and can be told to write in small chunks, fail,
//! or stall mid-write.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rfid_relay::clock::Clock;
use rfid_relay::config::ReaderConfig;
use rfid_relay::diagnostics::ReaderStats;
use rfid_relay::error::LinkError;
use rfid_relay::feedback::{FeedbackSink, ReaderEvent};
use rfid_relay::link::{ConnectionRecord, Link};
use rfid_relay::message::OutboundChannel;
use rfid_relay::wiegand::{Line, WiegandLines};
use rfid_relay::worker::{AcquisitionWorker, PublisherWorker, WorkerContext};

// ── Link ──────────────────────────────────────────────────────

/// State the test keeps after the link is handed to the record.
#[derive(Default)]
pub struct Wire {
    pub sent: Mutex<Vec<u8>>,
    pub inbound: Mutex<Vec<u8>>,
    pub write_calls: AtomicU32,
    /// Fail this many upcoming write calls.
    pub fail_writes: AtomicU32,
    /// Set while a write call is stalled.
    pub in_write: AtomicBool,
}

impl Wire {
    pub fn sent_text(&self) -> String {
        String::from_utf8(self.sent.lock().unwrap().clone()).unwrap()
    }
}

pub struct MockLink {
    pub wire: Arc<Wire>,
    /// Max bytes accepted per write call.
    pub chunk: usize,
    /// Time each write call stalls while holding the record lock.
    pub stall: Duration,
}

impl MockLink {
    pub fn new(wire: Arc<Wire>) -> Self {
        Self {
            wire,
            chunk: usize::MAX,
            stall: Duration::ZERO,
        }
    }
}

impl Link for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let mut inbound = self.wire.inbound.lock().unwrap();
        if inbound.is_empty() {
            return Err(LinkError::WouldBlock);
        }
        let n = inbound.len().min(buf.len());
        buf[..n].copy_from_slice(&inbound[..n]);
        inbound.drain(..n);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        self.wire.write_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .wire
            .fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(LinkError::Io(104));
        }
        if !self.stall.is_zero() {
            self.wire.in_write.store(true, Ordering::SeqCst);
            std::thread::sleep(self.stall);
            self.wire.in_write.store(false, Ordering::SeqCst);
        }
        let n = data.len().min(self.chunk);
        self.wire.sent.lock().unwrap().extend_from_slice(&data[..n]);
        Ok(n)
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Hand-advanced clock, shareable across threads.
#[derive(Default)]
pub struct TestClock(AtomicU32);

#[allow(dead_code)]
impl TestClock {
    pub fn set(&self, ms: u32) {
        self.0.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u32) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Feedback ──────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingFeedback {
    pub events: Mutex<Vec<ReaderEvent>>,
}

#[allow(dead_code)]
impl RecordingFeedback {
    pub fn events(&self) -> Vec<ReaderEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl FeedbackSink for RecordingFeedback {
    fn notify(&self, event: &ReaderEvent) {
        self.events.lock().unwrap().push(*event);
    }
}

// ── Bench ─────────────────────────────────────────────────────

/// Everything `main` would hold as statics, owned by one test.
pub struct Bench {
    pub lines: WiegandLines,
    pub clock: TestClock,
    pub outbound: OutboundChannel,
    pub connection: ConnectionRecord<MockLink>,
    pub feedback: RecordingFeedback,
    pub stats: ReaderStats,
    pub config: ReaderConfig,
}

#[allow(dead_code)]
impl Bench {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            lines: WiegandLines::new(),
            clock: TestClock::default(),
            outbound: OutboundChannel::new(),
            connection: ConnectionRecord::new(),
            feedback: RecordingFeedback::default(),
            stats: ReaderStats::new(),
            config,
        }
    }

    /// Short timeouts so idle cycles don't slow the suite down.
    pub fn fast_config() -> ReaderConfig {
        ReaderConfig {
            channel_timeout_ms: 2,
            lock_timeout_ms: 50,
            lock_backoff_max_ms: 4,
            ..ReaderConfig::default()
        }
    }

    pub fn connect(&self) -> Arc<Wire> {
        let wire = Arc::new(Wire::default());
        self.connection.establish(MockLink::new(wire.clone()));
        wire
    }

    pub fn workers(
        &self,
    ) -> (
        AcquisitionWorker<'_, MockLink, &TestClock>,
        PublisherWorker<'_, MockLink>,
    ) {
        let (tx, rx) = self.outbound.split().expect("bench split once");
        let ctx = WorkerContext {
            connection: &self.connection,
            feedback: &self.feedback,
            stats: &self.stats,
        };
        (
            AcquisitionWorker::new(&self.lines, &self.clock, &self.config, tx, ctx),
            PublisherWorker::new(&self.config, rx, ctx),
        )
    }

    /// Simulate the reader clocking out `bits`, 1 ms apart.
    pub fn present_card(&self, bits: &[u8]) {
        for &b in bits {
            let line = if b == 1 { Line::Data1 } else { Line::Data0 };
            self.lines.on_falling_edge(line, self.clock.now_ms());
            self.clock.advance(1);
        }
    }

    pub fn present_byte(&self, byte: u8) {
        let bits: Vec<u8> = (0..8).rev().map(|i| (byte >> i) & 1).collect();
        self.present_card(&bits);
    }

    /// Let the line go quiet long enough for the packet to settle.
    pub fn settle(&self) {
        self.clock.advance(self.config.packet_gap_ms + 1);
    }
}
