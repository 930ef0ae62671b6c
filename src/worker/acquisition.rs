//! RFID acquisition worker.
//!
//! One cycle: `POLL_LINK → DRAIN_BITS → ENCODE (or skip) → SLEEP`.
//!
//! Bits are drained into the packer every cycle regardless of framing. In
//! [`FramingMode::Settled`] the packed run is held across cycles and only
//! emitted once the decoder reports the packet settled; in
//! [`FramingMode::Eager`] whatever one cycle drained is emitted at once.

use core::time::Duration;

use log::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{FramingMode, MAX_MESSAGE_SIZE, ReaderConfig};
use crate::error::{LinkError, MessageError};
use crate::feedback::{DropReason, ReaderEvent};
use crate::link::Link;
use crate::message::{Message, OutboundTx};
use crate::wiegand::hex::{HexPacker, drain_available};
use crate::wiegand::{WiegandDecoder, WiegandLines};

use super::WorkerContext;

/// What one `run_cycle` did with the captured bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing captured, or a packet encoded to zero length.
    Idle,
    /// Bits are buffered but the packet has not settled yet.
    Pending { bits: u32 },
    /// A packet was encoded and handed to the publisher.
    Queued { bits: u32, len: usize },
    /// A packet was encoded but the outbound channel stayed full.
    Dropped { bits: u32 },
}

/// Result of the non-blocking inbound check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPoll {
    /// Someone else holds the connection lock; read skipped.
    Busy,
    /// Lock taken, no link attached.
    Absent,
    NoData,
    Received(usize),
}

pub struct AcquisitionWorker<'a, L, C: Clock> {
    decoder: WiegandDecoder<'a, C>,
    packer: HexPacker,
    framing: FramingMode,
    outbound: OutboundTx<'a>,
    ctx: WorkerContext<'a, L>,
    send_timeout: Duration,
    poll_interval: Duration,
    inbound: [u8; MAX_MESSAGE_SIZE],
}

impl<'a, L: Link, C: Clock> AcquisitionWorker<'a, L, C> {
    pub fn new(
        lines: &'a WiegandLines,
        clock: C,
        config: &ReaderConfig,
        outbound: OutboundTx<'a>,
        ctx: WorkerContext<'a, L>,
    ) -> Self {
        Self {
            decoder: WiegandDecoder::new(lines, clock, config.packet_gap_ms),
            packer: HexPacker::new(config.hex_case),
            framing: config.framing,
            outbound,
            ctx,
            send_timeout: Duration::from_millis(config.channel_timeout_ms.into()),
            poll_interval: Duration::from_millis(config.poll_interval_ms.into()),
            inbound: [0; MAX_MESSAGE_SIZE],
        }
    }

    /// Run forever at the configured cadence.
    pub fn run(mut self) -> ! {
        info!(target: "rfid_reader",
            "acquisition started (gap={}ms, poll={:?}, framing={:?})",
            self.decoder.packet_gap(), self.poll_interval, self.framing);
        loop {
            self.poll_link();
            self.run_cycle();
            self.ctx.feedback.tick(self.decoder.now_ms());
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Check the link for inbound bytes without ever waiting on the lock.
    /// The guard is dropped before anything is reported, and only a lock
    /// that was actually taken is released.
    pub fn poll_link(&mut self) -> LinkPoll {
        let read = {
            let Some(mut guard) = self.ctx.connection.try_lock() else {
                debug!(target: "rfid_reader", "link busy, skipping inbound read");
                return LinkPoll::Busy;
            };
            let Some(link) = guard.link_mut() else {
                return LinkPoll::Absent;
            };
            link.read(&mut self.inbound)
        };

        match read {
            Ok(0) | Err(LinkError::WouldBlock) => LinkPoll::NoData,
            Ok(n) => {
                info!(target: "rfid_reader", "host sent {} bytes: {:02X?}", n, &self.inbound[..n]);
                self.ctx.stats.record_inbound(n);
                self.ctx.feedback.notify(&ReaderEvent::InboundData(n));
                LinkPoll::Received(n)
            }
            Err(e) => {
                debug!(target: "rfid_reader", "inbound read failed: {}", e);
                LinkPoll::NoData
            }
        }
    }

    /// Drain queued bits and emit a packet if framing says one is complete.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let popped = drain_available(&mut self.decoder, &mut self.packer);
        if popped > 0 {
            self.ctx.stats.record_drained(popped);
        }

        let complete = match self.framing {
            // Checked after draining: a bit captured since the drain is
            // recent, so it holds settlement off until the next cycle.
            FramingMode::Settled => self.decoder.packet_settled(),
            FramingMode::Eager => popped > 0,
        };

        if !complete {
            return if self.packer.is_empty() {
                CycleOutcome::Idle
            } else {
                CycleOutcome::Pending { bits: self.packer.bits() }
            };
        }

        let outcome = self.emit_packet();
        self.decoder.clear();
        self.packer.reset();
        outcome
    }

    pub fn decoder(&self) -> &WiegandDecoder<'a, C> {
        &self.decoder
    }

    fn emit_packet(&mut self) -> CycleOutcome {
        let bits = self.packer.bits();
        let truncated = self.packer.truncated();
        if truncated > 0 {
            warn!(target: "rfid_reader", "packet capped at {} chars, {} bits discarded",
                MAX_MESSAGE_SIZE, truncated);
            self.ctx.stats.record_truncated(truncated);
        }

        let text = self.packer.finish();
        if text.is_empty() {
            debug!(target: "rfid_reader", "settled with no bits drained, nothing to send");
            return CycleOutcome::Idle;
        }

        let msg = match Message::from_slice(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(target: "rfid_reader", "could not build message: {}", e);
                self.ctx.stats.record_queue_drop();
                return CycleOutcome::Dropped { bits };
            }
        };
        let len = msg.len();

        info!(target: "rfid_reader", "card read: {} bits -> {}", bits, msg.as_str());
        self.ctx.stats.record_packet();
        self.ctx.feedback.notify(&ReaderEvent::PacketCaptured { bits, len });

        match self.outbound.send_timeout(msg, self.send_timeout) {
            Ok(()) => CycleOutcome::Queued { bits, len },
            Err(msg) => {
                warn!(target: "rfid_reader", "{}, dropping {}", MessageError::QueueFull, msg.as_str());
                self.ctx.stats.record_queue_drop();
                self.ctx.feedback.notify(&ReaderEvent::MessageDropped(DropReason::QueueFull));
                CycleOutcome::Dropped { bits }
            }
        }
    }
}
