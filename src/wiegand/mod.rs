//! Wiegand capture and framing.
//!
//! ```text
//! ┌─────────────┐  edge   ┌──────────────┐  pop   ┌───────────────┐
//! │ D0 / D1 ISR │───────▶│ WiegandLines │──────▶│ WiegandDecoder │──▶ HexPacker
//! │ (falling)   │         │ bits+capture │        │ settle rule    │
//! └─────────────┘         └──────────────┘        └───────────────┘
//! ```
//!
//! [`WiegandLines`] is the only state the interrupt path touches. It is
//! owned by `main` (as a `static`) and handed by reference both to the ISR
//! registration in `drivers::hw_init` and to the decoder, so there is one
//! writer (the ISRs) and one reader (the acquisition worker).
//!
//! Framing rule: a packet is complete once no bit has been captured for more
//! than `packet_gap` ms, provided at least one bit has arrived since the
//! last clear. The same rule splits a batch of queued bits: a sample whose
//! stamp trails the previous bit by more than `packet_gap` ms belongs to the
//! next packet, even if both cards were queued before the worker woke up.

pub mod capture;
pub mod channel;
pub mod hex;

use log::debug;

use crate::clock::Clock;
use crate::config::BIT_CHANNEL_CAPACITY;

use capture::{CaptureState, elapsed_ms};
pub use channel::{Bit, BitChannel, BitSample};

/// Which reader data line fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Data0,
    Data1,
}

impl Line {
    pub const fn bit(self) -> Bit {
        match self {
            Self::Data0 => Bit::Zero,
            Self::Data1 => Bit::One,
        }
    }
}

/// ISR-shared capture state: the Bit Channel plus the Packet Capture State.
pub struct WiegandLines {
    bits: BitChannel<BIT_CHANNEL_CAPACITY>,
    capture: CaptureState,
}

impl WiegandLines {
    pub const fn new() -> Self {
        Self {
            bits: BitChannel::new(),
            capture: CaptureState::new(),
        }
    }

    /// ISR entry point for a falling edge on either data line.
    ///
    /// Timestamp and count are advanced first, then the bit is enqueued.
    /// Never blocks, never allocates, never logs. A full channel drops the
    /// bit (counted in [`dropped_bits`](Self::dropped_bits)).
    pub fn on_falling_edge(&self, line: Line, now_ms: u32) {
        self.capture.record(now_ms);
        let _ = self.bits.push(BitSample::new(line.bit(), now_ms));
    }

    /// Bits lost to a full channel since boot.
    pub fn dropped_bits(&self) -> u32 {
        self.bits.dropped()
    }

    /// Bits waiting to be drained.
    pub fn queued_bits(&self) -> usize {
        self.bits.len()
    }
}

impl Default for WiegandLines {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side of the capture path. Owned by the acquisition worker.
pub struct WiegandDecoder<'a, C: Clock> {
    lines: &'a WiegandLines,
    clock: C,
    packet_gap_ms: u32,
    /// Count observed by the last positive `packet_settled()`.
    settled_count: Option<u32>,
    /// First sample of the next packet, popped but not yet handed out.
    held: Option<BitSample>,
    /// Stamp of the last bit handed out for the current packet.
    last_bit_ms: Option<u32>,
    /// Bits handed out for the current packet.
    packet_bits: u32,
}

impl<'a, C: Clock> WiegandDecoder<'a, C> {
    /// Attach to the shared lines and start framing from "now".
    pub fn new(lines: &'a WiegandLines, clock: C, packet_gap_ms: u32) -> Self {
        lines.capture.clear(clock.now_ms());
        Self {
            lines,
            clock,
            packet_gap_ms,
            settled_count: None,
            held: None,
            last_bit_ms: None,
            packet_bits: 0,
        }
    }

    /// Pop the next bit of the current packet.
    ///
    /// Returns `None` when nothing is queued, or when the next queued bit
    /// was captured more than `packet_gap` ms after the previous one. That
    /// bit is held back and opens the next packet after `clear()`.
    pub fn bit_available(&mut self) -> Option<Bit> {
        let (sample, was_held) = match self.held.take() {
            Some(sample) => (sample, true),
            None => (self.lines.bits.pop()?, false),
        };

        if let Some(prev) = self.last_bit_ms {
            let gap = elapsed_ms(prev, sample.at_ms);
            if gap > self.packet_gap_ms {
                if !was_held {
                    debug!(target: "wiegand", "{} ms gap inside queued bits, closing packet", gap);
                }
                self.held = Some(sample);
                return None;
            }
        }

        self.last_bit_ms = Some(sample.at_ms);
        self.packet_bits += 1;
        Some(sample.bit)
    }

    /// True iff the current packet is complete: either a queued bit was
    /// found past a `packet_gap` silence, or at least one bit arrived since
    /// the last clear and the line has been quiet for more than `packet_gap`
    /// ms. Consumes nothing.
    pub fn packet_settled(&mut self) -> bool {
        if self.held.is_some() && self.packet_bits > 0 {
            self.settled_count = Some(self.packet_bits);
            return true;
        }

        let snap = self.lines.capture.snapshot();
        let settled = snap.count > 0
            && elapsed_ms(snap.last_ms, self.clock.now_ms()) > self.packet_gap_ms;
        self.settled_count = settled.then_some(snap.count);
        settled
    }

    /// Start framing the next packet: count to zero, timestamp to now.
    ///
    /// After a positive `packet_settled()` only the bits that check saw are
    /// released, so an edge landing between the check and this call still
    /// counts toward the next packet. A held sample stays queued first.
    pub fn clear(&mut self) {
        self.last_bit_ms = None;
        self.packet_bits = 0;
        let now = self.clock.now_ms();
        match self.settled_count.take() {
            Some(consumed) => self.lines.capture.release(consumed, now),
            None => self.lines.capture.clear(now),
        }
    }

    /// Bits captured since the last clear (diagnostics).
    pub fn bit_count(&self) -> u32 {
        self.lines.capture.snapshot().count
    }

    /// Whether any bit has been captured since the last clear.
    pub fn bits_received(&self) -> bool {
        self.bit_count() > 0
    }

    pub fn packet_gap(&self) -> u32 {
        self.packet_gap_ms
    }

    /// "Now" on the framing time base.
    pub fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }

    pub fn lines(&self) -> &'a WiegandLines {
        self.lines
    }
}
