//! Bit Channel: interrupt-to-worker handoff for captured bits.
//!
//! Lock-free SPSC ring. The two line ISRs are the producer (they are
//! dispatched one at a time by the GPIO ISR service, so there is only ever
//! one writer); the acquisition worker's decoder is the only consumer.
//!
//! Each slot holds one [`BitSample`]: the bit and its capture time, packed
//! into a single `AtomicU32` as `bit << 24 | ms mod 2^24`. The stamp uses
//! the same 24-bit domain as the Packet Capture State, so the decoder can
//! measure the silence between any two queued bits.
//!
//! `push` never blocks and never allocates. When the ring is full the new
//! sample is dropped and counted; that is data loss, not a fault.
//!
//! Head and tail are free-running counters; the slot index is the counter
//! modulo `N`, so the full capacity `N` is usable.

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use super::capture::TS_MASK;

/// One captured Wiegand bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bit {
    Zero = 0,
    One = 1,
}

impl Bit {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<bool> for Bit {
    fn from(high: bool) -> Self {
        if high { Self::One } else { Self::Zero }
    }
}

/// A bit together with the time its edge was seen (ms, 24-bit domain).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSample {
    pub bit: Bit,
    pub at_ms: u32,
}

impl BitSample {
    pub const fn new(bit: Bit, at_ms: u32) -> Self {
        Self {
            bit,
            at_ms: at_ms & TS_MASK,
        }
    }

    const fn pack(self) -> u32 {
        ((self.bit as u32) << 24) | self.at_ms
    }

    const fn unpack(raw: u32) -> Self {
        let bit = if raw >> 24 == 0 { Bit::Zero } else { Bit::One };
        Self {
            bit,
            at_ms: raw & TS_MASK,
        }
    }
}

pub struct BitChannel<const N: usize> {
    slots: [AtomicU32; N],
    head: AtomicUsize,
    tail: AtomicUsize,
    dropped: AtomicU32,
}

impl<const N: usize> BitChannel<N> {
    pub const fn new() -> Self {
        assert!(N > 0, "BitChannel capacity must be non-zero");
        Self {
            slots: [const { AtomicU32::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue a sample. Producer side only (ISR context).
    /// Returns `false` if the ring was full and the sample was dropped.
    pub fn push(&self, sample: BitSample) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head.wrapping_sub(tail) >= N {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        self.slots[head % N].store(sample.pack(), Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Dequeue the oldest sample, if any. Consumer side only. Never waits.
    pub fn pop(&self) -> Option<BitSample> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail == head {
            return None;
        }

        let raw = self.slots[tail % N].load(Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(BitSample::unpack(raw))
    }

    /// Number of bits waiting.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bits dropped because the ring was full, since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for BitChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}
