//! Packet Capture State: bit count and last-bit timestamp as one atomic.
//!
//! Both fields live in a single `AtomicU32` so the framing check never sees
//! a count from one edge paired with the timestamp of another. ESP32 Xtensa
//! has no 64-bit atomics, so the packing is:
//!
//! ```text
//!  31        24 23                                 0
//! ┌────────────┬────────────────────────────────────┐
//! │ count (8b) │ last bit time, ms mod 2^24 (24b)   │
//! └────────────┴────────────────────────────────────┘
//! ```
//!
//! The count saturates at 255, well above the widest packet. The 24-bit
//! timestamp wraps every ~4.6 h; elapsed time is computed modulo 2^24, which
//! is exact for any gap shorter than that.

use core::sync::atomic::{AtomicU32, Ordering};

const TS_BITS: u32 = 24;
pub(crate) const TS_MASK: u32 = (1 << TS_BITS) - 1;
const COUNT_MAX: u32 = 0xFF;

const fn pack(count: u32, now_ms: u32) -> u32 {
    (count << TS_BITS) | (now_ms & TS_MASK)
}

const fn count_of(state: u32) -> u32 {
    state >> TS_BITS
}

const fn stamp_of(state: u32) -> u32 {
    state & TS_MASK
}

/// Milliseconds from `since` to `now`, both reduced to the 24-bit domain.
pub const fn elapsed_ms(since: u32, now_ms: u32) -> u32 {
    (now_ms & TS_MASK).wrapping_sub(since) & TS_MASK
}

/// Point-in-time copy of the capture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSnapshot {
    /// Bits captured since the last clear (saturating at 255).
    pub count: u32,
    /// Timestamp of the last captured bit (or of the last clear), 24-bit ms.
    pub last_ms: u32,
}

pub struct CaptureState {
    packed: AtomicU32,
}

impl CaptureState {
    pub const fn new() -> Self {
        Self {
            packed: AtomicU32::new(0),
        }
    }

    /// Count one captured bit at `now_ms`. ISR context; a short CAS loop,
    /// contended only by `release`/`clear` on the worker side.
    pub fn record(&self, now_ms: u32) {
        let _ = self
            .packed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                let count = (count_of(state) + 1).min(COUNT_MAX);
                Some(pack(count, now_ms))
            });
    }

    /// Unconditional reset: count 0, timestamp `now_ms`.
    pub fn clear(&self, now_ms: u32) {
        self.packed.store(pack(0, now_ms), Ordering::Release);
    }

    /// Remove `consumed` bits from the count. If nothing newer was captured
    /// the result equals `clear(now_ms)`; bits that landed after the caller
    /// observed its snapshot survive together with their timestamp.
    pub fn release(&self, consumed: u32, now_ms: u32) {
        let _ = self
            .packed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                let remaining = count_of(state).saturating_sub(consumed);
                if remaining == 0 {
                    Some(pack(0, now_ms))
                } else {
                    Some(pack(remaining, stamp_of(state)))
                }
            });
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        let state = self.packed.load(Ordering::Acquire);
        CaptureSnapshot {
            count: count_of(state),
            last_ms: stamp_of(state),
        }
    }
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::new()
    }
}
