//! Runtime counters and diagnostics.
//!
//! Both workers bump counters in one shared [`ReaderStats`]; the main task
//! logs a [`StatsSnapshot`] periodically. Counters are relaxed atomics:
//! each is independent and only ever read for reporting.
//!
//! Heap figures are collected on demand, as real values on target and
//! synthetic ones in simulation.

use core::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Shared counters. One instance, `static` in `main`.
#[derive(Debug, Default)]
pub struct ReaderStats {
    bits_drained: AtomicU32,
    bits_truncated: AtomicU32,
    packets_emitted: AtomicU32,
    queue_drops: AtomicU32,
    messages_sent: AtomicU32,
    bytes_sent: AtomicU32,
    write_faults: AtomicU32,
    link_absent_drops: AtomicU32,
    lock_timeouts: AtomicU32,
    inbound_bytes: AtomicU32,
}

fn bump(counter: &AtomicU32, by: u32) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl ReaderStats {
    pub const fn new() -> Self {
        Self {
            bits_drained: AtomicU32::new(0),
            bits_truncated: AtomicU32::new(0),
            packets_emitted: AtomicU32::new(0),
            queue_drops: AtomicU32::new(0),
            messages_sent: AtomicU32::new(0),
            bytes_sent: AtomicU32::new(0),
            write_faults: AtomicU32::new(0),
            link_absent_drops: AtomicU32::new(0),
            lock_timeouts: AtomicU32::new(0),
            inbound_bytes: AtomicU32::new(0),
        }
    }

    pub fn record_drained(&self, bits: u32) {
        bump(&self.bits_drained, bits);
    }

    pub fn record_truncated(&self, bits: u32) {
        bump(&self.bits_truncated, bits);
    }

    pub fn record_packet(&self) {
        bump(&self.packets_emitted, 1);
    }

    pub fn record_queue_drop(&self) {
        bump(&self.queue_drops, 1);
    }

    pub fn record_sent(&self, bytes: usize) {
        bump(&self.messages_sent, 1);
        bump(&self.bytes_sent, bytes as u32);
    }

    pub fn record_write_fault(&self) {
        bump(&self.write_faults, 1);
    }

    pub fn record_link_absent(&self) {
        bump(&self.link_absent_drops, 1);
    }

    pub fn record_lock_timeout(&self) {
        bump(&self.lock_timeouts, 1);
    }

    pub fn record_inbound(&self, bytes: usize) {
        bump(&self.inbound_bytes, bytes as u32);
    }

    /// Copy out every counter. `bits_dropped` comes from the Bit Channel,
    /// which keeps its own count because the ISR is the only writer.
    pub fn snapshot(&self, bits_dropped: u32) -> StatsSnapshot {
        let get = |c: &AtomicU32| c.load(Ordering::Relaxed);
        StatsSnapshot {
            bits_dropped,
            bits_drained: get(&self.bits_drained),
            bits_truncated: get(&self.bits_truncated),
            packets_emitted: get(&self.packets_emitted),
            queue_drops: get(&self.queue_drops),
            messages_sent: get(&self.messages_sent),
            bytes_sent: get(&self.bytes_sent),
            write_faults: get(&self.write_faults),
            link_absent_drops: get(&self.link_absent_drops),
            lock_timeouts: get(&self.lock_timeouts),
            inbound_bytes: get(&self.inbound_bytes),
        }
    }
}

/// Point-in-time copy of [`ReaderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub bits_dropped: u32,
    pub bits_drained: u32,
    pub bits_truncated: u32,
    pub packets_emitted: u32,
    pub queue_drops: u32,
    pub messages_sent: u32,
    pub bytes_sent: u32,
    pub write_faults: u32,
    pub link_absent_drops: u32,
    pub lock_timeouts: u32,
    pub inbound_bytes: u32,
}

impl StatsSnapshot {
    /// Messages that were encoded but never written in full.
    pub fn messages_lost(&self) -> u32 {
        self.queue_drops + self.write_faults + self.link_absent_drops + self.lock_timeouts
    }
}

/// Heap usage collected on demand.
#[derive(Debug, Clone, Copy)]
pub struct HeapMetrics {
    pub free: u32,
    pub min_free: u32,
}

impl HeapMetrics {
    #[cfg(target_os = "espidf")]
    pub fn collect() -> Self {
        use esp_idf_svc::sys::*;
        // SAFETY: plain reads of allocator statistics.
        let free = unsafe { esp_get_free_heap_size() };
        let min_free = unsafe { esp_get_minimum_free_heap_size() };
        Self { free, min_free }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn collect() -> Self {
        // Roughly what an ESP32 has left with Bluetooth Classic up.
        Self {
            free: 112_640,
            min_free: 98_304,
        }
    }
}

/// Install a panic hook that logs the reason before the default abort.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };

        match info.location() {
            Some(loc) => log::error!("PANIC: {} at {}:{}", reason, loc.file(), loc.line()),
            None => log::error!("PANIC: {}", reason),
        }
    }));
}
