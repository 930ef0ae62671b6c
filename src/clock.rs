//! Monotonic millisecond clock.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer. Safe to call from ISR context.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` measured from a
//!   process-wide epoch, for host-side testing and simulation.
//!
//! The line ISRs and the decoder must read the same time base, so both go
//! through [`uptime_ms`].

/// Source of "now" for the framing check.
pub trait Clock {
    /// Milliseconds since boot, truncated to `u32`.
    fn now_ms(&self) -> u32;
}

/// Milliseconds since boot (monotonic, wraps at `u32::MAX`).
#[cfg(target_os = "espidf")]
pub fn uptime_ms() -> u32 {
    // SAFETY: esp_timer_get_time is a read of the RTC-backed system timer;
    // safe from task and ISR context.
    ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1_000) as u32
}

/// Milliseconds since first use (monotonic, wraps at `u32::MAX`).
#[cfg(not(target_os = "espidf"))]
pub fn uptime_ms() -> u32 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_millis() as u32
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        uptime_ms()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
