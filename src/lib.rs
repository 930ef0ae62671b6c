//! Wiegand badge-reader relay firmware library.
//!
//! Exposes the capture, framing, and relay logic for host-side testing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, with simulation twins for the host.

#![deny(unused_must_use)]

pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod feedback;
pub mod link;
pub mod message;
pub mod pins;
pub mod wiegand;
pub mod worker;

pub mod adapters;
pub mod drivers;

mod esp_link_shims;
