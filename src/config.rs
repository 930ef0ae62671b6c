//! Reader configuration parameters
//!
//! All tunable parameters for the badge-reader accessory. Built once in
//! `main()` and handed by reference to the pin setup and both workers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest message the link accepts in one send (bytes of hex text).
pub const MAX_MESSAGE_SIZE: usize = 100;

/// Bit Channel depth. Sized to the widest Wiegand packet expected.
pub const BIT_CHANNEL_CAPACITY: usize = 128;

/// Outbound message queue depth (card reads in flight to the publisher).
pub const OUTBOUND_DEPTH: usize = 16;

/// How a drained bit run becomes a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramingMode {
    /// Bits are drained every cycle but only emitted once the line has been
    /// quiet for `packet_gap_ms`. Partial packets carry over between cycles.
    Settled,
    /// Whatever was drained in one cycle is emitted immediately.
    Eager,
}

/// Case of the hex digits written to the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HexCase {
    Upper,
    Lower,
}

/// Core reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    // --- Pins ---
    /// Wiegand DATA0 line (falling edge = bit 0)
    pub pin_d0: i32,
    /// Wiegand DATA1 line (falling edge = bit 1)
    pub pin_d1: i32,
    /// Reader LED line (high = red, low = green)
    pub led_pin: i32,
    /// Reader buzzer line (active low)
    pub buzzer_pin: i32,

    // --- Capture ---
    /// Widest packet expected, in bits
    pub max_wiegand_bits: u16,
    /// Quiet time after the last bit that closes a packet (milliseconds)
    pub packet_gap_ms: u32,
    /// Packet boundary policy
    pub framing: FramingMode,
    /// Hex digit case on the wire
    pub hex_case: HexCase,

    // --- Timing ---
    /// Acquisition worker cadence (milliseconds)
    pub poll_interval_ms: u32,
    /// Bounded wait on outbound channel send/receive (milliseconds)
    pub channel_timeout_ms: u32,
    /// Publisher's total wait for the connection lock (milliseconds)
    pub lock_timeout_ms: u32,
    /// Upper bound of the lock retry backoff step (milliseconds)
    pub lock_backoff_max_ms: u32,
    /// How long the LED/buzzer hold a feedback state (milliseconds)
    pub feedback_hold_ms: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            // Pins
            pin_d0: crate::pins::WIEGAND_D0_GPIO,
            pin_d1: crate::pins::WIEGAND_D1_GPIO,
            led_pin: crate::pins::READER_LED_GPIO,
            buzzer_pin: crate::pins::READER_BUZZER_GPIO,

            // Capture
            max_wiegand_bits: BIT_CHANNEL_CAPACITY as u16,
            packet_gap_ms: 100,
            framing: FramingMode::Settled,
            hex_case: HexCase::Upper,

            // Timing
            poll_interval_ms: 250,
            channel_timeout_ms: 10,
            lock_timeout_ms: 1000,
            lock_backoff_max_ms: 8,
            feedback_hold_ms: 200,
        }
    }
}

impl ReaderConfig {
    /// Range-check every field. Rejects rather than clamps.
    pub fn validate(&self) -> Result<()> {
        if self.pin_d0 == self.pin_d1 {
            return Err(Error::Config("pin_d0 and pin_d1 must differ"));
        }
        if !(0..64).contains(&self.pin_d0) || !(0..64).contains(&self.pin_d1) {
            return Err(Error::Config("data pins must be GPIO 0-63"));
        }
        if self.max_wiegand_bits == 0 || self.max_wiegand_bits as usize > BIT_CHANNEL_CAPACITY {
            return Err(Error::Config("max_wiegand_bits must be 1-128"));
        }
        if !(10..=5_000).contains(&self.packet_gap_ms) {
            return Err(Error::Config("packet_gap_ms must be 10-5000"));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be non-zero"));
        }
        if self.channel_timeout_ms == 0 {
            return Err(Error::Config("channel_timeout_ms must be non-zero"));
        }
        if self.lock_backoff_max_ms == 0 || self.lock_backoff_max_ms > self.lock_timeout_ms {
            return Err(Error::Config("lock_backoff_max_ms must be 1..=lock_timeout_ms"));
        }
        Ok(())
    }

    /// Parse a JSON override. Missing fields are an error; the result is
    /// validated before it is returned.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|_| Error::Config("malformed config JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Build the runtime config: `overrides` (JSON) if given and valid,
    /// otherwise the defaults.
    pub fn load_or_default(overrides: Option<&str>) -> Self {
        let Some(text) = overrides else {
            return Self::default();
        };
        match Self::from_json(text) {
            Ok(config) => {
                log::info!("config: using build-time overrides");
                config
            }
            Err(e) => {
                log::warn!("config: overrides rejected ({}), using defaults", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = ReaderConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.packet_gap_ms, 100);
        assert_eq!(c.max_wiegand_bits, 128);
        assert_eq!(c.framing, FramingMode::Settled);
    }

    #[test]
    fn same_data_pins_rejected() {
        let c = ReaderConfig {
            pin_d1: 22,
            ..ReaderConfig::default()
        };
        assert_eq!(
            c.validate(),
            Err(Error::Config("pin_d0 and pin_d1 must differ"))
        );
    }

    #[test]
    fn oversized_packet_width_rejected() {
        let c = ReaderConfig {
            max_wiegand_bits: 200,
            ..ReaderConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn backoff_cannot_exceed_lock_timeout() {
        let c = ReaderConfig {
            lock_timeout_ms: 5,
            lock_backoff_max_ms: 10,
            ..ReaderConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn timing_ratios_make_sense() {
        let c = ReaderConfig::default();
        assert!(
            c.channel_timeout_ms < c.poll_interval_ms,
            "channel waits must be shorter than the polling cadence"
        );
        assert!(
            c.packet_gap_ms < c.poll_interval_ms * 4,
            "a settled packet should be emitted within a few cycles"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let c = ReaderConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: ReaderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.packet_gap_ms, c2.packet_gap_ms);
        assert_eq!(c.hex_case, c2.hex_case);
        assert_eq!(c.framing, c2.framing);
    }

    #[test]
    fn json_override_is_validated() {
        let mut c = ReaderConfig::default();
        c.packet_gap_ms = 50;
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(ReaderConfig::from_json(&json).unwrap().packet_gap_ms, 50);

        c.pin_d1 = c.pin_d0;
        let bad = serde_json::to_string(&c).unwrap();
        assert_eq!(
            ReaderConfig::from_json(&bad).unwrap_err(),
            Error::Config("pin_d0 and pin_d1 must differ")
        );
    }

    #[test]
    fn load_falls_back_to_defaults() {
        assert_eq!(ReaderConfig::load_or_default(None).packet_gap_ms, 100);
        let c = ReaderConfig::load_or_default(Some("{not json"));
        assert_eq!(c.packet_gap_ms, 100);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = ReaderConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: ReaderConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.pin_d0, c2.pin_d0);
        assert_eq!(c.lock_timeout_ms, c2.lock_timeout_ms);
    }
}
