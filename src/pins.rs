//! GPIO assignments for the RFID accessory board.
//!
//! Single source of truth for `ReaderConfig::default()` and the
//! peripheral init path.

// ---------------------------------------------------------------------------
// Wiegand reader data lines (open collector, pulled up)
// ---------------------------------------------------------------------------

/// DATA0: a falling edge clocks in a `0` bit.
pub const WIEGAND_D0_GPIO: i32 = 22;
/// DATA1: a falling edge clocks in a `1` bit.
pub const WIEGAND_D1_GPIO: i32 = 23;

// ---------------------------------------------------------------------------
// Reader feedback lines
// ---------------------------------------------------------------------------

/// Bi-colour reader LED. HIGH = red, LOW = green.
pub const READER_LED_GPIO: i32 = 25;
/// Reader beeper. Active LOW.
pub const READER_BUZZER_GPIO: i32 = 27;
