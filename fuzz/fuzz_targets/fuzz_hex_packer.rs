//! Fuzz target: `HexPacker`
//!
//! Treats every input byte as one bit (low bit) and optionally a reset
//! (0xFF). Asserts the packer never exceeds the link maximum, only ever
//! emits hex digits, and accounts for every bit it was given.
//!
//! cargo fuzz run fuzz_hex_packer

#![no_main]

use libfuzzer_sys::fuzz_target;
use rfid_relay::config::{HexCase, MAX_MESSAGE_SIZE};
use rfid_relay::wiegand::Bit;
use rfid_relay::wiegand::hex::HexPacker;

fuzz_target!(|data: &[u8]| {
    let case = if data.first().is_some_and(|b| b & 0x80 != 0) {
        HexCase::Lower
    } else {
        HexCase::Upper
    };
    let mut packer = HexPacker::new(case);
    let mut since_reset: u32 = 0;

    for &byte in data {
        if byte == 0xFF {
            packer.reset();
            since_reset = 0;
            continue;
        }
        packer.push_bit(Bit::from(byte & 1 == 1));
        since_reset += 1;
        assert_eq!(packer.bits() + packer.truncated(), since_reset);
    }

    let out = packer.finish();
    assert!(out.len() <= MAX_MESSAGE_SIZE, "output exceeds link maximum");
    assert!(out.len() % 2 == 0, "hex output must be whole pairs");
    assert!(out.iter().all(u8::is_ascii_hexdigit));
});
