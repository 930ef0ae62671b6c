//! Fuzz target: `BitChannel`
//!
//! Interprets input as a push/pop script against a small ring and a
//! `VecDeque` model. The ring must stay FIFO, never exceed its capacity,
//! and count every rejected push.
//!
//! cargo fuzz run fuzz_bit_channel

#![no_main]

use std::collections::VecDeque;

use libfuzzer_sys::fuzz_target;
use rfid_relay::wiegand::{Bit, BitChannel, BitSample};

const CAP: usize = 16;

fuzz_target!(|data: &[u8]| {
    let ch: BitChannel<CAP> = BitChannel::new();
    let mut model: VecDeque<BitSample> = VecDeque::new();
    let mut drops = 0u32;

    for (t, &op) in data.iter().enumerate() {
        if op & 0x80 == 0 {
            let sample = BitSample::new(Bit::from(op & 1 == 1), t as u32);
            if ch.push(sample) {
                model.push_back(sample);
            } else {
                assert_eq!(model.len(), CAP, "push rejected while not full");
                drops += 1;
            }
        } else {
            assert_eq!(ch.pop(), model.pop_front());
        }
        assert_eq!(ch.len(), model.len());
        assert!(ch.len() <= CAP);
    }
    assert_eq!(ch.dropped(), drops);
});
