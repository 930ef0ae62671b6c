//! Bit-run to hex text packing.
//!
//! Bits are shifted MSB-first into an 8-bit accumulator; every eighth bit
//! the accumulator is written as two hex digits. A trailing group of 1 to 7
//! bits is written as the value accumulated so far (e.g. `1,0,1` → `05`),
//! so short final groups are kept rather than discarded.
//!
//! Output is capped at [`MAX_MESSAGE_SIZE`]. Once full, further bits are
//! counted as truncated and otherwise ignored; the capped text is still a
//! valid packet.

use heapless::Vec;
use log::{debug, trace};

use super::Bit;
use super::WiegandDecoder;
use crate::clock::Clock;
use crate::config::{HexCase, MAX_MESSAGE_SIZE};

const UPPER: &[u8; 16] = b"0123456789ABCDEF";
const LOWER: &[u8; 16] = b"0123456789abcdef";

pub struct HexPacker {
    out: Vec<u8, MAX_MESSAGE_SIZE>,
    digits: &'static [u8; 16],
    acc: u8,
    /// Bits currently held in `acc` (0 to 7).
    pending: u8,
    bits: u32,
    truncated: u32,
    full: bool,
}

impl HexPacker {
    pub fn new(case: HexCase) -> Self {
        Self {
            out: Vec::new(),
            digits: match case {
                HexCase::Upper => UPPER,
                HexCase::Lower => LOWER,
            },
            acc: 0,
            pending: 0,
            bits: 0,
            truncated: 0,
            full: false,
        }
    }

    /// Shift one bit in. Returns `false` if the output is already at
    /// capacity and the bit was discarded.
    pub fn push_bit(&mut self, bit: Bit) -> bool {
        if self.full {
            self.truncated += 1;
            return false;
        }

        trace!(target: "wiegand", "rx bit {} val {}", self.bits, bit.as_u8());
        self.bits += 1;
        self.acc = (self.acc << 1) | bit.as_u8();
        self.pending += 1;

        if self.pending == 8 {
            debug!(target: "wiegand", "byte {} val {:#04x}", self.out.len() / 2, self.acc);
            self.emit_group();
        }
        true
    }

    /// Flush a trailing partial group (if room) and return the text.
    /// Idempotent until the next `push_bit`.
    pub fn finish(&mut self) -> &[u8] {
        if self.pending > 0 && !self.full {
            debug!(target: "wiegand", "partial byte {} ({} bits) val {:#04x}",
                self.out.len() / 2, self.pending, self.acc);
            self.emit_group();
        }
        &self.out
    }

    /// Forget everything and start a new packet.
    pub fn reset(&mut self) {
        self.out.clear();
        self.acc = 0;
        self.pending = 0;
        self.bits = 0;
        self.truncated = 0;
        self.full = false;
    }

    /// Encoded bytes so far (full groups only until `finish`).
    pub fn len(&self) -> usize {
        self.out.len()
    }

    /// No bits accepted since the last reset.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Bits accepted into the output since the last reset.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Bits discarded because the output was at capacity.
    pub fn truncated(&self) -> u32 {
        self.truncated
    }

    fn emit_group(&mut self) {
        let pair = [
            self.digits[(self.acc >> 4) as usize],
            self.digits[(self.acc & 0x0F) as usize],
        ];
        for digit in pair {
            if self.out.push(digit).is_err() {
                break;
            }
        }
        if self.out.len() == self.out.capacity() {
            debug!(target: "wiegand", "message buffer size reached, capping packet");
            self.full = true;
        }
        self.acc = 0;
        self.pending = 0;
    }
}

/// Pop the current packet's queued bits into `packer`. Returns how many bits
/// were popped (including any discarded past capacity). Stops early at a
/// packet boundary inside the queue; does not wait for more.
pub fn drain_available<C: Clock>(decoder: &mut WiegandDecoder<'_, C>, packer: &mut HexPacker) -> u32 {
    let mut popped = 0;
    while let Some(bit) = decoder.bit_available() {
        packer.push_bit(bit);
        popped += 1;
    }
    popped
}
