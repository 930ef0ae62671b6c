//! Reader LED and buzzer.
//!
//! The reader head has a bi-colour LED (high = red, low = green) and an
//! active-low beeper. At rest the LED is red and the beeper silent.
//!
//! - card captured: green + beep for `hold_ms`
//! - message dropped or write fault: red + long beep (`2 * hold_ms`)
//!
//! Effects end in [`FeedbackSink::tick`], so nothing here ever sleeps.

use std::sync::Mutex;

use embedded_hal::digital::OutputPin;
use log::debug;

use crate::clock::Clock;
use crate::drivers::hw_init;
use crate::feedback::{FeedbackSink, ReaderEvent};

/// A GPIO already configured as output by `hw_init`.
#[derive(Debug, Clone, Copy)]
pub struct GpioOutput(pub i32);

impl embedded_hal::digital::ErrorType for GpioOutput {
    type Error = core::convert::Infallible;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.0, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.0, true);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Idle,
    Accepted,
    Fault,
}

struct Outputs<LED, BUZ> {
    led: LED,
    buzzer: BUZ,
    signal: Signal,
    started_ms: u32,
    hold_ms: u32,
}

impl<LED: OutputPin, BUZ: OutputPin> Outputs<LED, BUZ> {
    fn show(&mut self, signal: Signal, now_ms: u32, hold_ms: u32) {
        let (green, beep) = match signal {
            Signal::Idle => (false, false),
            Signal::Accepted => (true, true),
            Signal::Fault => (false, true),
        };
        let led = if green { self.led.set_low() } else { self.led.set_high() };
        let buz = if beep { self.buzzer.set_low() } else { self.buzzer.set_high() };
        if led.is_err() || buz.is_err() {
            debug!("indicator: output write failed for {:?}", signal);
        }
        self.signal = signal;
        self.started_ms = now_ms;
        self.hold_ms = hold_ms;
    }
}

pub struct Indicator<LED, BUZ, C> {
    outputs: Mutex<Outputs<LED, BUZ>>,
    clock: C,
    hold_ms: u32,
}

impl<LED: OutputPin, BUZ: OutputPin, C: Clock> Indicator<LED, BUZ, C> {
    /// Take the pins and drive them to the resting state.
    pub fn new(led: LED, buzzer: BUZ, clock: C, hold_ms: u32) -> Self {
        let mut outputs = Outputs {
            led,
            buzzer,
            signal: Signal::Idle,
            started_ms: 0,
            hold_ms: 0,
        };
        outputs.show(Signal::Idle, clock.now_ms(), 0);
        Self {
            outputs: Mutex::new(outputs),
            clock,
            hold_ms,
        }
    }

    pub fn signal(&self) -> Signal {
        self.lock().signal
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Outputs<LED, BUZ>> {
        self.outputs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<LED, BUZ, C> FeedbackSink for Indicator<LED, BUZ, C>
where
    LED: OutputPin + Send,
    BUZ: OutputPin + Send,
    C: Clock + Sync,
{
    fn notify(&self, event: &ReaderEvent) {
        let (signal, hold) = match event {
            ReaderEvent::PacketCaptured { .. } => (Signal::Accepted, self.hold_ms),
            ReaderEvent::MessageDropped(_) | ReaderEvent::WriteFailed(_) => {
                (Signal::Fault, self.hold_ms.saturating_mul(2))
            }
            ReaderEvent::MessageSent { .. } | ReaderEvent::InboundData(_) => return,
        };
        self.lock().show(signal, self.clock.now_ms(), hold);
    }

    fn tick(&self, now_ms: u32) {
        let mut out = self.lock();
        if out.signal != Signal::Idle && now_ms.wrapping_sub(out.started_ms) >= out.hold_ms {
            out.show(Signal::Idle, now_ms, 0);
        }
    }
}
