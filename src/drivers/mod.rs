//! Reader peripherals: pin setup, LED/buzzer, task placement.

pub mod hw_init;
pub mod indicator;
pub mod task_pin;
