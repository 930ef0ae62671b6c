//! One-shot reader peripheral initialization.
//!
//! Configures the two Wiegand data inputs (falling edge, pull-up, per-pin
//! ISR) and the LED/buzzer outputs using raw ESP-IDF sys calls. Called once
//! from `main()` before the workers start; any failure is fatal to startup.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

use crate::config::{BIT_CHANNEL_CAPACITY, ReaderConfig};
use crate::wiegand::WiegandLines;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrHandlerFailed { pin: i32, rc: i32 },
    /// The Bit Channel cannot hold the widest packet configured.
    ChannelTooSmall { wanted: u16 },
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrHandlerFailed { pin, rc } => {
                write!(f, "ISR handler add on GPIO{} failed (rc={})", pin, rc)
            }
            Self::ChannelTooSmall { wanted } => write!(
                f,
                "bit channel holds {} bits, config wants {}",
                BIT_CHANNEL_CAPACITY, wanted
            ),
        }
    }
}

impl std::error::Error for HwInitError {}

fn check_capacity(config: &ReaderConfig) -> Result<(), HwInitError> {
    if config.max_wiegand_bits as usize > BIT_CHANNEL_CAPACITY {
        return Err(HwInitError::ChannelTooSmall {
            wanted: config.max_wiegand_bits,
        });
    }
    Ok(())
}

// ── Wiegand line ISRs ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
use crate::wiegand::Line;

/// SAFETY (both handlers): `arg` is the `&'static WiegandLines` registered in
/// `configure_rfid_pins`. The GPIO ISR service dispatches per-pin handlers
/// one at a time, so the Bit Channel still sees a single producer.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn wiegand_data0_isr(arg: *mut core::ffi::c_void) {
    let lines = unsafe { &*(arg as *const WiegandLines) };
    lines.on_falling_edge(Line::Data0, crate::clock::uptime_ms());
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn wiegand_data1_isr(arg: *mut core::ffi::c_void) {
    let lines = unsafe { &*(arg as *const WiegandLines) };
    lines.on_falling_edge(Line::Data1, crate::clock::uptime_ms());
}

/// Configure both data lines as pulled-up inputs interrupting on the falling
/// edge, and hook them to `lines`.
#[cfg(target_os = "espidf")]
pub fn configure_rfid_pins(
    config: &ReaderConfig,
    lines: &'static WiegandLines,
) -> Result<(), HwInitError> {
    check_capacity(config)?;

    let cfg = gpio_config_t {
        pin_bit_mask: (1u64 << config.pin_d0) | (1u64 << config.pin_d1),
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
    };
    // SAFETY: called once from main() before the workers exist.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    // ESP_ERR_INVALID_STATE means the service is already installed.
    let ret = unsafe { gpio_install_isr_service(0) };
    if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
        return Err(HwInitError::IsrInstallFailed(ret));
    }

    let arg = lines as *const WiegandLines as *mut core::ffi::c_void;
    let handlers: [(i32, unsafe extern "C" fn(*mut core::ffi::c_void)); 2] = [
        (config.pin_d0, wiegand_data0_isr),
        (config.pin_d1, wiegand_data1_isr),
    ];
    for (pin, isr) in handlers {
        // SAFETY: `arg` points at a 'static WiegandLines; see handler note.
        let ret = unsafe { gpio_isr_handler_add(pin, Some(isr), arg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::IsrHandlerFailed { pin, rc: ret });
        }
    }

    info!("hw_init: Wiegand D0=GPIO{} D1=GPIO{} armed (falling edge, pull-up)",
        config.pin_d0, config.pin_d1);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_rfid_pins(
    config: &ReaderConfig,
    _lines: &'static WiegandLines,
) -> Result<(), HwInitError> {
    check_capacity(config)?;
    log::info!("hw_init(sim): Wiegand ISRs skipped (D0={}, D1={})",
        config.pin_d0, config.pin_d1);
    Ok(())
}

// ── Feedback outputs ──────────────────────────────────────────

/// LED and buzzer as push-pull outputs, left red and silent.
#[cfg(target_os = "espidf")]
pub fn init_feedback_outputs(config: &ReaderConfig) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: (1u64 << config.led_pin) | (1u64 << config.buzzer_pin),
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: called once from main() before the workers exist.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    gpio_write(config.led_pin, true);
    gpio_write(config.buzzer_pin, true);

    info!("hw_init: LED=GPIO{} buzzer=GPIO{} configured", config.led_pin, config.buzzer_pin);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_feedback_outputs(_config: &ReaderConfig) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): feedback outputs skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}
