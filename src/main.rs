//! RFID Relay Firmware: main entry point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  D0/D1 ISRs ──▶ LINES ──▶ rfid_reader task ──▶ OUTBOUND          │
//! │                               │                   │              │
//! │                               │ try_lock          ▼              │
//! │                               └────────▶ CONNECTION ◀── publisher│
//! │                                              ▲                   │
//! │  SPP connection manager ── attach/detach ────┘                   │
//! │                                                                  │
//! │  main task: stats log every minute                               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::Result;
use log::{error, info};

use rfid_relay::adapters::fd_link::{self, FdLink};
use rfid_relay::clock::MonotonicClock;
use rfid_relay::config::ReaderConfig;
use rfid_relay::diagnostics::{self, HeapMetrics, ReaderStats};
use rfid_relay::drivers::hw_init;
use rfid_relay::drivers::indicator::{GpioOutput, Indicator};
use rfid_relay::drivers::task_pin::{Core, TaskSpec, spawn_on_core};
use rfid_relay::error::Error;
use rfid_relay::feedback::{FeedbackSink, LogFeedback};
use rfid_relay::link::ConnectionRecord;
use rfid_relay::message::OutboundChannel;
use rfid_relay::wiegand::WiegandLines;
use rfid_relay::worker::{AcquisitionWorker, PublisherWorker, WorkerContext};

// ── Process-lifetime state ────────────────────────────────────

static LINES: WiegandLines = WiegandLines::new();
static OUTBOUND: OutboundChannel = OutboundChannel::new();
static CONNECTION: ConnectionRecord<FdLink> = ConnectionRecord::new();
static STATS: ReaderStats = ReaderStats::new();

const STATS_PERIOD: Duration = Duration::from_secs(60);

const READER_TASK: TaskSpec = TaskSpec {
    name: "rfid_reader\0",
    core: Core::App,
    priority: 5,
    stack_kb: 6,
};

const PUBLISHER_TASK: TaskSpec = TaskSpec {
    name: "publisher\0",
    core: Core::App,
    priority: 5,
    stack_kb: 6,
};

// ── Link lifecycle hooks (called by the SPP connection manager) ──

/// A host connected; `fd` is the SPP VFS descriptor.
///
/// # Safety
/// `fd` must stay open until `rfid_link_detached` has returned.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rfid_link_attached(fd: i32) {
    // A refused descriptor is logged by attach and the record stays idle.
    // SAFETY: forwarded from the caller.
    let _ = unsafe { fd_link::attach(&CONNECTION, fd) };
}

/// The host disconnected; the manager may close the descriptor afterwards.
#[unsafe(no_mangle)]
pub extern "C" fn rfid_link_detached() {
    fd_link::detach(&CONNECTION);
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("RFID relay v{}", env!("CARGO_PKG_VERSION"));
    diagnostics::install_panic_handler();

    // ── 2. Config ─────────────────────────────────────────────
    let config = ReaderConfig::load_or_default(option_env!("RFID_RELAY_CONFIG"));
    info!("config: {:?}", config);

    // ── 3. Peripherals (fatal on failure) ─────────────────────
    let hw = hw_init::configure_rfid_pins(&config, &LINES)
        .and_then(|()| hw_init::init_feedback_outputs(&config));
    if let Err(e) = hw {
        // The task watchdog resets us from here.
        error!("HAL init failed: {}, halting", e);
        loop {
            std::thread::sleep(Duration::from_secs(1));
        }
    }

    let indicator = Indicator::new(
        GpioOutput(config.led_pin),
        GpioOutput(config.buzzer_pin),
        MonotonicClock,
        config.feedback_hold_ms,
    );
    let feedback: &'static dyn FeedbackSink = Box::leak(Box::new((indicator, LogFeedback)));

    // ── 4. Workers ────────────────────────────────────────────
    let (tx, rx) = OUTBOUND
        .split()
        .ok_or(Error::Init("outbound channel already split"))?;
    let ctx = WorkerContext {
        connection: &CONNECTION,
        feedback,
        stats: &STATS,
    };

    let reader_config = config.clone();
    spawn_on_core(READER_TASK, move || {
        AcquisitionWorker::new(&LINES, MonotonicClock, &reader_config, tx, ctx).run()
    })?;

    let publisher_config = config.clone();
    spawn_on_core(PUBLISHER_TASK, move || {
        PublisherWorker::new(&publisher_config, rx, ctx).run()
    })?;

    info!("Reader ready. Waiting for cards.");

    // ── 5. Periodic stats ─────────────────────────────────────
    loop {
        std::thread::sleep(STATS_PERIOD);
        let s = STATS.snapshot(LINES.dropped_bits());
        let heap = HeapMetrics::collect();
        info!(
            "STATS | cards={} sent={} lost={} | bits drained={} dropped={} truncated={} | \
             link={} rx={}B | heap={}/{}",
            s.packets_emitted,
            s.messages_sent,
            s.messages_lost(),
            s.bits_drained,
            s.bits_dropped,
            s.bits_truncated,
            if CONNECTION.is_active() { "up" } else { "down" },
            s.inbound_bytes,
            heap.free,
            heap.min_free,
        );
    }
}
