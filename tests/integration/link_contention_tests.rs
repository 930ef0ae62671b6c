//! Shared-connection locking between the two workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rfid_relay::config::ReaderConfig;
use rfid_relay::error::LinkError;
use rfid_relay::feedback::{DropReason, ReaderEvent};
use rfid_relay::worker::{CycleOutcome, LinkPoll, PublishOutcome};

use crate::mock_link::Bench;

fn wait_for(flag: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !flag() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn reader_poll_never_waits_on_a_writing_publisher() {
    let bench = Bench::new(Bench::fast_config());
    let wire = bench.connect();
    bench.connection.try_lock().unwrap().link_mut().unwrap().stall = Duration::from_millis(200);
    let (mut reader, mut publisher) = bench.workers();

    bench.present_byte(0xB2);
    bench.settle();
    assert!(matches!(reader.run_cycle(), CycleOutcome::Queued { .. }));

    std::thread::scope(|s| {
        let writer = s.spawn(move || publisher.run_cycle());
        wait_for(|| wire.in_write.load(Ordering::SeqCst));

        let started = Instant::now();
        assert_eq!(reader.poll_link(), LinkPoll::Busy);
        assert!(started.elapsed() < Duration::from_millis(50));

        // Capture keeps working while the link is busy.
        bench.present_byte(0xC3);
        bench.settle();
        assert!(matches!(reader.run_cycle(), CycleOutcome::Queued { .. }));

        assert_eq!(writer.join().unwrap(), PublishOutcome::Sent { len: 2 });
    });

    assert_eq!(wire.sent_text(), "B2");
    assert_eq!(bench.outbound.len(), 1);
}

#[test]
fn reader_poll_leaves_lock_free_afterwards() {
    let bench = Bench::new(Bench::fast_config());
    bench.connect();
    let (mut reader, _publisher) = bench.workers();

    assert_eq!(reader.poll_link(), LinkPoll::NoData);
    assert!(bench.connection.try_lock().is_some());

    let held = bench.connection.try_lock().unwrap();
    assert_eq!(reader.poll_link(), LinkPoll::Busy);
    drop(held);
    // A skipped poll must not have released someone else's lock.
    assert!(bench.connection.try_lock().is_some());
}

#[test]
fn publisher_gives_up_on_a_stuck_lock() {
    let config = ReaderConfig {
        lock_timeout_ms: 30,
        ..Bench::fast_config()
    };
    let bench = Bench::new(config);
    let wire = bench.connect();
    let (mut reader, mut publisher) = bench.workers();

    bench.present_byte(0xB2);
    bench.settle();
    reader.run_cycle();

    let held = bench.connection.try_lock().unwrap();
    let started = Instant::now();
    assert_eq!(publisher.run_cycle(), PublishOutcome::Failed(LinkError::LockTimeout));
    assert!(started.elapsed() >= Duration::from_millis(30));
    drop(held);

    assert!(wire.sent_text().is_empty());
    assert_eq!(bench.stats.snapshot(0).lock_timeouts, 1);
    assert!(
        bench
            .feedback
            .events()
            .contains(&ReaderEvent::MessageDropped(DropReason::LockTimeout))
    );
}

#[test]
fn publisher_waits_out_a_short_hold() {
    let bench = Bench::new(Bench::fast_config());
    let wire = bench.connect();
    let (mut reader, mut publisher) = bench.workers();

    bench.present_byte(0x5A);
    bench.settle();
    reader.run_cycle();

    let holding = AtomicBool::new(false);
    std::thread::scope(|s| {
        s.spawn(|| {
            let held = bench.connection.try_lock().unwrap();
            holding.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            drop(held);
        });
        wait_for(|| holding.load(Ordering::SeqCst));
        assert_eq!(publisher.run_cycle(), PublishOutcome::Sent { len: 2 });
    });
    assert_eq!(wire.sent_text(), "5A");
}
