//! End-to-end: line edges in, hex text out on the link.

use std::sync::atomic::Ordering;

use rfid_relay::config::{FramingMode, MAX_MESSAGE_SIZE, ReaderConfig};
use rfid_relay::error::LinkError;
use rfid_relay::feedback::{DropReason, ReaderEvent};
use rfid_relay::worker::{CycleOutcome, PublishOutcome};

use crate::mock_link::Bench;

#[test]
fn card_b2_is_relayed_as_hex_text() {
    let bench = Bench::new(Bench::fast_config());
    let wire = bench.connect();
    let (mut reader, mut publisher) = bench.workers();

    bench.present_card(&[1, 0, 1, 1, 0, 0, 1, 0]);
    assert_eq!(reader.run_cycle(), CycleOutcome::Pending { bits: 8 });
    assert_eq!(publisher.run_cycle(), PublishOutcome::Idle);

    bench.settle();
    assert_eq!(reader.run_cycle(), CycleOutcome::Queued { bits: 8, len: 2 });
    assert_eq!(publisher.run_cycle(), PublishOutcome::Sent { len: 2 });
    assert_eq!(wire.sent_text(), "B2");
}

#[test]
fn wiegand26_card_is_four_pairs() {
    let bench = Bench::new(Bench::fast_config());
    let wire = bench.connect();
    let (mut reader, mut publisher) = bench.workers();

    // 26-bit frame: even parity, 8-bit facility 0x2A, 16-bit card 0x1234, odd parity.
    let mut bits = vec![1];
    bits.extend((0..8).rev().map(|i| (0x2Au8 >> i) & 1));
    bits.extend((0..16).rev().map(|i| ((0x1234u16 >> i) & 1) as u8));
    bits.push(0);
    bench.present_card(&bits);
    bench.settle();

    assert_eq!(reader.run_cycle(), CycleOutcome::Queued { bits: 26, len: 8 });
    publisher.run_cycle();
    // 1001_0101 0000_1001 0001_1010 + trailing 00 -> 95 09 1A 00
    assert_eq!(wire.sent_text(), "95091A00");
}

#[test]
fn messages_reach_link_in_enqueue_order_despite_partial_writes() {
    let bench = Bench::new(Bench::fast_config());
    let wire = bench.connect();
    bench.connection.try_lock().unwrap().link_mut().unwrap().chunk = 1;
    let (mut reader, mut publisher) = bench.workers();

    for byte in [0xAA, 0xBB, 0xCC] {
        bench.present_byte(byte);
        bench.settle();
        assert!(matches!(reader.run_cycle(), CycleOutcome::Queued { .. }));
    }
    for _ in 0..3 {
        assert_eq!(publisher.run_cycle(), PublishOutcome::Sent { len: 2 });
    }

    assert_eq!(wire.sent_text(), "AABBCC");
    assert_eq!(wire.write_calls.load(Ordering::SeqCst), 6);
}

#[test]
fn quiet_line_never_enqueues() {
    let bench = Bench::new(Bench::fast_config());
    let (mut reader, _publisher) = bench.workers();

    for _ in 0..5 {
        bench.clock.advance(1_000);
        assert_eq!(reader.run_cycle(), CycleOutcome::Idle);
    }
    assert!(bench.outbound.is_empty());
    assert!(bench.feedback.events().is_empty());
}

#[test]
fn back_to_back_cards_are_not_spliced() {
    let bench = Bench::new(Bench::fast_config());
    let wire = bench.connect();
    let (mut reader, mut publisher) = bench.workers();

    bench.present_byte(0x12);
    bench.settle();
    reader.run_cycle();
    bench.present_byte(0x34);
    bench.settle();
    reader.run_cycle();

    publisher.run_cycle();
    publisher.run_cycle();
    assert_eq!(wire.sent_text(), "1234");
    assert_eq!(bench.stats.snapshot(0).packets_emitted, 2);
}

#[test]
fn cards_queued_within_one_cycle_stay_separate() {
    let bench = Bench::new(Bench::fast_config());
    let wire = bench.connect();
    let (mut reader, mut publisher) = bench.workers();

    // Two reads separated by more than the packet gap, both captured
    // before the worker's next cycle.
    bench.present_byte(0x12);
    bench.clock.advance(bench.config.packet_gap_ms + 50);
    bench.present_byte(0x34);

    assert_eq!(reader.run_cycle(), CycleOutcome::Queued { bits: 8, len: 2 });
    assert_eq!(reader.run_cycle(), CycleOutcome::Pending { bits: 8 });
    bench.settle();
    assert_eq!(reader.run_cycle(), CycleOutcome::Queued { bits: 8, len: 2 });

    publisher.run_cycle();
    publisher.run_cycle();
    assert_eq!(wire.sent_text(), "1234");
    assert_eq!(bench.stats.snapshot(0).packets_emitted, 2);
}

#[test]
fn eager_framing_also_splits_queued_cards() {
    let config = ReaderConfig {
        framing: FramingMode::Eager,
        ..Bench::fast_config()
    };
    let bench = Bench::new(config);
    let wire = bench.connect();
    let (mut reader, mut publisher) = bench.workers();

    bench.present_byte(0xAB);
    bench.clock.advance(bench.config.packet_gap_ms + 50);
    bench.present_byte(0xCD);

    assert_eq!(reader.run_cycle(), CycleOutcome::Queued { bits: 8, len: 2 });
    assert_eq!(reader.run_cycle(), CycleOutcome::Queued { bits: 8, len: 2 });
    publisher.run_cycle();
    publisher.run_cycle();
    assert_eq!(wire.sent_text(), "ABCD");
}

#[test]
fn oversized_packet_is_capped_at_link_maximum() {
    let bench = Bench::new(Bench::fast_config());
    let wire = bench.connect();
    let (mut reader, mut publisher) = bench.workers();

    // 480 bits, drained in bursts that fit the bit channel.
    for _ in 0..4 {
        bench.present_card(&[1; 120]);
        assert!(matches!(reader.run_cycle(), CycleOutcome::Pending { .. }));
    }
    bench.settle();

    assert_eq!(
        reader.run_cycle(),
        CycleOutcome::Queued { bits: 400, len: MAX_MESSAGE_SIZE }
    );
    assert_eq!(publisher.run_cycle(), PublishOutcome::Sent { len: MAX_MESSAGE_SIZE });
    assert_eq!(wire.sent_text(), "F".repeat(MAX_MESSAGE_SIZE));
    assert_eq!(bench.stats.snapshot(0).bits_truncated, 80);
}

#[test]
fn eager_framing_emits_whatever_one_cycle_drained() {
    let config = ReaderConfig {
        framing: FramingMode::Eager,
        ..Bench::fast_config()
    };
    let bench = Bench::new(config);
    let wire = bench.connect();
    let (mut reader, mut publisher) = bench.workers();

    bench.present_card(&[1, 0, 1, 1]);
    assert_eq!(reader.run_cycle(), CycleOutcome::Queued { bits: 4, len: 2 });
    bench.present_card(&[0, 0, 1, 0]);
    assert_eq!(reader.run_cycle(), CycleOutcome::Queued { bits: 4, len: 2 });
    publisher.run_cycle();
    publisher.run_cycle();
    assert_eq!(wire.sent_text(), "0B02");
}

#[test]
fn no_link_drops_message_but_reader_keeps_going() {
    let bench = Bench::new(Bench::fast_config());
    let (mut reader, mut publisher) = bench.workers();

    bench.present_byte(0xB2);
    bench.settle();
    reader.run_cycle();
    assert_eq!(publisher.run_cycle(), PublishOutcome::Failed(LinkError::NotConnected));

    let wire = bench.connect();
    bench.present_byte(0xC3);
    bench.settle();
    reader.run_cycle();
    assert_eq!(publisher.run_cycle(), PublishOutcome::Sent { len: 2 });
    assert_eq!(wire.sent_text(), "C3");
    assert!(
        bench
            .feedback
            .events()
            .contains(&ReaderEvent::MessageDropped(DropReason::NotConnected))
    );
}

#[test]
fn write_fault_abandons_one_message_only() {
    let bench = Bench::new(Bench::fast_config());
    let wire = bench.connect();
    wire.fail_writes.store(1, Ordering::SeqCst);
    let (mut reader, mut publisher) = bench.workers();

    for byte in [0x11, 0x22] {
        bench.present_byte(byte);
        bench.settle();
        reader.run_cycle();
    }
    assert_eq!(publisher.run_cycle(), PublishOutcome::Failed(LinkError::Io(104)));
    assert_eq!(publisher.run_cycle(), PublishOutcome::Sent { len: 2 });

    assert_eq!(wire.sent_text(), "22");
    assert!(bench.connection.is_active());
    let snap = bench.stats.snapshot(0);
    assert_eq!(snap.write_faults, 1);
    assert_eq!(snap.messages_sent, 1);
}

#[test]
fn inbound_host_data_is_read_and_counted() {
    let bench = Bench::new(Bench::fast_config());
    let wire = bench.connect();
    wire.inbound.lock().unwrap().extend_from_slice(b"MODE=26");
    let (mut reader, _publisher) = bench.workers();

    assert_eq!(reader.poll_link(), rfid_relay::worker::LinkPoll::Received(7));
    assert_eq!(reader.poll_link(), rfid_relay::worker::LinkPoll::NoData);
    assert_eq!(bench.stats.snapshot(0).inbound_bytes, 7);
    assert_eq!(bench.feedback.events(), vec![ReaderEvent::InboundData(7)]);
}
