//! Protocol engine behaviour against a simulated peer: timeouts, retries,
//! corruption, resynchronization and mismatched responses.

mod common;

use std::time::{Duration, Instant};

use common::*;
use pinwire_driver::sim::Faults;
use pinwire_driver::{AttemptError, DriverError, ErrorKind, Transport};
use pinwire_protocol::*;

fn write_13_high() -> Request {
    DigitalWriteRequest { pin: 13, level: PinLevel::High }.into()
}

#[test]
fn test_timeout_waits_one_read_window() {
    let read_timeout = Duration::from_millis(60);
    let (mut engine, handle) = sim_engine(read_timeout);
    handle.set_faults(Faults { mute: true, ..Faults::default() });

    let started = Instant::now();
    let err = engine.send(&write_13_high(), 1).unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(matches!(
        err,
        DriverError::Exhausted { attempts: 1, last: AttemptError::Timeout, .. }
    ));
    assert!(elapsed >= read_timeout, "gave up early after {:?}", elapsed);
    assert!(elapsed < read_timeout * 5, "waited too long: {:?}", elapsed);
    assert_eq!(handle.write_count(), 1);
}

#[test]
fn test_retry_exhaustion_makes_exactly_n_writes() {
    let (mut engine, handle) = sim_engine(FAST_TIMEOUT);
    handle.set_faults(Faults { corrupt_responses: u32::MAX, ..Faults::default() });

    let err = engine.send(&write_13_high(), 4).unwrap_err();

    assert_eq!(handle.write_count(), 4);
    assert_eq!(err.kind(), ErrorKind::Corrupt);
    match err {
        DriverError::Exhausted { kind, attempts, last } => {
            assert_eq!(kind, Kind::DigitalWrite);
            assert_eq!(attempts, 4);
            assert!(matches!(
                last,
                AttemptError::Corrupt(FrameError::ChecksumMismatch { .. })
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_retry_recovers_after_corruption() {
    let (mut engine, handle) = sim_engine(FAST_TIMEOUT);
    handle.set_faults(Faults { corrupt_responses: 1, ..Faults::default() });

    let response = engine.send(&write_13_high(), 2).unwrap();

    assert_eq!(
        response,
        Response::DigitalWrite(DigitalWriteResponse { pin: 13, level: PinLevel::High })
    );
    assert_eq!(handle.write_count(), 2);
    // The retry is a full fresh write of the same frame.
    assert_eq!(handle.requests(), vec![write_13_high(), write_13_high()]);
}

#[test]
fn test_single_attempt_does_not_retry_on_corruption() {
    let (mut engine, handle) = sim_engine(FAST_TIMEOUT);
    handle.set_faults(Faults { corrupt_responses: 1, ..Faults::default() });

    let err = engine.send(&write_13_high(), 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);
    assert_eq!(handle.write_count(), 1);
}

#[test]
fn test_wrong_kind_is_a_mismatch() {
    let (mut engine, handle) = sim_engine(FAST_TIMEOUT);
    handle.set_faults(Faults { wrong_kind_responses: 1, ..Faults::default() });

    let err = engine.send(&write_13_high(), 1).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Mismatch);
    assert!(matches!(
        err,
        DriverError::Exhausted {
            last: AttemptError::Mismatch { expected: Kind::DigitalWrite, actual: 0x88 },
            ..
        }
    ));
}

#[test]
fn test_garbage_before_frame_is_skipped() {
    let (mut engine, handle) = sim_engine(FAST_TIMEOUT);
    handle.set_faults(Faults {
        garbage_prefix: vec![0x00, 0x55, 0x13, 0x7F],
        ..Faults::default()
    });

    let response = engine.send(&DigitalReadRequest { pin: 4 }.into(), 1).unwrap();
    assert!(matches!(response, Response::DigitalRead(DigitalReadResponse { pin: 4, .. })));
    assert_eq!(handle.write_count(), 1);
}

#[test]
fn test_peer_rejection_is_not_retried() {
    let (mut engine, handle) = sim_engine(FAST_TIMEOUT);
    handle.set_faults(Faults {
        reject_with: Some(PeerErrorCode::Busy),
        ..Faults::default()
    });

    let err = engine.send(&write_13_high(), 3).unwrap_err();

    assert!(matches!(
        err,
        DriverError::PeerRejected { kind: Kind::DigitalWrite, code: PeerErrorCode::Busy }
    ));
    assert_eq!(err.kind(), ErrorKind::PeerRejected);
    assert_eq!(handle.write_count(), 1);
}

#[test]
fn test_transport_fault_is_terminal() {
    let (mut engine, handle) = sim_engine(FAST_TIMEOUT);
    engine.transport_mut().close().unwrap();

    let err = engine.send(&write_13_high(), 3).unwrap_err();

    assert!(matches!(err, DriverError::Io(_)));
    assert_eq!(handle.write_count(), 0);
}

#[test]
fn test_zero_budget_still_sends_once() {
    let (mut engine, handle) = sim_engine(FAST_TIMEOUT);
    assert!(engine.send(&Request::Handshake, 0).is_ok());
    assert_eq!(handle.write_count(), 1);
}

#[test]
fn test_bounded_by_worst_case() {
    let (mut engine, handle) = sim_engine(FAST_TIMEOUT);
    handle.set_faults(Faults { mute: true, ..Faults::default() });

    let started = Instant::now();
    let _ = engine.send(&write_13_high(), 3);
    let bound = engine.config().worst_case(3);

    assert!(started.elapsed() < bound * 3, "{:?} exceeds {:?}", started.elapsed(), bound);
    assert_eq!(handle.write_count(), 3);
}
