//! End-to-end framing over simulated serial links.
//!
//! Covers:
//! - host/peer exchanges over a null-modem pair
//! - loopback round-trips for every frame type
//! - non-blocking behaviour on empty queues
//! - lifecycle guarantees (idempotent close, re-open guard, handle release)

mod common;

use common::{loopback_framer, mock_with_output, println_bytes, NullModem};
use duino_link::port::{Completion, MockOpener, MockSerialPort, PortId, DEFAULT_DEVICE_PREFIX};
use duino_link::{Connection, Framer, LineEnding, OpenError, ReadError, WriteError};
use pretty_assertions::assert_eq;
use std::time::Instant;

// ============================================================================
// Null-modem exchanges
// ============================================================================

#[test]
fn test_ping_line_reaches_peer() {
    let mut link = NullModem::new();

    link.host.write_line("ping", LineEnding::Lf).unwrap();
    assert_eq!(link.peer.read_line().unwrap(), "ping");
}

#[test]
fn test_int_reaches_peer() {
    let mut link = NullModem::new();

    link.host.write_int(42).unwrap();
    assert_eq!(link.peer.read_int().unwrap(), 42);
}

#[test]
fn test_conversation_both_directions() {
    let mut link = NullModem::new();
    link.peer.set_line_ending(LineEnding::CrLf);

    link.host.print_line("GET TEMP").unwrap();
    assert_eq!(link.peer.read_line().unwrap(), "GET TEMP");

    link.peer.print_line("TEMP").unwrap();
    link.peer.write_float(21.5).unwrap();

    assert_eq!(link.host.read_line().unwrap(), "TEMP");
    assert_eq!(link.host.read_float().unwrap(), 21.5);
    assert!(matches!(
        link.host.read_line(),
        Err(ReadError::NothingAvailable)
    ));
}

#[test]
fn test_crlf_writer_and_line_reader_agree() {
    for ending in [LineEnding::CrLf, LineEnding::Lf] {
        let mut link = NullModem::new();
        link.host.write_line("status", ending).unwrap();
        assert_eq!(link.peer.read_line().unwrap(), "status", "ending {ending:?}");
    }
}

#[test]
fn test_lfcr_leaves_empty_line_for_next_read() {
    let mut link = NullModem::new();
    link.host.write_line("a", LineEnding::LfCr).unwrap();

    assert_eq!(link.peer.read_line().unwrap(), "a");
    // the stray CR is consumed and stripped
    assert_eq!(link.peer.read_line().unwrap(), "");
    assert!(matches!(
        link.peer.read_line(),
        Err(ReadError::NothingAvailable)
    ));
}

#[test]
fn test_crlf_split_before_lf() {
    let mut link = NullModem::new();

    link.host.print("hello\r").unwrap();
    assert_eq!(link.peer.read_line().unwrap(), "hello");

    link.host.print("\n").unwrap();
    assert_eq!(link.peer.read_line().unwrap(), "");
}

#[test]
fn test_flush_discards_backlog_only_on_one_side() {
    let mut link = NullModem::new();
    link.host.print("stale data").unwrap();
    link.peer.print("fresh").unwrap();

    assert_eq!(link.peer.flush(), 10);
    assert_eq!(link.peer_port.available_bytes(), 0);
    assert_eq!(link.host.read_string().unwrap(), "fresh");
}

// ============================================================================
// Loopback round-trips
// ============================================================================

#[test]
fn test_loopback_every_frame_type() {
    let (mut serial, _port) = loopback_framer("LOOP");

    serial.print("abc").unwrap();
    serial.write_byte(0).unwrap();
    assert_eq!(serial.read_string().unwrap(), "abc");

    serial.write_int(i32::MIN).unwrap();
    assert_eq!(serial.read_int().unwrap(), i32::MIN);

    serial.write_float(-0.125).unwrap();
    assert_eq!(serial.read_float().unwrap(), -0.125);

    serial.write_byte(0x7F).unwrap();
    assert_eq!(serial.read_byte().unwrap(), 0x7F);

    serial.write_bytes(&[9, 8, 7, 6, 5]).unwrap();
    assert_eq!(serial.read_bytes(3), vec![9, 8, 7]);
    assert_eq!(serial.read_bytes(256), vec![6, 5]);
    assert!(serial.read_bytes(256).is_empty());
}

#[test]
fn test_numbered_port_on_loopback() {
    let device = PortId::Number(3).device_name(DEFAULT_DEVICE_PREFIX);
    let port = MockSerialPort::loopback(device.clone());
    let opener = MockOpener::new();
    opener.register(&port);

    let mut serial = Framer::new(Connection::with_opener(opener));
    serial.open(3, 9600).unwrap();
    assert_eq!(serial.connection().device_name(), Some(device.as_str()));
    assert_eq!(port.times_opened(), 1);

    serial.write_line("ping", LineEnding::Lf).unwrap();
    assert_eq!(serial.read_line().unwrap(), "ping");

    serial.write_int(42).unwrap();
    assert_eq!(serial.read_int().unwrap(), 42);
}

#[test]
fn test_codec_matches_wire_bytes() {
    let (mut serial, port) = loopback_framer("LOOP");

    serial.write_float(3.25).unwrap();
    let wire = port.written();
    assert_eq!(wire, Framer::float_to_bytes(3.25).to_vec());
    assert_eq!(Framer::bytes_to_float(&wire), 3.25);
}

// ============================================================================
// Firmware-style output
// ============================================================================

#[test]
fn test_sketch_println_output() {
    let mut output = println_bytes("READY");
    output.extend(println_bytes("v1.2"));
    let port = mock_with_output("UNO", &[output.as_slice()]);
    let opener = MockOpener::new();
    opener.register(&port);

    let mut serial = Framer::new(Connection::with_opener(opener));
    serial.open("UNO", 115_200).unwrap();

    assert_eq!(serial.read_line().unwrap(), "READY");
    assert_eq!(serial.read_line().unwrap(), "v1.2");
}

#[test]
fn test_line_split_across_ticks() {
    let port = MockSerialPort::new("UNO");
    let opener = MockOpener::new();
    opener.register(&port);
    let mut serial = Framer::new(Connection::with_opener(opener));
    serial.open("UNO", 9600).unwrap();

    port.enqueue_read(b"hel");
    // the scan stops when the queue runs dry and hands back what it has
    assert_eq!(serial.read_line().unwrap(), "hel");
    port.enqueue_read(b"lo\r\n");
    assert_eq!(serial.read_line().unwrap(), "lo");
}

// ============================================================================
// Non-blocking behaviour
// ============================================================================

#[test]
fn test_empty_queue_never_waits() {
    let (mut serial, port) = loopback_framer("LOOP");
    port.defer_next_read(Completion::Never);

    let started = Instant::now();
    for _ in 0..100 {
        assert!(matches!(serial.read_line(), Err(ReadError::NothingAvailable)));
        assert!(matches!(serial.read_int(), Err(ReadError::NothingAvailable)));
        assert!(serial.read_bytes(64).is_empty());
    }
    assert!(started.elapsed().as_millis() < 1000);
    assert!(port.read_waits().is_empty());
}

#[test]
fn test_stalled_write_reports_timeout() {
    let (mut serial, port) = loopback_framer("LOOP");
    port.defer_next_write(Completion::Never);

    assert!(matches!(
        serial.print_line("lost"),
        Err(WriteError::WriteTimedOut(_))
    ));
    // the link is still usable afterwards
    serial.print_line("next").unwrap();
    assert_eq!(serial.read_line().unwrap(), "next");
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_close_twice_and_never_opened() {
    let mut link = NullModem::new();
    link.host.close();
    link.host.close();
    assert!(!link.host.is_open());
    assert!(!link.host_port.is_held());

    let mut idle = Framer::new(Connection::with_opener(MockOpener::new()));
    idle.close();
    assert!(!idle.is_open());
}

#[test]
fn test_reopen_guard_keeps_first_connection() {
    let mut link = NullModem::new();
    let err = link.host.open("PEER", 115_200).unwrap_err();
    assert!(matches!(err, OpenError::AlreadyOpen { .. }));

    assert_eq!(link.host.port(), Some(&PortId::from("HOST")));
    assert_eq!(link.host.baud(), Some(9600));
    link.host.print_line("still here").unwrap();
    assert_eq!(link.peer.read_line().unwrap(), "still here");
}

#[test]
fn test_port_and_baud_survive_close() {
    let mut link = NullModem::new();
    link.peer.close();
    assert_eq!(link.peer.port(), Some(&PortId::from("PEER")));
    assert_eq!(link.peer.baud(), Some(9600));
    assert!(matches!(link.peer.read_line(), Err(ReadError::NotOpen)));
}

#[test]
fn test_dropping_framer_releases_device() {
    let link = NullModem::new();
    let host_port = link.host_port.clone();
    let opener = link.opener.clone();
    drop(link);

    assert!(!host_port.is_held());
    let mut again = Framer::new(Connection::with_opener(opener));
    again.open("HOST", 9600).unwrap();
}

#[test]
fn test_open_port_factory_reports_failure() {
    let (serial, result) = Framer::open_port(-4, 9600);
    assert!(matches!(result, Err(OpenError::InvalidPort(_))));
    assert!(!serial.is_open());
}
