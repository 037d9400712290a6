//! Shared test utilities.
//!
//! - Null-modem and loopback harnesses built on `MockSerialPort`
//! - Peer builders that queue firmware-style output

#![allow(dead_code)]

use duino_link::port::{MockOpener, MockSerialPort};
use duino_link::{Connection, Framer};

/// Two framers joined by a null-modem cable, both open at 9600 baud.
pub struct NullModem {
    pub host: Framer,
    pub peer: Framer,
    pub host_port: MockSerialPort,
    pub peer_port: MockSerialPort,
    pub opener: MockOpener,
}

impl NullModem {
    pub fn new() -> Self {
        let (host_port, peer_port) = MockSerialPort::pair("HOST", "PEER");
        let opener = MockOpener::new();
        opener.register(&host_port).register(&peer_port);

        let mut host = Framer::new(Connection::with_opener(opener.clone()));
        let mut peer = Framer::new(Connection::with_opener(opener.clone()));
        host.open("HOST", 9600).expect("open host side");
        peer.open("PEER", 9600).expect("open peer side");

        Self {
            host,
            peer,
            host_port,
            peer_port,
            opener,
        }
    }
}

/// A framer opened on a loopback device, plus a handle to the device.
pub fn loopback_framer(name: &str) -> (Framer, MockSerialPort) {
    let port = MockSerialPort::loopback(name);
    let opener = MockOpener::new();
    opener.register(&port);
    let mut framer = Framer::new(Connection::with_opener(opener));
    framer.open(name, 9600).expect("open loopback");
    (framer, port)
}

/// A mock device with firmware output already queued.
pub fn mock_with_output(name: &str, chunks: &[&[u8]]) -> MockSerialPort {
    let port = MockSerialPort::new(name);
    for chunk in chunks {
        port.enqueue_read(chunk);
    }
    port
}

/// Bytes an Arduino sketch emits for `Serial.println(text)`.
pub fn println_bytes(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.extend_from_slice(b"\r\n");
    bytes
}
