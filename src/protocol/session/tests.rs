//! Unit tests for session dispatch and sequence stitching.
use super::*;
use crate::protocol::packet::PKT_CLIENT_FORMAT_DEF_24;

/// Handler double that records what the session dispatched.
#[derive(Default)]
struct RecordingHandler {
    init: usize,
    events: usize,
    last_status: u16,
    last_sequence: u32,
    properties: usize,
    last_property_key: u16,
    diagnostics: usize,
    errors: usize,
}

impl PacketHandler for RecordingHandler {
    fn on_client_init(&mut self) {
        self.init += 1;
    }

    fn on_event(&mut self, _packet: &Packet, event: &Event, _mask: &FieldMask) {
        self.events += 1;
        self.last_status = event.status_code;
        self.last_sequence = event.sequence;
    }

    fn on_property(&mut self, key: u16, _value: &[u8]) {
        self.properties += 1;
        self.last_property_key = key;
    }

    fn on_diagnostic(&mut self, _code: u16, _data: &[u8]) {
        self.diagnostics += 1;
    }

    fn on_error(&mut self, _code: u16, _data: &[u8]) {
        self.errors += 1;
    }
}

fn fixed_std_packet() -> Packet {
    let payload = [
        0xF1, 0x23, 0x62, 0xD5, 0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x32, 0x80,
        0x00, 0x00, 0x00, 0x01, 0x2C, 0x07,
    ];
    Packet::from_parts(0xE0, 0x30, &payload)
}

#[test]
fn test_event_dispatch() {
    let mut session = Session::new();
    let mut handler = RecordingHandler::default();
    session.begin(&mut handler);
    assert_eq!(handler.init, 1);

    let response = session.process_packet(&fixed_std_packet(), &mut handler);
    assert!(response.is_none());
    assert_eq!(handler.events, 1);
    assert_eq!(handler.last_status, 0xF123);
}

#[test]
fn test_identification_packets_store_ids() {
    let mut session = Session::new();
    let mut handler = RecordingHandler::default();

    session.process_packet(&Packet::from_parts(0xE0, 0x12, b"acct"), &mut handler);
    session.process_packet(&Packet::from_parts(0xE0, 0x13, b"unit-42"), &mut handler);
    assert_eq!(session.account_id(), "acct");
    assert_eq!(session.device_id(), "unit-42");
}

#[test]
fn test_property_and_diag_and_error_dispatch() {
    let mut session = Session::new();
    let mut handler = RecordingHandler::default();

    session.process_packet(
        &Packet::from_parts(0xE0, 0xB0, &[0xF5, 0x33, 0x01]),
        &mut handler,
    );
    assert_eq!(handler.properties, 1);
    assert_eq!(handler.last_property_key, 0xF533);

    session.process_packet(&Packet::from_parts(0xE0, 0xD0, &[0x00, 0x01]), &mut handler);
    assert_eq!(handler.diagnostics, 1);

    session.process_packet(
        &Packet::from_parts(0xE0, 0xE0, &[0xF9, 0x11]),
        &mut handler,
    );
    assert_eq!(handler.errors, 1);
}

#[test]
fn test_truncated_property_naks() {
    let mut session = Session::new();
    let mut handler = RecordingHandler::default();
    let response = session
        .process_packet(&Packet::from_parts(0xE0, 0xB0, &[0x01]), &mut handler)
        .expect("truncated property must NAK");
    assert_eq!(response.packet_type, 0xE0);
    assert_eq!(
        &response.payload()[..2],
        &cmderrs::ERROR_PACKET_PAYLOAD.to_be_bytes()
    );
    assert_eq!(handler.properties, 0);
}

#[test]
fn test_custom_format_install_then_decode() {
    let mut session = Session::new();
    let mut handler = RecordingHandler::default();

    // Install type 0x73 = status(2) + timestamp(4).
    let def = [0x73, 0x02, 0x01, 0x00, 0x02, 0x02, 0x00, 0x04];
    let response = session.process_packet(
        &Packet::from_parts(0xE0, PKT_CLIENT_FORMAT_DEF_24, &def),
        &mut handler,
    );
    assert!(response.is_none());

    let event_payload = [0x00, 0x15, 0x62, 0xD5, 0x00, 0x00];
    let response = session.process_packet(
        &Packet::from_parts(0xE0, 0x73, &event_payload),
        &mut handler,
    );
    assert!(response.is_none());
    assert_eq!(handler.events, 1);
    assert_eq!(handler.last_status, 0x0015);
}

#[test]
fn test_unregistered_custom_type_naks() {
    let mut session = Session::new();
    let mut handler = RecordingHandler::default();
    let response = session
        .process_packet(&Packet::from_parts(0xE0, 0x74, &[0x00]), &mut handler)
        .expect("unknown custom type must NAK");
    assert_eq!(
        &response.payload()[..2],
        &cmderrs::ERROR_PACKET_TYPE.to_be_bytes()
    );
}

#[test]
fn test_malformed_event_naks() {
    let mut session = Session::new();
    let mut handler = RecordingHandler::default();
    let response = session
        .process_packet(&Packet::from_parts(0xE0, 0x30, &[0xF1]), &mut handler)
        .expect("short event must NAK");
    assert_eq!(
        &response.payload()[..2],
        &cmderrs::ERROR_PACKET_PAYLOAD.to_be_bytes()
    );
    assert_eq!(handler.events, 0);
}

#[test]
fn test_sequence_stitching_across_events() {
    let mut session = Session::new();
    let mut handler = RecordingHandler::default();
    session.sequence_mut().set_base(0x0001_02FF);

    // 1-byte suffix 0x07 against base 0x000102FF -> 0x00010207.
    session.process_packet(&fixed_std_packet(), &mut handler);
    assert_eq!(handler.last_sequence, 0x0001_0207);
    assert_eq!(session.sequence().base(), 0x0001_0207);
}

#[test]
fn test_eob_flags() {
    let mut session = Session::new();
    let mut handler = RecordingHandler::default();
    session.process_packet(&Packet::from_parts(0xE0, 0x01, &[]), &mut handler);
    assert!(session.client_has_more());
    session.process_packet(&Packet::from_parts(0xE0, 0x00, &[]), &mut handler);
    assert!(!session.client_has_more());
}

#[test]
fn test_stitch_widths() {
    let mut tracker = SequenceTracker::new();
    tracker.set_base(0xAABB_CCDD);
    assert_eq!(tracker.stitch(0x11, 1), 0xAABB_CC11);
    assert_eq!(tracker.stitch(0x2233, 2), 0xAABB_2233);
    assert_eq!(tracker.stitch(0x9988_7766, 4), 0x9988_7766);
    assert_eq!(tracker.stitch(0, 0), 0x9988_7766);
}
