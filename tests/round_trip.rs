//! Framing round-trip scenarios: one fixed-format event carried over the
//! binary, hex and base64 encodings must frame, parse and decode to the
//! same record on every path.

mod helpers;

use dmtp_codec::error::FrameError;
use dmtp_codec::protocol::events::decoder::decode_event;
use dmtp_codec::protocol::formats::standard_fields;
use dmtp_codec::protocol::packet::{
    Encoding, EncodingMask, Packet, PacketEncoding,
};
use dmtp_codec::protocol::transport::framer::Framer;
use helpers::MockLink;

/// Fixed low-resolution event: status 0xF123, timestamp 0x62D50000,
/// speed 50 kph, heading 180 deg, distance 300 km, sequence 7.
const FIXED_STD_PAYLOAD: [u8; 20] = [
    0xF1, 0x23, 0x62, 0xD5, 0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x32, 0x80, 0x00,
    0x00, 0x00, 0x01, 0x2C, 0x07,
];

fn event_packet() -> Packet {
    Packet::from_parts(0xE0, 0x30, &FIXED_STD_PAYLOAD)
}

async fn round_trip(encoding: PacketEncoding) -> (Packet, PacketEncoding) {
    let framer = Framer::default();
    let packet = event_packet();

    let mut frame = [0u8; 600];
    let len = framer
        .encode_packet(&packet, encoding, &EncodingMask::all(), &mut frame)
        .expect("encode");

    let mut source = MockLink::from_script(&frame[..len]);
    framer.read_packet(&mut source).await.expect("parse")
}

#[tokio::test]
async fn test_binary_round_trip() {
    let (parsed, encoding) = round_trip(PacketEncoding::new(Encoding::Binary)).await;
    assert_eq!(parsed, event_packet());
    assert_eq!(encoding.encoding, Encoding::Binary);
}

#[tokio::test]
async fn test_text_round_trips_with_and_without_checksum() {
    for encoding in [Encoding::Base64, Encoding::Hex] {
        let (parsed, seen) = round_trip(PacketEncoding::new(encoding)).await;
        assert_eq!(parsed, event_packet(), "{encoding:?}");
        assert_eq!(seen.encoding, encoding);
        assert!(!seen.checksum);

        let (parsed, seen) = round_trip(PacketEncoding::with_checksum(encoding)).await;
        assert_eq!(parsed, event_packet(), "{encoding:?} + cksum");
        assert!(seen.checksum);
    }
}

#[tokio::test]
async fn test_encoding_equivalence_for_events() {
    // Every legal encoding of the same packet decodes to the same Event.
    let fields = standard_fields(0x30).expect("fixed layout");
    let (reference, reference_mask) = decode_event(fields, &FIXED_STD_PAYLOAD).expect("decode");
    assert_eq!(reference.status_code, 0xF123);
    assert_eq!(reference.timestamp[0], 0x62D5_0000);
    assert_eq!(reference.speed_kph, 50.0);
    assert_eq!(reference.heading_deg, 180.0);
    assert_eq!(reference.sequence, 7);

    for encoding in [Encoding::Binary, Encoding::Base64, Encoding::Hex] {
        let (parsed, _) = round_trip(PacketEncoding::with_checksum(encoding)).await;
        let (event, mask) = decode_event(fields, parsed.payload()).expect("decode");
        assert_eq!(event, reference, "{encoding:?}");
        assert_eq!(mask, reference_mask);
    }
}

#[tokio::test]
async fn test_tampered_checksum_is_rejected() {
    let framer = Framer::default();
    let mut frame = [0u8; 600];
    let len = framer
        .encode_packet(
            &event_packet(),
            PacketEncoding::with_checksum(Encoding::Hex),
            &EncodingMask::all(),
            &mut frame,
        )
        .expect("encode");

    // Flip one checksum hex digit (positions len-3/len-2, before '\r').
    frame[len - 2] = if frame[len - 2] == b'0' { b'1' } else { b'0' };

    let mut source = MockLink::from_script(&frame[..len]);
    let err = framer.read_packet(&mut source).await.unwrap_err();
    assert!(matches!(err, FrameError::ChecksumFailed));
}

#[tokio::test]
async fn test_header_detection_and_failures() {
    let framer = Framer::default();

    // Invalid leading octet.
    let mut source = MockLink::from_script(&[0x55, 0x30, 0x00]);
    assert!(matches!(
        framer.read_packet(&mut source).await.unwrap_err(),
        FrameError::HeaderInvalid { header: 0x55 }
    ));

    // Idle stream.
    let mut source = MockLink::from_script(&[]);
    assert!(matches!(
        framer.read_packet(&mut source).await.unwrap_err(),
        FrameError::Timeout
    ));

    // Binary frame cut short after the header.
    let mut source = MockLink::from_script(&[0xE0, 0x30, 0x14, 0xF1, 0x23]);
    assert!(matches!(
        framer.read_packet(&mut source).await.unwrap_err(),
        FrameError::ShortRead
    ));

    // ASCII frame starved before '\r'.
    let mut source = MockLink::from_script(b"$E030:F1");
    assert!(matches!(
        framer.read_packet(&mut source).await.unwrap_err(),
        FrameError::Timeout
    ));
}

#[tokio::test]
async fn test_write_packet_through_sink() {
    let framer = Framer::default();
    let (mut client, mut server) = MockLink::create_pair();

    let written = framer
        .write_packet(
            &mut client,
            &event_packet(),
            PacketEncoding::new(Encoding::Base64),
            &EncodingMask::all(),
        )
        .await
        .expect("write");
    assert!(written > 0);

    let (parsed, encoding) = framer.read_packet(&mut server).await.expect("read back");
    assert_eq!(parsed, event_packet());
    assert_eq!(encoding.encoding, Encoding::Base64);
}

#[tokio::test]
async fn test_oversized_ascii_frame() {
    // 700 characters with no terminator exceed the encoded-length bound.
    let mut junk = vec![b'$'; 1];
    junk.extend(std::iter::repeat(b'A').take(700));
    let mut source = MockLink::from_script(&junk);
    let err = Framer::default().read_packet(&mut source).await.unwrap_err();
    assert!(matches!(err, FrameError::PacketTooLong { .. }));
}
