//! Quickstart: frame a fixed-format event the way a tracker would send it,
//! read it back off an in-memory link, and decode it into an event record.
//!
//! Run with: `cargo run --example quickstart`

use dmtp_codec::protocol::events::decoder::decode_event;
use dmtp_codec::protocol::formats::standard_fields;
use dmtp_codec::protocol::packet::{Encoding, EncodingMask, Packet, PacketEncoding};
use dmtp_codec::protocol::transport::framer::Framer;
use dmtp_codec::protocol::transport::traits::byte_link::ByteSource;

/// Byte source over a canned script, as a stand-in for a socket.
struct ScriptSource {
    data: Vec<u8>,
    pos: usize,
}

impl ByteSource for ScriptSource {
    type Error = ();

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // A fixed low-resolution event: status, timestamp, GPS point, speed,
    // heading, altitude, distance, sequence.
    let payload: [u8; 20] = [
        0xF1, 0x23, // status code
        0x62, 0xD5, 0x00, 0x00, // timestamp
        0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, // packed GPS point
        0x32, // speed (kph)
        0x80, // heading (x360/256 deg)
        0x00, 0x00, // altitude (m)
        0x00, 0x01, 0x2C, // distance (km)
        0x07, // sequence
    ];
    let packet = Packet::from_parts(0xE0, 0x30, &payload);

    // Frame it as ASCII/hex with a checksum, the way a tracker on a text
    // link would emit it.
    let framer = Framer::default();
    let mut frame = [0u8; 600];
    let len = framer
        .encode_packet(
            &packet,
            PacketEncoding::with_checksum(Encoding::Hex),
            &EncodingMask::all(),
            &mut frame,
        )
        .expect("encode");
    println!("wire: {}", String::from_utf8_lossy(&frame[..len - 1]));

    // Read it back and decode the payload against the static layout.
    let mut source = ScriptSource {
        data: frame[..len].to_vec(),
        pos: 0,
    };
    let (parsed, encoding) = framer.read_packet(&mut source).await.expect("read");
    println!("encoding: {:?} (checksum: {})", encoding.encoding, encoding.checksum);

    let fields = standard_fields(parsed.packet_type).expect("fixed layout");
    let (event, mask) = decode_event(fields, parsed.payload()).expect("decode");

    println!("status:   0x{:04X}", event.status_code);
    println!("time:     {}", event.timestamp[0]);
    println!(
        "position: {:.5}, {:.5}",
        event.gps_point[0].latitude, event.gps_point[0].longitude
    );
    println!("speed:    {:.1} kph @ {:.1} deg", event.speed_kph, event.heading_deg);
    println!("distance: {:.1} km", event.distance_km);
    println!("sequence: {} ({} byte)", event.sequence, event.sequence_len);
    println!("unknown fields skipped: {}", mask.has_unknown_fields());
}
