//! Per-client session state for the server side of a link: negotiated
//! encoding, client identification, the custom-format overlay, and the
//! sequence base used to reconstitute shortened event counters.
//!
//! The codec itself is callback-free; this module is the dispatch layer
//! that walks a parsed packet to the right [`PacketHandler`] method and
//! produces the NAK packets the protocol expects on malformed input.
use crate::core::IdBytes;
use crate::error::FrameError;
use crate::protocol::cmderrs;
use crate::protocol::events::{decoder::decode_event, Event, FieldMask};
use crate::protocol::formats::{event_fields, CustomFormats};
use crate::protocol::packet::{
    ClientPacketKind, Encoding, EncodingMask, Packet, PacketBuilder, PacketEncoding,
    ServerPacketType,
};
use crate::protocol::transport::framer::Framer;
use crate::protocol::transport::traits::byte_link::ByteSource;

//==================================================================================HANDLER

/// Interface a server application implements to consume client packets.
/// Dispatch lives here, above the codec; unimplemented methods default to
/// dropping the data.
pub trait PacketHandler {
    /// A link was established; identification packets follow.
    fn on_client_init(&mut self) {}

    /// A decoded event, with the mask of populated fields. The sequence
    /// attribute has already been stitched against the session base.
    fn on_event(&mut self, packet: &Packet, event: &Event, mask: &FieldMask);

    /// A property value report.
    fn on_property(&mut self, key: u16, value: &[u8]) {
        let _ = (key, value);
    }

    /// A diagnostic report.
    fn on_diagnostic(&mut self, code: u16, data: &[u8]) {
        let _ = (code, data);
    }

    /// A client error report.
    fn on_error(&mut self, code: u16, data: &[u8]) {
        let _ = (code, data);
    }
}

//==================================================================================SEQUENCE

/// Reconstitutes full 32-bit event sequence counters from the shortened
/// suffix a packet carries, against the last full value this session saw.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceTracker {
    base: u32,
}

impl SequenceTracker {
    pub const fn new() -> Self {
        Self { base: 0 }
    }

    /// Seed the base, e.g. from a persisted acknowledge position.
    pub fn set_base(&mut self, base: u32) {
        self.base = base;
    }

    /// Stitch an in-packet sequence of `len` wire bytes into a full
    /// counter and advance the base.
    pub fn stitch(&mut self, sequence: u32, len: usize) -> u32 {
        let full = if len == 0 {
            self.base
        } else if len >= 4 {
            sequence
        } else {
            let mask = (1u32 << (8 * len)) - 1;
            (self.base & !mask) | (sequence & mask)
        };
        self.base = full;
        full
    }

    /// Last full counter observed.
    pub fn base(&self) -> u32 {
        self.base
    }
}

//==================================================================================SESSION

/// State owned by one client connection. Short-lived packets flow through;
/// the session keeps only what must survive between them.
#[derive(Debug)]
pub struct Session {
    /// Encodings this server end accepts for its replies.
    encoding_mask: EncodingMask,
    /// Encoding adopted from the client's frames.
    encoding: PacketEncoding,
    unique_id: IdBytes,
    account_id: IdBytes,
    device_id: IdBytes,
    /// Custom-format overlay installed by 0xCF packets on this session.
    formats: CustomFormats,
    sequence: SequenceTracker,
    /// Client announced more pending data at its last end-of-block.
    client_has_more: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            encoding_mask: EncodingMask::all(),
            encoding: PacketEncoding::new(Encoding::Binary),
            unique_id: IdBytes::new(),
            account_id: IdBytes::new(),
            device_id: IdBytes::new(),
            formats: CustomFormats::new(),
            sequence: SequenceTracker::new(),
            client_has_more: false,
        }
    }

    /// Announce the link to the handler. Call once per connection.
    pub fn begin<H: PacketHandler>(&mut self, handler: &mut H) {
        handler.on_client_init();
    }

    /// Adopt the encoding the client last used, so replies match.
    pub fn adopt_encoding(&mut self, encoding: PacketEncoding) {
        self.encoding = PacketEncoding {
            encoding: self.encoding_mask.resolve(encoding.encoding),
            checksum: encoding.checksum,
        };
    }

    /// Encoding to use for reply frames.
    pub fn reply_encoding(&self) -> PacketEncoding {
        self.encoding
    }

    pub fn encoding_mask(&self) -> &EncodingMask {
        &self.encoding_mask
    }

    pub fn encoding_mask_mut(&mut self) -> &mut EncodingMask {
        &mut self.encoding_mask
    }

    pub fn unique_id(&self) -> &[u8] {
        self.unique_id.as_slice()
    }

    pub fn account_id(&self) -> &str {
        self.account_id.as_str()
    }

    pub fn device_id(&self) -> &str {
        self.device_id.as_str()
    }

    /// Custom-format overlay (e.g. to persist or pre-seed layouts).
    pub fn formats(&self) -> &CustomFormats {
        &self.formats
    }

    pub fn formats_mut(&mut self) -> &mut CustomFormats {
        &mut self.formats
    }

    pub fn sequence(&self) -> &SequenceTracker {
        &self.sequence
    }

    /// Mutable tracker access, e.g. to seed the base from a persisted
    /// acknowledge position.
    pub fn sequence_mut(&mut self) -> &mut SequenceTracker {
        &mut self.sequence
    }

    /// True when the client's last end-of-block promised more data.
    pub fn client_has_more(&self) -> bool {
        self.client_has_more
    }

    /// Reset everything a fresh connection must not inherit.
    pub fn reset(&mut self) {
        self.formats.clear();
        self.client_has_more = false;
        self.encoding = PacketEncoding::new(Encoding::Binary);
    }

    //==================================================================================DISPATCH

    /// Dispatch one client packet. Returns the response packet the server
    /// should queue, if the protocol calls for one (currently only NAKs;
    /// acknowledge/EOB policy lives above this layer).
    pub fn process_packet<H: PacketHandler>(
        &mut self,
        packet: &Packet,
        handler: &mut H,
    ) -> Option<Packet> {
        match packet.client_kind() {
            ClientPacketKind::EobDone => {
                self.client_has_more = false;
                None
            }
            ClientPacketKind::EobMore => {
                self.client_has_more = true;
                None
            }

            ClientPacketKind::UniqueId => {
                self.unique_id = IdBytes::from_slice(packet.payload());
                None
            }
            ClientPacketKind::AccountId => {
                self.account_id = IdBytes::from_slice(packet.payload());
                None
            }
            ClientPacketKind::DeviceId => {
                self.device_id = IdBytes::from_slice(packet.payload());
                None
            }

            ClientPacketKind::FixedFormat(code)
            | ClientPacketKind::ServiceFormat(code)
            | ClientPacketKind::CustomFormat(code) => self.dispatch_event(code, packet, handler),

            ClientPacketKind::PropertyValue => match split_key_payload(packet.payload()) {
                Some((key, value)) => {
                    handler.on_property(key, value);
                    None
                }
                None => Some(self.nak(cmderrs::ERROR_PACKET_PAYLOAD, packet)),
            },

            ClientPacketKind::FormatDef24 => {
                match self.formats.install_from_payload(packet.payload()) {
                    Ok(_) => None,
                    Err(_err) => {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("rejected custom format definition");
                        Some(self.nak(cmderrs::ERROR_PACKET_PAYLOAD, packet))
                    }
                }
            }

            ClientPacketKind::Diagnostic => match split_key_payload(packet.payload()) {
                Some((code, data)) => {
                    handler.on_diagnostic(code, data);
                    None
                }
                None => Some(self.nak(cmderrs::ERROR_PACKET_PAYLOAD, packet)),
            },
            ClientPacketKind::Error => match split_key_payload(packet.payload()) {
                Some((code, data)) => {
                    handler.on_error(code, data);
                    None
                }
                None => Some(self.nak(cmderrs::ERROR_PACKET_PAYLOAD, packet)),
            },

            ClientPacketKind::Unknown(_) => Some(self.nak(cmderrs::ERROR_PACKET_TYPE, packet)),
        }
    }

    /// Read one packet from the link, adopt its encoding for replies, and
    /// dispatch it. Returns the response packet to queue, if any.
    pub async fn poll<S, H>(
        &mut self,
        framer: &Framer,
        source: &mut S,
        handler: &mut H,
    ) -> Result<Option<Packet>, FrameError<S::Error>>
    where
        S: ByteSource,
        H: PacketHandler,
    {
        let (packet, encoding) = framer.read_packet(source).await?;
        self.adopt_encoding(encoding);
        Ok(self.process_packet(&packet, handler))
    }

    fn dispatch_event<H: PacketHandler>(
        &mut self,
        code: u8,
        packet: &Packet,
        handler: &mut H,
    ) -> Option<Packet> {
        let fields = match event_fields(code, &self.formats) {
            Ok(fields) => fields,
            Err(_) => {
                // Event type with no known layout, static or installed.
                return Some(self.nak(cmderrs::ERROR_PACKET_TYPE, packet));
            }
        };

        match decode_event(fields, packet.payload()) {
            Ok((mut event, mask)) => {
                if event.sequence_len > 0 {
                    event.sequence = self.sequence.stitch(event.sequence, event.sequence_len);
                }
                handler.on_event(packet, &event, &mask);
                None
            }
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("event decode failed for packet type {}", code);
                Some(self.nak(cmderrs::ERROR_PACKET_PAYLOAD, packet))
            }
        }
    }

    /// Build the NAK for a rejected packet: error code, then the offending
    /// header and type.
    fn nak(&self, code: u16, packet: &Packet) -> Packet {
        PacketBuilder::server(ServerPacketType::Error)
            .uint(u32::from(code), 2)
            .uint(u32::from(packet.header), 2)
            .uint(u32::from(packet.packet_type), 2)
            .finish()
            .unwrap_or_else(|_| Packet::new(ServerPacketType::Error.type_code()))
    }
}

/// Split a `[key:u16][data...]` payload.
fn split_key_payload(payload: &[u8]) -> Option<(u16, &[u8])> {
    if payload.len() < 2 {
        return None;
    }
    let key = u16::from(payload[0]) << 8 | u16::from(payload[1]);
    Some((key, &payload[2..]))
}

//==================================================================================TESTS

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
