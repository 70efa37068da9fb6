//! DMTP packet model: the typed container for one protocol message, the
//! client/server type tables, the payload encodings, and the typed packet
//! builder.
//!
//! General binary packet format:
//!   `[0xE0] [type:u8] [len:u8] [payload: len bytes]`
//!
//! General ASCII packet format:
//!   `'$' <4 hex: header,type> <enc char> <encoded payload> ['*' <2 hex>] '\r'`
use crate::core::{GpsPoint, PayloadBytes, MAX_FIELD_COUNT, PACKET_HEADER_BASIC};
use crate::error::FmtError;
use crate::infra::codec::payload::PayloadWriter;

/// Start-of-frame character for ASCII encoded packets.
pub const PACKET_ASCII_ENCODING_CHAR: u8 = b'$';
/// ASCII frame terminator.
pub const PACKET_ASCII_ENCODING_EOL: u8 = b'\r';

pub const ENCODING_BASE64_CHAR: u8 = b'=';
pub const ENCODING_HEX_CHAR: u8 = b':';
pub const ENCODING_CSV_CHAR: u8 = b',';

//==================================================================================CLIENT_TYPES

/// Classified client packet type. Fixed, service-provider and custom event
/// formats are ranges, so the classification carries the low type nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientPacketKind {
    /// End of block/transmission, "no more to say".
    EobDone,
    /// End of block/transmission, "I have more to say".
    EobMore,
    /// Unique identifier (4 to 20 bytes).
    UniqueId,
    /// Case-insensitive ASCII account identifier.
    AccountId,
    /// Case-insensitive ASCII device identifier.
    DeviceId,
    /// Standard fixed format event, 0x30..=0x3F.
    FixedFormat(u8),
    /// DMT service provider format, 0x50..=0x5F.
    ServiceFormat(u8),
    /// Custom format event, 0x70..=0x7F.
    CustomFormat(u8),
    /// Property value report.
    PropertyValue,
    /// Custom format definition (24-bit field definitions).
    FormatDef24,
    /// Diagnostic codes.
    Diagnostic,
    /// Error codes.
    Error,
    /// Type code not defined by this protocol revision.
    Unknown(u8),
}

impl ClientPacketKind {
    /// Classify a client packet type octet.
    pub fn from_type_code(code: u8) -> Self {
        match code {
            0x00 => Self::EobDone,
            0x01 => Self::EobMore,
            0x11 => Self::UniqueId,
            0x12 => Self::AccountId,
            0x13 => Self::DeviceId,
            0x30..=0x3F => Self::FixedFormat(code),
            0x50..=0x5F => Self::ServiceFormat(code),
            0x70..=0x7F => Self::CustomFormat(code),
            0xB0 => Self::PropertyValue,
            0xCF => Self::FormatDef24,
            0xD0 => Self::Diagnostic,
            0xE0 => Self::Error,
            other => Self::Unknown(other),
        }
    }

    /// Type octet for this classification.
    pub fn type_code(self) -> u8 {
        match self {
            Self::EobDone => 0x00,
            Self::EobMore => 0x01,
            Self::UniqueId => 0x11,
            Self::AccountId => 0x12,
            Self::DeviceId => 0x13,
            Self::FixedFormat(code) | Self::ServiceFormat(code) | Self::CustomFormat(code) => code,
            Self::PropertyValue => 0xB0,
            Self::FormatDef24 => 0xCF,
            Self::Diagnostic => 0xD0,
            Self::Error => 0xE0,
            Self::Unknown(code) => code,
        }
    }
}

/// Standard fixed-format event, standard resolution GPS.
pub const PKT_CLIENT_FIXED_FMT_STD: u8 = 0x30;
/// Standard fixed-format event, high resolution GPS.
pub const PKT_CLIENT_FIXED_FMT_HIGH: u8 = 0x31;
/// Custom format definition packet.
pub const PKT_CLIENT_FORMAT_DEF_24: u8 = 0xCF;

/// True for packet types that carry an event payload: the fixed-format
/// range, the service-provider range, and the custom range.
pub fn is_event_packet(type_code: u8) -> bool {
    matches!(type_code, 0x30..=0x3F | 0x50..=0x5F | 0x70..=0x7F)
}

//==================================================================================SERVER_TYPES

/// Server originated packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServerPacketType {
    /// End of transmission, query response.
    EobDone = 0x00,
    /// End of transmission, speak freely.
    EobSpeakFreely = 0x01,
    /// Acknowledge a sequence.
    Ack = 0xA0,
    /// Get property.
    GetProperty = 0xB0,
    /// Set property.
    SetProperty = 0xB1,
    /// File upload record.
    FileUpload = 0xC0,
    /// NAK/error codes.
    Error = 0xE0,
    /// End transmission (link will be closed).
    Eot = 0xFF,
}

impl ServerPacketType {
    #[inline]
    pub fn type_code(self) -> u8 {
        self as u8
    }

    /// Classify a server packet type octet.
    pub fn from_type_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::EobDone),
            0x01 => Some(Self::EobSpeakFreely),
            0xA0 => Some(Self::Ack),
            0xB0 => Some(Self::GetProperty),
            0xB1 => Some(Self::SetProperty),
            0xC0 => Some(Self::FileUpload),
            0xE0 => Some(Self::Error),
            0xFF => Some(Self::Eot),
            _ => None,
        }
    }

    /// Canonical payload format for this packet type.
    pub fn payload_format(self) -> &'static [u8] {
        match self {
            Self::EobDone | Self::EobSpeakFreely | Self::Eot => b"",
            Self::Ack => b"%*u",
            Self::GetProperty => b"%2u",
            Self::SetProperty => b"%2u%*b",
            Self::FileUpload => b"%1x%3u%*b",
            Self::Error => b"%2u",
        }
    }
}

//==================================================================================ENCODING

/// Payload encoding of one framed packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Encoding {
    /// Raw binary triplet framing. Always supported.
    Binary,
    /// ASCII frame, base64 payload (preferred text form). Always supported.
    Base64,
    /// ASCII frame, hex payload. Always supported.
    Hex,
    /// ASCII frame, CSV payload. Emit-only; support optional.
    Csv,
}

impl Encoding {
    /// The encoding character placed after the 4 hex header digits.
    /// Binary frames carry no encoding character.
    pub fn encoding_char(self) -> Option<u8> {
        match self {
            Self::Binary => None,
            Self::Base64 => Some(ENCODING_BASE64_CHAR),
            Self::Hex => Some(ENCODING_HEX_CHAR),
            Self::Csv => Some(ENCODING_CSV_CHAR),
        }
    }

    fn mask_bit(self) -> u16 {
        match self {
            Self::Binary => 0x01,
            Self::Base64 => 0x02,
            Self::Hex => 0x04,
            Self::Csv => 0x08,
        }
    }
}

/// An encoding plus the ASCII checksum flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketEncoding {
    pub encoding: Encoding,
    /// Append/verify the `*HH` XOR suffix on ASCII frames.
    pub checksum: bool,
}

impl PacketEncoding {
    pub const fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            checksum: false,
        }
    }

    pub const fn with_checksum(encoding: Encoding) -> Self {
        Self {
            encoding,
            checksum: true,
        }
    }
}

/// Set of encodings a session supports. Binary, base64 and hex are
/// mandatory and cannot be masked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncodingMask(u16);

impl EncodingMask {
    const REQUIRED: u16 = 0x01 | 0x02 | 0x04;

    /// Mandatory encodings only.
    pub const fn required() -> Self {
        Self(Self::REQUIRED)
    }

    /// Every encoding, CSV included.
    pub const fn all() -> Self {
        Self(Self::REQUIRED | 0x08)
    }

    pub fn supports(&self, encoding: Encoding) -> bool {
        self.0 & encoding.mask_bit() != 0
    }

    pub fn insert(&mut self, encoding: Encoding) {
        self.0 |= encoding.mask_bit();
    }

    pub fn remove(&mut self, encoding: Encoding) {
        self.0 &= !encoding.mask_bit();
        self.0 |= Self::REQUIRED;
    }

    /// Cheapest supported encoding, by emitted frame size:
    /// binary < base64 < hex < csv.
    pub fn cheapest(&self) -> Encoding {
        for encoding in [Encoding::Binary, Encoding::Base64, Encoding::Hex, Encoding::Csv] {
            if self.supports(encoding) {
                return encoding;
            }
        }
        // REQUIRED bits make this unreachable.
        Encoding::Binary
    }

    /// Resolve a requested encoding against the mask, falling back to the
    /// cheapest supported one when masked off.
    pub fn resolve(&self, requested: Encoding) -> Encoding {
        if self.supports(requested) {
            requested
        } else {
            self.cheapest()
        }
    }
}

impl Default for EncodingMask {
    fn default() -> Self {
        Self::required()
    }
}

//==================================================================================FMT_HINT

/// Capacity of a remembered format string: three characters per field plus
/// slack for one variable-width directive.
const FMT_HINT_CAPACITY: usize = MAX_FIELD_COUNT * 3 + 3;

/// Format string remembered by packets built through the typed builder.
/// Absent (empty) for packets parsed off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmtHint {
    len: usize,
    data: [u8; FMT_HINT_CAPACITY],
}

impl Default for FmtHint {
    fn default() -> Self {
        Self::new()
    }
}

impl FmtHint {
    pub const fn new() -> Self {
        Self {
            len: 0,
            data: [0; FMT_HINT_CAPACITY],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    fn push_directive(&mut self, width: Option<usize>, conv: u8) {
        if self.len + 3 > FMT_HINT_CAPACITY {
            // Builders cap out at MAX_FIELD_COUNT fields before this.
            return;
        }
        self.data[self.len] = b'%';
        self.data[self.len + 1] = match width {
            Some(n) => b'0' + n as u8,
            None => b'*',
        };
        self.data[self.len + 2] = conv;
        self.len += 3;
    }
}

//==================================================================================PACKET

/// A single protocol message. Value semantics; produced by the framer or
/// the builder, consumed by the decoder or the framer write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Protocol magic, `0xE0` in this revision.
    pub header: u8,
    /// Packet type octet.
    pub packet_type: u8,
    /// Payload bytes (at most 255).
    pub payload: PayloadBytes,
    /// Format hint preserved when the packet was built field by field.
    pub format: FmtHint,
}

impl Packet {
    /// Empty packet of the given type.
    pub fn new(packet_type: u8) -> Self {
        Self {
            header: PACKET_HEADER_BASIC,
            packet_type,
            payload: PayloadBytes::new(),
            format: FmtHint::new(),
        }
    }

    /// Packet from parsed wire parts.
    pub fn from_parts(header: u8, packet_type: u8, payload: &[u8]) -> Self {
        Self {
            header,
            packet_type,
            payload: PayloadBytes::from_slice(payload),
            format: FmtHint::new(),
        }
    }

    /// Classified client packet type.
    pub fn client_kind(&self) -> ClientPacketKind {
        ClientPacketKind::from_type_code(self.packet_type)
    }

    /// True when this packet carries an event payload.
    pub fn is_event(&self) -> bool {
        is_event_packet(self.packet_type)
    }

    /// Payload view.
    pub fn payload(&self) -> &[u8] {
        self.payload.as_slice()
    }
}

//==================================================================================BUILDER

/// Typed packet builder: each method appends both to the payload and to the
/// remembered format string, replacing the variadic initializer of older
/// implementations.
#[derive(Debug)]
pub struct PacketBuilder {
    packet: Packet,
    error: Option<FmtError>,
    fields: usize,
}

impl PacketBuilder {
    /// Start a client packet.
    pub fn client(kind: ClientPacketKind) -> Self {
        Self {
            packet: Packet::new(kind.type_code()),
            error: None,
            fields: 0,
        }
    }

    /// Start a server packet.
    pub fn server(packet_type: ServerPacketType) -> Self {
        Self {
            packet: Packet::new(packet_type.type_code()),
            error: None,
            fields: 0,
        }
    }

    fn append<F>(mut self, width: Option<usize>, conv: u8, write: F) -> Self
    where
        F: FnOnce(&mut PayloadWriter<'_>) -> Result<(), FmtError>,
    {
        if self.error.is_some() {
            return self;
        }
        if self.fields >= MAX_FIELD_COUNT {
            self.error = Some(FmtError::Overflow {
                asked: self.fields + 1,
                available: MAX_FIELD_COUNT,
            });
            return self;
        }
        let appended = self.packet.payload.extend_with(|tail| {
            let mut writer = PayloadWriter::new(tail);
            write(&mut writer)?;
            Ok(writer.written())
        });
        match appended {
            Ok(()) => {
                self.packet.format.push_directive(width, conv);
                self.fields += 1;
            }
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Append `%Nu`: an unsigned big-endian integer of `len` bytes.
    pub fn uint(self, value: u32, len: usize) -> Self {
        self.append(Some(len), b'u', |w| w.write_uint(value, len))
    }

    /// Append `%Ni`: a signed big-endian integer of `len` bytes.
    pub fn int(self, value: i32, len: usize) -> Self {
        self.append(Some(len), b'i', |w| w.write_int(value, len))
    }

    /// Append `%Nx`: an opaque integer displayed as hex.
    pub fn hex(self, value: u32, len: usize) -> Self {
        self.append(Some(len), b'x', |w| w.write_uint(value, len))
    }

    /// Append `%*u`: an unsigned integer of caller-chosen width.
    pub fn uint_var(self, value: u32, len: usize) -> Self {
        self.append(None, b'u', |w| w.write_uint(value, len))
    }

    /// Append `%Ng`: a packed GPS point of 6 or 8 bytes.
    pub fn gps(self, point: &GpsPoint, len: usize) -> Self {
        self.append(Some(len), b'g', |w| w.write_gps(point, len))
    }

    /// Append `%*s`: an identifier string NUL-padded to `width`.
    pub fn string(self, data: &[u8], width: usize) -> Self {
        self.append(None, b's', |w| w.write_string(data, width))
    }

    /// Append `%*b`: a raw byte run.
    pub fn bytes(self, data: &[u8]) -> Self {
        self.append(None, b'b', |w| w.write_bytes(data))
    }

    /// Finish the packet, reporting the first append error if any.
    pub fn finish(self) -> Result<Packet, FmtError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.packet),
        }
    }
}

//==================================================================================TESTS
