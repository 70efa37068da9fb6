//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (stream framing, payload
//! formatting, event decoding, custom-format registration, upload, etc.).
use crate::core::EventFieldType;
use thiserror_no_std::Error;

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors raised by the binary payload formatter (reader/writer and the
/// `%N?` directive interpreter).
pub enum FmtError {
    /// Directive width is missing or outside the supported 1..=4 range.
    #[error("Invalid format width digit: {digit}")]
    Digit { digit: u8 },
    /// Unrecognized directive character.
    #[error("Invalid format character: {ch}")]
    Char { ch: u8 },
    /// Destination buffer cannot hold the next field.
    #[error("Buffer overflow -> asked: {asked}, available: {available}")]
    Overflow { asked: usize, available: usize },
    /// Payload ended in the middle of a field.
    #[error("Payload underflow -> asked: {asked}, available: {available}")]
    Underflow { asked: usize, available: usize },
    /// String field contains a character outside the permitted set.
    #[error("Invalid identifier character: 0x{ch:02X}")]
    InvalidChar { ch: u8 },
    /// Supplied argument does not match the directive at that position.
    #[error("Directive/argument mismatch at position {ndx}")]
    ArgMismatch { ndx: usize },
    /// A variable-width directive appeared before the end of an unpack
    /// format, where no width argument can resolve it.
    #[error("Variable-width directive must be trailing: position {ndx}")]
    VarWidth { ndx: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors raised by the ASCII payload codecs (hex, base64, CSV).
pub enum TextError {
    /// Encountered a character that is not a hex digit.
    #[error("Invalid hex digit: 0x{ch:02X}")]
    HexDigit { ch: u8 },
    /// Hex payload has an odd number of digits.
    #[error("Odd hex digit count: {count}")]
    OddDigits { count: usize },
    /// Base64 payload could not be decoded.
    #[error("Malformed base64 payload")]
    Base64,
    /// Encoded output does not fit the destination buffer.
    #[error("Encoded text overflow -> asked: {asked}, available: {available}")]
    Overflow { asked: usize, available: usize },
    /// CSV emission could not re-read the payload through its format hint.
    #[error(transparent)]
    Fmt(#[from] FmtError),
}

//==================================================================================FRAME_ERROR

#[derive(Error, Debug)]
/// Errors encountered while reading or writing one framed packet.
/// All read failures are non-fatal to the codec; the session layer decides
/// whether to NAK, drop the link, or continue.
pub enum FrameError<E: core::fmt::Debug> {
    /// Leading octet is neither the binary header nor `$`.
    #[error("Invalid packet header: 0x{header:02X}")]
    HeaderInvalid { header: u8 },

    /// Stream returned no data mid-frame (starved or EOF).
    #[error("Stream timeout/EOF inside frame")]
    Timeout,

    /// Error reported by the byte source/sink itself.
    #[error("Transport error: {0:?}")]
    Transport(E),

    /// Stream delivered part of a frame and then stopped.
    #[error("Short read inside frame")]
    ShortRead,

    /// ASCII frame exceeded the encoded-length bound without a terminator.
    #[error("ASCII frame too long: {len}")]
    PacketTooLong { len: usize },

    /// ASCII XOR checksum mismatch.
    #[error("Frame checksum failed")]
    ChecksumFailed,

    /// Malformed ASCII frame: bad header digits, unsupported or
    /// unrecognized payload encoding, undecodable payload.
    #[error("Frame parse error")]
    Parse,

    /// Frame does not fit the destination buffer.
    #[error("Frame overflow -> asked: {asked}, available: {available}")]
    Overflow { asked: usize, available: usize },
}

//==================================================================================DECODE_ERROR

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors raised while decoding an event payload against a field list.
/// Fields are identified by their 7-bit wire type code.
pub enum DecodeError {
    /// Payload is shorter than the descriptor list demands.
    #[error("Payload underflow for field type 0x{type_code:02X}")]
    Underflow { type_code: u8 },

    /// String validation failure or otherwise malformed field content.
    #[error("Malformed field type 0x{type_code:02X}")]
    Parse { type_code: u8 },

    /// Descriptor total exceeds the payload bound.
    #[error("Descriptor total exceeds payload bound: {total}")]
    Overflow { total: usize },

    /// No format is known for the packet type (custom type without a
    /// registered definition).
    #[error("No format registered for packet type 0x{packet_type:02X}")]
    UnknownFormat { packet_type: u8 },

    /// Field index exceeds the capacity reserved in the event record.
    #[error("Field index out of range for type 0x{type_code:02X}: {index}")]
    IndexRange { type_code: u8, index: u8 },
}

//==================================================================================REGISTRY_ERROR

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors raised while installing a custom format definition.
pub enum RegistryError {
    /// Target packet type is outside the custom range.
    #[error("Packet type 0x{packet_type:02X} outside custom range")]
    TypeOutOfRange { packet_type: u8 },

    /// A field definition names a type code this implementation does not
    /// know; mandatory fields cannot be skipped at definition time.
    #[error("Unknown field type code: 0x{code:02X}")]
    UnknownFieldType { code: u8 },

    /// Field length is incompatible with the declared resolution.
    #[error("Invalid length {length} for field {field_type:?}")]
    FieldLength {
        field_type: EventFieldType,
        length: u8,
    },

    /// More fields than one packet format may carry.
    #[error("Too many fields: {count}")]
    TooManyFields { count: usize },

    /// Field lengths sum past the payload bound.
    #[error("Field lengths exceed payload bound: {total}")]
    DescriptorTotal { total: usize },

    /// Definition payload is truncated or otherwise malformed.
    #[error("Malformed format definition")]
    Malformed,
}

//==================================================================================UPLOAD_ERROR

#[derive(Error, Debug, PartialEq, Eq)]
/// Errors raised while assembling a server-initiated file upload.
/// Each maps to the protocol error subcode reported back to the server.
pub enum UploadError {
    /// Unrecognized upload record type.
    #[error("Invalid upload record type: {record_type}")]
    RecordType { record_type: u8 },
    /// Declared file size is zero, negative, or beyond the receive buffer.
    #[error("Invalid upload length: {size}")]
    Length { size: usize },
    /// Missing or oversized file name.
    #[error("Invalid upload file name")]
    FileName,
    /// Data record rewinds over bytes already received.
    #[error("Upload offset overlap at {offset}")]
    OffsetOverlap { offset: usize },
    /// Data record leaves a hole before its offset.
    #[error("Upload offset gap at {offset}")]
    OffsetGap { offset: usize },
    /// Data record extends past the declared file size.
    #[error("Upload data overflow at {offset}")]
    OffsetOverflow { offset: usize },
    /// Fletcher checksum mismatch at end-of-data.
    #[error("Upload checksum failed")]
    ChecksumFailed,
    /// Upload record payload is truncated.
    #[error("Truncated upload record")]
    Truncated,
}

impl UploadError {
    /// Protocol error subcode queued back at the server when this record
    /// is rejected.
    pub fn subcode(&self) -> u16 {
        use crate::protocol::cmderrs;
        match self {
            // A truncated record reads as record type zero, which the
            // protocol reports as an unknown type.
            Self::RecordType { .. } | Self::Truncated => cmderrs::ERROR_UPLOAD_TYPE,
            Self::Length { .. } => cmderrs::ERROR_UPLOAD_LENGTH,
            Self::FileName => cmderrs::ERROR_UPLOAD_FILE_NAME,
            Self::OffsetOverlap { .. } => cmderrs::ERROR_UPLOAD_OFFSET_OVERLAP,
            Self::OffsetGap { .. } => cmderrs::ERROR_UPLOAD_OFFSET_GAP,
            Self::OffsetOverflow { .. } => cmderrs::ERROR_UPLOAD_OFFSET_OVERFLOW,
            Self::ChecksumFailed => cmderrs::ERROR_UPLOAD_CHECKSUM,
        }
    }
}

