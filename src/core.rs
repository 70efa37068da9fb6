//! Defines the data contract between the format tables (static and
//! runtime-registered) and the event decoding engine.
//!
//! The descriptor types in this module mirror the 24-bit field definitions
//! carried on the wire by format-definition packets; the engine consumes
//! them to parse binary event payloads.

// Maximum binary payload carried by one packet.
pub const MAX_PAYLOAD_LENGTH: usize = 255;

// (with excess) largest possible ASCII encoded packet.
pub const MAX_ENCODED_LENGTH: usize = 600;

/// Maximum number of separate fields used in one packet format.
pub const MAX_FIELD_COUNT: usize = 16;

/// Maximum length of account/device/entity identifier strings.
pub const MAX_ID_LENGTH: usize = 20;

/// Packet header octet common to client and server packets in this
/// protocol revision.
pub const PACKET_HEADER_BASIC: u8 = 0xE0;

/// Semantic type of a field within an event payload.
///
/// The discriminants are the 7-bit type codes carried in the wire form of a
/// field definition. The comment on each entry gives the low-resolution and
/// (where it differs) high-resolution wire widths.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventFieldType {
    // Most common fields                  // Low                 High
    StatusCode = 0x01,      // %2u
    Timestamp = 0x02,       // %4u
    Index = 0x03,           // %4u 0 to 4294967295
    Sequence = 0x04,        // %1u 0 to 255

    // GPS fields
    GpsPoint = 0x06,        // %6g                  %8g
    GpsAge = 0x07,          // %2u 0 to 65535 sec
    Speed = 0x08,           // %1u 0 to 255 kph     %2u 0.0 to 6553.5 kph
    Heading = 0x09,         // %1u 1.412 deg unit   %2u 0.00 to 360.00 deg
    Altitude = 0x0A,        // %2i meters           %3i decimeters
    Distance = 0x0B,        // %3u kilometers       %3u km*10
    Odometer = 0x0C,        // %3u kilometers       %4u km*10

    // Misc fields
    GeofenceId = 0x0E,      // %4u
    TopSpeed = 0x0F,        // %1u 0 to 255 kph     %2u 0.0 to 6553.5 kph

    // String/ID fields ('A'..'Z', 'a'..'z', '0'..'9', '-', '.' only)
    String = 0x11,          // %*s
    StringPad = 0x12,       // %*s
    Entity = 0x15,          // %*s
    EntityPad = 0x16,       // %*s

    // Generic binary field
    Binary = 0x1A,          // %*b

    // Digital I/O fields
    InputId = 0x21,         // %4u
    InputState = 0x22,      // %4u
    OutputId = 0x24,        // %4u
    OutputState = 0x25,     // %4u
    ElapsedTime = 0x27,     // %3u 0 to 16777216 sec
    Counter = 0x28,         // %4u

    // Analog I/O fields
    Sensor32Low = 0x31,     // %4u
    Sensor32High = 0x32,    // %4u
    Sensor32Average = 0x33, // %4u

    // Temperature fields (+-126 is the low-res out-of-range sentinel)
    TempLow = 0x3A,         // %1i -126 to +126 C   %2i C*10
    TempHigh = 0x3B,        // %1i -126 to +126 C   %2i C*10
    TempAverage = 0x3C,     // %1i -126 to +126 C   %2i C*10

    // GPS quality fields
    GpsDgpsUpdate = 0x41,   // %2u 0 to 65535 sec
    GpsHorzAccuracy = 0x42, // %1u meters           %2u m*10
    GpsVertAccuracy = 0x43, // %1u meters           %2u m*10
    GpsSatellites = 0x44,   // %1u 0 to 12
    GpsMagVariation = 0x45, // %2i deg*100
    GpsQuality = 0x46,      // %1u (0=None 1=GPS 2=DGPS ...)
    GpsType = 0x47,         // %1u (1=None 2=2D 3=3D ...)
    GpsGeoidHeight = 0x48,  // %1i meters           %2i m*10
    GpsPdop = 0x49,         // %1u 0.0 to 25.5      %2u 0.0 to 99.9
    GpsHdop = 0x4A,         // %1u 0.0 to 25.5      %2u 0.0 to 99.9
    GpsVdop = 0x4B,         // %1u 0.0 to 25.5      %2u 0.0 to 99.9

    // OBC/J1708 fields
    ObcValue = 0x50,        // %*b (at least 4 bytes, includes mid/pid)
    ObcGeneric = 0x51,      // %4u
    ObcJ1708Fault = 0x52,   // %4u
    ObcDistance = 0x54,     // %3u kilometers       %4u km*10
    ObcEngineHours = 0x57,  // %3u hours*10
    ObcEngineRpm = 0x58,    // %2u 0 to 65535 rpm
    ObcCoolantTemp = 0x59,  // %1i -126 to 126 C    %2i C*10
    ObcCoolantLevel = 0x5A, // %1u percent          %2u %*10
    ObcOilLevel = 0x5B,     // %1u percent          %2u %*10
    ObcOilPressure = 0x5C,  // %1u kPa              %2u kPa*10
    ObcFuelLevel = 0x5D,    // %1u percent          %2u %*10
    ObcFuelEconomy = 0x5E,  // %1u kpl              %2u kpl*10
    ObcFuelUsed = 0x5F,     // %3u liters           %4u l*10
}

impl EventFieldType {
    /// Decode a 7-bit wire type code. Unknown codes return `None` and are
    /// skipped by the decoder for forward compatibility.
    pub fn from_wire(code: u8) -> Option<Self> {
        let ft = match code & 0x7F {
            0x01 => Self::StatusCode,
            0x02 => Self::Timestamp,
            0x03 => Self::Index,
            0x04 => Self::Sequence,
            0x06 => Self::GpsPoint,
            0x07 => Self::GpsAge,
            0x08 => Self::Speed,
            0x09 => Self::Heading,
            0x0A => Self::Altitude,
            0x0B => Self::Distance,
            0x0C => Self::Odometer,
            0x0E => Self::GeofenceId,
            0x0F => Self::TopSpeed,
            0x11 => Self::String,
            0x12 => Self::StringPad,
            0x15 => Self::Entity,
            0x16 => Self::EntityPad,
            0x1A => Self::Binary,
            0x21 => Self::InputId,
            0x22 => Self::InputState,
            0x24 => Self::OutputId,
            0x25 => Self::OutputState,
            0x27 => Self::ElapsedTime,
            0x28 => Self::Counter,
            0x31 => Self::Sensor32Low,
            0x32 => Self::Sensor32High,
            0x33 => Self::Sensor32Average,
            0x3A => Self::TempLow,
            0x3B => Self::TempHigh,
            0x3C => Self::TempAverage,
            0x41 => Self::GpsDgpsUpdate,
            0x42 => Self::GpsHorzAccuracy,
            0x43 => Self::GpsVertAccuracy,
            0x44 => Self::GpsSatellites,
            0x45 => Self::GpsMagVariation,
            0x46 => Self::GpsQuality,
            0x47 => Self::GpsType,
            0x48 => Self::GpsGeoidHeight,
            0x49 => Self::GpsPdop,
            0x4A => Self::GpsHdop,
            0x4B => Self::GpsVdop,
            0x50 => Self::ObcValue,
            0x51 => Self::ObcGeneric,
            0x52 => Self::ObcJ1708Fault,
            0x54 => Self::ObcDistance,
            0x57 => Self::ObcEngineHours,
            0x58 => Self::ObcEngineRpm,
            0x59 => Self::ObcCoolantTemp,
            0x5A => Self::ObcCoolantLevel,
            0x5B => Self::ObcOilLevel,
            0x5C => Self::ObcOilPressure,
            0x5D => Self::ObcFuelLevel,
            0x5E => Self::ObcFuelEconomy,
            0x5F => Self::ObcFuelUsed,
            _ => return None,
        };
        Some(ft)
    }

    /// 7-bit wire code for this field type.
    #[inline]
    pub fn wire_code(self) -> u8 {
        self as u8
    }

    /// Acceptable on-wire byte count for this type at the given resolution.
    /// Variable-width types (strings, binary) accept any length, where 0
    /// means "the remainder of the payload".
    pub fn wire_len_ok(self, hi_res: bool, length: u8) -> bool {
        match self {
            Self::String | Self::StringPad | Self::Entity | Self::EntityPad | Self::Binary
            | Self::ObcValue => true,
            Self::GpsPoint => {
                if hi_res {
                    length == 8
                } else {
                    length == 6
                }
            }
            // Scalar fields: any width the payload reader can consume. The
            // fixed formats use the canonical widths from the table above,
            // custom formats are allowed to shorten them.
            _ => (1..=4).contains(&length),
        }
    }
}

// Wire layout of a 24-bit field definition:
//   23:1  HiRes    0x800000
//   16:7  Type     0x7F0000
//    8:8  Index    0x00FF00
//    0:8  Length   0x0000FF

/// Descriptor for a single event payload field.
///
/// The type is stored as its raw 7-bit wire code so that layouts defined by
/// a newer protocol revision still walk correctly: the decoder skips over
/// fields whose code it does not know instead of rejecting the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldDescriptor {
    /// 7-bit field type code.
    pub type_code: u8,
    /// Selects the wider/finer-grained representation for the type.
    pub hi_res: bool,
    /// Array index when several instances of the same type share a packet.
    pub index: u8,
    /// On-wire byte count; 0 means "remainder of payload" for variable
    /// width types.
    pub length: u8,
}

impl FieldDescriptor {
    pub const fn new(field_type: EventFieldType, hi_res: bool, index: u8, length: u8) -> Self {
        Self {
            type_code: field_type as u8,
            hi_res,
            index,
            length,
        }
    }

    /// Descriptor with a raw (possibly unknown) type code.
    pub const fn from_raw(type_code: u8, hi_res: bool, index: u8, length: u8) -> Self {
        Self {
            type_code: type_code & 0x7F,
            hi_res,
            index,
            length,
        }
    }

    /// Semantic type, when the code is known to this implementation.
    pub fn field_type(&self) -> Option<EventFieldType> {
        EventFieldType::from_wire(self.type_code)
    }

    /// Serialize into the 24-bit wire form used by format-definition
    /// packets.
    pub fn to_wire24(&self) -> u32 {
        (u32::from(self.hi_res) << 23)
            | (u32::from(self.type_code & 0x7F) << 16)
            | (u32::from(self.index) << 8)
            | u32::from(self.length)
    }

    /// Parse the 24-bit wire form.
    pub fn from_wire24(word: u32) -> Self {
        Self {
            type_code: ((word >> 16) & 0x7F) as u8,
            hi_res: (word >> 23) & 0x01 != 0,
            index: ((word >> 8) & 0xFF) as u8,
            length: (word & 0xFF) as u8,
        }
    }
}

/// Descriptor for an entire event packet layout: a client packet type bound
/// to an ordered field list. Static layouts reference `'static` tables;
/// runtime layouts live in the custom-format registry.
#[derive(Debug, Clone, Copy)]
pub struct PacketDescriptor<'a> {
    /// Client packet type the layout applies to.
    pub packet_type: u8,
    /// Ordered field descriptors.
    pub fields: &'a [FieldDescriptor],
}

impl<'a> PacketDescriptor<'a> {
    /// Total fixed payload length demanded by the field list. Variable
    /// width trailing fields contribute zero.
    pub fn wire_length(&self) -> usize {
        self.fields.iter().map(|f| f.length as usize).sum()
    }
}

//==================================================================================PAYLOAD_BYTES

/// Inline payload storage for one packet. The protocol caps a payload at
/// 255 bytes and transmits its length as a single octet, so the length is
/// kept in wire form and a packet stays a plain `Copy` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadBytes {
    /// Length octet: number of valid bytes in `data`.
    len: u8,
    data: [u8; MAX_PAYLOAD_LENGTH],
}

impl PayloadBytes {
    /// Empty payload.
    pub const fn new() -> Self {
        Self {
            len: 0,
            data: [0; MAX_PAYLOAD_LENGTH],
        }
    }

    /// Payload holding a copy of `slice`. Bytes past the protocol bound
    /// are dropped; the framer and builder keep producers inside it.
    pub fn from_slice(slice: &[u8]) -> Self {
        let mut payload = Self::new();
        let take = slice.len().min(MAX_PAYLOAD_LENGTH);
        payload.data[..take].copy_from_slice(&slice[..take]);
        payload.len = take as u8;
        payload
    }

    /// Number of valid bytes, as the length octet transmits it.
    #[inline]
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Hand the free tail of the buffer to `fill` and grow the payload by
    /// however many bytes it reports written.
    pub fn extend_with<E>(
        &mut self,
        fill: impl FnOnce(&mut [u8]) -> Result<usize, E>,
    ) -> Result<(), E> {
        let start = self.len();
        let written = fill(&mut self.data[start..])?;
        self.len = (start + written) as u8;
        Ok(())
    }
}

impl Default for PayloadBytes {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================================================ID_BYTES

/// Identifier field (account, device and entity names): at most twenty
/// characters from the protocol's identifier alphabet (`A`..`Z`,
/// `a`..`z`, `0`..`9`, `-`, `.`), held inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdBytes {
    len: u8,
    data: [u8; MAX_ID_LENGTH],
}

impl IdBytes {
    /// Empty identifier.
    pub const fn new() -> Self {
        Self {
            len: 0,
            data: [0; MAX_ID_LENGTH],
        }
    }

    /// Identifier holding a copy of `slice`, truncated at capacity.
    pub fn from_slice(slice: &[u8]) -> Self {
        let mut id = Self::new();
        let take = slice.len().min(MAX_ID_LENGTH);
        id.data[..take].copy_from_slice(&slice[..take]);
        id.len = take as u8;
        id
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..usize::from(self.len)]
    }

    /// Identifier as `&str`. Decoded identifiers are validated ASCII, so
    /// the fallback only ever fires for raw unique-id bytes.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_slice()).unwrap_or("")
    }
}

impl Default for IdBytes {
    fn default() -> Self {
        Self::new()
    }
}

/// True for the characters permitted in ID/entity/string fields.
#[inline]
pub fn is_valid_id_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'-' || ch == b'.'
}

//==================================================================================GPS_POINT

/// A decoded GPS position in fractional degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Scale factor mapping `degrees + 90|180` onto an unsigned integer of
    /// `bits` bits: `((1 << (bits - 1)) - 1) / 180`.
    fn scale(bits: u32) -> f64 {
        (((1u64 << (bits - 1)) - 1) as f64) / 180.0
    }

    /// Encode one coordinate into `bits` bits. `offset` is 90 for latitude,
    /// 180 for longitude.
    fn encode_coord(deg: f64, offset: f64, bits: u32) -> u32 {
        let scaled = (deg + offset) * Self::scale(bits) + 0.5;
        if scaled <= 0.0 {
            0
        } else {
            scaled as u32
        }
    }

    #[inline]
    fn decode_coord(raw: u32, offset: f64, bits: u32) -> f64 {
        (raw as f64) / Self::scale(bits) - offset
    }

    /// Encoded latitude for the 6-byte (24-bit) or 8-byte (32-bit) form.
    pub fn encode_latitude(&self, bits: u32) -> u32 {
        Self::encode_coord(self.latitude, 90.0, bits)
    }

    /// Encoded longitude for the 6-byte (24-bit) or 8-byte (32-bit) form.
    pub fn encode_longitude(&self, bits: u32) -> u32 {
        Self::encode_coord(self.longitude, 180.0, bits)
    }

    /// Rebuild a point from its packed coordinates.
    pub fn from_encoded(lat_raw: u32, lon_raw: u32, bits: u32) -> Self {
        Self {
            latitude: Self::decode_coord(lat_raw, 90.0, bits),
            longitude: Self::decode_coord(lon_raw, 180.0, bits),
        }
    }
}
