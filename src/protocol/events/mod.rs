//! Decoded event records. An [`Event`] is the typed rendition of one event
//! packet payload; the paired [`FieldMask`] records which attributes the
//! walk actually populated, so consumers can distinguish unset defaults
//! from explicit zeros.
use crate::core::{GpsPoint, IdBytes, PayloadBytes};

pub mod decoder;

/// Timestamps an event may carry.
pub const MAX_TIMESTAMPS: usize = 2;
/// GPS points an event may carry.
pub const MAX_GPS_POINTS: usize = 2;
/// Geofence identifiers an event may carry.
pub const MAX_GEOFENCES: usize = 2;
/// Entity strings an event may carry.
pub const MAX_ENTITIES: usize = 2;
/// Generic strings an event may carry.
pub const MAX_STRINGS: usize = 2;
/// Elapsed-time counters an event may carry.
pub const MAX_ELAPSED: usize = 8;
/// Generic counters an event may carry.
pub const MAX_COUNTERS: usize = 8;
/// Analog sensor channels an event may carry.
pub const MAX_SENSORS: usize = 8;
/// Temperature channels an event may carry.
pub const MAX_TEMPS: usize = 4;
/// Raw OBC values an event may carry.
pub const MAX_OBC_VALUES: usize = 2;

/// Low-resolution temperature sentinel: |value| >= 126 means the probe was
/// out of range.
pub const TEMP_OUT_OF_RANGE: f64 = 126.0;

//==================================================================================OBC_VALUE

/// Raw OBC/J1708 parameter: message id, parameter id, and the parameter
/// bytes as read off the vehicle bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObcValue {
    pub mid: u16,
    pub pid: u16,
    pub len: usize,
    pub data: [u8; 21],
}

impl Default for ObcValue {
    fn default() -> Self {
        Self {
            mid: 0,
            pid: 0,
            len: 0,
            data: [0; 21],
        }
    }
}

impl ObcValue {
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

//==================================================================================EVENT

/// One decoded event record. Created per packet; all fields start at their
/// unset defaults and [`FieldMask`] tracks which ones a decode populated.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Event {
    pub status_code: u16,
    pub timestamp: [u32; MAX_TIMESTAMPS],
    pub index: u32,

    pub gps_point: [GpsPoint; MAX_GPS_POINTS],
    pub gps_age_sec: u32,
    pub speed_kph: f64,
    pub heading_deg: f64,
    pub altitude_m: f64,
    pub distance_km: f64,
    pub odometer_km: f64,

    /// Sequence suffix exactly as carried in the packet.
    pub sequence: u32,
    /// Number of bytes the sequence occupied on the wire; lets a session
    /// stitch the full counter back together.
    pub sequence_len: usize,

    pub geofence_id: [u32; MAX_GEOFENCES],
    pub top_speed_kph: f64,

    pub entity: [IdBytes; MAX_ENTITIES],
    pub string: [IdBytes; MAX_STRINGS],
    pub binary: PayloadBytes,

    pub input_id: u32,
    pub input_state: u32,
    pub output_id: u32,
    pub output_state: u32,
    pub elapsed_time_sec: [u32; MAX_ELAPSED],
    pub counter: [u32; MAX_COUNTERS],

    pub sensor32_low: [u32; MAX_SENSORS],
    pub sensor32_high: [u32; MAX_SENSORS],
    pub sensor32_average: [u32; MAX_SENSORS],

    pub temp_low_c: [f64; MAX_TEMPS],
    pub temp_high_c: [f64; MAX_TEMPS],
    pub temp_average_c: [f64; MAX_TEMPS],

    pub gps_dgps_update_sec: u32,
    pub gps_horz_accuracy_m: f64,
    pub gps_vert_accuracy_m: f64,
    pub gps_satellites: u32,
    pub gps_mag_variation_deg: f64,
    /// 0=none, 1=GPS, 2=DGPS, ...
    pub gps_quality: u32,
    /// 1=none, 2=2D, 3=3D, ...
    pub gps_2d3d: u32,
    pub gps_geoid_height_m: f64,
    pub gps_pdop: f64,
    pub gps_hdop: f64,
    pub gps_vdop: f64,

    pub obc_value: [ObcValue; MAX_OBC_VALUES],
    pub obc_generic: [u32; MAX_OBC_VALUES],
    pub obc_j1708_fault: [u32; MAX_OBC_VALUES],
    pub obc_distance_km: f64,
    pub obc_engine_hours: f64,
    pub obc_engine_rpm: u32,
    pub obc_coolant_temp_c: f64,
    pub obc_coolant_level: f64,
    pub obc_oil_level: f64,
    pub obc_oil_pressure_kpa: f64,
    pub obc_fuel_level: f64,
    pub obc_fuel_economy_kpl: f64,
    pub obc_fuel_used_l: f64,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }
}

//==================================================================================FIELD_MASK

/// Bitset keyed by `(field type code, index)` recording which fields were
/// populated during a decode, plus a marker for skipped unknown types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMask {
    /// One bit per index (0..8) for each 7-bit type code.
    bits: [u8; 128],
    unknown: bool,
}

impl Default for FieldMask {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMask {
    pub const fn new() -> Self {
        Self {
            bits: [0; 128],
            unknown: false,
        }
    }

    /// Mark `(type, index)` as populated.
    pub fn set(&mut self, type_code: u8, index: u8) {
        if index < 8 {
            self.bits[(type_code & 0x7F) as usize] |= 1 << index;
        }
    }

    /// True when `(type, index)` was populated.
    pub fn is_set(&self, type_code: u8, index: u8) -> bool {
        index < 8 && self.bits[(type_code & 0x7F) as usize] & (1 << index) != 0
    }

    /// Record that a descriptor with an unknown type was skipped.
    pub fn set_unknown(&mut self) {
        self.unknown = true;
    }

    /// True when the walk skipped at least one unknown field type.
    pub fn has_unknown_fields(&self) -> bool {
        self.unknown
    }

    /// True when no field was populated.
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|b| *b == 0)
    }
}
