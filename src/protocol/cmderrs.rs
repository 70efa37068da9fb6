//! Client error subcodes carried in the payload of error packets
//! (client type 0xE0 and the server NAK mirror). Only the codes produced
//! or consumed by this codec are listed.

/* packet errors */
pub const ERROR_PACKET_HEADER: u16 = 0xF111;
pub const ERROR_PACKET_TYPE: u16 = 0xF112;
pub const ERROR_PACKET_LENGTH: u16 = 0xF113;
pub const ERROR_PACKET_ENCODING: u16 = 0xF114;
pub const ERROR_PACKET_PAYLOAD: u16 = 0xF115;
pub const ERROR_PACKET_CHECKSUM: u16 = 0xF116;
pub const ERROR_PACKET_ACK: u16 = 0xF117;

/* protocol errors */
pub const ERROR_PROTOCOL_ERROR: u16 = 0xF121;

/* property errors */
pub const ERROR_PROPERTY_READ_ONLY: u16 = 0xF201;
pub const ERROR_PROPERTY_WRITE_ONLY: u16 = 0xF202;
pub const ERROR_PROPERTY_INVALID_ID: u16 = 0xF211;
pub const ERROR_PROPERTY_INVALID_VALUE: u16 = 0xF212;

/* command errors */
pub const ERROR_COMMAND_INVALID: u16 = 0xF311;
pub const ERROR_COMMAND_ERROR: u16 = 0xF321;

/* upload errors */
pub const ERROR_UPLOAD_TYPE: u16 = 0xF401;
pub const ERROR_UPLOAD_LENGTH: u16 = 0xF411;
pub const ERROR_UPLOAD_OFFSET_OVERLAP: u16 = 0xF412;
pub const ERROR_UPLOAD_OFFSET_GAP: u16 = 0xF413;
pub const ERROR_UPLOAD_OFFSET_OVERFLOW: u16 = 0xF414;
pub const ERROR_UPLOAD_FILE_NAME: u16 = 0xF421;
pub const ERROR_UPLOAD_CHECKSUM: u16 = 0xF431;
// Queued by the layer that persists a finished image, not by the assembler.
pub const ERROR_UPLOAD_SAVE: u16 = 0xF441;

/* GPS errors */
pub const ERROR_GPS_EXPIRED: u16 = 0xF911;
pub const ERROR_GPS_FAILURE: u16 = 0xF912;
