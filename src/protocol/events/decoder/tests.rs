//! End-to-end tests for the table-driven event decoder.
use super::*;
use crate::core::FieldDescriptor;
use crate::protocol::formats::{standard_fields, FIXED_FMT_HIGH, FIXED_FMT_STD};

/// 20-byte fixed low-resolution payload:
/// status 0xF123, timestamp 0x62D50000, GPS, speed 50 kph, heading 0x80,
/// altitude 0 m, distance 300 km, sequence 7.
fn fixed_std_payload() -> [u8; 20] {
    [
        0xF1, 0x23, // status
        0x62, 0xD5, 0x00, 0x00, // timestamp
        0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, // gps (6 bytes)
        0x32, // speed, kph
        0x80, // heading, x360/256
        0x00, 0x00, // altitude, m
        0x00, 0x01, 0x2C, // distance, km
        0x07, // sequence
    ]
}

#[test]
fn test_decode_fixed_std_event() {
    let (event, mask) = decode_event(FIXED_FMT_STD, &fixed_std_payload()).unwrap();

    assert_eq!(event.status_code, 0xF123);
    assert_eq!(event.timestamp[0], 0x62D5_0000);
    assert_eq!(event.speed_kph, 50.0);
    assert_eq!(event.heading_deg, 180.0);
    assert_eq!(event.altitude_m, 0.0);
    assert_eq!(event.distance_km, 300.0);
    assert_eq!(event.sequence, 7);
    assert_eq!(event.sequence_len, 1);

    // GPS coordinates decode from the packed 24-bit pair.
    let point = crate::core::GpsPoint::from_encoded(0xAABBCC, 0xDDEEFF, 24);
    assert!((event.gps_point[0].latitude - point.latitude).abs() < 1e-9);
    assert!((event.gps_point[0].longitude - point.longitude).abs() < 1e-9);

    for field in FIXED_FMT_STD {
        assert!(mask.is_set(field.type_code, field.index), "{field:?}");
    }
    assert!(!mask.has_unknown_fields());
    assert!(!mask.is_set(EventFieldType::Odometer as u8, 0));
}

#[test]
fn test_decode_fixed_high_event_scaling() {
    let mut payload = [0u8; 25];
    payload[0] = 0xF0;
    payload[1] = 0x20; // status
    payload[2..6].copy_from_slice(&0x62D5_0000u32.to_be_bytes()); // timestamp
    // gps 8 bytes left zeroed (decodes to -90/-180)
    payload[14..16].copy_from_slice(&1234u16.to_be_bytes()); // speed = 123.4 kph
    payload[16..18].copy_from_slice(&18000u16.to_be_bytes()); // heading = 180.00 deg
    payload[18..21].copy_from_slice(&[0xFF, 0xFC, 0x19]); // altitude = -999 dm2... -99.9 m
    payload[21..24].copy_from_slice(&[0x00, 0x0B, 0xB8]); // distance = 300.0 km
    payload[24] = 0x09; // sequence

    let (event, _mask) = decode_event(FIXED_FMT_HIGH, &payload).unwrap();
    assert_eq!(event.status_code, 0xF020);
    assert!((event.speed_kph - 123.4).abs() < 1e-9);
    assert!((event.heading_deg - 180.0).abs() < 1e-9);
    assert!((event.altitude_m + 99.9).abs() < 1e-9);
    assert!((event.distance_km - 300.0).abs() < 1e-9);
    assert_eq!(event.sequence, 9);
}

#[test]
fn test_underflow_stops_decode() {
    let payload = fixed_std_payload();
    let err = decode_event(FIXED_FMT_STD, &payload[..10]).unwrap_err();
    assert_eq!(
        err,
        DecodeError::Underflow {
            type_code: EventFieldType::GpsPoint as u8
        }
    );
}

#[test]
fn test_descriptor_total_bound() {
    let fields = [FieldDescriptor::new(EventFieldType::Binary, false, 0, 255); 2];
    assert_eq!(
        decode_event(&fields, &[]).unwrap_err(),
        DecodeError::Overflow { total: 510 }
    );
}

#[test]
fn test_string_field_validation() {
    let fields = [FieldDescriptor::new(EventFieldType::Entity, false, 0, 8)];
    let mut payload = [0u8; 8];
    payload[..5].copy_from_slice(b"rig-7");

    let (event, mask) = decode_event(&fields, &payload).unwrap();
    assert_eq!(event.entity[0].as_str(), "rig-7");
    assert!(mask.is_set(EventFieldType::Entity as u8, 0));

    payload[2] = b'!';
    assert_eq!(
        decode_event(&fields, &payload).unwrap_err(),
        DecodeError::Parse {
            type_code: EventFieldType::Entity as u8
        }
    );
}

#[test]
fn test_binary_length_zero_takes_remainder() {
    let fields = [
        FieldDescriptor::new(EventFieldType::StatusCode, false, 0, 2),
        FieldDescriptor::new(EventFieldType::Binary, false, 0, 0),
    ];
    let payload = [0xF0, 0x20, 0xDE, 0xAD, 0xBE, 0xEF];
    let (event, _mask) = decode_event(&fields, &payload).unwrap();
    assert_eq!(event.binary.as_slice(), &[0xDE, 0xAD, 0xBE, 0xEF]);
}

#[test]
fn test_unknown_field_type_skipped() {
    let fields = [
        FieldDescriptor::from_raw(0x7E, false, 0, 3),
        FieldDescriptor::new(EventFieldType::Sequence, false, 0, 1),
    ];
    let payload = [0xAA, 0xBB, 0xCC, 0x2A];
    let (event, mask) = decode_event(&fields, &payload).unwrap();
    assert_eq!(event.sequence, 0x2A);
    assert!(mask.has_unknown_fields());
    assert!(!mask.is_set(0x7E, 0));
    assert!(mask.is_set(EventFieldType::Sequence as u8, 0));
}

#[test]
fn test_index_routes_to_slot() {
    let fields = [
        FieldDescriptor::new(EventFieldType::TempLow, false, 0, 1),
        FieldDescriptor::new(EventFieldType::TempLow, false, 2, 1),
    ];
    let payload = [0xB5, 0x14]; // -75 C, +20 C
    let (event, mask) = decode_event(&fields, &payload).unwrap();
    assert_eq!(event.temp_low_c[0], -75.0);
    assert_eq!(event.temp_low_c[2], 20.0);
    assert!(mask.is_set(EventFieldType::TempLow as u8, 0));
    assert!(mask.is_set(EventFieldType::TempLow as u8, 2));
    assert!(!mask.is_set(EventFieldType::TempLow as u8, 1));
}

#[test]
fn test_index_out_of_range() {
    let fields = [FieldDescriptor::new(EventFieldType::GpsPoint, false, 9, 6)];
    let payload = [0u8; 6];
    assert_eq!(
        decode_event(&fields, &payload).unwrap_err(),
        DecodeError::IndexRange {
            type_code: EventFieldType::GpsPoint as u8,
            index: 9
        }
    );
}

#[test]
fn test_obc_value_parses_mid_pid() {
    let fields = [FieldDescriptor::new(EventFieldType::ObcValue, false, 0, 0)];
    let payload = [0x00, 0x80, 0x00, 0x54, 0x01, 0x02, 0x03];
    let (event, _mask) = decode_event(&fields, &payload).unwrap();
    assert_eq!(event.obc_value[0].mid, 128);
    assert_eq!(event.obc_value[0].pid, 84);
    assert_eq!(event.obc_value[0].data(), &[0x01, 0x02, 0x03]);
}

#[test]
fn test_hi_res_temperature() {
    let fields = [FieldDescriptor::new(EventFieldType::TempAverage, true, 1, 2)];
    // -312 -> -31.2 C
    let payload = (-312i16).to_be_bytes();
    let (event, _mask) = decode_event(&fields, &payload).unwrap();
    assert!((event.temp_average_c[1] + 31.2).abs() < 1e-9);
}

#[test]
fn test_custom_format_matches_static_semantics() {
    // A custom layout borrowing the standard status+timestamp prefix must
    // decode those fields identically.
    let custom = [
        FieldDescriptor::new(EventFieldType::StatusCode, false, 0, 2),
        FieldDescriptor::new(EventFieldType::Timestamp, false, 0, 4),
    ];
    let payload = [0x00, 0x15, 0x62, 0xD5, 0x00, 0x00];
    let (event, mask) = decode_event(&custom, &payload).unwrap();
    assert_eq!(event.status_code, 0x0015);
    assert_eq!(event.timestamp[0], 0x62D5_0000);
    assert!(mask.is_set(EventFieldType::StatusCode as u8, 0));
    assert!(mask.is_set(EventFieldType::Timestamp as u8, 0));
}

#[test]
fn test_standard_fields_lookup_drives_decoder() {
    let fields = standard_fields(0x30).unwrap();
    let (event, _mask) = decode_event(fields, &fixed_std_payload()).unwrap();
    assert_eq!(event.status_code, 0xF123);
}
