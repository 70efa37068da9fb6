//! Table-driven event decoder: walks an ordered field-descriptor list
//! against a binary payload and populates a typed [`Event`], tracking every
//! populated attribute in a [`FieldMask`].
//!
//! The decoder is pure: it holds no state across calls and is safe to run
//! concurrently against a shared read-only descriptor table.
use super::{
    Event, FieldMask, ObcValue, MAX_COUNTERS, MAX_ELAPSED, MAX_ENTITIES, MAX_GEOFENCES,
    MAX_GPS_POINTS, MAX_OBC_VALUES, MAX_SENSORS, MAX_STRINGS, MAX_TEMPS, MAX_TIMESTAMPS,
};
use crate::core::{EventFieldType, FieldDescriptor, IdBytes, PayloadBytes, MAX_PAYLOAD_LENGTH};
use crate::error::{DecodeError, FmtError};
use crate::infra::codec::payload::PayloadReader;

/// Decode one event payload against its ordered field list.
///
/// * `fields` – descriptor list from the static table or the registry
/// * `payload` – raw packet payload
///
/// Returns the populated event and the mask of fields that were set.
/// The fixed formats carry their status code inline, so no per-type
/// defaulting happens here.
pub fn decode_event(
    fields: &[FieldDescriptor],
    payload: &[u8],
) -> Result<(Event, FieldMask), DecodeError> {
    let total: usize = fields.iter().map(|f| f.length as usize).sum();
    if total > MAX_PAYLOAD_LENGTH {
        return Err(DecodeError::Overflow { total });
    }

    let mut event = Event::new();
    let mut mask = FieldMask::new();
    let mut reader = PayloadReader::new(payload);

    for field in fields {
        let field_type = match field.field_type() {
            Some(field_type) => field_type,
            None => {
                // Forward compatibility: skip fields defined by a newer
                // protocol revision.
                reader
                    .read_bytes(field.length as usize)
                    .map_err(|err| map_fmt(field, err))?;
                mask.set_unknown();
                continue;
            }
        };
        decode_field(&mut event, &mut reader, field, field_type)?;
        mask.set(field.type_code, field.index);
    }

    Ok((event, mask))
}

/// Read one field and store it into the event, applying the resolution
/// rules selected by the descriptor's hiRes flag.
fn decode_field(
    event: &mut Event,
    reader: &mut PayloadReader<'_>,
    field: &FieldDescriptor,
    field_type: EventFieldType,
) -> Result<(), DecodeError> {
    let len = field.length as usize;
    let ndx = field.index as usize;
    let hi = field.hi_res;
    let fail = |err: FmtError| map_fmt(field, err);

    match field_type {
        EventFieldType::StatusCode => {
            event.status_code = reader.read_uint(len).map_err(fail)? as u16;
        }
        EventFieldType::Timestamp => {
            let slot = checked_slot(field, ndx, MAX_TIMESTAMPS)?;
            event.timestamp[slot] = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::Index => {
            event.index = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::Sequence => {
            event.sequence = reader.read_uint(len).map_err(fail)?;
            event.sequence_len = len;
        }

        EventFieldType::GpsPoint => {
            let slot = checked_slot(field, ndx, MAX_GPS_POINTS)?;
            event.gps_point[slot] = reader.read_gps(len).map_err(fail)?;
        }
        EventFieldType::GpsAge => {
            event.gps_age_sec = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::Speed => {
            event.speed_kph = scaled_uint(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::Heading => {
            let raw = reader.read_uint(len).map_err(fail)?;
            event.heading_deg = if hi {
                f64::from(raw) / 100.0
            } else {
                f64::from(raw) * 360.0 / 256.0
            };
        }
        EventFieldType::Altitude => {
            event.altitude_m = scaled_int(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::Distance => {
            event.distance_km = scaled_uint(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::Odometer => {
            event.odometer_km = scaled_uint(reader, len, hi).map_err(fail)?;
        }

        EventFieldType::GeofenceId => {
            let slot = checked_slot(field, ndx, MAX_GEOFENCES)?;
            event.geofence_id[slot] = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::TopSpeed => {
            event.top_speed_kph = scaled_uint(reader, len, hi).map_err(fail)?;
        }

        EventFieldType::String | EventFieldType::StringPad => {
            let slot = checked_slot(field, ndx, MAX_STRINGS)?;
            let text = reader.read_string(len).map_err(fail)?;
            event.string[slot] = IdBytes::from_slice(text);
        }
        EventFieldType::Entity | EventFieldType::EntityPad => {
            let slot = checked_slot(field, ndx, MAX_ENTITIES)?;
            let text = reader.read_string(len).map_err(fail)?;
            event.entity[slot] = IdBytes::from_slice(text);
        }

        EventFieldType::Binary => {
            let data = reader.read_bytes(len).map_err(fail)?;
            event.binary = PayloadBytes::from_slice(data);
        }

        EventFieldType::InputId => {
            event.input_id = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::InputState => {
            event.input_state = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::OutputId => {
            event.output_id = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::OutputState => {
            event.output_state = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::ElapsedTime => {
            let slot = checked_slot(field, ndx, MAX_ELAPSED)?;
            event.elapsed_time_sec[slot] = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::Counter => {
            let slot = checked_slot(field, ndx, MAX_COUNTERS)?;
            event.counter[slot] = reader.read_uint(len).map_err(fail)?;
        }

        EventFieldType::Sensor32Low => {
            let slot = checked_slot(field, ndx, MAX_SENSORS)?;
            event.sensor32_low[slot] = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::Sensor32High => {
            let slot = checked_slot(field, ndx, MAX_SENSORS)?;
            event.sensor32_high[slot] = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::Sensor32Average => {
            let slot = checked_slot(field, ndx, MAX_SENSORS)?;
            event.sensor32_average[slot] = reader.read_uint(len).map_err(fail)?;
        }

        EventFieldType::TempLow => {
            let slot = checked_slot(field, ndx, MAX_TEMPS)?;
            event.temp_low_c[slot] = scaled_int(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::TempHigh => {
            let slot = checked_slot(field, ndx, MAX_TEMPS)?;
            event.temp_high_c[slot] = scaled_int(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::TempAverage => {
            let slot = checked_slot(field, ndx, MAX_TEMPS)?;
            event.temp_average_c[slot] = scaled_int(reader, len, hi).map_err(fail)?;
        }

        EventFieldType::GpsDgpsUpdate => {
            event.gps_dgps_update_sec = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::GpsHorzAccuracy => {
            event.gps_horz_accuracy_m = scaled_uint(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::GpsVertAccuracy => {
            event.gps_vert_accuracy_m = scaled_uint(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::GpsSatellites => {
            event.gps_satellites = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::GpsMagVariation => {
            let raw = reader.read_int(len).map_err(fail)?;
            event.gps_mag_variation_deg = f64::from(raw) / 100.0;
        }
        EventFieldType::GpsQuality => {
            event.gps_quality = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::GpsType => {
            event.gps_2d3d = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::GpsGeoidHeight => {
            event.gps_geoid_height_m = scaled_int(reader, len, hi).map_err(fail)?;
        }
        // DOP is transported as value*10 at either resolution.
        EventFieldType::GpsPdop => {
            event.gps_pdop = f64::from(reader.read_uint(len).map_err(fail)?) / 10.0;
        }
        EventFieldType::GpsHdop => {
            event.gps_hdop = f64::from(reader.read_uint(len).map_err(fail)?) / 10.0;
        }
        EventFieldType::GpsVdop => {
            event.gps_vdop = f64::from(reader.read_uint(len).map_err(fail)?) / 10.0;
        }

        EventFieldType::ObcValue => {
            let slot = checked_slot(field, ndx, MAX_OBC_VALUES)?;
            let data = reader.read_bytes(len).map_err(fail)?;
            event.obc_value[slot] = parse_obc_value(field, data)?;
        }
        EventFieldType::ObcGeneric => {
            let slot = checked_slot(field, ndx, MAX_OBC_VALUES)?;
            event.obc_generic[slot] = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::ObcJ1708Fault => {
            let slot = checked_slot(field, ndx, MAX_OBC_VALUES)?;
            event.obc_j1708_fault[slot] = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::ObcDistance => {
            event.obc_distance_km = scaled_uint(reader, len, hi).map_err(fail)?;
        }
        // Engine hours are hours*10 at either resolution.
        EventFieldType::ObcEngineHours => {
            event.obc_engine_hours = f64::from(reader.read_uint(len).map_err(fail)?) / 10.0;
        }
        EventFieldType::ObcEngineRpm => {
            event.obc_engine_rpm = reader.read_uint(len).map_err(fail)?;
        }
        EventFieldType::ObcCoolantTemp => {
            event.obc_coolant_temp_c = scaled_int(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::ObcCoolantLevel => {
            event.obc_coolant_level = scaled_uint(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::ObcOilLevel => {
            event.obc_oil_level = scaled_uint(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::ObcOilPressure => {
            event.obc_oil_pressure_kpa = scaled_uint(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::ObcFuelLevel => {
            event.obc_fuel_level = scaled_uint(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::ObcFuelEconomy => {
            event.obc_fuel_economy_kpl = scaled_uint(reader, len, hi).map_err(fail)?;
        }
        EventFieldType::ObcFuelUsed => {
            event.obc_fuel_used_l = scaled_uint(reader, len, hi).map_err(fail)?;
        }
    }
    Ok(())
}

/// Unsigned field where hi-res transports value*10.
fn scaled_uint(reader: &mut PayloadReader<'_>, len: usize, hi_res: bool) -> Result<f64, FmtError> {
    let raw = reader.read_uint(len)?;
    Ok(if hi_res {
        f64::from(raw) / 10.0
    } else {
        f64::from(raw)
    })
}

/// Signed field where hi-res transports value*10.
fn scaled_int(reader: &mut PayloadReader<'_>, len: usize, hi_res: bool) -> Result<f64, FmtError> {
    let raw = reader.read_int(len)?;
    Ok(if hi_res {
        f64::from(raw) / 10.0
    } else {
        f64::from(raw)
    })
}

/// OBC values carry mid/pid in their leading four bytes.
fn parse_obc_value(field: &FieldDescriptor, data: &[u8]) -> Result<ObcValue, DecodeError> {
    if data.len() < 4 {
        return Err(DecodeError::Parse {
            type_code: field.type_code,
        });
    }
    let mut value = ObcValue {
        mid: u16::from(data[0]) << 8 | u16::from(data[1]),
        pid: u16::from(data[2]) << 8 | u16::from(data[3]),
        ..ObcValue::default()
    };
    let body = &data[4..];
    value.len = body.len().min(value.data.len());
    value.data[..value.len].copy_from_slice(&body[..value.len]);
    Ok(value)
}

fn checked_slot(field: &FieldDescriptor, ndx: usize, capacity: usize) -> Result<usize, DecodeError> {
    if ndx < capacity {
        Ok(ndx)
    } else {
        Err(DecodeError::IndexRange {
            type_code: field.type_code,
            index: field.index,
        })
    }
}

fn map_fmt(field: &FieldDescriptor, err: FmtError) -> DecodeError {
    match err {
        FmtError::Underflow { .. } => DecodeError::Underflow {
            type_code: field.type_code,
        },
        _ => DecodeError::Parse {
            type_code: field.type_code,
        },
    }
}

//==================================================================================TESTS

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
