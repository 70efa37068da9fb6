//! Event packet formats: the static table binding the standard fixed
//! layouts to their field lists, and the runtime registry populated by
//! custom-format definition packets (client type 0xCF).
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;

use crate::core::{
    EventFieldType, FieldDescriptor, PacketDescriptor, MAX_FIELD_COUNT, MAX_PAYLOAD_LENGTH,
};
use crate::error::{DecodeError, RegistryError};
use crate::infra::codec::payload::PayloadReader;
use crate::protocol::packet::{PKT_CLIENT_FIXED_FMT_HIGH, PKT_CLIENT_FIXED_FMT_STD};

//==================================================================================STATIC_TABLE

/// Standard fixed-format event, type 0x30 (20-byte payload).
pub static FIXED_FMT_STD: &[FieldDescriptor] = &[
    FieldDescriptor::new(EventFieldType::StatusCode, false, 0, 2),
    FieldDescriptor::new(EventFieldType::Timestamp, false, 0, 4),
    FieldDescriptor::new(EventFieldType::GpsPoint, false, 0, 6),
    FieldDescriptor::new(EventFieldType::Speed, false, 0, 1),
    FieldDescriptor::new(EventFieldType::Heading, false, 0, 1),
    FieldDescriptor::new(EventFieldType::Altitude, false, 0, 2),
    FieldDescriptor::new(EventFieldType::Distance, false, 0, 3),
    FieldDescriptor::new(EventFieldType::Sequence, false, 0, 1),
];

/// High-resolution fixed-format event, type 0x31 (25-byte payload).
pub static FIXED_FMT_HIGH: &[FieldDescriptor] = &[
    FieldDescriptor::new(EventFieldType::StatusCode, false, 0, 2),
    FieldDescriptor::new(EventFieldType::Timestamp, false, 0, 4),
    FieldDescriptor::new(EventFieldType::GpsPoint, true, 0, 8),
    FieldDescriptor::new(EventFieldType::Speed, true, 0, 2),
    FieldDescriptor::new(EventFieldType::Heading, true, 0, 2),
    FieldDescriptor::new(EventFieldType::Altitude, true, 0, 3),
    FieldDescriptor::new(EventFieldType::Distance, true, 0, 3),
    FieldDescriptor::new(EventFieldType::Sequence, false, 0, 1),
];

/// Field list for a standard (statically defined) event packet type.
pub fn standard_fields(packet_type: u8) -> Option<&'static [FieldDescriptor]> {
    match packet_type {
        PKT_CLIENT_FIXED_FMT_STD => Some(FIXED_FMT_STD),
        PKT_CLIENT_FIXED_FMT_HIGH => Some(FIXED_FMT_HIGH),
        _ => None,
    }
}

/// Resolve the field list for an event packet type: the static table
/// first, then the session's custom overlay.
pub fn event_fields<'a>(
    packet_type: u8,
    customs: &'a CustomFormats,
) -> Result<&'a [FieldDescriptor], DecodeError> {
    standard_fields(packet_type)
        .or_else(|| customs.fields(packet_type))
        .ok_or(DecodeError::UnknownFormat { packet_type })
}

//==================================================================================CUSTOM_REGISTRY

/// First and last packet types a custom definition may target.
pub const CUSTOM_TYPE_FIRST: u8 = 0x70;
pub const CUSTOM_TYPE_LAST: u8 = 0x7F;
const CUSTOM_SLOTS: usize = (CUSTOM_TYPE_LAST - CUSTOM_TYPE_FIRST) as usize + 1;

/// One installed custom layout.
#[derive(Debug, Clone, Copy)]
struct CustomFormat {
    field_count: usize,
    fields: [FieldDescriptor; MAX_FIELD_COUNT],
}

const EMPTY_FIELD: FieldDescriptor =
    FieldDescriptor::new(EventFieldType::StatusCode, false, 0, 0);

/// Runtime table of custom packet layouts, one slot per type in the custom
/// range. Append-only during a session; cleared on session reset.
#[derive(Debug, Clone, Copy)]
pub struct CustomFormats {
    slots: [Option<CustomFormat>; CUSTOM_SLOTS],
}

impl Default for CustomFormats {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomFormats {
    pub const fn new() -> Self {
        Self {
            slots: [None; CUSTOM_SLOTS],
        }
    }

    /// Forget every installed layout.
    pub fn clear(&mut self) {
        self.slots = [None; CUSTOM_SLOTS];
    }

    /// Field list previously installed for `packet_type`.
    pub fn fields(&self, packet_type: u8) -> Option<&[FieldDescriptor]> {
        let slot = self.slot_index(packet_type)?;
        self.slots[slot]
            .as_ref()
            .map(|format| &format.fields[..format.field_count])
    }

    /// Descriptor view for `packet_type`, when installed.
    pub fn descriptor(&self, packet_type: u8) -> Option<PacketDescriptor<'_>> {
        self.fields(packet_type).map(|fields| PacketDescriptor {
            packet_type,
            fields,
        })
    }

    fn slot_index(&self, packet_type: u8) -> Option<usize> {
        if (CUSTOM_TYPE_FIRST..=CUSTOM_TYPE_LAST).contains(&packet_type) {
            Some((packet_type - CUSTOM_TYPE_FIRST) as usize)
        } else {
            None
        }
    }

    /// Install (or replace) the layout for one custom packet type.
    pub fn install(
        &mut self,
        packet_type: u8,
        fields: &[FieldDescriptor],
    ) -> Result<(), RegistryError> {
        let slot = self
            .slot_index(packet_type)
            .ok_or(RegistryError::TypeOutOfRange { packet_type })?;
        if fields.len() > MAX_FIELD_COUNT {
            return Err(RegistryError::TooManyFields {
                count: fields.len(),
            });
        }
        let mut total = 0usize;
        for field in fields {
            // Definitions must only name types this implementation knows;
            // the skip-forward path is reserved for static layouts.
            let field_type = field
                .field_type()
                .ok_or(RegistryError::UnknownFieldType {
                    code: field.type_code,
                })?;
            if !field_type.wire_len_ok(field.hi_res, field.length) {
                return Err(RegistryError::FieldLength {
                    field_type,
                    length: field.length,
                });
            }
            total += field.length as usize;
        }
        if total > MAX_PAYLOAD_LENGTH {
            return Err(RegistryError::DescriptorTotal { total });
        }

        let mut format = CustomFormat {
            field_count: fields.len(),
            fields: [EMPTY_FIELD; MAX_FIELD_COUNT],
        };
        format.fields[..fields.len()].copy_from_slice(fields);
        // Replacement is atomic at per-type granularity: the slot swaps in
        // one store.
        self.slots[slot] = Some(format);
        Ok(())
    }

    /// Install a layout from the payload of a format-definition packet
    /// (client type 0xCF):
    ///
    /// ```text
    /// [target type: u8] [field count: u8] [descriptor: 24 bits] ...
    /// descriptor = (hiRes<<23) | (type<<16) | (index<<8) | length
    /// ```
    ///
    /// Returns the target packet type on success.
    pub fn install_from_payload(&mut self, payload: &[u8]) -> Result<u8, RegistryError> {
        let mut reader = PayloadReader::new(payload);
        let packet_type = reader
            .read_uint(1)
            .map_err(|_| RegistryError::Malformed)? as u8;
        let count = reader
            .read_uint(1)
            .map_err(|_| RegistryError::Malformed)? as usize;
        if count > MAX_FIELD_COUNT {
            return Err(RegistryError::TooManyFields { count });
        }

        let mut fields = [EMPTY_FIELD; MAX_FIELD_COUNT];
        for field in fields.iter_mut().take(count) {
            let word = reader
                .read_uint(3)
                .map_err(|_| RegistryError::Malformed)?;
            *field = FieldDescriptor::from_wire24(word);
        }

        self.install(packet_type, &fields[..count])?;
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "installed custom format {} with {} fields",
            packet_type,
            count
        );
        Ok(packet_type)
    }
}

//==================================================================================SHARED_REGISTRY

/// Custom-format table shared between several transport-handler threads.
///
/// Readers and the installer go through a short lock section, so a decode
/// sees either the previous layout or the new one, never a torn descriptor
/// list. The mutex flavor is selectable; the default suits firmware, hosted
/// servers can pick a cheaper one.
pub struct SharedFormats<M: RawMutex = CriticalSectionRawMutex> {
    inner: Mutex<M, RefCell<CustomFormats>>,
}

impl<M: RawMutex> Default for SharedFormats<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> SharedFormats<M> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(CustomFormats::new())),
        }
    }

    /// Install a layout from a format-definition payload.
    pub fn install_from_payload(&self, payload: &[u8]) -> Result<u8, RegistryError> {
        self.inner
            .lock(|formats| formats.borrow_mut().install_from_payload(payload))
    }

    /// Run `f` against the field list for `packet_type`, if one is
    /// installed. The list is copied out of the critical section through
    /// the closure, so installs never observe a reader mid-walk.
    pub fn with_fields<R>(
        &self,
        packet_type: u8,
        f: impl FnOnce(Option<&[FieldDescriptor]>) -> R,
    ) -> R {
        self.inner
            .lock(|formats| f(formats.borrow().fields(packet_type)))
    }

    /// Forget every installed layout.
    pub fn clear(&self) {
        self.inner.lock(|formats| formats.borrow_mut().clear());
    }
}

//==================================================================================TESTS
