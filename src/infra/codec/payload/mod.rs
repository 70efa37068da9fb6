//! Binary payload formatter. DMTP payloads are dense big-endian records;
//! the reader/writer pair below extracts and lays down scalar fields,
//! packed GPS points, identifier strings and raw byte runs without extra
//! allocation or copies.
use crate::core::{is_valid_id_char, GpsPoint, IdBytes, PayloadBytes, MAX_FIELD_COUNT};
use crate::error::FmtError;

/// Generic reader that extracts big-endian fields from a `&[u8]`.
pub struct PayloadReader<'a> {
    /// Shared source buffer (typically a received packet payload).
    buffer: &'a [u8],
    /// Current index in bytes from the beginning.
    cursor: usize,
}

impl<'a> PayloadReader<'a> {
    /// Create a reader positioned at the start of the provided buffer.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], FmtError> {
        if len > self.remaining() {
            return Err(FmtError::Underflow {
                asked: len,
                available: self.remaining(),
            });
        }
        let slice = &self.buffer[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    /// Read an unsigned big-endian integer of `len` bytes, `len` in 1..=4.
    pub fn read_uint(&mut self, len: usize) -> Result<u32, FmtError> {
        if !(1..=4).contains(&len) {
            return Err(FmtError::Digit { digit: len as u8 });
        }
        let slice = self.take(len)?;
        let mut value = 0u32;
        for byte in slice {
            value = (value << 8) | u32::from(*byte);
        }
        Ok(value)
    }

    /// Read a signed big-endian integer of `len` bytes (two's complement,
    /// sign-extended to `i32`).
    pub fn read_int(&mut self, len: usize) -> Result<i32, FmtError> {
        let raw = self.read_uint(len)?;
        Ok(sign_extend(raw, len))
    }

    /// Read a packed GPS point; `len` must be 6 (24-bit coordinates) or
    /// 8 (32-bit coordinates).
    pub fn read_gps(&mut self, len: usize) -> Result<GpsPoint, FmtError> {
        let bits = match len {
            6 => 24,
            8 => 32,
            _ => return Err(FmtError::Digit { digit: len as u8 }),
        };
        let half = len / 2;
        let mut lat_raw = 0u32;
        for byte in self.take(half)? {
            lat_raw = (lat_raw << 8) | u32::from(*byte);
        }
        let mut lon_raw = 0u32;
        for byte in self.take(half)? {
            lon_raw = (lon_raw << 8) | u32::from(*byte);
        }
        Ok(GpsPoint::from_encoded(lat_raw, lon_raw, bits))
    }

    /// Read an identifier string of `len` bytes (0 = remainder of the
    /// payload), trim trailing NUL padding and validate the character set.
    pub fn read_string(&mut self, len: usize) -> Result<&'a [u8], FmtError> {
        let width = if len == 0 { self.remaining() } else { len };
        let slice = self.take(width)?;
        let mut end = slice.len();
        while end > 0 && slice[end - 1] == 0 {
            end -= 1;
        }
        let trimmed = &slice[..end];
        for ch in trimmed {
            if !is_valid_id_char(*ch) {
                return Err(FmtError::InvalidChar { ch: *ch });
            }
        }
        Ok(trimmed)
    }

    /// Read a raw byte run of `len` bytes (0 = remainder of the payload).
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], FmtError> {
        let width = if len == 0 { self.remaining() } else { len };
        self.take(width)
    }
}

//==================================================================================PAYLOAD_WRITER

/// Generic writer laying big-endian fields into a `&mut [u8]`. Used by the
/// packet builder and the server-side payload composers.
pub struct PayloadWriter<'a> {
    /// Target buffer (typically a packet payload under construction).
    buffer: &'a mut [u8],
    /// Current position in bytes written.
    cursor: usize,
}

impl<'a> PayloadWriter<'a> {
    /// Create a writer positioned at the start of the buffer.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Bytes written so far.
    #[inline]
    pub fn written(&self) -> usize {
        self.cursor
    }

    fn reserve(&mut self, len: usize) -> Result<&mut [u8], FmtError> {
        let available = self.buffer.len() - self.cursor;
        if len > available {
            return Err(FmtError::Overflow {
                asked: len,
                available,
            });
        }
        let slice = &mut self.buffer[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    /// Write the low `len` bytes of `value` big-endian, `len` in 1..=4.
    pub fn write_uint(&mut self, value: u32, len: usize) -> Result<(), FmtError> {
        if !(1..=4).contains(&len) {
            return Err(FmtError::Digit { digit: len as u8 });
        }
        let slice = self.reserve(len)?;
        for (i, byte) in slice.iter_mut().enumerate() {
            *byte = (value >> (8 * (len - 1 - i))) as u8;
        }
        Ok(())
    }

    /// Write a signed integer in two's complement over `len` bytes.
    pub fn write_int(&mut self, value: i32, len: usize) -> Result<(), FmtError> {
        self.write_uint(value as u32, len)
    }

    /// Write a packed GPS point over 6 or 8 bytes.
    pub fn write_gps(&mut self, point: &GpsPoint, len: usize) -> Result<(), FmtError> {
        let bits = match len {
            6 => 24,
            8 => 32,
            _ => return Err(FmtError::Digit { digit: len as u8 }),
        };
        let half = len / 2;
        let lat_raw = point.encode_latitude(bits);
        let lon_raw = point.encode_longitude(bits);
        let slice = self.reserve(len)?;
        for i in 0..half {
            slice[i] = (lat_raw >> (8 * (half - 1 - i))) as u8;
            slice[half + i] = (lon_raw >> (8 * (half - 1 - i))) as u8;
        }
        Ok(())
    }

    /// Write an identifier string NUL-padded to `width` bytes, validating
    /// the permitted character set.
    pub fn write_string(&mut self, data: &[u8], width: usize) -> Result<(), FmtError> {
        for ch in data.iter().take(width) {
            if !is_valid_id_char(*ch) {
                return Err(FmtError::InvalidChar { ch: *ch });
            }
        }
        let slice = self.reserve(width)?;
        let copy = data.len().min(width);
        slice[..copy].copy_from_slice(&data[..copy]);
        for byte in &mut slice[copy..] {
            *byte = 0;
        }
        Ok(())
    }

    /// Write a raw byte run verbatim.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), FmtError> {
        self.reserve(data.len())?.copy_from_slice(data);
        Ok(())
    }
}

//==================================================================================DIRECTIVES

/// One argument supplied to [`pack`], matching a format directive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldArg<'a> {
    /// `%Nu` / `%Nx`: width taken from the directive digit.
    UInt(u32),
    /// `%*u` / `%*x`: width travels with the argument.
    UIntVar { value: u32, width: usize },
    /// `%Ni`: signed two's complement.
    Int(i32),
    /// `%Ng`: packed GPS point, 6 or 8 bytes.
    Gps(GpsPoint),
    /// `%*s`: identifier string NUL-padded to `width`.
    Str { data: &'a [u8], width: usize },
    /// `%*b`: raw byte run.
    Bytes(&'a [u8]),
}

/// One value produced by [`unpack`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    UInt(u32),
    Int(i32),
    Gps(GpsPoint),
    Str(IdBytes),
    Bytes(PayloadBytes),
}

impl FieldValue {
    /// Unsigned view, when the value is scalar.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => Some(*v as u32),
            _ => None,
        }
    }
}

/// Fixed-capacity list of unpacked values.
#[derive(Debug, Clone, Copy)]
pub struct FieldValues {
    pub len: usize,
    pub values: [FieldValue; MAX_FIELD_COUNT],
}

impl Default for FieldValues {
    fn default() -> Self {
        Self {
            len: 0,
            values: [FieldValue::UInt(0); MAX_FIELD_COUNT],
        }
    }
}

impl FieldValues {
    pub fn as_slice(&self) -> &[FieldValue] {
        &self.values[..self.len]
    }

    fn push(&mut self, value: FieldValue) -> Result<(), FmtError> {
        if self.len >= MAX_FIELD_COUNT {
            return Err(FmtError::Overflow {
                asked: self.len + 1,
                available: MAX_FIELD_COUNT,
            });
        }
        self.values[self.len] = value;
        self.len += 1;
        Ok(())
    }
}

/// One parsed `%` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Directive {
    /// Conversion character (`u`, `i`, `x`, `g`, `s`, `b`).
    conv: u8,
    /// Width digit, or `None` for `*`.
    width: Option<usize>,
}

/// Iterate the directives of a format string. Anything outside a `%`
/// sequence is rejected; the wire format has no literal text.
fn directives(fmt: &[u8]) -> impl Iterator<Item = Result<Directive, FmtError>> + '_ {
    let mut pos = 0usize;
    core::iter::from_fn(move || {
        if pos >= fmt.len() {
            return None;
        }
        if fmt[pos] != b'%' {
            let ch = fmt[pos];
            pos = fmt.len();
            return Some(Err(FmtError::Char { ch }));
        }
        if pos + 2 >= fmt.len() {
            // truncated directive
            pos = fmt.len();
            return Some(Err(FmtError::Char { ch: b'%' }));
        }
        let width_ch = fmt[pos + 1];
        let width = match width_ch {
            b'*' => None,
            b'1'..=b'4' => Some((width_ch - b'0') as usize),
            // GPS points are 6 or 8 bytes wide
            b'6' | b'8' => Some((width_ch - b'0') as usize),
            _ => {
                pos = fmt.len();
                return Some(Err(FmtError::Digit { digit: width_ch }));
            }
        };
        let conv = fmt[pos + 2];
        pos += 3;
        match conv {
            b'u' | b'i' | b'x' | b'g' | b's' | b'b' => Some(Ok(Directive { conv, width })),
            _ => Some(Err(FmtError::Char { ch: conv })),
        }
    })
}

/// Pack a typed argument list into `buffer` following `fmt`.
/// Returns the number of bytes written.
pub fn pack(buffer: &mut [u8], fmt: &[u8], args: &[FieldArg]) -> Result<usize, FmtError> {
    let mut writer = PayloadWriter::new(buffer);
    let mut ndx = 0usize;
    for directive in directives(fmt) {
        let directive = directive?;
        let arg = args.get(ndx).ok_or(FmtError::ArgMismatch { ndx })?;
        match (directive.conv, directive.width, arg) {
            (b'u' | b'x', Some(len), FieldArg::UInt(value)) => writer.write_uint(*value, len)?,
            (b'u' | b'x', None, FieldArg::UIntVar { value, width }) => {
                writer.write_uint(*value, *width)?
            }
            (b'i', Some(len), FieldArg::Int(value)) => writer.write_int(*value, len)?,
            (b'g', Some(len), FieldArg::Gps(point)) => writer.write_gps(point, len)?,
            (b's', None, FieldArg::Str { data, width }) => writer.write_string(data, *width)?,
            (b'b', None, FieldArg::Bytes(data)) => writer.write_bytes(data)?,
            _ => return Err(FmtError::ArgMismatch { ndx }),
        }
        ndx += 1;
    }
    if ndx != args.len() {
        return Err(FmtError::ArgMismatch { ndx });
    }
    Ok(writer.written())
}

/// Unpack `buffer` following `fmt` into a typed value list; the mirror of
/// [`pack`].
///
/// [`pack`] resolves a `*` width from its argument list; `unpack` has no
/// argument list, so a variable-width directive is only accepted in the
/// trailing position, where the transmitted width and the remainder of the
/// payload coincide (`%*u`/`%*x` read at most four of the remaining bytes,
/// `%*s`/`%*b` read them all). Every format this protocol defines places
/// its one variable-width field last; a format that does not is rejected
/// rather than decoded wrong.
/// Returns the values and the number of bytes consumed.
pub fn unpack(buffer: &[u8], fmt: &[u8]) -> Result<(FieldValues, usize), FmtError> {
    let mut reader = PayloadReader::new(buffer);
    let mut out = FieldValues::default();
    let mut rest_taken = false;
    for (ndx, directive) in directives(fmt).enumerate() {
        let directive = directive?;
        if rest_taken {
            return Err(FmtError::VarWidth { ndx: ndx - 1 });
        }
        rest_taken = directive.width.is_none();
        let value = match (directive.conv, directive.width) {
            (b'u' | b'x', Some(len)) => FieldValue::UInt(reader.read_uint(len)?),
            (b'u' | b'x', None) => {
                let len = reader.remaining().min(4);
                if len == 0 {
                    return Err(FmtError::Underflow {
                        asked: 1,
                        available: 0,
                    });
                }
                FieldValue::UInt(reader.read_uint(len)?)
            }
            (b'i', Some(len)) => FieldValue::Int(reader.read_int(len)?),
            (b'g', Some(len)) => FieldValue::Gps(reader.read_gps(len)?),
            (b's', None) => FieldValue::Str(IdBytes::from_slice(reader.read_string(0)?)),
            (b'b', None) => FieldValue::Bytes(PayloadBytes::from_slice(reader.read_bytes(0)?)),
            (conv, _) => return Err(FmtError::Char { ch: conv }),
        };
        out.push(value)?;
    }
    Ok((out, reader.consumed()))
}

//==================================================================================

/// Two's complement helper: extend the sign of a value read over `len`
/// bytes into a full `i32`.
fn sign_extend(value: u32, len: usize) -> i32 {
    if len >= 4 {
        return value as i32;
    }
    let shift = 32 - 8 * len as u32;
    ((value << shift) as i32) >> shift
}

//==================================================================================TESTS
