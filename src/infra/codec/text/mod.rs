//! ASCII payload codecs. Text-framed packets carry their payload hex or
//! base64 encoded (and, on the write path only, as CSV tokens); all three
//! codecs work against caller-provided fixed buffers and never truncate
//! silently.
use crate::error::TextError;
use crate::infra::codec::payload::{FieldValue, FieldValues};
use base64::alphabet;
use base64::engine::general_purpose::GeneralPurposeConfig;
use base64::engine::{DecodePaddingMode, Engine, GeneralPurpose};
use core::fmt::Write;

/// Standard-alphabet engine: `=` padding on encode, indifferent on decode
/// (clients in the field emit both padded and unpadded payloads).
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

//==================================================================================HEX

/// Hex-encode `src` into `dst` using upper-case digits.
/// Returns the number of characters written.
pub fn hex_encode(src: &[u8], dst: &mut [u8]) -> Result<usize, TextError> {
    let needed = src.len() * 2;
    if needed > dst.len() {
        return Err(TextError::Overflow {
            asked: needed,
            available: dst.len(),
        });
    }
    for (i, byte) in src.iter().enumerate() {
        dst[2 * i] = HEX_DIGITS[(byte >> 4) as usize];
        dst[2 * i + 1] = HEX_DIGITS[(byte & 0x0F) as usize];
    }
    Ok(needed)
}

/// Decode a hex character run into `dst`, accepting either digit case.
/// Returns the number of payload bytes produced.
pub fn hex_decode(src: &[u8], dst: &mut [u8]) -> Result<usize, TextError> {
    if src.len() % 2 != 0 {
        return Err(TextError::OddDigits { count: src.len() });
    }
    let needed = src.len() / 2;
    if needed > dst.len() {
        return Err(TextError::Overflow {
            asked: needed,
            available: dst.len(),
        });
    }
    for i in 0..needed {
        let hi = hex_nibble(src[2 * i])?;
        let lo = hex_nibble(src[2 * i + 1])?;
        dst[i] = (hi << 4) | lo;
    }
    Ok(needed)
}

fn hex_nibble(ch: u8) -> Result<u8, TextError> {
    match ch {
        b'0'..=b'9' => Ok(ch - b'0'),
        b'A'..=b'F' => Ok(ch - b'A' + 10),
        b'a'..=b'f' => Ok(ch - b'a' + 10),
        _ => Err(TextError::HexDigit { ch }),
    }
}

//==================================================================================BASE64

/// Base64-encode `src` into `dst` with `=` padding.
/// Returns the number of characters written.
pub fn base64_encode(src: &[u8], dst: &mut [u8]) -> Result<usize, TextError> {
    BASE64
        .encode_slice(src, dst)
        .map_err(|_| TextError::Overflow {
            asked: src.len().div_ceil(3) * 4,
            available: dst.len(),
        })
}

/// Decode a base64 character run into `dst`.
/// Returns the number of payload bytes produced.
pub fn base64_decode(src: &[u8], dst: &mut [u8]) -> Result<usize, TextError> {
    BASE64.decode_slice(src, dst).map_err(|_| TextError::Base64)
}

//==================================================================================CSV

/// Render a payload as CSV tokens by replaying its remembered format
/// directives, one token per field. Emit-only: the framer rejects CSV on
/// ingress. Returns the number of characters written.
pub fn csv_encode(fmt: &[u8], payload: &[u8], dst: &mut [u8]) -> Result<usize, TextError> {
    let (values, _) = crate::infra::codec::payload::unpack(payload, fmt)?;
    let mut out = SliceWriter::new(dst);
    write_csv_tokens(fmt, &values, &mut out)?;
    Ok(out.written)
}

fn write_csv_tokens(
    fmt: &[u8],
    values: &FieldValues,
    out: &mut SliceWriter<'_>,
) -> Result<(), TextError> {
    // Conversion characters, in directive order, drive the token style.
    let convs = fmt.iter().skip(2).step_by(3);
    for (ndx, (value, conv)) in values.as_slice().iter().zip(convs).enumerate() {
        if ndx > 0 {
            out.push(b',')?;
        }
        match (value, conv) {
            (FieldValue::UInt(v), b'x') => write!(out, "0x{v:X}").map_err(|_| out.overflow())?,
            (FieldValue::UInt(v), _) => write!(out, "{v}").map_err(|_| out.overflow())?,
            (FieldValue::Int(v), _) => write!(out, "{v}").map_err(|_| out.overflow())?,
            (FieldValue::Gps(p), _) => write!(out, "{:.5}/{:.5}", p.latitude, p.longitude)
                .map_err(|_| out.overflow())?,
            (FieldValue::Str(id), _) => out.push_slice(id.as_slice())?,
            (FieldValue::Bytes(bytes), _) => {
                for byte in bytes.as_slice() {
                    out.push(HEX_DIGITS[(byte >> 4) as usize])?;
                    out.push(HEX_DIGITS[(byte & 0x0F) as usize])?;
                }
            }
        }
    }
    Ok(())
}

/// Minimal `core::fmt::Write` sink over a byte slice.
struct SliceWriter<'a> {
    dst: &'a mut [u8],
    written: usize,
}

impl<'a> SliceWriter<'a> {
    fn new(dst: &'a mut [u8]) -> Self {
        Self { dst, written: 0 }
    }

    fn overflow(&self) -> TextError {
        TextError::Overflow {
            asked: self.written + 1,
            available: self.dst.len(),
        }
    }

    fn push(&mut self, ch: u8) -> Result<(), TextError> {
        if self.written >= self.dst.len() {
            return Err(self.overflow());
        }
        self.dst[self.written] = ch;
        self.written += 1;
        Ok(())
    }

    fn push_slice(&mut self, data: &[u8]) -> Result<(), TextError> {
        for ch in data {
            self.push(*ch)?;
        }
        Ok(())
    }
}

impl Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.push_slice(s.as_bytes()).map_err(|_| core::fmt::Error)
    }
}

//==================================================================================TESTS
