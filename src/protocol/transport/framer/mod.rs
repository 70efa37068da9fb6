//! Packet framer: reads one packet from a byte stream (detecting the
//! encoding from the first octet) and writes one packet in a chosen
//! encoding.
//!
//! Read path state machine, per framed packet:
//!
//! ```text
//! Start ─read 3 octets─► Peek
//! Peek: '$'  ─► TextHeader ─accumulate to '\r'─► TextParse ─► Packet
//! Peek: 0xE0 ─► BinaryBody ─read len octets─► Packet
//! Peek: else ─► HeaderInvalid
//! ```
//!
//! All failures are reported as values and leave the destination
//! untouched; dropping the session is the caller's decision.
use crate::core::{MAX_ENCODED_LENGTH, MAX_PAYLOAD_LENGTH, PACKET_HEADER_BASIC};
use crate::error::{FrameError, TextError};
use crate::infra::codec::checksum::{ascii_xor, verify_frame_xor, XorCheck};
use crate::infra::codec::text;
use crate::protocol::packet::{
    Encoding, EncodingMask, Packet, PacketEncoding, ENCODING_BASE64_CHAR, ENCODING_CSV_CHAR,
    ENCODING_HEX_CHAR, PACKET_ASCII_ENCODING_CHAR, PACKET_ASCII_ENCODING_EOL,
};

/// Leading octets read before the encoding is known: the binary
/// header/type/length triplet, or `$` plus the first two hex digits.
const PACKET_HEADER_LENGTH: usize = 3;

/// Framer policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct FramerConfig {
    /// Reject ASCII frames that carry no `*HH` checksum suffix.
    pub require_checksum: bool,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            require_checksum: false,
        }
    }
}

/// Stateless packet framer; one instance may serve many links.
#[derive(Debug, Clone, Copy, Default)]
pub struct Framer {
    config: FramerConfig,
}

impl Framer {
    pub const fn new(config: FramerConfig) -> Self {
        Self { config }
    }

    //==================================================================================READ_PATH

    /// Read one packet from the stream. Returns the packet together with
    /// the encoding it arrived in, so a session can adopt the client's
    /// preference for its replies.
    pub async fn read_packet<S>(
        &self,
        source: &mut S,
    ) -> Result<(Packet, PacketEncoding), FrameError<S::Error>>
    where
        S: super::traits::byte_link::ByteSource,
    {
        let mut frame = [0u8; MAX_ENCODED_LENGTH];

        /* header: binary triplet, or '$' plus two hex digits */
        let mut got = 0usize;
        while got < PACKET_HEADER_LENGTH {
            let n = source
                .read(&mut frame[got..PACKET_HEADER_LENGTH])
                .await
                .map_err(FrameError::Transport)?;
            if n == 0 {
                if got == 0 {
                    // nothing at all: idle stream or clean EOF
                    return Err(FrameError::Timeout);
                }
                return Err(FrameError::ShortRead);
            }
            got += n;
        }

        match frame[0] {
            PACKET_ASCII_ENCODING_CHAR => {
                /* ASCII encoded, accumulate until '\r' */
                let mut len = PACKET_HEADER_LENGTH;
                loop {
                    if len >= frame.len() {
                        return Err(FrameError::PacketTooLong { len });
                    }
                    let n = source
                        .read(&mut frame[len..len + 1])
                        .await
                        .map_err(FrameError::Transport)?;
                    if n == 0 {
                        // partial packet read
                        return Err(FrameError::Timeout);
                    }
                    if frame[len] == PACKET_ASCII_ENCODING_EOL {
                        break;
                    }
                    len += 1;
                }
                self.parse_ascii(&frame[..len])
            }
            PACKET_HEADER_BASIC => {
                /* binary body: octet 2 is the payload length */
                let payload_len = frame[2] as usize;
                let mut got = 0usize;
                while got < payload_len {
                    let n = source
                        .read(&mut frame[PACKET_HEADER_LENGTH + got..PACKET_HEADER_LENGTH + payload_len])
                        .await
                        .map_err(FrameError::Transport)?;
                    if n == 0 {
                        return Err(FrameError::ShortRead);
                    }
                    got += n;
                }
                let packet = Packet::from_parts(
                    frame[0],
                    frame[1],
                    &frame[PACKET_HEADER_LENGTH..PACKET_HEADER_LENGTH + payload_len],
                );
                Ok((packet, PacketEncoding::new(Encoding::Binary)))
            }
            other => Err(FrameError::HeaderInvalid { header: other }),
        }
    }

    /// Parse a complete `\r`-stripped ASCII frame starting at `$`.
    fn parse_ascii<E: core::fmt::Debug>(
        &self,
        frame: &[u8],
    ) -> Result<(Packet, PacketEncoding), FrameError<E>> {
        /* checksum suffix */
        let (body, has_checksum) = match verify_frame_xor(frame) {
            XorCheck::Valid { body_len } => (&frame[..body_len], true),
            XorCheck::Absent if !self.config.require_checksum => (frame, false),
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!("ASCII frame failed XOR verification");
                return Err(FrameError::ChecksumFailed);
            }
        };

        /* '$' + 4 header hex digits at minimum */
        if body.len() < 5 {
            return Err(FrameError::Parse);
        }
        let mut header_type = [0u8; 2];
        if text::hex_decode(&body[1..5], &mut header_type).is_err() {
            return Err(FrameError::Parse);
        }
        if header_type[0] != PACKET_HEADER_BASIC {
            return Err(FrameError::HeaderInvalid {
                header: header_type[0],
            });
        }

        /* encoded payload */
        let mut payload = [0u8; MAX_PAYLOAD_LENGTH];
        let (payload_len, encoding) = if body.len() > 5 {
            let encoded = &body[6..];
            match body[5] {
                ENCODING_BASE64_CHAR => {
                    let len = text::base64_decode(encoded, &mut payload)
                        .map_err(map_text_error)?;
                    (len, Encoding::Base64)
                }
                ENCODING_HEX_CHAR => {
                    let len =
                        text::hex_decode(encoded, &mut payload).map_err(map_text_error)?;
                    (len, Encoding::Hex)
                }
                // parsing CSV encoded packets is not supported in this
                // implementation
                ENCODING_CSV_CHAR => return Err(FrameError::Parse),
                _ => return Err(FrameError::Parse),
            }
        } else {
            // bare frame: no encoding character, empty payload; report the
            // preferred text form
            (0, Encoding::Base64)
        };

        let packet = Packet::from_parts(header_type[0], header_type[1], &payload[..payload_len]);
        let encoding = if has_checksum {
            PacketEncoding::with_checksum(encoding)
        } else {
            PacketEncoding::new(encoding)
        };
        Ok((packet, encoding))
    }

    //==================================================================================WRITE_PATH

    /// Encode one packet into `dest`, honoring the session encoding mask.
    /// The destination is only written on success. Returns the frame
    /// length.
    pub fn encode_packet(
        &self,
        packet: &Packet,
        requested: PacketEncoding,
        mask: &EncodingMask,
        dest: &mut [u8],
    ) -> Result<usize, FrameError<core::convert::Infallible>> {
        let mut scratch = [0u8; MAX_ENCODED_LENGTH];
        let len = self.compose(packet, requested, mask, &mut scratch)?;
        if len > dest.len() {
            return Err(FrameError::Overflow {
                asked: len,
                available: dest.len(),
            });
        }
        dest[..len].copy_from_slice(&scratch[..len]);
        Ok(len)
    }

    /// Encode one packet and push it down the sink.
    pub async fn write_packet<K>(
        &self,
        sink: &mut K,
        packet: &Packet,
        requested: PacketEncoding,
        mask: &EncodingMask,
    ) -> Result<usize, FrameError<K::Error>>
    where
        K: super::traits::byte_link::ByteSink,
    {
        let mut scratch = [0u8; MAX_ENCODED_LENGTH];
        let len = self
            .compose(packet, requested, mask, &mut scratch)
            .map_err(widen_infallible)?;
        sink.write_all(&scratch[..len])
            .await
            .map_err(FrameError::Transport)?;
        Ok(len)
    }

    fn compose(
        &self,
        packet: &Packet,
        requested: PacketEncoding,
        mask: &EncodingMask,
        scratch: &mut [u8],
    ) -> Result<usize, FrameError<core::convert::Infallible>> {
        let mut encoding = mask.resolve(requested.encoding);
        // CSV needs the remembered field formats; packets parsed off the
        // wire have none.
        if encoding == Encoding::Csv && packet.format.is_empty() {
            encoding = Encoding::Hex;
        }

        if encoding == Encoding::Binary {
            let total = PACKET_HEADER_LENGTH + packet.payload.len();
            scratch[0] = packet.header;
            scratch[1] = packet.packet_type;
            scratch[2] = packet.payload.len() as u8;
            scratch[PACKET_HEADER_LENGTH..total].copy_from_slice(packet.payload());
            return Ok(total);
        }

        /* ASCII frame */
        scratch[0] = PACKET_ASCII_ENCODING_CHAR;
        let mut len = 1;
        len += text::hex_encode(&[packet.header, packet.packet_type], &mut scratch[len..])
            .map_err(map_text_error)?;
        if let Some(ch) = encoding.encoding_char() {
            scratch[len] = ch;
            len += 1;
        }
        len += match encoding {
            Encoding::Base64 => text::base64_encode(packet.payload(), &mut scratch[len..])
                .map_err(map_text_error)?,
            Encoding::Hex => {
                text::hex_encode(packet.payload(), &mut scratch[len..]).map_err(map_text_error)?
            }
            Encoding::Csv => {
                text::csv_encode(packet.format.as_bytes(), packet.payload(), &mut scratch[len..])
                    .map_err(map_text_error)?
            }
            Encoding::Binary => unreachable!(),
        };
        if requested.checksum {
            let cksum = ascii_xor(&scratch[..len]);
            if len + 3 > scratch.len() {
                return Err(FrameError::Overflow {
                    asked: len + 3,
                    available: scratch.len(),
                });
            }
            scratch[len] = b'*';
            len += 1;
            len += text::hex_encode(&[cksum], &mut scratch[len..]).map_err(map_text_error)?;
        }
        if len >= scratch.len() {
            return Err(FrameError::Overflow {
                asked: len + 1,
                available: scratch.len(),
            });
        }
        scratch[len] = PACKET_ASCII_ENCODING_EOL;
        Ok(len + 1)
    }
}

fn map_text_error<E: core::fmt::Debug>(err: TextError) -> FrameError<E> {
    match err {
        TextError::Overflow { asked, available } => FrameError::Overflow { asked, available },
        _ => FrameError::Parse,
    }
}

fn widen_infallible<E: core::fmt::Debug>(
    err: FrameError<core::convert::Infallible>,
) -> FrameError<E> {
    match err {
        FrameError::Transport(never) => match never {},
        FrameError::HeaderInvalid { header } => FrameError::HeaderInvalid { header },
        FrameError::Timeout => FrameError::Timeout,
        FrameError::ShortRead => FrameError::ShortRead,
        FrameError::PacketTooLong { len } => FrameError::PacketTooLong { len },
        FrameError::ChecksumFailed => FrameError::ChecksumFailed,
        FrameError::Parse => FrameError::Parse,
        FrameError::Overflow { asked, available } => FrameError::Overflow { asked, available },
    }
}

//==================================================================================TESTS
