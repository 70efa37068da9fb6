//! `dmtp-codec` library: primitives and protocol logic required to handle
//! DMTP (Device Monitoring Transport Protocol) packets in a `no_std`
//! environment, on either end of the link. The crate exposes the
//! infrastructure modules (payload formatter, text codecs, checksums) and
//! the protocol logic (packet model, framing, event formats and decoding,
//! per-session state).
#![no_std]
//==================================================================================
/// Core data types shared by the descriptor tables and the codec engine.
pub mod core;
/// Domain and low-level errors (framing, payload formatting, event
/// decoding, custom-format registration, upload, and related issues).
pub mod error;
/// Byte-level codec infrastructure: payload reader/writer, text encodings,
/// checksum primitives.
pub mod infra;
/// DMTP protocol implementation: packet model, stream framing, event
/// formats, event decoding, and session state.
pub mod protocol;
//==================================================================================
