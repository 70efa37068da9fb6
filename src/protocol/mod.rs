//! High-level components of the DMTP protocol: packet model and type
//! tables, stream framing, event format tables, event decoding, upload
//! assembly, and per-session state.
pub mod cmderrs;
pub mod events;
pub mod formats;
pub mod packet;
pub mod session;
pub mod transport;
pub mod upload;
