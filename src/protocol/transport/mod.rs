//! DMTP transport layer: the byte-stream abstraction the codec reads and
//! writes through, and the packet framer.
//!
//! The codec itself never owns a socket, serial port, or file; transports
//! implement [`traits::byte_link::ByteSource`] and
//! [`traits::byte_link::ByteSink`] and hand the framer a stream of bytes.
//! Timeouts are the transport's concern: a source that returns zero bytes
//! is reported as a timeout, the framer never waits on its own account.

pub mod framer;
pub mod traits;
