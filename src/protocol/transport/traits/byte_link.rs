//! Minimal abstraction for an asynchronous byte link. Allows the codec to
//! plug into various transports (TCP/UDP socket, serial port, file reader)
//! without knowing any of them.
use futures_util::Future;

/// Contract to pull raw bytes from a transport.
pub trait ByteSource {
    type Error: core::fmt::Debug;
    /// Read up to `buf.len()` bytes. Returns the number of bytes placed in
    /// `buf`; zero means the stream is starved or at end-of-file, which the
    /// framer reports as a timeout.
    fn read<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = Result<usize, Self::Error>> + 'a;
}

/// Contract to push raw bytes at a transport.
pub trait ByteSink {
    type Error: core::fmt::Debug;
    /// Write the whole buffer. Asynchronous to accommodate non-blocking
    /// drivers.
    fn write_all<'a>(
        &'a mut self,
        data: &'a [u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;
}
