//! Command transport (serial channel from the host).

use core::future::Future;

/// Error type for transport writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No host attached to the channel.
    Disconnected,
    /// Endpoint write failed.
    Io,
}

/// Byte stream from the host, read without blocking.
pub trait Transport {
    /// Copy whatever bytes are already buffered into `buf`, returning the count.
    ///
    /// Returns 0 when nothing is pending; never waits.
    fn read_available(&mut self, buf: &mut [u8]) -> usize;

    /// Report and clear a disconnect that happened since the last call.
    fn take_disconnect(&mut self) -> bool;

    /// Send a reply frame to the host.
    fn write_reply(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), TransportError>>;
}
