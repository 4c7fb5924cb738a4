use std::io;
use std::time::Duration;

/// A connected peer, as seen by receive and send strategies.
pub trait Connection: Send {
    /// Read at most `buf.len()` bytes, waiting no longer than `timeout`.
    ///
    /// `Ok(0)` means nothing arrived in time. A closed or failed connection
    /// is an error.
    fn receive_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Write all of `bytes`, returning how many were written.
    fn send(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Peer address, if known.
    fn peer(&self) -> Option<String>;
}
