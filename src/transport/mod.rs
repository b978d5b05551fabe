//! Transport abstraction over the serial link
//!
//! The engine only needs a duplex byte channel with best-effort writes and a
//! non-blocking poll for pending input. Opening the device, exclusive-lock
//! probing, and baud configuration are the implementor's concern; the engine
//! never touches OS-level serial state.

mod mock;

pub use mock::MockTransport;

use bytes::Bytes;
use std::io;

/// Duplex byte channel to the device console.
///
/// Implementations wrap a serial port, a telnet socket, or (in tests) an
/// in-memory script. All methods are non-blocking: `poll_available` returns
/// an empty buffer when nothing is pending rather than waiting.
pub trait Transport: Send {
    /// Write bytes to the device, flushing before returning.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Return any bytes pending on the link, or an empty buffer.
    fn poll_available(&mut self) -> io::Result<Bytes>;

    /// Release the underlying device. Subsequent I/O fails.
    fn close(&mut self);
}
