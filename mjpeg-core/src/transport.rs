//! Seams between the stream loop and the HTTP server it runs inside
use std::fmt::Debug;
use std::time::Duration;

/// Chunked HTTP response for one client connection
pub trait StreamTransport {
    type Error: Debug;

    /// Send the status line and response headers. Called once per session.
    fn begin(&mut self, headers: &[(&str, &str)]) -> Result<(), Self::Error>;

    /// Write one chunk. A send timeout must surface as an error.
    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Non-blocking check that the peer socket is still usable.
///
/// Implementations report `false` only on an observed socket error. "No data
/// available" is not a disconnect; a stale `true` is corrected by the next
/// failed write.
pub trait LivenessProbe<T: ?Sized> {
    fn peer_alive(&self, transport: &T) -> bool;
}

/// Probe for transports that expose no socket; relies on write failures alone
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl<T: ?Sized> LivenessProbe<T> for NoProbe {
    fn peer_alive(&self, _transport: &T) -> bool {
        true
    }
}

/// Cooperative delay between frames
pub trait Pacer {
    fn pause(&mut self, interval: Duration);
}

/// Sleeps the calling thread. Under ESP-IDF std this is a FreeRTOS tick delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, interval: Duration) {
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }
}
