//! Adapters between the ESP-IDF HTTP server and the MJPEG stream loop
use core::ffi::c_void;
use embedded_svc::http::server::{Connection, Request, Response};
use esp_idf_svc::http::server::EspHttpConnection;
use esp_idf_svc::io::Write;
use mjpeg_core::{LivenessProbe, StreamTransport};

#[derive(Debug)]
pub enum TransportError<E> {
    Io(E),
    /// `begin` called twice, or `send` before `begin`
    OutOfOrder,
}

enum Stage<C: Connection> {
    Pending(Request<C>),
    Open(Response<C>),
    Spent,
}

/// One `/stream` response. Headers go out on `begin`, each `send` writes and
/// flushes so a frame is not held back in the chunk buffer.
pub struct EspStreamTransport<C: Connection> {
    stage: Stage<C>,
}

impl<C: Connection> EspStreamTransport<C> {
    pub fn new(request: Request<C>) -> Self {
        Self {
            stage: Stage::Pending(request),
        }
    }
}

impl<C: Connection> StreamTransport for EspStreamTransport<C> {
    type Error = TransportError<C::Error>;

    fn begin(&mut self, headers: &[(&str, &str)]) -> Result<(), Self::Error> {
        let request = match std::mem::replace(&mut self.stage, Stage::Spent) {
            Stage::Pending(request) => request,
            other => {
                self.stage = other;
                return Err(TransportError::OutOfOrder);
            }
        };

        let response = request
            .into_response(200, Some("OK"), headers)
            .map_err(TransportError::Io)?;
        self.stage = Stage::Open(response);
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let Stage::Open(response) = &mut self.stage else {
            return Err(TransportError::OutOfOrder);
        };

        response.write_all(bytes).map_err(TransportError::Io)?;
        response.flush().map_err(TransportError::Io)
    }
}

/// Socket descriptor behind an in-flight request, read before the response starts
pub fn request_sockfd(request: &mut Request<&mut EspHttpConnection<'_>>) -> Option<i32> {
    let raw = request.connection().raw_connection().ok()?;
    let fd = unsafe { esp_idf_sys::httpd_req_to_sockfd(raw.handle()) };
    (fd >= 0).then_some(fd)
}

/// Reads `SO_ERROR` on the client socket without touching its receive queue
#[derive(Debug, Clone, Copy)]
pub struct SocketErrorProbe {
    sockfd: i32,
}

impl SocketErrorProbe {
    pub fn new(sockfd: i32) -> Self {
        Self { sockfd }
    }
}

impl<T: ?Sized> LivenessProbe<T> for SocketErrorProbe {
    fn peer_alive(&self, _transport: &T) -> bool {
        let mut error: i32 = 0;
        let mut len = core::mem::size_of::<i32>() as esp_idf_sys::socklen_t;

        let rc = unsafe {
            esp_idf_sys::lwip_getsockopt(
                self.sockfd,
                esp_idf_sys::SOL_SOCKET as i32,
                esp_idf_sys::SO_ERROR as i32,
                &mut error as *mut i32 as *mut c_void,
                &mut len,
            )
        };

        if rc != 0 {
            log::debug!("getsockopt failed on fd {}: socket closed", self.sockfd);
            return false;
        }
        if error != 0 {
            log::debug!("Socket {} reports error {}", self.sockfd, error);
            return false;
        }
        true
    }
}
