//! MJPEG Core - Hardware-independent streaming logic for the ESP32-S3 camera
//!
//! This crate contains the multipart encoder and the per-connection stream
//! loop. The camera driver, HTTP server and socket probe are reached through
//! the traits in [`frame`] and [`transport`], so everything here can be
//! tested on the host platform without ESP32 hardware.

pub mod fps;
pub mod frame;
pub mod multipart;
pub mod retry;
pub mod settings;
pub mod status;
pub mod stream;
pub mod transport;

pub use frame::{FrameBuffer, FrameSource, HeldFrame};
pub use multipart::{MultipartPart, PartDiagnostics, STREAM_CONTENT_TYPE};
pub use settings::{CameraSettings, FrameSize};
pub use stream::{
    CaptureFailurePolicy, ExitReason, MjpegStreamer, SessionSummary, StreamConfig, StreamError,
    StreamState,
};
pub use transport::{LivenessProbe, NoProbe, Pacer, StreamTransport, ThreadPacer};

#[cfg(test)]
pub(crate) mod testing;
