//! Per-connection MJPEG stream loop
//!
//! One `MjpegStreamer` serves one client for the lifetime of its connection:
//! set the multipart headers once, then pull, encode, send, release and pace
//! until the client goes away or the camera stops delivering. There is no
//! end-of-stream message in multipart/x-mixed-replace, so the loop only ends
//! on a failure or a disconnect, and none of those are errors for the caller.
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fps::RollingFps;
use crate::frame::{FrameBuffer, FrameSource, HeldFrame};
use crate::multipart::{MultipartPart, PartDiagnostics, STREAM_CONTENT_TYPE};
use crate::transport::{LivenessProbe, Pacer, StreamTransport};

/// What to do when the camera returns no frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CaptureFailurePolicy {
    /// Close the session on the first failed capture
    #[default]
    EndSession,
    /// Wait `delay_ms` and pull again, giving up after `max_consecutive`
    /// failures in a row
    Retry { delay_ms: u32, max_consecutive: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Delay after each frame; bounds camera pull rate and outgoing bandwidth
    pub pace_interval_ms: u32,
    /// Probe the socket before each pull
    pub liveness_check: bool,
    pub capture_failure: CaptureFailurePolicy,
    /// Emit X-Frame-Number / X-Timestamp / X-FPS on every part
    pub diagnostic_headers: bool,
    pub fps_window_ms: u32,
    /// Send `Access-Control-Allow-Origin: *`
    pub cors: bool,
    /// Advertised in `X-Framerate` when set
    pub framerate_hint: Option<u32>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            pace_interval_ms: 30,
            liveness_check: true,
            capture_failure: CaptureFailurePolicy::EndSession,
            diagnostic_headers: false,
            fps_window_ms: 5000,
            cors: true,
            framerate_hint: None,
        }
    }
}

impl StreamConfig {
    pub fn pace_interval(&self) -> Duration {
        Duration::from_millis(self.pace_interval_ms as u64)
    }

    pub fn fps_window(&self) -> Duration {
        Duration::from_millis(self.fps_window_ms as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Init,
    Streaming,
    Closing,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Liveness probe saw a socket error
    PeerGone,
    CaptureFailed,
    /// A boundary, header or payload write failed or timed out
    TransportError,
    EncodeError,
}

#[derive(Debug, Error)]
pub enum StreamError {
    /// Response headers could not be set; nothing was streamed
    #[error("failed to start multipart response: {0}")]
    Begin(String),
}

/// Per-connection counters. Nothing here is shared between sessions.
#[derive(Debug, Clone)]
pub struct StreamSession {
    state: StreamState,
    frames_sent: u64,
    bytes_sent: u64,
    capture_failures: u32,
    last_frame_at: Option<Instant>,
    fps: RollingFps,
}

impl StreamSession {
    fn new(fps_window: Duration) -> Self {
        Self {
            state: StreamState::Init,
            frames_sent: 0,
            bytes_sent: 0,
            capture_failures: 0,
            last_frame_at: None,
            fps: RollingFps::new(fps_window),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn capture_failures(&self) -> u32 {
        self.capture_failures
    }

    pub fn fps(&self) -> Option<f32> {
        self.fps.current()
    }

    pub fn last_frame_at(&self) -> Option<Instant> {
        self.last_frame_at
    }

    fn record_frame(&mut self, now: Instant) {
        self.frames_sent += 1;
        self.last_frame_at = Some(now);
        if let Some(rate) = self.fps.record(now) {
            log::info!("Stream: {:.1} fps ({} frames)", rate, self.frames_sent);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub capture_failures: u32,
    pub fps: Option<f32>,
    pub exit: ExitReason,
}

pub struct MjpegStreamer {
    config: StreamConfig,
    session: StreamSession,
}

impl MjpegStreamer {
    pub fn new(config: StreamConfig) -> Self {
        let session = StreamSession::new(config.fps_window());
        Self { config, session }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Stream until the client disconnects or the camera fails.
    ///
    /// Returns `Err` only when the response could not be started. Every
    /// in-stream failure closes the session and is reported in the summary.
    pub fn run<T, S, P, D>(
        &mut self,
        transport: &mut T,
        source: &S,
        probe: &P,
        pacer: &mut D,
    ) -> Result<SessionSummary, StreamError>
    where
        T: StreamTransport,
        S: FrameSource,
        P: LivenessProbe<T>,
        D: Pacer,
    {
        self.session.state = StreamState::Init;
        let framerate = self.config.framerate_hint.map(|fps| fps.to_string());
        let mut headers = vec![("Content-Type", STREAM_CONTENT_TYPE)];
        if self.config.cors {
            headers.push(("Access-Control-Allow-Origin", "*"));
        }
        if let Some(framerate) = framerate.as_deref() {
            headers.push(("X-Framerate", framerate));
        }

        if let Err(e) = transport.begin(&headers) {
            self.session.state = StreamState::Closing;
            log::error!("Failed to set stream content type: {:?}", e);
            return Err(StreamError::Begin(format!("{:?}", e)));
        }

        self.session.state = StreamState::Streaming;
        log::info!("Starting camera stream...");

        let exit = self.stream_frames(transport, source, probe, pacer);

        self.session.state = StreamState::Closing;
        log::info!(
            "Stream closed after {} frames, {} KB ({:?})",
            self.session.frames_sent,
            self.session.bytes_sent / 1024,
            exit
        );

        Ok(SessionSummary {
            frames_sent: self.session.frames_sent,
            bytes_sent: self.session.bytes_sent,
            capture_failures: self.session.capture_failures,
            fps: self.session.fps(),
            exit,
        })
    }

    fn stream_frames<T, S, P, D>(
        &mut self,
        transport: &mut T,
        source: &S,
        probe: &P,
        pacer: &mut D,
    ) -> ExitReason
    where
        T: StreamTransport,
        S: FrameSource,
        P: LivenessProbe<T>,
        D: Pacer,
    {
        let pace = self.config.pace_interval();
        let mut consecutive_failures = 0u32;

        loop {
            if self.config.liveness_check && !probe.peer_alive(transport) {
                log::info!("Client disconnected");
                return ExitReason::PeerGone;
            }

            let Some(held) = source.hold() else {
                self.session.capture_failures += 1;
                consecutive_failures += 1;
                match self.config.capture_failure {
                    CaptureFailurePolicy::Retry {
                        delay_ms,
                        max_consecutive,
                    } if consecutive_failures <= max_consecutive => {
                        log::warn!(
                            "Camera capture failed ({}/{}), retrying",
                            consecutive_failures,
                            max_consecutive
                        );
                        pacer.pause(Duration::from_millis(delay_ms as u64));
                        continue;
                    }
                    _ => {
                        log::error!("Camera capture failed");
                        return ExitReason::CaptureFailed;
                    }
                }
            };
            consecutive_failures = 0;

            let sent = self.send_part(transport, &held);
            // Back to the pool before anything else, including on failure
            held.release();

            if let Err(reason) = sent {
                return reason;
            }

            self.session.record_frame(Instant::now());
            pacer.pause(pace);
        }
    }

    /// Write boundary, header and payload for one frame, in that order
    fn send_part<T, S>(&mut self, transport: &mut T, held: &HeldFrame<'_, S>) -> Result<(), ExitReason>
    where
        T: StreamTransport,
        S: FrameSource,
    {
        let frame = held.frame();
        let diagnostics = if self.config.diagnostic_headers {
            PartDiagnostics {
                frame_number: Some(self.session.frames_sent + 1),
                timestamp_ms: frame.timestamp().map(|ts| ts.as_millis() as u64),
                fps: self.session.fps(),
            }
        } else {
            PartDiagnostics::none()
        };

        let part = MultipartPart::encode(frame.data(), &diagnostics).map_err(|e| {
            log::error!("Frame {} not sent: {}", self.session.frames_sent + 1, e);
            ExitReason::EncodeError
        })?;

        for segment in part.segments() {
            if let Err(e) = transport.send(segment) {
                log::info!(
                    "Stream write failed after {} frames: {:?}",
                    self.session.frames_sent,
                    e
                );
                return Err(ExitReason::TransportError);
            }
            self.session.bytes_sent += segment.len() as u64;
        }

        log::trace!(
            "Frame {} sent ({} bytes)",
            self.session.frames_sent + 1,
            frame.len()
        );
        Ok(())
    }
}
