use anyhow::Result;
use esp_idf_svc::http::server::EspHttpServer;
use esp_idf_svc::http::Method;
use esp_idf_svc::io::Write;
use mjpeg_core::status::StatusSnapshot;
use mjpeg_core::{MjpegStreamer, NoProbe, StreamConfig, ThreadPacer};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::camera::EspCamera;
use crate::memory_diagnostics::MemoryStats;
use crate::network::http_config::create_http_config;
use crate::network::stream_transport::{request_sockfd, EspStreamTransport, SocketErrorProbe};
use crate::system::info::uptime_ms;
use crate::version;

const INDEX_HTML: &str = concat!(
    "<html><head><title>ESP32-S3 Camera</title></head>",
    "<body><img src=\"/stream\" style=\"width:100%;\"></body></html>",
);

/// Counts `/stream` handlers currently running
#[derive(Clone, Default)]
pub struct StreamCounter(Arc<AtomicU32>);

impl StreamCounter {
    pub fn active(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    fn enter(&self) -> StreamSlot {
        self.0.fetch_add(1, Ordering::Relaxed);
        StreamSlot(self.0.clone())
    }
}

/// Decrements the stream count however the handler exits
struct StreamSlot(Arc<AtomicU32>);

impl Drop for StreamSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// HTTP front end for the camera.
///
/// `esp_http_server` runs handlers on a single task, so while one viewer is
/// on `/stream` the page, `/status` and any second viewer wait until that
/// stream ends.
pub struct CameraServer {
    _server: EspHttpServer<'static>,
    streams: StreamCounter,
}

impl CameraServer {
    pub fn new(camera: Arc<EspCamera>, stream_config: StreamConfig) -> Result<Self> {
        let mut server = EspHttpServer::new(&create_http_config())?;
        let streams = StreamCounter::default();

        server.fn_handler("/", Method::Get, |req| {
            let mut response = req.into_response(
                200,
                Some("OK"),
                &[("Content-Type", "text/html"), ("Connection", "close")],
            )?;
            response.write_all(INDEX_HTML.as_bytes())?;
            Ok(()) as Result<()>
        })?;

        let stream_camera = camera.clone();
        let stream_counter = streams.clone();
        server.fn_handler("/stream", Method::Get, move |mut req| {
            let sockfd = request_sockfd(&mut req);
            let _slot = stream_counter.enter();
            log::info!("Stream client connected ({} active)", stream_counter.active());

            let mut transport = EspStreamTransport::new(req);
            let mut streamer = MjpegStreamer::new(stream_config.clone());

            let result = match sockfd {
                Some(fd) => streamer.run(
                    &mut transport,
                    stream_camera.as_ref(),
                    &SocketErrorProbe::new(fd),
                    &mut ThreadPacer,
                ),
                None => {
                    log::warn!("No socket descriptor for stream, relying on write errors");
                    streamer.run(&mut transport, stream_camera.as_ref(), &NoProbe, &mut ThreadPacer)
                }
            };

            match result {
                Ok(summary) => log::info!(
                    "Stream client left: {:?}, {} frames, fps {:?}",
                    summary.exit,
                    summary.frames_sent,
                    summary.fps
                ),
                Err(e) => log::warn!("Stream not started: {}", e),
            }

            // The session is over either way; there is nothing left to send
            Ok(()) as Result<()>
        })?;

        let status_camera = camera;
        let status_counter = streams.clone();
        server.fn_handler("/status", Method::Get, move |req| {
            let mut snapshot = status_camera
                .sensor_snapshot()
                .map(StatusSnapshot::from_readout)
                .unwrap_or_default();

            let memory = MemoryStats::current();
            snapshot.free_heap = memory.free_heap;
            snapshot.min_free_heap = memory.min_free_heap;
            snapshot.psram_free = memory.psram_free;
            snapshot.active_streams = status_counter.active();
            snapshot.uptime_ms = uptime_ms();
            snapshot.version = version::full_version();

            let json = snapshot.to_json()?;
            let mut response = req.into_response(
                200,
                Some("OK"),
                &[
                    ("Content-Type", "application/json"),
                    ("Access-Control-Allow-Origin", "*"),
                    ("Connection", "close"),
                ],
            )?;
            response.write_all(json.as_bytes())?;
            Ok(()) as Result<()>
        })?;

        log::info!("Web server started: routes /, /stream, /status");

        Ok(Self {
            _server: server,
            streams,
        })
    }

    pub fn active_streams(&self) -> u32 {
        self.streams.active()
    }
}
