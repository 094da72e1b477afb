// esp32-camera driver adapter: init, frame pool access and sensor readback
use anyhow::{bail, Result};
use esp_idf_sys::camera;
use mjpeg_core::settings::{CameraSettings, FrameSize};
use mjpeg_core::status::{sensor_name, SensorReadout};
use mjpeg_core::{FrameBuffer, FrameSource};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

// ESP32-S3 camera module pinout
mod pinout {
    pub const PWDN: i32 = -1;
    pub const RESET: i32 = -1;
    pub const XCLK: i32 = 15;
    pub const SIOD: i32 = 4;
    pub const SIOC: i32 = 5;
    pub const D7: i32 = 16;
    pub const D6: i32 = 17;
    pub const D5: i32 = 18;
    pub const D4: i32 = 12;
    pub const D3: i32 = 10;
    pub const D2: i32 = 8;
    pub const D1: i32 = 9;
    pub const D0: i32 = 11;
    pub const VSYNC: i32 = 6;
    pub const HREF: i32 = 7;
    pub const PCLK: i32 = 13;
}

const FRAME_SIZES: [(FrameSize, camera::framesize_t); 9] = [
    (FrameSize::Uxga, camera::framesize_t_FRAMESIZE_UXGA),
    (FrameSize::Sxga, camera::framesize_t_FRAMESIZE_SXGA),
    (FrameSize::Xga, camera::framesize_t_FRAMESIZE_XGA),
    (FrameSize::Svga, camera::framesize_t_FRAMESIZE_SVGA),
    (FrameSize::Vga, camera::framesize_t_FRAMESIZE_VGA),
    (FrameSize::Cif, camera::framesize_t_FRAMESIZE_CIF),
    (FrameSize::Qvga, camera::framesize_t_FRAMESIZE_QVGA),
    (FrameSize::Hqvga, camera::framesize_t_FRAMESIZE_HQVGA),
    (FrameSize::Qqvga, camera::framesize_t_FRAMESIZE_QQVGA),
];

fn to_driver_frame_size(size: FrameSize) -> camera::framesize_t {
    FRAME_SIZES
        .iter()
        .find(|(ours, _)| *ours == size)
        .map(|(_, driver)| *driver)
        .unwrap_or(camera::framesize_t_FRAMESIZE_SVGA)
}

fn from_driver_frame_size(size: camera::framesize_t) -> Option<FrameSize> {
    FRAME_SIZES
        .iter()
        .find(|(_, driver)| *driver == size)
        .map(|(ours, _)| *ours)
}

/// Initialized camera driver; the frame buffer pool is shared by all viewers
pub struct EspCamera {
    sequence: AtomicU32,
}

impl EspCamera {
    pub fn init(settings: &CameraSettings) -> Result<Self> {
        settings.validate()?;

        let mut config = camera::camera_config_t::default();
        config.pin_pwdn = pinout::PWDN;
        config.pin_reset = pinout::RESET;
        config.pin_xclk = pinout::XCLK;
        config.__bindgen_anon_1.pin_sccb_sda = pinout::SIOD;
        config.__bindgen_anon_2.pin_sccb_scl = pinout::SIOC;
        config.pin_d7 = pinout::D7;
        config.pin_d6 = pinout::D6;
        config.pin_d5 = pinout::D5;
        config.pin_d4 = pinout::D4;
        config.pin_d3 = pinout::D3;
        config.pin_d2 = pinout::D2;
        config.pin_d1 = pinout::D1;
        config.pin_d0 = pinout::D0;
        config.pin_vsync = pinout::VSYNC;
        config.pin_href = pinout::HREF;
        config.pin_pclk = pinout::PCLK;

        config.xclk_freq_hz = settings.xclk_freq_hz as i32;
        config.ledc_timer = camera::ledc_timer_t_LEDC_TIMER_0;
        config.ledc_channel = camera::ledc_channel_t_LEDC_CHANNEL_0;

        config.pixel_format = camera::pixformat_t_PIXFORMAT_JPEG;
        config.frame_size = to_driver_frame_size(settings.frame_size);
        config.jpeg_quality = settings.jpeg_quality as i32;
        config.fb_count = settings.fb_count as usize;
        config.fb_location = camera::camera_fb_location_t_CAMERA_FB_IN_PSRAM;
        config.grab_mode = if settings.grab_latest {
            camera::camera_grab_mode_t_CAMERA_GRAB_LATEST
        } else {
            camera::camera_grab_mode_t_CAMERA_GRAB_WHEN_EMPTY
        };

        let err = unsafe { camera::esp_camera_init(&config) };
        if err != esp_idf_sys::ESP_OK {
            log::error!("Camera init failed with error: 0x{:x}", err);
            bail!("Camera init failed with error: 0x{:x}", err);
        }

        log::info!(
            "Camera initialized: frame size: {}, quality: {}, buffers: {}",
            settings.frame_size.name(),
            settings.jpeg_quality,
            settings.fb_count
        );

        Ok(Self {
            sequence: AtomicU32::new(0),
        })
    }

    /// Sensor id and current tuning values, if the sensor is reachable
    pub fn sensor_snapshot(&self) -> Option<SensorReadout> {
        let sensor = unsafe { camera::esp_camera_sensor_get() };
        if sensor.is_null() {
            return None;
        }

        let sensor = unsafe { &*sensor };
        let status = &sensor.status;
        Some(SensorReadout {
            sensor: sensor_name(sensor.id.PID).to_string(),
            framesize: from_driver_frame_size(status.framesize),
            quality: status.quality as i32,
            brightness: status.brightness as i32,
            contrast: status.contrast as i32,
            saturation: status.saturation as i32,
        })
    }
}

/// A frame buffer borrowed from the driver's pool
pub struct CameraFrame {
    fb: NonNull<camera::camera_fb_t>,
    data: &'static [u8],
    timestamp: Duration,
    sequence: u64,
}

impl FrameBuffer for CameraFrame {
    fn data(&self) -> &[u8] {
        self.data
    }

    fn timestamp(&self) -> Option<Duration> {
        Some(self.timestamp)
    }

    fn sequence(&self) -> Option<u64> {
        Some(self.sequence)
    }
}

impl FrameSource for EspCamera {
    type Frame = CameraFrame;

    fn pull(&self) -> Option<CameraFrame> {
        let fb = NonNull::new(unsafe { camera::esp_camera_fb_get() })?;

        // camera_fb_t is not guaranteed to be aligned for direct field reads
        let (buf, len, ts) = unsafe {
            let raw = fb.as_ptr();
            (
                std::ptr::addr_of!((*raw).buf).read_unaligned(),
                std::ptr::addr_of!((*raw).len).read_unaligned(),
                std::ptr::addr_of!((*raw).timestamp).read_unaligned(),
            )
        };

        if buf.is_null() {
            unsafe { camera::esp_camera_fb_return(fb.as_ptr()) };
            return None;
        }

        // Valid until esp_camera_fb_return, which only `release` calls
        let data = unsafe { std::slice::from_raw_parts(buf, len) };
        let timestamp = Duration::from_secs(ts.tv_sec as u64)
            + Duration::from_micros(ts.tv_usec as u64);

        Some(CameraFrame {
            fb,
            data,
            timestamp,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed) as u64 + 1,
        })
    }

    fn release(&self, frame: CameraFrame) {
        unsafe { camera::esp_camera_fb_return(frame.fb.as_ptr()) };
    }
}
