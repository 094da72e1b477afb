//! Camera configuration that can be validated independently of the driver
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sensor output resolutions supported by the JPEG pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrameSize {
    Uxga,
    Sxga,
    Xga,
    #[default]
    Svga,
    Vga,
    Cif,
    Qvga,
    Hqvga,
    Qqvga,
}

impl FrameSize {
    pub const ALL: [FrameSize; 9] = [
        FrameSize::Uxga,
        FrameSize::Sxga,
        FrameSize::Xga,
        FrameSize::Svga,
        FrameSize::Vga,
        FrameSize::Cif,
        FrameSize::Qvga,
        FrameSize::Hqvga,
        FrameSize::Qqvga,
    ];

    /// Parse a build-time frame size name. Unknown names fall back to SVGA.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|size| size.name().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| {
                if !name.is_empty() {
                    log::warn!("Unknown frame size '{}', using SVGA", name);
                }
                FrameSize::Svga
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            FrameSize::Uxga => "UXGA",
            FrameSize::Sxga => "SXGA",
            FrameSize::Xga => "XGA",
            FrameSize::Svga => "SVGA",
            FrameSize::Vga => "VGA",
            FrameSize::Cif => "CIF",
            FrameSize::Qvga => "QVGA",
            FrameSize::Hqvga => "HQVGA",
            FrameSize::Qqvga => "QQVGA",
        }
    }

    /// Width and height in pixels
    pub fn dimensions(&self) -> (u16, u16) {
        match self {
            FrameSize::Uxga => (1600, 1200),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Xga => (1024, 768),
            FrameSize::Svga => (800, 600),
            FrameSize::Vga => (640, 480),
            FrameSize::Cif => (400, 296),
            FrameSize::Qvga => (320, 240),
            FrameSize::Hqvga => (240, 176),
            FrameSize::Qqvga => (160, 120),
        }
    }
}

pub const MAX_JPEG_QUALITY: u8 = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("JPEG quality {0} out of range (0-63)")]
    Quality(u8),
    #[error("at least one frame buffer is required")]
    NoFrameBuffers,
    #[error("XCLK frequency {0} Hz out of range")]
    ClockFrequency(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub frame_size: FrameSize,
    /// 0-63, lower is better quality and larger frames
    pub jpeg_quality: u8,
    pub fb_count: u8,
    pub xclk_freq_hz: u32,
    /// Hand out the newest frame instead of waiting for a free buffer
    pub grab_latest: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::Svga,
            jpeg_quality: 12,
            fb_count: 1,
            xclk_freq_hz: 20_000_000,
            grab_latest: false,
        }
    }
}

impl CameraSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.jpeg_quality > MAX_JPEG_QUALITY {
            return Err(SettingsError::Quality(self.jpeg_quality));
        }
        if self.fb_count == 0 {
            return Err(SettingsError::NoFrameBuffers);
        }
        if !(1_000_000..=40_000_000).contains(&self.xclk_freq_hz) {
            return Err(SettingsError::ClockFrequency(self.xclk_freq_hz));
        }
        Ok(())
    }

    /// Worst-case memory pinned by the driver's frame buffer pool
    pub fn pool_budget_bytes(&self, max_frame_bytes: usize) -> usize {
        self.fb_count as usize * max_frame_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_names_round_trip() {
        for size in FrameSize::ALL {
            assert_eq!(FrameSize::from_name(size.name()), size);
        }
    }

    #[test]
    fn test_frame_size_lookup_is_case_insensitive() {
        assert_eq!(FrameSize::from_name("vga"), FrameSize::Vga);
        assert_eq!(FrameSize::from_name(" qqvga "), FrameSize::Qqvga);
    }

    #[test]
    fn test_unknown_frame_size_falls_back_to_svga() {
        assert_eq!(FrameSize::from_name("8K"), FrameSize::Svga);
        assert_eq!(FrameSize::from_name(""), FrameSize::Svga);
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(FrameSize::Svga.dimensions(), (800, 600));
        assert_eq!(FrameSize::Uxga.dimensions(), (1600, 1200));
    }

    #[test]
    fn test_default_settings_are_valid() {
        let settings = CameraSettings::default();
        assert_eq!(settings.validate(), Ok(()));
        assert_eq!(settings.frame_size, FrameSize::Svga);
    }

    #[test]
    fn test_quality_bounds() {
        let mut settings = CameraSettings::default();
        settings.jpeg_quality = 63;
        assert!(settings.validate().is_ok());
        settings.jpeg_quality = 64;
        assert_eq!(settings.validate(), Err(SettingsError::Quality(64)));
    }

    #[test]
    fn test_buffer_count_required() {
        let settings = CameraSettings {
            fb_count: 0,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::NoFrameBuffers));
        assert_eq!(CameraSettings::default().pool_budget_bytes(64 * 1024), 64 * 1024);
    }

    #[test]
    fn test_settings_serialization() {
        let settings = CameraSettings {
            frame_size: FrameSize::Vga,
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains(r#""frame_size":"VGA""#));
        let deserialized: CameraSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, deserialized);
    }
}
