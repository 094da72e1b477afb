//! Read-only diagnostic snapshot served at `/status`
use serde::{Deserialize, Serialize};

use crate::settings::FrameSize;

/// Sensor identity and the tuning values the driver currently applies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReadout {
    pub sensor: String,
    pub framesize: Option<FrameSize>,
    pub quality: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub sensor: String,
    pub framesize: String,
    pub quality: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    pub free_heap: u32,
    pub min_free_heap: u32,
    pub psram_free: u32,
    pub active_streams: u32,
    pub uptime_ms: u64,
    pub version: String,
}

impl StatusSnapshot {
    pub fn from_readout(readout: SensorReadout) -> Self {
        Self {
            framesize: readout
                .framesize
                .map(|size| size.name().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            sensor: readout.sensor,
            quality: readout.quality,
            brightness: readout.brightness,
            contrast: readout.contrast,
            saturation: readout.saturation,
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Sensor name for a camera module product id
pub fn sensor_name(pid: u16) -> &'static str {
    match pid {
        0x26 => "OV2640",
        0x3660 => "OV3660",
        0x5640 => "OV5640",
        0x77 => "OV7725",
        0x96 => "OV9650",
        0x2145 => "GC2145",
        _ => "unknown",
    }
}
