// PSRAM (External SPI RAM) checks for the camera frame buffer pool
// The driver places every frame buffer in PSRAM

use esp_idf_sys::*;
use log::*;
use mjpeg_core::CameraSettings;

pub struct PsramAllocator;

impl PsramAllocator {
    /// Check if PSRAM is available and initialized
    pub fn is_available() -> bool {
        unsafe { esp_psram_is_initialized() }
    }

    pub fn get_info() -> PsramInfo {
        let available = Self::is_available();
        unsafe {
            PsramInfo {
                available,
                total_size: if available { esp_psram_get_size() } else { 0 },
                free_size: heap_caps_get_free_size(MALLOC_CAP_SPIRAM),
                largest_block: heap_caps_get_largest_free_block(MALLOC_CAP_SPIRAM),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PsramInfo {
    pub available: bool,
    pub total_size: usize,
    pub free_size: usize,
    pub largest_block: usize,
}

impl PsramInfo {
    pub fn log_info(&self) {
        if self.available {
            info!("PSRAM Status: Available");
            info!("  Total: {} MB", self.total_size / 1024 / 1024);
            info!("  Free: {} KB", self.free_size / 1024);
            info!("  Largest block: {} KB", self.largest_block / 1024);
        } else {
            warn!("PSRAM Status: Not available");
        }
    }

    /// Whether the driver's JPEG buffers for `settings` fit in free PSRAM
    pub fn fits_frame_pool(&self, settings: &CameraSettings) -> bool {
        let (width, height) = settings.frame_size.dimensions();
        // esp32-camera sizes a JPEG buffer at a fifth of the raw pixel count
        let frame_bytes = width as usize * height as usize / 5;
        let budget = settings.pool_budget_bytes(frame_bytes);

        if !self.available || budget > self.free_size || frame_bytes > self.largest_block {
            warn!(
                "Frame pool needs {} x {} KB, PSRAM free {} KB (largest block {} KB)",
                settings.fb_count,
                frame_bytes / 1024,
                self.free_size / 1024,
                self.largest_block / 1024
            );
            return false;
        }
        true
    }
}
