use anyhow::Result;
use esp_idf_hal::prelude::*;
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
use esp_idf_sys as _; // Binstart
use std::sync::Arc;

use log::info;

// Generate ESP-IDF app descriptor
#[allow(unexpected_cfgs)]
mod app_desc {
    esp_idf_sys::esp_app_desc!();
}

mod camera;
mod config;
mod logging;
mod memory_diagnostics;
mod network;
mod psram;
mod system;
mod version;

use crate::camera::EspCamera;
use crate::network::web_server::CameraServer;
use crate::network::NetworkManager;
use crate::psram::PsramAllocator;

const IDLE_LOG_INTERVAL_MS: u32 = 10_000;

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();

    if let Err(e) = logging::init_logger() {
        // Another logger is already installed; keep using it
        log::warn!("Logger init failed: {:?}", e);
    }

    info!("Booting ESP32-S3 Camera Module {}", version::full_version());
    system::info::log_chip_info();

    let psram_info = PsramAllocator::get_info();
    psram_info.log_info();

    // Takes care of erasing and re-initializing a full or outdated NVS partition
    let nvs = EspDefaultNvsPartition::take()?;
    let config = config::load_or_default(nvs.clone())?;

    if !logging::set_max_level_from_str(&config.log_level) {
        log::warn!("Unknown log level '{}', keeping info", config.log_level);
    }

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;

    let mut network = NetworkManager::new(peripherals.modem, sys_loop, nvs, &config)?;
    network.connect()?;

    if !psram_info.fits_frame_pool(&config.camera) {
        log::warn!("Camera frame pool may not fit in PSRAM, init may fail");
    }
    let camera = Arc::new(EspCamera::init(&config.camera)?);

    let server = CameraServer::new(camera, config.stream.clone())?;

    info!(
        "Setup complete! Access the camera stream at http://{}/ (SSID {})",
        network.get_ip().unwrap_or_else(|| "<IP>".to_string()),
        network.get_ssid()
    );

    loop {
        esp_idf_hal::delay::FreeRtos::delay_ms(IDLE_LOG_INTERVAL_MS);

        network.maintain();
        if !network.is_connected() {
            log::warn!("WiFi down, streams will fail until it reconnects");
        }

        memory_diagnostics::log_memory_state("idle", server.active_streams());
    }
}
