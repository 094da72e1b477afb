use esp_idf_sys::*;

/// Milliseconds since boot from the high resolution timer
pub fn uptime_ms() -> u64 {
    (unsafe { esp_timer_get_time() } / 1000) as u64
}

/// Log chip model, cores, radio features, revision and flash size
pub fn log_chip_info() {
    let mut info = esp_chip_info_t::default();
    let mut flash_size = 0u32;
    let flash_ok = unsafe {
        esp_chip_info(&mut info);
        esp_flash_get_size(std::ptr::null_mut(), &mut flash_size) == ESP_OK
    };

    let feature = |mask: u32, name: &'static str| {
        if info.features & mask != 0 {
            name
        } else {
            ""
        }
    };

    log::info!(
        "Chip: {} with {} CPU core(s), WiFi{}{}{}, revision v{}.{}",
        if info.model == esp_chip_model_t_CHIP_ESP32S3 { "ESP32-S3" } else { "ESP32" },
        info.cores,
        feature(CHIP_FEATURE_BT, "/BT"),
        feature(CHIP_FEATURE_BLE, "/BLE"),
        feature(CHIP_FEATURE_IEEE802154, "/802.15.4"),
        info.revision / 100,
        info.revision % 100
    );

    if flash_ok {
        log::info!(
            "Flash: {} MB {}",
            flash_size / (1024 * 1024),
            if info.features & CHIP_FEATURE_EMB_FLASH != 0 { "embedded" } else { "external" }
        );
    } else {
        log::warn!("Failed to read flash size");
    }
}
