use anyhow::{bail, Result};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};
use mjpeg_core::retry::wait_until;
use mjpeg_core::ThreadPacer;
use std::time::Duration;

/// Association polls before giving up
const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct WifiManager {
    wifi: BlockingWifi<EspWifi<'static>>,
    pub ssid: String,
}

impl WifiManager {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        ssid: String,
        password: String,
    ) -> Result<Self> {
        log::info!("Initializing WiFi manager for SSID: '{}'", ssid);

        if ssid.is_empty() {
            log::error!("WiFi SSID is empty! Check wifi_config.h");
            bail!("WiFi SSID cannot be empty");
        }

        let mut esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;

        let cfg = Configuration::Client(ClientConfiguration {
            ssid: ssid.as_str().try_into().map_err(|e| {
                log::error!("Failed to convert SSID '{}': {:?}", ssid, e);
                anyhow::anyhow!("Invalid SSID format: {}", ssid)
            })?,
            password: password.as_str().try_into().map_err(|e| {
                log::error!("Failed to convert password: {:?}", e);
                anyhow::anyhow!("Invalid password format")
            })?,
            auth_method: if password.is_empty() {
                log::warn!("WiFi password is empty, using open network");
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });

        esp_wifi.set_configuration(&cfg)?;
        let wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;

        Ok(Self { wifi, ssid })
    }

    /// Start the station and wait a bounded time for an IP address
    pub fn connect(&mut self) -> Result<()> {
        log::info!("Starting WiFi...");
        self.wifi.start()?;

        log::info!("Connecting to {}...", self.ssid);
        if let Err(e) = self.wifi.wifi_mut().connect() {
            log::warn!("Initial connect request failed: {:?}", e);
        }

        let wifi = &self.wifi;
        let attempt = wait_until(CONNECT_ATTEMPTS, CONNECT_POLL_INTERVAL, &mut ThreadPacer, || {
            wifi.is_up().unwrap_or(false)
        })
        .map_err(|e| {
            log::error!("WiFi connection failed: {}", e);
            anyhow::anyhow!("WiFi connection to {} failed: {}", self.ssid, e)
        })?;

        log::info!("WiFi connected after {} poll(s)", attempt);

        // Power save drops frames under sustained streaming traffic
        unsafe {
            use esp_idf_sys::*;
            let result = esp_wifi_set_ps(wifi_ps_type_t_WIFI_PS_NONE);
            if result != ESP_OK {
                log::warn!("Failed to set WiFi power save mode: {:?}", result);
            }
        }

        Ok(())
    }

    /// Re-issue an association request if the station dropped off
    pub fn reconnect_if_needed(&mut self) {
        if self.is_connected() {
            return;
        }

        log::warn!("Disconnected from WiFi, retrying...");
        if let Err(e) = self.wifi.wifi_mut().connect() {
            log::warn!("Reconnect request failed: {:?}", e);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    pub fn get_ip(&self) -> Option<String> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|ip_info| format!("{}", ip_info.ip))
    }
}
