pub mod http_config;
pub mod stream_transport;
pub mod web_server;
pub mod wifi;

use anyhow::Result;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::{eventloop::EspSystemEventLoop, mdns::EspMdns, nvs::EspDefaultNvsPartition};

use self::wifi::WifiManager;
use crate::config::Config;
use crate::version;

pub struct NetworkManager {
    wifi: WifiManager,
    hostname: String,
    _mdns: Option<EspMdns>,
}

impl NetworkManager {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        config: &Config,
    ) -> Result<Self> {
        let wifi = WifiManager::new(
            modem,
            sys_loop,
            nvs,
            config.wifi_ssid.clone(),
            config.wifi_password.clone(),
        )?;

        Ok(Self {
            wifi,
            hostname: config.hostname.clone(),
            _mdns: None,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        self.wifi.connect()?;
        log::info!("WiFi connected, IP: {:?}", self.wifi.get_ip());

        // Discovery is optional; the camera is still reachable by IP
        match self.start_mdns() {
            Ok(_) => log::info!("mDNS service started: {}.local", self.hostname),
            Err(e) => log::warn!("Failed to start mDNS: {:?}", e),
        }

        Ok(())
    }

    fn start_mdns(&mut self) -> Result<()> {
        let mut mdns = EspMdns::take()?;
        mdns.set_hostname(&self.hostname)?;
        mdns.set_instance_name("ESP32-S3 Camera")?;

        mdns.add_service(
            None,
            "_http",
            "_tcp",
            80,
            &[("path", "/"), ("stream", "/stream"), ("version", version::FIRMWARE_VERSION)],
        )?;

        self._mdns = Some(mdns);
        Ok(())
    }

    pub fn maintain(&mut self) {
        self.wifi.reconnect_if_needed();
    }

    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected()
    }

    pub fn get_ip(&self) -> Option<String> {
        self.wifi.get_ip()
    }

    pub fn get_ssid(&self) -> &str {
        &self.wifi.ssid
    }
}
