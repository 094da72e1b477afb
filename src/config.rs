use anyhow::Result;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use mjpeg_core::settings::{CameraSettings, FrameSize};
use mjpeg_core::StreamConfig;
use serde::{Deserialize, Serialize};

const CONFIG_NAMESPACE: &str = "camera";
const CONFIG_KEY: &str = "config";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // WiFi settings
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub hostname: String,

    // Sensor settings
    pub camera: CameraSettings,

    // Stream loop settings
    pub stream: StreamConfig,

    // Applied after load; see logging::set_max_level_from_str
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        // Values come from wifi_config.h via build.rs, which should NOT be committed to git
        let wifi_ssid = env!("WIFI_SSID");
        let wifi_password = env!("WIFI_PASSWORD");

        log::info!(
            "Config default: SSID='{}', Password={}",
            wifi_ssid,
            if wifi_password.is_empty() { "<empty>" } else { "<set>" }
        );

        let jpeg_quality = env!("CAMERA_JPEG_QUALITY").parse().unwrap_or_else(|_| {
            log::warn!("Invalid CAMERA_JPEG_QUALITY, using 12");
            12
        });

        let mut stream = StreamConfig::default();
        stream.diagnostic_headers = cfg!(feature = "stream_diagnostics");

        Self {
            wifi_ssid: wifi_ssid.to_string(),
            wifi_password: wifi_password.to_string(),
            hostname: env!("CAMERA_HOSTNAME").to_string(),
            camera: CameraSettings {
                frame_size: FrameSize::from_name(env!("CAMERA_FRAME_SIZE")),
                jpeg_quality,
                ..Default::default()
            },
            stream,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn save(&self, nvs: &mut EspNvs<NvsDefault>) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        nvs.set_blob(CONFIG_KEY, &json)?;
        log::info!("Configuration saved to NVS");
        Ok(())
    }
}

/// Load the stored config, falling back to compiled-in defaults.
///
/// Invalid camera settings from NVS are replaced by the defaults rather than
/// failing camera init later.
pub fn load_or_default(partition: EspDefaultNvsPartition) -> Result<Config> {
    let mut nvs = EspNvs::new(partition, CONFIG_NAMESPACE, true)?;

    match load_from_nvs(&nvs) {
        Ok(mut config) => {
            log::info!("Loaded configuration from NVS");
            let defaults = Config::default();
            let mut dirty = false;

            // If NVS has empty WiFi credentials, use the compiled-in ones
            if config.wifi_ssid.is_empty() {
                log::warn!("NVS WiFi credentials empty, using compiled defaults: SSID='{}'", defaults.wifi_ssid);
                config.wifi_ssid = defaults.wifi_ssid;
                config.wifi_password = defaults.wifi_password;
                dirty = true;
            }

            if let Err(e) = config.camera.validate() {
                log::warn!("Stored camera settings invalid ({}), using defaults", e);
                config.camera = defaults.camera;
                dirty = true;
            }

            if dirty {
                if let Err(e) = config.save(&mut nvs) {
                    log::warn!("Failed to save updated config: {:?}", e);
                }
            }

            Ok(config)
        }
        Err(e) => {
            log::warn!("Failed to load config from NVS: {:?}, using defaults", e);
            let config = Config::default();

            // Try to save default config to NVS for next time
            if let Err(save_err) = config.save(&mut nvs) {
                log::warn!("Failed to save default config to NVS: {:?}", save_err);
            }

            Ok(config)
        }
    }
}

fn load_from_nvs(nvs: &EspNvs<NvsDefault>) -> Result<Config> {
    let mut buf = vec![0u8; 1024]; // Max config size
    let data = nvs
        .get_blob(CONFIG_KEY, &mut buf)?
        .ok_or_else(|| anyhow::anyhow!("Config not found in NVS"))?;

    let config: Config = serde_json::from_slice(data)?;

    Ok(config)
}
