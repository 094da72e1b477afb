// Centralized version information

// Firmware version reported in logs and /status
pub const FIRMWARE_VERSION: &str = "v1.0-camera";

// Cargo package version from Cargo.toml
pub const CARGO_VERSION: &str = env!("CARGO_PKG_VERSION");

// Full version string including Cargo version
pub fn full_version() -> String {
    format!("{} ({})", FIRMWARE_VERSION, CARGO_VERSION)
}
