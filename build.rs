use std::fs;
use std::path::Path;

/// Defines read from wifi_config.h and exported as compile-time env vars
const DEFINES: [(&str, &str); 5] = [
    ("WIFI_SSID", ""),
    ("WIFI_PASSWORD", ""),
    ("CAMERA_FRAME_SIZE", "SVGA"),
    ("CAMERA_JPEG_QUALITY", "12"),
    ("CAMERA_HOSTNAME", "esp32-camera"),
];

fn main() -> anyhow::Result<()> {
    // Necessary for ESP-IDF
    embuild::espidf::sysenv::output();

    // Add crash log helper for better panic diagnostics
    println!("cargo:rustc-link-arg=-Wl,--undefined=esp_backtrace_print_app_description");

    let config_path = "wifi_config.h";
    println!("cargo:rerun-if-changed={}", config_path);

    let contents = if Path::new(config_path).exists() {
        fs::read_to_string(config_path)?
    } else {
        println!("cargo:warning=wifi_config.h not found! Copy wifi_config.h.example to wifi_config.h and add your credentials.");
        String::new()
    };

    for (name, default) in DEFINES {
        let value = define_value(&contents, name).unwrap_or(default);
        println!("cargo:rustc-env={}={}", name, value);
    }

    Ok(())
}

/// Value of `#define NAME "value"` or `#define NAME value`
fn define_value<'a>(contents: &'a str, name: &str) -> Option<&'a str> {
    contents.lines().find_map(|line| {
        let mut tokens = line.trim().splitn(3, char::is_whitespace);
        if tokens.next()? != "#define" || tokens.next()? != name {
            return None;
        }
        let raw = tokens.next()?.trim();
        match raw.split('"').nth(1) {
            Some(quoted) => Some(quoted),
            None => Some(raw),
        }
    })
}
