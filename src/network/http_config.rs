use esp_idf_svc::http::server::Configuration;

/// HTTP server configuration sized for long-lived stream handlers.
///
/// Every open `/stream` pins one socket and one server task for its whole
/// lifetime, so sockets are budgeted for several viewers plus `/status`.
pub fn create_http_config() -> Configuration {
    Configuration {
        stack_size: 8192,        // Stack size for request handlers
        max_uri_handlers: 8,
        max_open_sockets: 7,     // httpd reserves 3 more of the 16 LWIP sockets; the rest serve Wi-Fi and mDNS
        max_resp_headers: 8,

        // Reclaim sockets from viewers that vanished without a FIN
        lru_purge_enable: true,

        ..Default::default()
    }
}
