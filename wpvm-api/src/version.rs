// Version information module

/// Crate version baked in at compile time
pub fn get_backend_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get version info response structure
#[derive(Debug, serde::Serialize)]
pub struct VersionInfo {
    pub backend_version: String,
    pub server_time: String,
}

/// Get version info for API response
pub fn get_version_info() -> VersionInfo {
    VersionInfo {
        backend_version: get_backend_version(),
        server_time: chrono::Utc::now()
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
    }
}
