use std::time::Duration;

pub const APP_NAME: &str = "slotbook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("{APP_NAME}=info")
}

/// Connection settings for the appointment backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix, no trailing slash.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        }
    }

    /// Default local backend at the standard Spring port.
    pub fn default_local() -> Self {
        Self::new("http://localhost:8080/api", 30)
    }

    /// Read `SLOTBOOK_API_URL` / `SLOTBOOK_API_TIMEOUT_SECS`, falling back
    /// to the local defaults.
    pub fn from_env() -> Self {
        let base_url = std::env::var("SLOTBOOK_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080/api".into());
        let timeout_secs = std::env::var("SLOTBOOK_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        Self::new(&base_url, timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
