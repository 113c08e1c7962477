use std::time::Duration;

use jobsync_core::{Cadence, HISTORY_PAGE_SIZE};

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// API root, e.g. `https://example.com/api`. Endpoint paths are appended to it.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Poll period while individual jobs are being watched.
    pub watch_interval: Duration,
    /// Poll period for the summary dashboard.
    pub summary_interval: Duration,
    pub history_page_size: usize,
    pub refresh_path: String,
    /// Append `/` to every endpoint path (servers that route on trailing slashes).
    pub trailing_slash: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            watch_interval: Duration::from_secs(10),
            summary_interval: Duration::from_secs(60),
            history_page_size: HISTORY_PAGE_SIZE,
            refresh_path: "/auth/jwt/refresh".to_string(),
            trailing_slash: false,
        }
    }
}

impl ClientSettings {
    pub fn interval_for(&self, cadence: Cadence) -> Duration {
        match cadence {
            Cadence::Watch => self.watch_interval,
            Cadence::Summary => self.summary_interval,
        }
    }
}
