use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jobsync_engine::ClientSettings;
use jobsync_logging::LogDestination;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const CONFIG_FILENAME: &str = "jobsync.ron";
pub(crate) const CONFIG_ENV: &str = "JOBSYNC_CONFIG";
pub(crate) const ACCESS_TOKEN_ENV: &str = "JOBSYNC_ACCESS_TOKEN";
pub(crate) const REFRESH_TOKEN_ENV: &str = "JOBSYNC_REFRESH_TOKEN";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

/// Contents of `jobsync.ron`. Every field may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub watch_interval_secs: u64,
    pub summary_interval_secs: u64,
    pub history_page_size: usize,
    pub refresh_path: String,
    pub trailing_slash: bool,
    pub log_target: LogTarget,
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let settings = ClientSettings::default();
        Self {
            base_url: settings.base_url,
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            watch_interval_secs: settings.watch_interval.as_secs(),
            summary_interval_secs: settings.summary_interval.as_secs(),
            history_page_size: settings.history_page_size,
            refresh_path: settings.refresh_path,
            trailing_slash: settings.trailing_slash,
            // The dashboard owns the terminal.
            log_target: LogTarget::File,
            verbose: false,
        }
    }
}

impl AppConfig {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            watch_interval: Duration::from_secs(self.watch_interval_secs.max(1)),
            summary_interval: Duration::from_secs(self.summary_interval_secs.max(1)),
            history_page_size: self.history_page_size.max(1),
            refresh_path: self.refresh_path.clone(),
            trailing_slash: self.trailing_slash,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

pub(crate) fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME))
}

/// Reads the config file. A missing file yields the defaults.
pub(crate) fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_token(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub(crate) fn tokens_from_env() -> (Option<String>, Option<String>) {
    (env_token(ACCESS_TOKEN_ENV), env_token(REFRESH_TOKEN_ENV))
}
