use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use converter_engine::{BridgeSettings, Endpoints, PollerSettings, ServiceSettings};
use log::LevelFilter;
use serde::Deserialize;

use crate::logging::LogDestination;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "converter.ron";

pub const BASE_URL_ENV: &str = "API_BASE_URL";

/// Endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub convert: String,
    pub progress: String,
    pub list: String,
    pub download: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        let Endpoints {
            convert,
            progress,
            list,
            download,
        } = Endpoints::default();
        Self {
            convert,
            progress,
            list,
            download,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub endpoints: EndpointPaths,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub max_poll_failures: u32,
    pub max_artifact_bytes: u64,
    pub download_dir: PathBuf,
    pub log_destination: LogDestination,
    pub log_level: String,
    pub ipc_debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let service = ServiceSettings::default();
        let poller = PollerSettings::default();
        Self {
            base_url: service.base_url,
            endpoints: EndpointPaths::default(),
            connect_timeout_ms: service.connect_timeout.as_millis() as u64,
            request_timeout_ms: service.request_timeout.as_millis() as u64,
            poll_interval_ms: poller.interval.as_millis() as u64,
            max_poll_failures: poller.max_consecutive_failures,
            max_artifact_bytes: service.max_artifact_bytes,
            download_dir: PathBuf::from("./downloads"),
            log_destination: LogDestination::File,
            log_level: "info".to_string(),
            ipc_debug: false,
        }
    }
}

impl AppConfig {
    /// Reads `explicit` if given, else `converter.ron` when present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Applies `API_BASE_URL` and `IPC_DEBUG` from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if lookup(converter_logging::IPC_DEBUG_ENV).as_deref() == Some("1") {
            self.ipc_debug = true;
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            base_url: self.base_url.clone(),
            endpoints: Endpoints {
                convert: self.endpoints.convert.clone(),
                progress: self.endpoints.progress.clone(),
                list: self.endpoints.list.clone(),
                download: self.endpoints.download.clone(),
            },
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_artifact_bytes: self.max_artifact_bytes,
        }
    }

    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            poller: PollerSettings {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_consecutive_failures: self.max_poll_failures,
            },
            download_dir: self.download_dir.clone(),
        }
    }
}
