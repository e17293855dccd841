use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::version_policy::{parse_core_version, VersionStrictness};
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub monitor: MonitorConfig,
    pub daemon: DaemonConfig,
}

/// Where node info comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub request_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9200".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    /// Version the cluster is checked against. Required.
    pub application_version: String,
    pub ignore_version_mismatch: bool,
    pub version_strictness: VersionStrictness,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_500,
            application_version: String::new(),
            ignore_version_mismatch: false,
            version_strictness: VersionStrictness::default(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        let version = self.application_version.trim();
        if version.is_empty() {
            return Err(ConfigError::MissingApplicationVersion);
        }
        if parse_core_version(version).is_none() {
            return Err(ConfigError::InvalidApplicationVersion(version.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub http_addr: String,
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:9110".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Flags that take precedence over every other configuration layer.
#[derive(Debug, Default)]
pub struct Overrides {
    pub source_url: Option<String>,
    pub application_version: Option<String>,
    pub ignore_version_mismatch: Option<bool>,
    pub version_strictness: Option<String>,
    pub http_addr: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nodewatch").join("config.yaml"))
    }

    pub fn apply(&mut self, overrides: Overrides) -> Result<(), ConfigError> {
        if let Some(url) = overrides.source_url {
            self.source.url = url;
        }
        if let Some(version) = overrides.application_version {
            self.monitor.application_version = version;
        }
        if let Some(ignore) = overrides.ignore_version_mismatch {
            self.monitor.ignore_version_mismatch = ignore;
        }
        if let Some(strictness) = overrides.version_strictness {
            self.monitor.version_strictness = strictness.parse()?;
        }
        if let Some(addr) = overrides.http_addr {
            self.daemon.http_addr = addr;
        }
        if let Some(level) = overrides.log_level {
            self.daemon.log_level = level;
        }
        Ok(())
    }
}

/// Layer defaults, the YAML file, and `NODEWATCH_*` environment variables.
///
/// `path` replaces the default `~/.config/nodewatch/config.yaml`. A missing
/// file is not an error; nested keys use `__` in env names
/// (`NODEWATCH_MONITOR__POLL_INTERVAL_MS`).
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    let file = path.map(Path::to_path_buf).or_else(Config::path);
    if let Some(file) = file {
        figment = figment.merge(Yaml::file(file));
    }

    figment
        .merge(Env::prefixed("NODEWATCH_").split("__"))
        .extract()
        .map_err(|e| ConfigError::Load(Box::new(e)))
}
