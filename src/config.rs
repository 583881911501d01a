use crate::error::ConfigError;
use crate::model::{Credentials, LabelSet};
use anyhow::{anyhow, Result};
use serde_derive::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    pub fn log_level(&self) -> tracing::Level {
        tracing::Level::from_str(self.log_level.as_str()).unwrap_or(tracing::Level::INFO)
    }
}

pub(crate) fn load_app_config() -> Result<AppConfig> {
    match envy::from_env::<AppConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load AppConfig: {}", err)),
    }
}

fn default_login_timeout_sec() -> u64 {
    10
}

fn default_base_url() -> String {
    "https://myaccount.thameswater.co.uk".to_string()
}

#[derive(Deserialize, Clone)]
pub struct ThamesWaterConfig {
    pub email: String,
    pub password: String,
    #[serde(default = "default_login_timeout_sec")]
    pub login_timeout_sec: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl ThamesWaterConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.password.clone())
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_sec)
    }
}

impl fmt::Debug for ThamesWaterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThamesWaterConfig")
            .field("email", &self.email)
            .field("password", &"*".repeat(self.password.chars().count()))
            .field("login_timeout_sec", &self.login_timeout_sec)
            .field("base_url", &self.base_url)
            .finish()
    }
}

pub(crate) fn load_thames_water_config() -> Result<ThamesWaterConfig> {
    match envy::prefixed("THAMES_WATER_").from_env::<ThamesWaterConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load ThamesWaterConfig: {}", err)),
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_true() -> bool {
    true
}

fn default_element_timeout_sec() -> u64 {
    30
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChromeConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_true")]
    pub headless: bool,
    // disabling the sandbox makes it easier to run in a container
    #[serde(default = "default_true")]
    pub sandbox: bool,
    #[serde(default = "default_element_timeout_sec")]
    pub element_timeout_sec: u64,
}

pub fn load_chrome_config() -> Result<ChromeConfig> {
    match envy::prefixed("CHROME_").from_env::<ChromeConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load ChromeConfig: {}", err)),
    }
}

fn default_tsdb_path() -> String {
    "./tsdb".to_string()
}

fn default_block_duration_sec() -> u64 {
    2 * 60 * 60
}

fn default_retention_days() -> u64 {
    90
}

fn default_external_labels() -> String {
    "cluster=thames-water-importer".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct TsdbConfig {
    #[serde(default = "default_tsdb_path")]
    pub path: String,
    // only change if you know what you are doing
    #[serde(default = "default_block_duration_sec")]
    pub block_duration_sec: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    // comma separated name=value pairs added to every sample and block
    #[serde(default = "default_external_labels")]
    pub external_labels: String,
}

impl TsdbConfig {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    pub fn block_duration(&self) -> Duration {
        Duration::from_secs(self.block_duration_sec)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }

    pub fn external_labels(&self) -> Result<LabelSet, ConfigError> {
        parse_external_labels(&self.external_labels)
    }
}

pub fn load_tsdb_config() -> Result<TsdbConfig> {
    let config = match envy::prefixed("TSDB_").from_env::<TsdbConfig>() {
        Ok(config) => config,
        Err(err) => return Err(anyhow!("Failed to load TsdbConfig: {}", err)),
    };
    if config.block_duration_sec == 0 {
        return Err(ConfigError::invalid("TSDB_BLOCK_DURATION_SEC", "must be greater than zero").into());
    }
    config.external_labels()?;
    Ok(config)
}

/// Parses `name=value` pairs separated by commas.
///
/// Every entry must contain exactly one `=` and names must be unique.
pub fn parse_external_labels(raw: &str) -> Result<LabelSet, ConfigError> {
    let mut labels = LabelSet::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split('=').collect();
        if parts.len() != 2 || parts[0].trim().is_empty() {
            return Err(ConfigError::invalid(
                "external_labels",
                format!("invalid label '{}'", entry),
            ));
        }
        let name = parts[0].trim();
        if labels.contains(name) {
            return Err(ConfigError::invalid(
                "external_labels",
                format!("duplicate label '{}'", name),
            ));
        }
        labels.set(name, parts[1].trim());
    }
    Ok(labels)
}

/// Where finished blocks are archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketTarget {
    Filesystem { directory: PathBuf },
    Http {
        url: String,
        token: Option<String>,
        timeout: Duration,
    },
}

fn default_bucket_timeout_sec() -> u64 {
    60
}

#[derive(Deserialize, Debug, Clone)]
pub struct BucketConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub directory: Option<String>,
    pub url: Option<String>,
    pub token: Option<String>,
    /// Per-request timeout for the HTTP bucket
    #[serde(default = "default_bucket_timeout_sec")]
    pub timeout_sec: u64,
}

impl BucketConfig {
    pub fn target(&self) -> Result<BucketTarget, ConfigError> {
        match self.kind.to_ascii_lowercase().as_str() {
            "filesystem" => match &self.directory {
                Some(directory) => Ok(BucketTarget::Filesystem {
                    directory: PathBuf::from(directory),
                }),
                None => Err(ConfigError::missing("BUCKET_DIRECTORY")),
            },
            "http" => match &self.url {
                Some(url) => Ok(BucketTarget::Http {
                    url: url.trim_end_matches('/').to_string(),
                    token: self.token.clone(),
                    timeout: Duration::from_secs(self.timeout_sec),
                }),
                None => Err(ConfigError::missing("BUCKET_URL")),
            },
            other => Err(ConfigError::invalid(
                "BUCKET_TYPE",
                format!("unknown bucket type '{}'", other),
            )),
        }
    }
}

pub fn load_bucket_config() -> Result<BucketConfig> {
    let config = match envy::prefixed("BUCKET_").from_env::<BucketConfig>() {
        Ok(config) => config,
        Err(err) => return Err(anyhow!("Failed to load BucketConfig: {}", err)),
    };
    config.target()?;
    Ok(config)
}
