//! Configuration read from `config.toml`.
//!
//! ```toml
//! cache_dir = "/var/cache/pgk_slupsk"
//! retry_interval_secs = 600
//!
//! [home_assistant]
//! base_url = "http://homeassistant.local:8123/api"
//! token = "..."
//!
//! [[entries]]
//! entry_id = "home"
//! title = "Słupsk - Długa"
//! region = "Słupsk"
//! location = "Długa"
//! notify_service = "notify.mobile_app_phone"
//! ```

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::{Error, Result};

static APP_DIR: &str = "pgk_slupsk";
pub static DEFAULT_TITLE: &str = "PGK Słupsk";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where the JSON and ETag files are kept
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Seconds between attempts when a refresh fails
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    /// Timeout of a schedule request in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Address the server listens on
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default)]
    pub home_assistant: Option<HomeAssistantConfig>,

    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

/// Where notifications are sent to.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeAssistantConfig {
    pub base_url: String,
    pub token: String,
}

/// One location whose schedule is followed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryConfig {
    pub entry_id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "type", default = "default_customer_type")]
    pub customer_type: String,
    #[serde(default)]
    pub notify_service: Option<String>,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            entry_id: String::new(),
            title: default_title(),
            region: String::new(),
            location: String::new(),
            customer_type: default_customer_type(),
            notify_service: None,
        }
    }
}

impl EntryConfig {
    /// An entry can only be used when it names a region and a location.
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() || self.location.trim().is_empty() {
            return Err(Error::EntryNotReady(self.entry_id.clone()));
        }
        Ok(())
    }
}

impl Config {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn entry(&self, entry_id: &str) -> Result<&EntryConfig> {
        self.entries
            .iter()
            .find(|entry| entry.entry_id == entry_id)
            .ok_or_else(|| Error::Config(format!("no entry with id {entry_id}")))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|err| Error::Config(err.to_string()))?;
        for (index, entry) in config.entries.iter().enumerate() {
            if entry.entry_id.is_empty() {
                return Err(Error::Config(format!("entry #{index} has no entry_id")));
            }
            if config.entries[..index]
                .iter()
                .any(|other| other.entry_id == entry.entry_id)
            {
                return Err(Error::Config(format!(
                    "duplicate entry_id {}",
                    entry.entry_id
                )));
            }
        }
        Ok(config)
    }

    /// Load the config from `path`, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };
        let content = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("loaded config from {}", path.display());
        Self::parse(&content)
    }
}

/// `~/.config/pgk_slupsk/config.toml` on Linux.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| Error::Config("could not determine config directory".to_string()))?;
    Ok(config_dir.join(APP_DIR).join("config.toml"))
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

fn default_retry_interval_secs() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8008))
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_customer_type() -> String {
    "individual".to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{config::Config, error::Error};

    #[test]
    fn test_parse_defaults() {
        let config = Config::parse(
            r#"
            [[entries]]
            entry_id = "home"
            region = "Słupsk"
            location = "Długa"
            "#,
        )
        .unwrap();
        assert_eq!(config.retry_interval(), Duration::from_secs(600));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.listen.port(), 8008);
        assert!(config.home_assistant.is_none());
        let entry = config.entry("home").unwrap();
        assert_eq!(entry.title, "PGK Słupsk");
        assert_eq!(entry.customer_type, "individual");
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
            cache_dir = "/tmp/pgk"
            retry_interval_secs = 5
            listen = "127.0.0.1:9000"

            [home_assistant]
            base_url = "http://ha:8123/api"
            token = "secret"

            [[entries]]
            entry_id = "work"
            title = "Ustka - Morska"
            region = "Ustka"
            location = "Morska"
            type = "company"
            notify_service = "mobile_app"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache_dir.to_str(), Some("/tmp/pgk"));
        assert_eq!(config.retry_interval(), Duration::from_secs(5));
        let entry = config.entry("work").unwrap();
        assert_eq!(entry.customer_type, "company");
        assert_eq!(entry.notify_service.as_deref(), Some("mobile_app"));
        assert!(config.entry("home").is_err());
    }

    #[test]
    fn test_entry_without_location_is_not_ready() {
        let config = Config::parse(
            r#"
            [[entries]]
            entry_id = "home"
            region = "Słupsk"
            location = " "
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.entries[0].validate(),
            Err(Error::EntryNotReady(id)) if id == "home"
        ));
    }

    #[test]
    fn test_duplicate_entry_ids() {
        let result = Config::parse(
            r#"
            [[entries]]
            entry_id = "a"
            [[entries]]
            entry_id = "a"
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
