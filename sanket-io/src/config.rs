//! Configuration for the SanketIO mini-program bridge
//!
//! Loads configuration from a TOML file. Every field has a default, so an
//! empty file (or no file) yields a working development setup.

use crate::error::{Error, Result};
use crate::share::DEFAULT_SHARE_PATH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub web_app: WebAppConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub radio: RadioConfig,
    #[serde(default)]
    pub share: ShareConfig,
}

/// Navigation web page opened in the WebView
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebAppConfig {
    /// Base URI; the session is appended as a query parameter
    #[serde(default = "default_web_app_uri")]
    pub base_uri: String,
}

/// Beacon broker
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    /// Base URI; push/pull endpoints are derived from it
    #[serde(default = "default_broker_uri")]
    pub base_uri: String,
}

/// Scan driver filter
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// iBeacon proximity UUIDs deployed in the venue
    #[serde(default = "default_uuids")]
    pub uuids: Vec<String>,
}

/// Bluetooth adapter watchdog
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RadioConfig {
    /// How long the adapter may stay off before warning (ms, default: 10000)
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Display duration of the "bluetooth disabled" toast (ms, default: 10000)
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
}

/// Share hook
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShareConfig {
    #[serde(default = "default_share_path")]
    pub path: String,
}

impl Default for WebAppConfig {
    fn default() -> Self {
        Self {
            base_uri: default_web_app_uri(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_uri: default_broker_uri(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            uuids: default_uuids(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            toast_duration_ms: default_toast_duration_ms(),
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            path: default_share_path(),
        }
    }
}

fn default_web_app_uri() -> String {
    "https://indoorgo.weapp.jcbel.com/".to_string()
}
fn default_broker_uri() -> String {
    "https://beacon-p2p.jcmap.jcbel.com/".to_string()
}
fn default_uuids() -> Vec<String> {
    vec![
        "F0F0C1C1-0001-0000-00FF-FFFF0A020000".to_string(),
        "F0F0C1C1-0001-0000-00FF-FFFF0A030000".to_string(),
    ]
}
fn default_grace_period_ms() -> u64 {
    10_000
}
fn default_toast_duration_ms() -> u64 {
    10_000
}
fn default_share_path() -> String {
    DEFAULT_SHARE_PATH.to_string()
}

impl RadioConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use sanket_io::config::AppConfig;
    ///
    /// let config = AppConfig::load("sanket.toml")?;
    /// # Ok::<(), sanket_io::Error>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.scanner.uuids.is_empty() {
            return Err(Error::Config("scanner.uuids must not be empty".into()));
        }
        if self.radio.grace_period_ms == 0 {
            return Err(Error::Config("radio.grace_period_ms must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.radio.grace_period(), Duration::from_secs(10));
        assert_eq!(config.scanner.uuids.len(), 2);
        assert_eq!(config.share.path, "/pages/mapa/mapa");
    }

    #[test]
    fn test_partial_override() {
        let config = AppConfig::from_toml(
            r#"
            [broker]
            base_uri = "http://127.0.0.1:9000/"

            [radio]
            grace_period_ms = 2500
            "#,
        )
        .unwrap();
        assert_eq!(config.broker.base_uri, "http://127.0.0.1:9000/");
        assert_eq!(config.radio.grace_period_ms, 2500);
        assert_eq!(config.radio.toast_duration_ms, 10_000);
    }

    #[test]
    fn test_validation() {
        assert!(AppConfig::from_toml("[scanner]\nuuids = []").is_err());
        assert!(AppConfig::from_toml("[radio]\ngrace_period_ms = 0").is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sanket.toml");

        let mut config = AppConfig::default();
        config.web_app.base_uri = "http://192.168.1.20:3000/".into();
        config.to_file(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.web_app.base_uri, "http://192.168.1.20:3000/");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AppConfig::load("/nonexistent/sanket.toml"),
            Err(Error::Config(_))
        ));
    }
}
