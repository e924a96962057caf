//! Configuration loading for DishaNav

use crate::arrival::DEFAULT_ARRIVAL_THRESHOLD;
use crate::engine::TravelMode;
use crate::error::{NavError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize, Default)]
pub struct DishaConfig {
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Navigation behaviour
#[derive(Clone, Debug, Deserialize)]
pub struct NavigationConfig {
    /// Travel mode for new tasks (default: walking)
    #[serde(default)]
    pub mode: TravelMode,

    /// Remaining length below which the arrival notice fires (meters, default: 5.0)
    #[serde(default = "default_arrival_threshold")]
    pub arrival_threshold: f64,

    /// Arrival notice display time (ms, default: 5000)
    #[serde(default = "default_arrival_notice_ms")]
    pub arrival_notice_ms: u64,

    /// Unreachable notice display time (ms, default: 3000)
    #[serde(default = "default_unreachable_notice_ms")]
    pub unreachable_notice_ms: u64,
}

/// Map data source
#[derive(Clone, Debug, Deserialize)]
pub struct MapConfig {
    /// Cartogram collection JSON (default: cartogram-collection.json)
    #[serde(default = "default_map_path")]
    pub data_path: String,
}

/// Beacon broker used by the web half of the bridge
#[derive(Clone, Debug, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_broker_uri")]
    pub broker_base_uri: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            mode: TravelMode::default(),
            arrival_threshold: default_arrival_threshold(),
            arrival_notice_ms: default_arrival_notice_ms(),
            unreachable_notice_ms: default_unreachable_notice_ms(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            data_path: default_map_path(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            broker_base_uri: default_broker_uri(),
        }
    }
}

impl NavigationConfig {
    pub fn arrival_notice(&self) -> Duration {
        Duration::from_millis(self.arrival_notice_ms)
    }

    pub fn unreachable_notice(&self) -> Duration {
        Duration::from_millis(self.unreachable_notice_ms)
    }
}

impl DishaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: DishaConfig = toml::from_str(content)?;
        let threshold = config.navigation.arrival_threshold;
        if threshold.is_nan() || threshold <= 0.0 {
            return Err(NavError::Config(format!(
                "navigation.arrival_threshold must be positive, got {}",
                config.navigation.arrival_threshold
            )));
        }
        Ok(config)
    }
}

fn default_arrival_threshold() -> f64 {
    DEFAULT_ARRIVAL_THRESHOLD
}
fn default_arrival_notice_ms() -> u64 {
    5000
}
fn default_unreachable_notice_ms() -> u64 {
    3000
}
fn default_map_path() -> String {
    "cartogram-collection.json".to_string()
}
fn default_broker_uri() -> String {
    "https://beacon-p2p.jcmap.jcbel.com/".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DishaConfig::from_toml("").unwrap();
        assert_eq!(config.navigation.mode, TravelMode::Walking);
        assert_eq!(config.navigation.arrival_threshold, 5.0);
        assert_eq!(config.navigation.arrival_notice(), Duration::from_secs(5));
        assert_eq!(config.navigation.unreachable_notice(), Duration::from_secs(3));
        assert_eq!(config.map.data_path, "cartogram-collection.json");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[navigation]\nmode = \"accessible\"\narrival_threshold = 3.5\n\n[map]\ndata_path = \"mall.json\""
        )
        .unwrap();

        let config = DishaConfig::load(file.path()).unwrap();
        assert_eq!(config.navigation.mode, TravelMode::Accessible);
        assert_eq!(config.navigation.arrival_threshold, 3.5);
        assert_eq!(config.navigation.arrival_notice_ms, 5000);
        assert_eq!(config.map.data_path, "mall.json");
    }

    #[test]
    fn test_rejects_bad_threshold() {
        assert!(DishaConfig::from_toml("[navigation]\narrival_threshold = 0.0").is_err());
        assert!(matches!(
            DishaConfig::from_toml("[navigation]\nmode = \"flying\""),
            Err(NavError::Config(_))
        ));
    }
}
