//! Runtime configuration: discovery timing, command timeouts and the
//! location of the persisted results. Defaults can be overridden from the
//! environment and then from the command line.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device_control::DEFAULT_MAX_ATTEMPTS;

const DEFAULT_DATA_PATH: &str = "data.json";
const DEFAULT_MAX_CONCURRENT: usize = 32;

/// Path of the discovery results file (`PROJECTOR_DATA_PATH`)
pub fn data_path() -> PathBuf {
    env::var("PROJECTOR_DATA_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH))
}

fn max_concurrent_from_env() -> usize {
    env::var("DISCOVERY_MAX_CONCURRENT")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .filter(|&val| val > 0)
        .unwrap_or(DEFAULT_MAX_CONCURRENT)
}

/// Discovery sweep configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Liveness check timeout
    pub ping_timeout_ms: u64,
    /// Per-adapter probe timeout
    pub probe_timeout_ms: u64,
    pub max_concurrent: usize,
    /// Non-standard HTTP port appended to every probed address
    pub port: Option<u16>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ping_timeout_ms: 300,
            probe_timeout_ms: 500,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            port: None,
        }
    }
}

impl DiscoveryConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self {
            max_concurrent: max_concurrent_from_env(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// `host` or `host:port` for an address
    pub fn host_for(&self, ip: &str) -> String {
        match self.port {
            Some(port) => format!("{}:{}", ip, port),
            None => ip.to_string(),
        }
    }
}

/// Device command configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlConfig {
    pub request_timeout_ms: u64,
    pub max_attempts: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 3000,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ControlConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// HTTP client used for commands and status queries
    pub fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_config_default() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.ping_timeout(), Duration::from_millis(300));
        assert_eq!(config.probe_timeout(), Duration::from_millis(500));
        assert_eq!(config.max_concurrent, 32);
        assert_eq!(config.port, None);
    }

    #[test]
    fn test_host_for_port() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.host_for("192.168.0.4"), "192.168.0.4");

        let config = config.with_port(Some(8080));
        assert_eq!(config.host_for("192.168.0.4"), "192.168.0.4:8080");
    }

    #[test]
    fn test_max_concurrent_never_zero() {
        let config = DiscoveryConfig::default().with_max_concurrent(0);
        assert_eq!(config.max_concurrent, 1);
    }

    #[test]
    fn test_control_config_default() {
        let config = ControlConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.max_attempts, 12);
        assert!(config.build_client().is_ok());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = DiscoveryConfig::default().with_port(Some(8080));
        let json = serde_json::to_string(&config).unwrap();
        let parsed: DiscoveryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
