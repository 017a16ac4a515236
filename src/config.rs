//! Configuration module for the hypescan engine

use crate::network::protocol::LIVENESS_PORTS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for a scan session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum liveness checks in flight at once
    pub concurrency: usize,

    /// Timeout for each TCP liveness probe in milliseconds
    pub timeout_ms: u64,

    /// Timeout for the HTTP HEAD fallback in milliseconds
    pub http_timeout_ms: u64,

    /// Probe the service table on every live host
    pub port_scan: bool,

    /// Maximum port probes in flight against a single host
    pub port_concurrency: usize,

    /// Timeout for each service-table port probe in milliseconds
    pub port_timeout_ms: u64,

    /// Ports raced by the liveness check
    pub liveness_ports: Vec<u16>,

    /// Port used by the HTTP fallback
    pub http_port: u16,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 254, // a full /24 at once
            timeout_ms: 2000,
            http_timeout_ms: 2000,
            port_scan: false,
            port_concurrency: 8,
            port_timeout_ms: 800,
            liveness_ports: LIVENESS_PORTS.to_vec(),
            http_port: 80,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings used when discovering and profiling every device on the
    /// local network
    pub fn profiling() -> Self {
        Self {
            concurrency: 100,
            timeout_ms: 2000,
            port_scan: true,
            ..Default::default()
        }
    }

    /// Set the host-discovery concurrency ceiling
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the TCP liveness timeout
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the HTTP fallback timeout
    pub fn with_http_timeout(mut self, http_timeout_ms: u64) -> Self {
        self.http_timeout_ms = http_timeout_ms;
        self
    }

    /// Enable or disable port scanning of live hosts
    pub fn with_port_scan(mut self, port_scan: bool) -> Self {
        self.port_scan = port_scan;
        self
    }

    /// Set the per-host port-probe concurrency
    pub fn with_port_concurrency(mut self, port_concurrency: usize) -> Self {
        self.port_concurrency = port_concurrency;
        self
    }

    /// Set the per-port probe timeout
    pub fn with_port_timeout(mut self, port_timeout_ms: u64) -> Self {
        self.port_timeout_ms = port_timeout_ms;
        self
    }

    /// Replace the liveness candidate ports
    pub fn with_liveness_ports(mut self, ports: Vec<u16>) -> Self {
        self.liveness_ports = ports;
        self
    }

    /// Set the port used by the HTTP fallback
    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.port_timeout_ms)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::ScanError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: ScanConfig = toml::from_str(&content)
            .map_err(|e| crate::ScanError::ConfigError(format!("Failed to parse TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `~/.hypescan.toml`, falling back to defaults
    pub fn load_default_config() -> Self {
        let Some(home_dir) = dirs::home_dir() else {
            return Self::default();
        };

        let config_path = home_dir.join(".hypescan.toml");
        if !config_path.exists() {
            return Self::default();
        }

        match Self::from_toml_file(&config_path) {
            Ok(config) => {
                log::info!("Loaded config from {}", config_path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", config_path.display(), e);
                Self::default()
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.concurrency == 0 {
            return Err(crate::ScanError::ConfigError(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        if self.port_concurrency == 0 {
            return Err(crate::ScanError::ConfigError(
                "Port concurrency must be greater than 0".to_string(),
            ));
        }

        if self.timeout_ms == 0 || self.http_timeout_ms == 0 || self.port_timeout_ms == 0 {
            return Err(crate::ScanError::ConfigError(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        if self.liveness_ports.is_empty() {
            return Err(crate::ScanError::ConfigError(
                "At least one liveness port is required".to_string(),
            ));
        }

        Ok(())
    }
}
