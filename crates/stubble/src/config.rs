//! Server configuration.
//!
//! Settings come from defaults, then an optional YAML file, then command
//! line arguments, each layer overriding the previous one.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::capture::DEFAULT_CAPACITY;

/// Main server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Rule files loaded at start-up, in order
    pub rules: Vec<PathBuf>,
    /// Ceiling on a single rule storage call, in milliseconds
    pub storage_timeout_ms: u64,
    /// Number of captured requests kept for `/stubble/requests`
    pub request_log_capacity: usize,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            rules: Vec::new(),
            storage_timeout_ms: 5000,
            request_log_capacity: DEFAULT_CAPACITY,
            log_level: "info".to_string(),
        }
    }
}

/// Values given on the command line; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub rules: Vec<PathBuf>,
    pub storage_timeout_ms: Option<u64>,
    pub request_log_capacity: Option<usize>,
    pub log_level: Option<String>,
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command line values. Rule files given on the command line are
    /// loaded after those from the file.
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        self.rules.extend(overrides.rules);
        if let Some(ms) = overrides.storage_timeout_ms {
            self.storage_timeout_ms = ms;
        }
        if let Some(capacity) = overrides.request_log_capacity {
            self.request_log_capacity = capacity;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.host.parse::<IpAddr>().is_err() {
            anyhow::bail!("Invalid host '{}': expected an IP address", self.host);
        }
        if self.storage_timeout_ms == 0 {
            anyhow::bail!("storage_timeout_ms must be greater than 0");
        }
        if EnvFilter::try_new(&self.log_level).is_err() {
            anyhow::bail!("Invalid log level '{}'", self.log_level);
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid host '{}': {}", self.host, e))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:8080");
        assert_eq!(config.storage_timeout(), Duration::from_secs(5));
        assert_eq!(config.request_log_capacity, 40);
    }

    #[test]
    fn test_from_file_partial() {
        let file = write_yaml(
            r#"
port: 9090
rules:
  - rules/a.ndjson
request_log_capacity: 0
"#,
        );
        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.rules, vec![PathBuf::from("rules/a.ndjson")]);
        assert_eq!(config.request_log_capacity, 0);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let file = write_yaml("host: not-an-ip\n");
        let err = ServerConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("not-an-ip"));

        let file = write_yaml("storage_timeout_ms: 0\n");
        assert!(ServerConfig::from_file(file.path()).is_err());

        let file = write_yaml("port: [1, 2]\n");
        assert!(ServerConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let base = ServerConfig {
            port: 9090,
            rules: vec![PathBuf::from("a.ndjson")],
            ..Default::default()
        };
        let config = base.apply(ConfigOverrides {
            port: Some(7070),
            rules: vec![PathBuf::from("b.ndjson")],
            log_level: Some("debug".to_string()),
            ..Default::default()
        });
        assert_eq!(config.port, 7070);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(
            config.rules,
            vec![PathBuf::from("a.ndjson"), PathBuf::from("b.ndjson")]
        );
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.storage_timeout_ms, 5000);
    }

    #[test]
    fn test_ipv6_host() {
        let config = ServerConfig {
            host: "::1".to_string(),
            port: 1234,
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.socket_addr().unwrap().to_string(), "[::1]:1234");
    }
}
