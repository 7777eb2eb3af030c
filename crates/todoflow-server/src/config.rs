//! Configuration for the Todoflow Server
//!
//! This module contains the configuration types and loading functionality.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::net::SocketAddr;
use todoflow_monitoring::MonitoringConfig;
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};

/// Server configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON log output instead of the pretty format
    #[serde(default)]
    pub json_logs: bool,

    /// Deployment environment name
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Secret for JWT signing
    #[serde(default)]
    pub jwt_secret: String,

    /// JWT issuer
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,

    /// JWT audience
    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,

    /// JWT expiry in seconds
    #[serde(default = "default_jwt_expiry")]
    pub jwt_expiry_seconds: u64,

    /// Insert demo items and a demo user at startup
    #[serde(default)]
    pub seed_demo_data: bool,

    /// Problems found while loading, logged once logging is up
    #[serde(skip)]
    pub warnings: Vec<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_jwt_issuer() -> String {
    "todoflow".to_string()
}

fn default_jwt_audience() -> String {
    "todoflow-api".to_string()
}

fn default_jwt_expiry() -> u64 {
    3600 // 1 hour
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_source<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Start with defaults
        let mut config = Self::default();

        if let Some(port) = lookup("SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.port = port;
            } else {
                config
                    .warnings
                    .push(format!("Invalid SERVER_PORT value: {}", port));
            }
        }

        if let Some(host) = lookup("SERVER_HOST") {
            config.bind_address = host;
        }

        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "json" => config.json_logs = true,
                "pretty" => config.json_logs = false,
                _ => config
                    .warnings
                    .push(format!("Invalid LOG_FORMAT value: {}", format)),
            }
        }

        if let Some(environment) = lookup("ENVIRONMENT") {
            config.environment = environment;
        }

        if let Some(jwt_secret) = lookup("JWT_SECRET") {
            config.jwt_secret = jwt_secret;
        }

        if let Some(jwt_issuer) = lookup("JWT_ISSUER") {
            config.jwt_issuer = jwt_issuer;
        }

        if let Some(jwt_audience) = lookup("JWT_AUDIENCE") {
            config.jwt_audience = jwt_audience;
        }

        if let Some(jwt_expiry) = lookup("JWT_EXPIRY_SECONDS") {
            if let Ok(expiry) = jwt_expiry.parse::<u64>() {
                config.jwt_expiry_seconds = expiry;
            } else {
                config
                    .warnings
                    .push(format!("Invalid JWT_EXPIRY_SECONDS value: {}", jwt_expiry));
            }
        }

        if let Some(seed) = lookup("SEED_DEMO_DATA") {
            if let Some(seed) = parse_bool(&seed) {
                config.seed_demo_data = seed;
            } else {
                config
                    .warnings
                    .push(format!("Invalid SEED_DEMO_DATA value: {}", seed));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Log the load result. Call after logging is initialized; loading
    /// itself runs before any subscriber exists.
    pub fn log_loaded(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
        info!(
            port = self.port,
            environment = %self.environment,
            ignored = self.warnings.len(),
            "Loaded server configuration"
        );
    }

    /// Check required values
    pub fn validate(&self) -> ServerResult<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ServerError::ConfigError("JWT_SECRET is required".to_string()));
        }

        if self.jwt_expiry_seconds == 0 {
            return Err(ServerError::ConfigError(
                "JWT_EXPIRY_SECONDS must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Address the listener binds to
    pub fn socket_addr(&self) -> ServerResult<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                ServerError::ConfigError(format!(
                    "Invalid bind address {}:{}: {}",
                    self.bind_address, self.port, e
                ))
            })
    }

    /// Monitoring settings derived from this configuration
    pub fn monitoring_config(&self) -> MonitoringConfig {
        MonitoringConfig {
            service_name: crate::SERVICE_NAME.to_string(),
            log_filter: self.log_level.clone(),
            json_logs: self.json_logs,
            environment: self.environment.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            log_level: default_log_level(),
            json_logs: false,
            environment: default_environment(),
            jwt_secret: String::new(),
            jwt_issuer: default_jwt_issuer(),
            jwt_audience: default_jwt_audience(),
            jwt_expiry_seconds: default_jwt_expiry(),
            seed_demo_data: false,
            warnings: Vec::new(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("json_logs", &self.json_logs)
            .field("environment", &self.environment)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_expiry_seconds", &self.jwt_expiry_seconds)
            .field("seed_demo_data", &self.seed_demo_data)
            .field("warnings", &self.warnings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ServerResult<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_source(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_secret() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.jwt_issuer, "todoflow");
        assert_eq!(config.jwt_audience, "todoflow-api");
        assert_eq!(config.jwt_expiry_seconds, 3600);
        assert!(!config.seed_demo_data);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_missing_secret_fails() {
        assert!(matches!(load(&[]), Err(ServerError::ConfigError(_))));
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("SERVER_PORT", "not-a-port"),
            ("SERVER_HOST", "127.0.0.1"),
            ("LOG_FORMAT", "json"),
            ("SEED_DEMO_DATA", "yes"),
            ("JWT_EXPIRY_SECONDS", "60"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert!(config.json_logs);
        assert!(config.seed_demo_data);
        assert_eq!(config.jwt_expiry_seconds, 60);
        assert!(config.monitoring_config().json_logs);
        assert_eq!(config.warnings, ["Invalid SERVER_PORT value: not-a-port"]);
    }

    #[test]
    fn test_ignored_values_are_kept_for_later_logging() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("SERVER_PORT", "99999"),
            ("LOG_FORMAT", "xml"),
            ("JWT_EXPIRY_SECONDS", "soon"),
            ("SEED_DEMO_DATA", "maybe"),
        ])
        .unwrap();

        assert_eq!(
            config.warnings,
            [
                "Invalid SERVER_PORT value: 99999",
                "Invalid LOG_FORMAT value: xml",
                "Invalid JWT_EXPIRY_SECONDS value: soon",
                "Invalid SEED_DEMO_DATA value: maybe",
            ]
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_expiry_seconds, 3600);
    }

    #[test]
    fn test_clean_load_has_no_warnings() {
        let config = load(&[("JWT_SECRET", "s3cret"), ("SERVER_PORT", "9000")]).unwrap();
        assert!(config.warnings.is_empty());
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert!(!format!("{:?}", config).contains("s3cret"));
    }
}
