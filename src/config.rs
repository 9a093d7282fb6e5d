//! Configuration loading and types for Postbox.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Defaults target a LocalStack instance on
//! `http://localhost:4566` with dummy credentials, matching the intended
//! local-development setup.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// AWS client settings (shared by DynamoDB and S3).
    #[serde(default)]
    pub aws: AwsConfig,

    /// Storage container names.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// AWS client configuration.
///
/// Empty credential fields fall back to the standard credential chain
/// (env vars, `~/.aws/credentials`, IAM role); an empty `endpoint_url`
/// targets real AWS instead of an emulator.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint (e.g. LocalStack).
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    /// Explicit access key.
    #[serde(default = "default_access_key")]
    pub access_key_id: String,

    /// Explicit secret key.
    #[serde(default = "default_secret_key")]
    pub secret_access_key: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: default_endpoint_url(),
            access_key_id: default_access_key(),
            secret_access_key: default_secret_key(),
        }
    }
}

/// Storage container names.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// DynamoDB table holding message records.
    #[serde(default = "default_table")]
    pub table: String,

    /// S3 bucket holding mirrored message blobs.
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            bucket: default_bucket(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_endpoint_url() -> String {
    "http://localhost:4566".to_string()
}

fn default_access_key() -> String {
    "fake_access_key".to_string()
}

fn default_secret_key() -> String {
    "fake_secret_key".to_string()
}

fn default_table() -> String {
    "messages".to_string()
}

fn default_bucket() -> String {
    "message-bucket".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.aws.region, "us-east-1");
        assert_eq!(config.aws.endpoint_url, "http://localhost:4566");
        assert_eq!(config.storage.table, "messages");
        assert_eq!(config.storage.bucket, "message-bucket");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_override() {
        let yaml = r#"
server:
  port: 8080
storage:
  bucket: other-bucket
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.bucket, "other-bucket");
        assert_eq!(config.storage.table, "messages");
    }
}
