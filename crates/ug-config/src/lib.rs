//! UtmGate Configuration System
//!
//! This crate provides TOML-based configuration with environment variable
//! override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub secrets: SecretsConfig,

    /// Enable development mode (relaxes cookie security for localhost)
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            auth: AuthConfig::default(),
            secrets: SecretsConfig::default(),
            dev_mode: false,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:4200".to_string()],
        }
    }
}

/// Authentication gate configuration
///
/// The OAuth client credentials themselves come from the secret provider,
/// not from this file. Everything here is non-secret policy: the domain
/// allow-list, TTLs, and session cookie behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Email domains permitted to authenticate (case-insensitive)
    pub allowed_domains: Vec<String>,

    /// Override for the registered redirect URI. When unset, the value
    /// from the client secrets blob is used. Must be byte-identical to
    /// what is registered with the provider.
    pub redirect_uri: Option<String>,

    /// TTL for pending authorization (login-start) records, in seconds
    pub state_ttl_secs: u64,

    /// Session TTL in seconds
    pub session_ttl_secs: u64,

    /// Session cookie name
    pub session_cookie_name: String,

    /// Whether to set the Secure flag on the session cookie
    pub session_cookie_secure: bool,

    /// SameSite policy for the session cookie: "strict", "lax" or "none"
    pub session_cookie_same_site: String,

    /// Interval between expired-entry sweeps, in seconds (0 disables the
    /// sweep task; lazy expiry on lookup still applies)
    pub sweep_interval_secs: u64,

    /// Timeout for outbound calls to the identity provider, in seconds
    pub provider_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allowed_domains: vec![],
            redirect_uri: None,
            state_ttl_secs: 600,       // 10 minutes
            session_ttl_secs: 28800,   // 8 hours
            session_cookie_name: "ug_session".to_string(),
            session_cookie_secure: true,
            session_cookie_same_site: "Lax".to_string(),
            sweep_interval_secs: 300,
            provider_timeout_secs: 10,
        }
    }
}

/// Secret provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Provider backend: "env" or "file"
    pub provider: String,

    /// Environment variable holding the client secrets JSON blob
    /// (env provider)
    pub env_key: String,

    /// Path to the client secrets JSON file (file provider)
    pub file_path: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            provider: "env".to_string(),
            env_key: "UTMGATE_CLIENT_SECRETS".to_string(),
            file_path: "./client_secrets.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::ValidationError(
                "http.port must be non-zero".to_string(),
            ));
        }

        if self.auth.allowed_domains.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.allowed_domains must list at least one domain".to_string(),
            ));
        }

        if self.auth.state_ttl_secs == 0 || self.auth.session_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "auth TTLs must be non-zero".to_string(),
            ));
        }

        match self.auth.session_cookie_same_site.to_lowercase().as_str() {
            "strict" | "lax" | "none" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "auth.session_cookie_same_site must be strict, lax or none (got {})",
                    other
                )));
            }
        }

        match self.secrets.provider.as_str() {
            "env" | "file" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "secrets.provider must be env or file (got {})",
                    other
                )));
            }
        }

        Ok(())
    }
}
