//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "utmgate.toml",
    "./config/config.toml",
    "./config/utmgate.toml",
    "/etc/utmgate/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        // Start with defaults
        let mut config = AppConfig::default();

        // Try to load from file
        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        // Check explicit path first
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        // Check UTMGATE_CONFIG env var
        if let Ok(path) = env::var("UTMGATE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // Search standard paths
        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut AppConfig) {
        // HTTP
        if let Ok(val) = env::var("UTMGATE_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.http.port = port;
            }
        }
        if let Ok(val) = env::var("UTMGATE_HTTP_HOST") {
            config.http.host = val;
        }
        if let Ok(val) = env::var("UTMGATE_CORS_ORIGINS") {
            config.http.cors_origins = val.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Auth
        if let Ok(val) = env::var("UTMGATE_ALLOWED_DOMAINS") {
            config.auth.allowed_domains =
                val.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(val) = env::var("UTMGATE_REDIRECT_URI") {
            config.auth.redirect_uri = Some(val);
        }
        if let Ok(val) = env::var("UTMGATE_STATE_TTL_SECS") {
            if let Ok(ttl) = val.parse() {
                config.auth.state_ttl_secs = ttl;
            }
        }
        if let Ok(val) = env::var("UTMGATE_SESSION_TTL_SECS") {
            if let Ok(ttl) = val.parse() {
                config.auth.session_ttl_secs = ttl;
            }
        }
        if let Ok(val) = env::var("UTMGATE_SESSION_COOKIE_NAME") {
            config.auth.session_cookie_name = val;
        }
        if let Ok(val) = env::var("UTMGATE_SESSION_COOKIE_SECURE") {
            config.auth.session_cookie_secure = val.parse().unwrap_or(true);
        }
        if let Ok(val) = env::var("UTMGATE_SWEEP_INTERVAL_SECS") {
            if let Ok(interval) = val.parse() {
                config.auth.sweep_interval_secs = interval;
            }
        }
        if let Ok(val) = env::var("UTMGATE_PROVIDER_TIMEOUT_SECS") {
            if let Ok(timeout) = val.parse() {
                config.auth.provider_timeout_secs = timeout;
            }
        }

        // Secrets
        if let Ok(val) = env::var("UTMGATE_SECRETS_PROVIDER") {
            config.secrets.provider = val;
        }
        if let Ok(val) = env::var("UTMGATE_SECRETS_ENV_KEY") {
            config.secrets.env_key = val;
        }
        if let Ok(val) = env::var("UTMGATE_SECRETS_FILE_PATH") {
            config.secrets.file_path = val;
        }

        // General
        if let Ok(val) = env::var("UTMGATE_DEV_MODE") {
            config.dev_mode = val.parse().unwrap_or(false);
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
