//! UtmGate Secrets Management
//!
//! Provides a unified interface for fetching the OAuth client secrets blob
//! (and any other secret material) with multiple backends:
//! - Environment variables (default)
//! - Local file storage
//!
//! Secrets are read once at startup; providers are read-only by design so
//! that secret material never flows back out of the process.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

mod env;
mod file;

pub use env::EnvProvider;
pub use file::FileProvider;

#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("Secret not found: {0}")]
    NotFound(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Configuration for secrets providers
#[derive(Debug, Clone)]
pub struct SecretsConfig {
    /// Provider backend: "env" or "file"
    pub provider: String,
    /// Environment variable prefix for the env provider
    pub env_prefix: String,
    /// Base directory for the file provider
    pub file_dir: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            provider: "env".to_string(),
            env_prefix: "UTMGATE_SECRET_".to_string(),
            file_dir: ".".to_string(),
        }
    }
}

/// Secrets provider trait
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get a secret by key
    async fn get(&self, key: &str) -> Result<String, SecretsError>;

    /// Provider name
    fn name(&self) -> &str;
}

/// Create a provider based on configuration
pub fn create_provider(config: &SecretsConfig) -> Result<Arc<dyn Provider>, SecretsError> {
    match config.provider.as_str() {
        "env" => {
            info!("Using environment variable secrets provider");
            Ok(Arc::new(EnvProvider::with_prefix(&config.env_prefix)))
        }
        "file" => {
            info!(dir = %config.file_dir, "Using file secrets provider");
            Ok(Arc::new(FileProvider::new(&config.file_dir)))
        }
        other => Err(SecretsError::ProviderError(format!(
            "Unknown provider: {}",
            other
        ))),
    }
}
