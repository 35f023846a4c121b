//! Environment variable secrets provider

use crate::{Provider, SecretsError};
use async_trait::async_trait;
use std::env;

/// Environment variable secrets provider
pub struct EnvProvider {
    prefix: String,
}

impl EnvProvider {
    pub fn new() -> Self {
        Self {
            prefix: "UTMGATE_SECRET_".to_string(),
        }
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn env_key(&self, key: &str) -> String {
        format!(
            "{}{}",
            self.prefix,
            key.to_uppercase().replace('-', "_").replace('.', "_")
        )
    }
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for EnvProvider {
    async fn get(&self, key: &str) -> Result<String, SecretsError> {
        let env_key = self.env_key(key);
        env::var(&env_key).map_err(|_| SecretsError::NotFound(key.to_string()))
    }

    fn name(&self) -> &str {
        "env"
    }
}
