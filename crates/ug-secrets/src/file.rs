//! File-based secrets provider
//!
//! Reads each secret from a file under the configured directory. The key
//! maps directly to a file name, so `client_secrets.json` resolves to
//! `<dir>/client_secrets.json`. Intended for mounted Kubernetes secrets
//! and local development.

use crate::{Provider, SecretsError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File-based secrets provider
pub struct FileProvider {
    dir: PathBuf,
}

impl FileProvider {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Provider for FileProvider {
    async fn get(&self, key: &str) -> Result<String, SecretsError> {
        // Keys are file names, never paths
        if key.contains('/') || key.contains("..") {
            return Err(SecretsError::ProviderError(format!(
                "Invalid secret key: {}",
                key
            )));
        }

        let path = self.dir.join(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SecretsError::NotFound(key.to_string()))
            }
            Err(e) => Err(SecretsError::IoError(e)),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}
