//! JWKS fetching and caching
//!
//! The provider's signing keys are fetched once and cached for an hour.
//! Key rotation at the provider shows up as a missing `kid`, which
//! forces an early refresh.

use chrono::{DateTime, Utc};
use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{AuthError, Result};

/// JWKS cache TTL: 1 hour
const JWKS_CACHE_TTL_SECS: i64 = 3600;

/// JWKS (JSON Web Key Set)
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<JwkKey>,
}

/// Individual JWK key
#[derive(Debug, Clone, Deserialize)]
pub struct JwkKey {
    pub kty: String,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    pub kid: Option<String>,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

struct CachedJwks {
    jwks: Jwks,
    fetched_at: DateTime<Utc>,
}

/// Cached JWKS client for a single provider.
pub struct JwksCache {
    http_client: reqwest::Client,
    jwks_uri: String,
    cached: RwLock<Option<CachedJwks>>,
}

impl JwksCache {
    pub fn new(http_client: reqwest::Client, jwks_uri: impl Into<String>) -> Self {
        Self {
            http_client,
            jwks_uri: jwks_uri.into(),
            cached: RwLock::new(None),
        }
    }

    /// Build the RSA decoding key matching `kid`.
    ///
    /// A `kid` that is not in the cached set triggers one refresh before
    /// giving up, so provider key rotation does not strand logins for
    /// the rest of the cache window.
    pub async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey> {
        let jwks = self.current().await?;

        if let Some(key) = find_key(&jwks, kid) {
            return build_decoding_key(key);
        }

        warn!(kid = kid.unwrap_or(""), "No matching JWKS key, refreshing");
        let jwks = self.refresh().await?;

        let key = find_key(&jwks, kid).ok_or_else(|| {
            AuthError::token_invalid("No matching key found in JWKS")
        })?;
        build_decoding_key(key)
    }

    /// Return the cached key set, fetching when missing or stale.
    async fn current(&self) -> Result<Jwks> {
        {
            let cached = self.cached.read();
            if let Some(entry) = cached.as_ref() {
                let age = (Utc::now() - entry.fetched_at).num_seconds();
                if age < JWKS_CACHE_TTL_SECS {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        self.refresh().await
    }

    /// Fetch the key set, with a single retry on transient failures.
    async fn refresh(&self) -> Result<Jwks> {
        let jwks = match self.fetch().await {
            Ok(jwks) => jwks,
            Err(first) => {
                warn!(error = %first, "JWKS fetch failed, retrying once");
                self.fetch().await?
            }
        };

        info!(keys = jwks.keys.len(), "Fetched JWKS");

        *self.cached.write() = Some(CachedJwks {
            jwks: jwks.clone(),
            fetched_at: Utc::now(),
        });

        Ok(jwks)
    }

    async fn fetch(&self) -> Result<Jwks> {
        let response = self
            .http_client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| {
                AuthError::provider_unavailable(format!("Failed to fetch JWKS: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AuthError::provider_unavailable(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            AuthError::provider_unavailable(format!("Failed to parse JWKS: {}", e))
        })
    }
}

fn find_key<'a>(jwks: &'a Jwks, kid: Option<&str>) -> Option<&'a JwkKey> {
    jwks.keys
        .iter()
        .find(|k| kid.map_or(true, |kid| k.kid.as_deref() == Some(kid)))
}

fn build_decoding_key(key: &JwkKey) -> Result<DecodingKey> {
    match key.kty.as_str() {
        "RSA" => {
            let n = key
                .n
                .as_ref()
                .ok_or_else(|| AuthError::token_invalid("Missing 'n' in RSA key"))?;
            let e = key
                .e
                .as_ref()
                .ok_or_else(|| AuthError::token_invalid("Missing 'e' in RSA key"))?;
            DecodingKey::from_rsa_components(n, e)
                .map_err(|e| AuthError::token_invalid(format!("Invalid RSA key: {}", e)))
        }
        other => Err(AuthError::token_invalid(format!(
            "Unsupported key type: {}",
            other
        ))),
    }
}
