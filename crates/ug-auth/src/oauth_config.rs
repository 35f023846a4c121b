//! OAuth client configuration
//!
//! Parsed from the Google-style `client_secrets.json` blob delivered by
//! the secret provider:
//!
//! ```json
//! {
//!   "web": {
//!     "client_id": "...",
//!     "client_secret": "...",
//!     "auth_uri": "https://accounts.google.com/o/oauth2/auth",
//!     "token_uri": "https://oauth2.googleapis.com/token",
//!     "redirect_uris": ["https://utm.example.com/auth/callback"]
//!   }
//! }
//! ```
//!
//! `jwks_uri` and `issuer` may be set in the blob; when absent they
//! default to Google's published values.

use serde::Deserialize;

use crate::error::{AuthError, Result};

const GOOGLE_ISSUER: &str = "https://accounts.google.com";
const GOOGLE_JWKS_URI: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Immutable OAuth provider configuration, validated at startup.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub issuer: String,
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsBlob {
    web: WebSection,
}

#[derive(Debug, Deserialize)]
struct WebSection {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
    #[serde(default)]
    jwks_uri: Option<String>,
    #[serde(default)]
    issuer: Option<String>,
}

impl OAuthConfig {
    /// Parse the client secrets JSON blob.
    ///
    /// `redirect_uri_override` takes precedence over the blob's
    /// `redirect_uris`; one of the two must supply a value.
    pub fn from_client_secrets_json(
        blob: &str,
        redirect_uri_override: Option<&str>,
    ) -> Result<Self> {
        let parsed: ClientSecretsBlob = serde_json::from_str(blob).map_err(|e| {
            AuthError::configuration(format!("Failed to parse client secrets: {}", e))
        })?;

        let web = parsed.web;

        let redirect_uri = redirect_uri_override
            .map(String::from)
            .or_else(|| web.redirect_uris.first().cloned())
            .ok_or_else(|| AuthError::configuration("No redirect URI configured"))?;

        let config = Self {
            client_id: web.client_id,
            client_secret: web.client_secret,
            authorization_endpoint: web.auth_uri,
            token_endpoint: web.token_uri,
            jwks_uri: web.jwks_uri.unwrap_or_else(|| GOOGLE_JWKS_URI.to_string()),
            issuer: web.issuer.unwrap_or_else(|| GOOGLE_ISSUER.to_string()),
            redirect_uri,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate that every required field is non-empty and that the
    /// endpoints look like absolute URLs. Failure here is fatal at
    /// startup.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("auth_uri", &self.authorization_endpoint),
            ("token_uri", &self.token_endpoint),
            ("jwks_uri", &self.jwks_uri),
            ("issuer", &self.issuer),
            ("redirect_uri", &self.redirect_uri),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AuthError::configuration(format!(
                    "OAuth config field {} is empty",
                    name
                )));
            }
        }

        for (name, value) in [
            ("auth_uri", &self.authorization_endpoint),
            ("token_uri", &self.token_endpoint),
            ("jwks_uri", &self.jwks_uri),
            ("redirect_uri", &self.redirect_uri),
        ] {
            if !value.starts_with("https://") && !value.starts_with("http://") {
                return Err(AuthError::configuration(format!(
                    "OAuth config field {} must be an absolute URL",
                    name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOB: &str = r#"{
        "web": {
            "client_id": "client-123.apps.googleusercontent.com",
            "client_secret": "shhh",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["https://utm.avisia.fr/auth/callback"]
        }
    }"#;

    #[test]
    fn test_parse_google_blob() {
        let config = OAuthConfig::from_client_secrets_json(BLOB, None).unwrap();
        assert_eq!(config.client_id, "client-123.apps.googleusercontent.com");
        assert_eq!(config.redirect_uri, "https://utm.avisia.fr/auth/callback");
        // Google defaults fill the OIDC validation fields
        assert_eq!(config.issuer, "https://accounts.google.com");
        assert_eq!(config.jwks_uri, "https://www.googleapis.com/oauth2/v3/certs");
    }

    #[test]
    fn test_redirect_override_wins() {
        let config =
            OAuthConfig::from_client_secrets_json(BLOB, Some("http://localhost:8080/auth/callback"))
                .unwrap();
        assert_eq!(config.redirect_uri, "http://localhost:8080/auth/callback");
    }

    #[test]
    fn test_missing_redirect_is_fatal() {
        let blob = r#"{
            "web": {
                "client_id": "id",
                "client_secret": "secret",
                "auth_uri": "https://idp/auth",
                "token_uri": "https://idp/token"
            }
        }"#;
        let result = OAuthConfig::from_client_secrets_json(blob, None);
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }

    #[test]
    fn test_rejects_relative_endpoint() {
        let blob = r#"{
            "web": {
                "client_id": "id",
                "client_secret": "secret",
                "auth_uri": "/auth",
                "token_uri": "https://idp/token",
                "redirect_uris": ["https://app/cb"]
            }
        }"#;
        let result = OAuthConfig::from_client_secrets_json(blob, None);
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let result = OAuthConfig::from_client_secrets_json("{not json", None);
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }
}
