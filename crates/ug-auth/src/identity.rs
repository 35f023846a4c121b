//! Identity types derived from the OIDC ID token.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard OIDC ID token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer
    pub iss: String,
    /// Subject (unique user ID from the IDP)
    pub sub: String,
    /// Audience (client ID)
    pub aud: StringOrVec,
    /// Expiration
    pub exp: i64,
    /// Issued at
    pub iat: i64,
    /// Nonce
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Email verified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Picture URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Audience can be a string or array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrVec {
    String(String),
    Vec(Vec<String>),
}

impl StringOrVec {
    pub fn contains(&self, value: &str) -> bool {
        match self {
            StringOrVec::String(s) => s == value,
            StringOrVec::Vec(v) => v.iter().any(|s| s == value),
        }
    }
}

/// OIDC token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Authenticated user identity, derived solely from validated ID-token
/// claims. This is the only identity representation the rest of the
/// service sees; raw tokens are dropped once the session exists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserIdentity {
    pub email: String,
    pub email_verified: bool,
    /// Stable subject identifier from the provider
    pub subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl UserIdentity {
    /// Build an identity from validated claims. The email claim is
    /// required; everything else is carried through as-is.
    pub fn from_claims(claims: &IdTokenClaims) -> Option<Self> {
        let email = claims.email.as_ref()?.trim().to_lowercase();
        if email.is_empty() {
            return None;
        }

        Some(Self {
            email,
            email_verified: claims.email_verified.unwrap_or(false),
            subject_id: claims.sub.clone(),
            name: claims.name.clone(),
            picture: claims.picture.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(email: Option<&str>, verified: Option<bool>) -> IdTokenClaims {
        IdTokenClaims {
            iss: "https://accounts.google.com".to_string(),
            sub: "sub-123".to_string(),
            aud: StringOrVec::String("client-id".to_string()),
            exp: 0,
            iat: 0,
            nonce: None,
            email: email.map(String::from),
            email_verified: verified,
            name: Some("Jean Martin".to_string()),
            picture: None,
        }
    }

    #[test]
    fn test_string_or_vec() {
        let single: StringOrVec = serde_json::from_str("\"client123\"").unwrap();
        assert!(single.contains("client123"));
        assert!(!single.contains("other"));

        let multi: StringOrVec = serde_json::from_str("[\"client1\", \"client2\"]").unwrap();
        assert!(multi.contains("client1"));
        assert!(multi.contains("client2"));
        assert!(!multi.contains("client3"));
    }

    #[test]
    fn test_identity_from_claims() {
        let identity = UserIdentity::from_claims(&claims(Some("User@Avisia.FR"), Some(true)))
            .expect("identity");
        assert_eq!(identity.email, "user@avisia.fr");
        assert!(identity.email_verified);
        assert_eq!(identity.subject_id, "sub-123");
    }

    #[test]
    fn test_identity_requires_email() {
        assert!(UserIdentity::from_claims(&claims(None, Some(true))).is_none());
        assert!(UserIdentity::from_claims(&claims(Some("   "), Some(true))).is_none());
    }

    #[test]
    fn test_missing_email_verified_defaults_false() {
        let identity =
            UserIdentity::from_claims(&claims(Some("user@avisia.fr"), None)).expect("identity");
        assert!(!identity.email_verified);
    }
}
