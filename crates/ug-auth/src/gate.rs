//! The authentication gate
//!
//! Drives the OIDC authorization-code flow:
//! 1. `begin_login` issues state/nonce/PKCE material and the provider
//!    authorization URL.
//! 2. The user authenticates at the provider.
//! 3. `complete_login` consumes the state, exchanges the code, validates
//!    the ID token, applies the domain policy and creates a session.
//!
//! No partial session exists on any failure path: the session is created
//! only after every check has passed.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{AuthError, Result};
use crate::identity::{IdTokenClaims, TokenResponse, UserIdentity};
use crate::jwks::JwksCache;
use crate::oauth_config::OAuthConfig;
use crate::pending::{PendingAuthorization, PendingAuthorizationStore};
use crate::policy::DomainPolicy;
use crate::session::{Session, SessionStore};

/// Scopes requested from the provider
const SCOPES: &str = "openid email profile";

pub struct AuthGate {
    config: OAuthConfig,
    policy: DomainPolicy,
    pending: Arc<PendingAuthorizationStore>,
    sessions: Arc<SessionStore>,
    jwks: JwksCache,
    http_client: reqwest::Client,
    state_ttl_secs: i64,
}

impl AuthGate {
    pub fn new(
        config: OAuthConfig,
        policy: DomainPolicy,
        pending: Arc<PendingAuthorizationStore>,
        sessions: Arc<SessionStore>,
        state_ttl_secs: i64,
        provider_timeout_secs: u64,
    ) -> Result<Self> {
        if policy.is_empty() {
            return Err(AuthError::configuration("Domain allow-list is empty"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(provider_timeout_secs))
            .build()
            .map_err(|e| AuthError::internal(format!("Failed to build HTTP client: {}", e)))?;

        let jwks = JwksCache::new(http_client.clone(), &config.jwks_uri);

        Ok(Self {
            config,
            policy,
            pending,
            sessions,
            jwks,
            http_client,
            state_ttl_secs,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn pending(&self) -> &Arc<PendingAuthorizationStore> {
        &self.pending
    }

    /// Start a login: generate state/nonce/PKCE, store the pending
    /// record, and return the provider authorization URL plus the state.
    pub fn begin_login(&self) -> (String, String) {
        let state = generate_random_string(32);
        let nonce = generate_random_string(32);
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);

        self.pending.insert(PendingAuthorization::new(
            &state,
            &nonce,
            &code_verifier,
            self.state_ttl_secs,
        ));

        let auth_url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&nonce={}&code_challenge={}&code_challenge_method=S256",
            self.config.authorization_endpoint,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(&state),
            urlencoding::encode(&nonce),
            urlencoding::encode(&code_challenge),
        );

        (auth_url, state)
    }

    /// Complete a login from the provider callback.
    ///
    /// Returns the raw session id (for the cookie) and the session.
    pub async fn complete_login(&self, code: &str, state: &str) -> Result<(String, Session)> {
        // Single use: the record is gone after this whatever happens next
        let pending = self.pending.consume(state).ok_or(AuthError::StateMismatch)?;

        let tokens = self.exchange_code(code, &pending.code_verifier).await?;

        let id_token = tokens
            .id_token
            .as_deref()
            .ok_or_else(|| AuthError::token_invalid("No ID token in response"))?;

        let claims = self.validate_id_token(id_token, &pending.nonce).await?;

        let identity = UserIdentity::from_claims(&claims)
            .ok_or_else(|| AuthError::token_invalid("No email claim in ID token"))?;

        if !self.policy.authorize(&identity) {
            let domain =
                DomainPolicy::email_domain(&identity.email).unwrap_or_else(|| "?".to_string());
            warn!(email = %identity.email, "Login denied by domain policy");
            return Err(AuthError::DomainDenied { domain });
        }

        let email = identity.email.clone();
        let (raw_id, session) = self.sessions.create(identity);

        info!(email = %email, "Login successful");
        Ok((raw_id, session))
    }

    /// Exchange the authorization code for tokens at the token endpoint.
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.config.redirect_uri),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("code_verifier", code_verifier),
        ];

        // One retry on transport errors and 5xx; 4xx is terminal.
        let response = match self.post_token_request(&params).await {
            Ok(resp) if resp.status().is_server_error() => {
                warn!(status = %resp.status(), "Token endpoint server error, retrying once");
                self.post_token_request(&params).await?
            }
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "Token request failed, retrying once");
                self.post_token_request(&params).await?
            }
        };

        let status = response.status();
        if status.is_server_error() {
            return Err(AuthError::provider_unavailable(format!(
                "Token endpoint returned {}",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::token_exchange(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        response.json().await.map_err(|e| {
            AuthError::token_exchange(format!("Failed to parse token response: {}", e))
        })
    }

    async fn post_token_request(&self, params: &[(&str, &str)]) -> Result<reqwest::Response> {
        self.http_client
            .post(&self.config.token_endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| AuthError::provider_unavailable(format!("Token request failed: {}", e)))
    }

    /// Validate the ID token signature and claims against this provider.
    async fn validate_id_token(&self, id_token: &str, expected_nonce: &str) -> Result<IdTokenClaims> {
        let header = decode_header(id_token)
            .map_err(|e| AuthError::token_invalid(format!("Invalid ID token header: {}", e)))?;

        let decoding_key = self.jwks.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.client_id]);

        let token_data =
            decode::<IdTokenClaims>(id_token, &decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::token_invalid(format!("Invalid ID token: {}", e)),
                }
            })?;

        let claims = token_data.claims;

        if claims.nonce.as_deref() != Some(expected_nonce) {
            return Err(AuthError::token_invalid("Nonce mismatch"));
        }

        if !claims.aud.contains(&self.config.client_id) {
            return Err(AuthError::token_invalid("Audience mismatch"));
        }

        Ok(claims)
    }
}

// ==================== Helpers ====================

fn generate_random_string(length: usize) -> String {
    let bytes: Vec<u8> = (0..length).map(|_| rand::thread_rng().gen()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

fn generate_code_verifier() -> String {
    generate_random_string(32)
}

fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gate() -> AuthGate {
        let config = OAuthConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            authorization_endpoint: "https://idp.example.com/auth".to_string(),
            token_endpoint: "https://idp.example.com/token".to_string(),
            jwks_uri: "https://idp.example.com/jwks".to_string(),
            issuer: "https://idp.example.com".to_string(),
            redirect_uri: "https://app.example.com/auth/callback".to_string(),
        };

        AuthGate::new(
            config,
            DomainPolicy::new(["avisia.fr"]),
            Arc::new(PendingAuthorizationStore::new()),
            Arc::new(SessionStore::new(3600)),
            600,
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_policy_rejected() {
        let gate = test_gate();
        let result = AuthGate::new(
            gate.config.clone(),
            DomainPolicy::new(Vec::<String>::new()),
            Arc::new(PendingAuthorizationStore::new()),
            Arc::new(SessionStore::new(3600)),
            600,
            5,
        );
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }

    #[test]
    fn test_begin_login_stores_pending_state() {
        let gate = test_gate();
        let (auth_url, state) = gate.begin_login();

        assert_eq!(gate.pending().len(), 1);
        assert!(auth_url.starts_with("https://idp.example.com/auth?response_type=code"));
        assert!(auth_url.contains("client_id=client-123"));
        assert!(auth_url.contains(&format!("state={}", urlencoding::encode(&state))));
        assert!(auth_url.contains("code_challenge_method=S256"));
        assert!(auth_url.contains("scope=openid%20email%20profile"));
    }

    #[test]
    fn test_begin_login_states_are_unique() {
        let gate = test_gate();
        let (_, a) = gate.begin_login();
        let (_, b) = gate.begin_login();
        assert_ne!(a, b);
        assert_eq!(gate.pending().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_state_is_mismatch() {
        let gate = test_gate();
        let result = gate.complete_login("some-code", "never-issued").await;
        assert!(matches!(result, Err(AuthError::StateMismatch)));
    }

    #[test]
    fn test_code_challenge_is_s256() {
        // RFC 7636 appendix B test vector
        let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }
}
