//! UtmGate Authentication Gate
//!
//! OIDC authorization-code flow against an external identity provider,
//! with an email-domain allow-list and in-process TTL session storage.
//!
//! The flow in one line: `begin_login` hands out the provider URL and
//! remembers state/nonce/PKCE; `complete_login` consumes that state,
//! exchanges the code, validates the ID token, applies the domain
//! policy, and mints a session whose raw id lives only in the cookie.

pub mod api;
pub mod error;
pub mod gate;
pub mod identity;
pub mod jwks;
pub mod oauth_config;
pub mod pending;
pub mod policy;
pub mod session;

pub use api::{auth_router, AuthApiState, CurrentSession, MeResponse};
pub use error::{AuthError, ErrorResponse, Result};
pub use gate::AuthGate;
pub use identity::{IdTokenClaims, StringOrVec, TokenResponse, UserIdentity};
pub use jwks::{Jwks, JwkKey, JwksCache};
pub use oauth_config::OAuthConfig;
pub use pending::{PendingAuthorization, PendingAuthorizationStore};
pub use policy::DomainPolicy;
pub use session::{Session, SessionStore};
