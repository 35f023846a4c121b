//! Authentication endpoints
//!
//! Flow:
//! 1. GET  /auth/login    - Redirects to the identity provider
//! 2. User authenticates at the provider
//! 3. GET  /auth/callback - Validates the callback, sets the session cookie
//! 4. POST /auth/logout   - Destroys the session
//! 5. GET  /auth/me       - Identity of the current session

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AuthError, ErrorResponse};
use crate::gate::AuthGate;
use crate::session::Session;

/// Auth API state
#[derive(Clone)]
pub struct AuthApiState {
    pub gate: Arc<AuthGate>,
    /// Session cookie settings
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub cookie_same_site: String,
    pub cookie_max_age_secs: i64,
}

impl AuthApiState {
    pub fn new(gate: Arc<AuthGate>) -> Self {
        Self {
            gate,
            cookie_name: "ug_session".to_string(),
            cookie_secure: true,
            cookie_same_site: "Lax".to_string(),
            cookie_max_age_secs: 28800,
        }
    }

    pub fn with_cookie_settings(
        mut self,
        name: impl Into<String>,
        secure: bool,
        same_site: impl Into<String>,
        max_age_secs: i64,
    ) -> Self {
        self.cookie_name = name.into();
        self.cookie_secure = secure;
        self.cookie_same_site = same_site.into();
        self.cookie_max_age_secs = max_age_secs;
        self
    }

    fn same_site(&self) -> SameSite {
        match self.cookie_same_site.to_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            _ => SameSite::Lax,
        }
    }

    fn session_cookie(&self, raw_id: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), raw_id))
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(self.same_site())
            .max_age(time::Duration::seconds(self.cookie_max_age_secs))
            .build()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(self.same_site())
            .max_age(time::Duration::ZERO)
            .build()
    }
}

// ==================== Request/Response Types ====================

/// Callback query parameters from the provider
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Current-session response
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub email: String,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for MeResponse {
    fn from(session: Session) -> Self {
        Self {
            email: session.identity.email,
            email_verified: session.identity.email_verified,
            name: session.identity.name,
            picture: session.identity.picture,
            expires_at: session.expires_at,
        }
    }
}

// ==================== Session Extractor ====================

/// Extractor for the authenticated session.
///
/// Reads the session cookie, validates it against the store and slides
/// the TTL. Rejects with 401 when the cookie is missing, unknown or
/// expired.
pub struct CurrentSession(pub Session);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    AuthApiState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let api_state = AuthApiState::from_ref(state);

        let jar = CookieJar::from_headers(&parts.headers);
        let raw_id = jar
            .get(&api_state.cookie_name)
            .map(|c| c.value().to_string())
            .ok_or_else(|| AuthError::unauthorized("No session cookie"))?;

        let session = api_state
            .gate
            .sessions()
            .touch(&raw_id)
            .ok_or_else(|| AuthError::unauthorized("Session expired or unknown"))?;

        Ok(CurrentSession(session))
    }
}

// ==================== Endpoints ====================

/// Start a login: redirect to the identity provider
#[utoipa::path(
    get,
    path = "/login",
    tag = "auth",
    responses(
        (status = 303, description = "Redirect to the identity provider")
    )
)]
pub async fn login(State(state): State<AuthApiState>) -> Response {
    let (auth_url, _) = state.gate.begin_login();
    (StatusCode::SEE_OTHER, [(header::LOCATION, auth_url)]).into_response()
}

/// Handle the provider callback
#[utoipa::path(
    get,
    path = "/callback",
    tag = "auth",
    params(CallbackParams),
    responses(
        (status = 303, description = "Redirect to the application, with or without a session")
    )
)]
pub async fn callback(
    State(state): State<AuthApiState>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Response {
    // Provider-reported errors (user cancelled, consent denied, ...)
    if let Some(error) = &params.error {
        warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Provider returned an error on callback"
        );
        return error_redirect(params.error_description.as_deref().unwrap_or(error));
    }

    let code = match params.code.as_deref() {
        Some(c) if !c.is_empty() => c,
        _ => return error_redirect("No authorization code received"),
    };

    let oidc_state = match params.state.as_deref() {
        Some(s) if !s.is_empty() => s,
        _ => return error_redirect("No state parameter received"),
    };

    let (raw_id, _session) = match state.gate.complete_login(code, oidc_state).await {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "Login failed");
            return error_redirect(&e.to_string());
        }
    };

    let jar = jar.add(state.session_cookie(raw_id));

    (jar, (StatusCode::SEE_OTHER, [(header::LOCATION, "/")])).into_response()
}

/// Destroy the current session
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Session destroyed")
    )
)]
pub async fn logout(State(state): State<AuthApiState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(&state.cookie_name) {
        if state.gate.sessions().destroy(cookie.value()) {
            info!("Session destroyed");
        }
    }

    let jar = jar.add(state.removal_cookie());
    (jar, StatusCode::NO_CONTENT).into_response()
}

/// Identity of the current session
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current identity", body = MeResponse),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
pub async fn me(CurrentSession(session): CurrentSession) -> Json<MeResponse> {
    Json(session.into())
}

fn error_redirect(message: &str) -> Response {
    let error_url = format!("/?error={}", urlencoding::encode(message));
    (StatusCode::SEE_OTHER, [(header::LOCATION, error_url)]).into_response()
}

/// Create the auth router
pub fn auth_router(state: AuthApiState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}
