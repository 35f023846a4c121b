//! Router-level tests for the auth endpoints and the session cookie.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use ug_auth::{
    auth_router, AuthApiState, AuthGate, DomainPolicy, OAuthConfig, PendingAuthorizationStore,
    SessionStore, UserIdentity,
};

const COOKIE_NAME: &str = "ug_session";

fn oauth_config() -> OAuthConfig {
    OAuthConfig {
        client_id: "client-123".to_string(),
        client_secret: "secret".to_string(),
        authorization_endpoint: "https://idp.example.com/auth".to_string(),
        token_endpoint: "https://idp.example.com/token".to_string(),
        jwks_uri: "https://idp.example.com/jwks".to_string(),
        issuer: "https://idp.example.com".to_string(),
        redirect_uri: "https://app.example.com/auth/callback".to_string(),
    }
}

fn identity() -> UserIdentity {
    UserIdentity {
        email: "user@avisia.fr".to_string(),
        email_verified: true,
        subject_id: "sub-123".to_string(),
        name: Some("Jean Martin".to_string()),
        picture: None,
    }
}

fn app(session_ttl_secs: i64) -> (Router, Arc<SessionStore>) {
    let sessions = Arc::new(SessionStore::new(session_ttl_secs));
    let gate = Arc::new(
        AuthGate::new(
            oauth_config(),
            DomainPolicy::new(["avisia.fr"]),
            Arc::new(PendingAuthorizationStore::new()),
            sessions.clone(),
            600,
            5,
        )
        .unwrap(),
    );

    let state = AuthApiState::new(gate).with_cookie_settings(COOKIE_NAME, false, "Lax", 3600);
    (auth_router(state), sessions)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, format!("{}={}", COOKIE_NAME, cookie));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn login_redirects_to_provider() {
    let (app, _) = app(3600);

    let response = app.oneshot(get("/login", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://idp.example.com/auth?response_type=code"));
}

#[tokio::test]
async fn callback_provider_error_redirects_without_session() {
    let (app, sessions) = app(3600);

    let response = app
        .oneshot(get("/callback?error=access_denied", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("/?error="));
    assert_eq!(sessions.len(), 0);
}

#[tokio::test]
async fn me_without_cookie_is_unauthorized() {
    let (app, _) = app(3600);

    let response = app.oneshot(get("/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_with_valid_cookie_returns_identity() {
    let (app, sessions) = app(3600);
    let (raw_id, _) = sessions.create(identity());

    let response = app.oneshot(get("/me", Some(&raw_id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["email"], "user@avisia.fr");
    assert_eq!(body["name"], "Jean Martin");
}

#[tokio::test]
async fn me_with_expired_session_is_unauthorized() {
    let (app, sessions) = app(-1);
    let (raw_id, _) = sessions.create(identity());

    let response = app.oneshot(get("/me", Some(&raw_id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_destroys_session() {
    let (app, sessions) = app(3600);
    let (raw_id, _) = sessions.create(identity());

    let request = Request::builder()
        .method("POST")
        .uri("/logout")
        .header(header::COOKIE, format!("{}={}", COOKIE_NAME, raw_id))
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(sessions.len(), 0);

    // The cookie no longer works
    let response = app.oneshot(get("/me", Some(&raw_id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
