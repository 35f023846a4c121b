//! UtmGate Server
//!
//! OIDC-gated UTM URL builder:
//! - Auth APIs: login redirect, provider callback, logout, current identity
//! - UTM APIs: session-gated tracking URL builder
//! - Monitoring: health, ready, Swagger UI
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `UTMGATE_CONFIG` | - | Path to a config TOML file |
//! | `UTMGATE_HTTP_PORT` | `8080` | HTTP port |
//! | `UTMGATE_ALLOWED_DOMAINS` | - | Comma-separated email domains |
//! | `UTMGATE_SECRETS_PROVIDER` | `env` | `env` or `file` |
//! | `UTMGATE_CLIENT_SECRETS` | - | Client secrets JSON (env provider) |
//! | `RUST_LOG` | `info` | Log level |
//! | `LOG_FORMAT` | `text` | `json` for JSON output |

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::{response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ug_auth::{auth_router, AuthApiState, AuthGate, DomainPolicy, OAuthConfig};
use ug_auth::{PendingAuthorizationStore, SessionStore};
use ug_config::{AppConfig, ConfigLoader};
use ug_secrets::Provider;
use ug_utm::{utm_router, UtmApiState};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "UtmGate API",
        description = "OIDC-gated UTM tracking URL builder"
    ),
    paths(
        ug_auth::api::login,
        ug_auth::api::callback,
        ug_auth::api::logout,
        ug_auth::api::me,
        ug_utm::api::build_utm,
    ),
    components(schemas(
        ug_auth::MeResponse,
        ug_auth::ErrorResponse,
        ug_auth::UserIdentity,
        ug_utm::UtmRequest,
        ug_utm::BuildUtmRequest,
        ug_utm::BuildUtmResponse,
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    ug_common::logging::init_logging("ug-server");

    info!("Starting UtmGate Server");

    let config = ConfigLoader::new().load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // Fetch the OAuth client secrets blob; failure here is fatal
    let blob = fetch_client_secrets(&config)
        .await
        .context("Failed to fetch OAuth client secrets")?;

    let oauth_config =
        OAuthConfig::from_client_secrets_json(&blob, config.auth.redirect_uri.as_deref())
            .context("Invalid OAuth client configuration")?;

    info!(
        issuer = %oauth_config.issuer,
        redirect_uri = %oauth_config.redirect_uri,
        domains = ?config.auth.allowed_domains,
        "OAuth configuration loaded"
    );

    let policy = DomainPolicy::new(&config.auth.allowed_domains);
    let pending = Arc::new(PendingAuthorizationStore::new());
    let sessions = Arc::new(SessionStore::new(config.auth.session_ttl_secs as i64));

    let gate = Arc::new(
        AuthGate::new(
            oauth_config,
            policy,
            pending.clone(),
            sessions.clone(),
            config.auth.state_ttl_secs as i64,
            config.auth.provider_timeout_secs,
        )
        .context("Failed to build auth gate")?,
    );

    // Dev mode relaxes the Secure flag so localhost works over http
    let cookie_secure = !config.dev_mode && config.auth.session_cookie_secure;

    let auth_state = AuthApiState::new(gate).with_cookie_settings(
        config.auth.session_cookie_name.clone(),
        cookie_secure,
        config.auth.session_cookie_same_site.clone(),
        config.auth.session_ttl_secs as i64,
    );
    let utm_state = UtmApiState {
        auth: auth_state.clone(),
    };

    // Background sweep for expired pending/session entries. Lookups
    // already drop expired entries, this just bounds memory.
    if config.auth.sweep_interval_secs > 0 {
        let interval_secs = config.auth.sweep_interval_secs;
        let pending = pending.clone();
        let sessions = sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                let dropped_pending = pending.sweep_expired();
                let dropped_sessions = sessions.sweep_expired();
                if dropped_pending + dropped_sessions > 0 {
                    debug!(
                        pending = dropped_pending,
                        sessions = dropped_sessions,
                        "Swept expired entries"
                    );
                }
            }
        });
    }

    let app = Router::new()
        .nest("/auth", auth_router(auth_state))
        .nest("/api/utm", utm_router(utm_state))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http.cors_origins));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    info!("Server listening on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("UtmGate Server shutdown complete");
    Ok(())
}

/// Resolve the secret provider from configuration and fetch the blob.
async fn fetch_client_secrets(config: &AppConfig) -> Result<String> {
    let (secrets_config, key) = match config.secrets.provider.as_str() {
        "file" => {
            let path = Path::new(&config.secrets.file_path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| ".".to_string());
            let key = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .context("secrets.file_path has no file name")?;
            (
                ug_secrets::SecretsConfig {
                    provider: "file".to_string(),
                    file_dir: dir,
                    ..Default::default()
                },
                key,
            )
        }
        _ => (
            ug_secrets::SecretsConfig {
                provider: "env".to_string(),
                // The configured key is the full variable name
                env_prefix: String::new(),
                ..Default::default()
            },
            config.secrets.env_key.clone(),
        ),
    };

    let provider = ug_secrets::create_provider(&secrets_config)?;
    info!(provider = provider.name(), key = %key, "Fetching client secrets");

    Ok(provider.get(&key).await?)
}

/// Build the CORS layer from configured origins; a `*` entry allows any.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match parse_origins(origins) {
        None => layer.allow_origin(Any),
        Some(origins) => layer.allow_origin(origins),
    }
}

/// None means wildcard; unparseable entries are dropped.
fn parse_origins(origins: &[String]) -> Option<Vec<HeaderValue>> {
    if origins.iter().any(|o| o == "*") {
        return None;
    }
    Some(origins.iter().filter_map(|o| o.parse().ok()).collect())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ready_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "READY"
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_origin() {
        assert!(parse_origins(&["*".to_string()]).is_none());
        assert!(parse_origins(&["http://localhost:4200".to_string(), "*".to_string()]).is_none());
    }

    #[test]
    fn test_explicit_origins_parsed() {
        let origins = parse_origins(&[
            "http://localhost:4200".to_string(),
            "https://utm.avisia.fr".to_string(),
        ])
        .unwrap();
        assert_eq!(origins.len(), 2);
    }

    #[test]
    fn test_unparseable_origin_dropped() {
        let origins = parse_origins(&["bad\norigin".to_string()]).unwrap();
        assert!(origins.is_empty());
    }
}
