//! UTM builder endpoint
//!
//! Session-gated: the request must carry a valid session cookie. Errors
//! from the builder are local to the call and never touch session state.

use axum::{
    extract::{FromRef, State},
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use ug_auth::{AuthApiState, CurrentSession, ErrorResponse};

use crate::builder::{self, UtmError, UtmRequest};

/// UTM API state. Wraps the auth state so the session extractor works
/// on these routes too.
#[derive(Clone)]
pub struct UtmApiState {
    pub auth: AuthApiState,
}

impl FromRef<UtmApiState> for AuthApiState {
    fn from_ref(state: &UtmApiState) -> Self {
        state.auth.clone()
    }
}

/// Build request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct BuildUtmRequest {
    #[serde(flatten)]
    pub request: UtmRequest,

    /// Normalize values (lowercase, trim, spaces to hyphens) before
    /// building. Defaults to true, matching how the campaign team
    /// writes values by hand.
    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

fn default_normalize() -> bool {
    true
}

/// Build response body
#[derive(Debug, Serialize, ToSchema)]
pub struct BuildUtmResponse {
    pub url: String,
}

/// Build a campaign tracking URL
#[utoipa::path(
    post,
    path = "/build",
    tag = "utm",
    request_body = BuildUtmRequest,
    responses(
        (status = 200, description = "Tracking URL", body = BuildUtmResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
pub async fn build_utm(
    CurrentSession(session): CurrentSession,
    State(_state): State<UtmApiState>,
    Json(body): Json<BuildUtmRequest>,
) -> Result<Json<BuildUtmResponse>, UtmError> {
    let mut request = body.request;

    if body.normalize {
        request.source = builder::normalize_value(&request.source);
        request.medium = builder::normalize_value(&request.medium);
        request.campaign = builder::normalize_value(&request.campaign);
        request.term = request.term.as_deref().map(builder::normalize_value);
        request.content = request.content.as_deref().map(builder::normalize_value);
    }

    let url = builder::build(&request)?;

    debug!(email = %session.identity.email, url = %url, "Built UTM URL");
    Ok(Json(BuildUtmResponse { url }))
}

/// Create the UTM router
pub fn utm_router(state: UtmApiState) -> Router {
    Router::new()
        .route("/build", post(build_utm))
        .with_state(state)
}
