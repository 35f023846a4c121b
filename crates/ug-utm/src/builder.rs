//! Deterministic UTM URL assembly
//!
//! Builds campaign tracking URLs with a fixed parameter order so the
//! same request always produces the same URL, byte for byte. Existing
//! query parameters on the base URL are preserved in their original
//! order; pre-existing `utm_*` keys are overridden, never duplicated.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// The five reserved UTM parameter names, in output order.
const RESERVED_KEYS: [&str; 5] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
];

#[derive(Error, Debug, PartialEq)]
pub enum UtmError {
    #[error("Invalid base URL: {message}")]
    InvalidBaseUrl { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

impl UtmError {
    fn invalid_base_url(message: impl Into<String>) -> Self {
        Self::InvalidBaseUrl {
            message: message.into(),
        }
    }

    fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

impl IntoResponse for UtmError {
    fn into_response(self) -> Response {
        let error_type = match &self {
            UtmError::InvalidBaseUrl { .. } => "INVALID_BASE_URL",
            UtmError::MissingField { .. } => "MISSING_FIELD",
        };

        let body = serde_json::json!({
            "error": error_type,
            "message": self.to_string(),
        });

        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// A UTM URL request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UtmRequest {
    /// Absolute http(s) URL the campaign points at
    pub base_url: String,
    pub source: String,
    pub medium: String,
    pub campaign: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Build the tracking URL for a request.
pub fn build(request: &UtmRequest) -> Result<String, UtmError> {
    let base_url = request.base_url.trim();
    validate_base_url(base_url)?;

    let source = required(&request.source, "source")?;
    let medium = required(&request.medium, "medium")?;
    let campaign = required(&request.campaign, "campaign")?;
    let term = request.term.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let content = request
        .content
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());

    // A fragment stays at the very end; the query goes before it
    let (base_url, fragment) = match base_url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (base_url, None),
    };

    // Split off any existing query and drop reserved keys from it
    let (path_part, existing_query) = match base_url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (base_url, ""),
    };

    let kept: Vec<&str> = existing_query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            !RESERVED_KEYS.contains(&key)
        })
        .collect();

    let mut url = String::from(path_part);
    url.push('?');

    for pair in &kept {
        url.push_str(pair);
        url.push('&');
    }

    url.push_str(&format!("utm_source={}", urlencoding::encode(source)));
    url.push_str(&format!("&utm_medium={}", urlencoding::encode(medium)));
    url.push_str(&format!("&utm_campaign={}", urlencoding::encode(campaign)));

    if let Some(term) = term {
        url.push_str(&format!("&utm_term={}", urlencoding::encode(term)));
    }
    if let Some(content) = content {
        url.push_str(&format!("&utm_content={}", urlencoding::encode(content)));
    }

    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }

    Ok(url)
}

/// Normalize a UTM value the way the campaign team writes them:
/// lowercase, trimmed, spaces replaced with hyphens.
pub fn normalize_value(value: &str) -> String {
    value.trim().to_lowercase().replace(' ', "-")
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, UtmError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UtmError::missing_field(field));
    }
    Ok(trimmed)
}

fn validate_base_url(base_url: &str) -> Result<(), UtmError> {
    if base_url.is_empty() {
        return Err(UtmError::missing_field("base_url"));
    }

    let rest = base_url
        .strip_prefix("https://")
        .or_else(|| base_url.strip_prefix("http://"))
        .ok_or_else(|| UtmError::invalid_base_url("must start with http:// or https://"))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    if host.is_empty() {
        return Err(UtmError::invalid_base_url("missing host"));
    }
    if base_url.chars().any(char::is_whitespace) {
        return Err(UtmError::invalid_base_url("contains whitespace"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(base_url: &str) -> UtmRequest {
        UtmRequest {
            base_url: base_url.to_string(),
            source: "newsletter".to_string(),
            medium: "email".to_string(),
            campaign: "q4promo".to_string(),
            term: None,
            content: None,
        }
    }

    #[test]
    fn test_plain_base_url() {
        let url = build(&request("https://avisia.fr")).unwrap();
        assert_eq!(
            url,
            "https://avisia.fr?utm_source=newsletter&utm_medium=email&utm_campaign=q4promo"
        );
    }

    #[test]
    fn test_existing_query_preserved_first() {
        let mut req = request("https://example.com?ref=1");
        req.source = "google".to_string();
        req.medium = "cpc".to_string();
        req.campaign = "launch".to_string();

        let url = build(&req).unwrap();
        assert_eq!(
            url,
            "https://example.com?ref=1&utm_source=google&utm_medium=cpc&utm_campaign=launch"
        );
    }

    #[test]
    fn test_optional_params_in_fixed_order() {
        let mut req = request("https://avisia.fr");
        req.term = Some("analytics".to_string());
        req.content = Some("banner".to_string());

        let url = build(&req).unwrap();
        assert_eq!(
            url,
            "https://avisia.fr?utm_source=newsletter&utm_medium=email&utm_campaign=q4promo&utm_term=analytics&utm_content=banner"
        );
    }

    #[test]
    fn test_content_without_term() {
        let mut req = request("https://avisia.fr");
        req.content = Some("banner".to_string());

        let url = build(&req).unwrap();
        assert!(url.ends_with("&utm_campaign=q4promo&utm_content=banner"));
        assert!(!url.contains("utm_term"));
    }

    #[test]
    fn test_reserved_keys_overridden_not_duplicated() {
        let url = build(&request("https://avisia.fr?utm_source=old&keep=1")).unwrap();
        assert_eq!(
            url,
            "https://avisia.fr?keep=1&utm_source=newsletter&utm_medium=email&utm_campaign=q4promo"
        );
        assert_eq!(url.matches("utm_source").count(), 1);
    }

    #[test]
    fn test_values_percent_encoded() {
        let mut req = request("https://avisia.fr");
        req.campaign = "été 2026".to_string();

        let url = build(&req).unwrap();
        assert!(url.contains("utm_campaign=%C3%A9t%C3%A9%202026"));
    }

    #[test]
    fn test_missing_required_field() {
        let mut req = request("https://avisia.fr");
        req.medium = "   ".to_string();

        assert_eq!(
            build(&req),
            Err(UtmError::MissingField {
                field: "medium".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            build(&request("ftp://avisia.fr")),
            Err(UtmError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            build(&request("avisia.fr")),
            Err(UtmError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            build(&request("https://")),
            Err(UtmError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            build(&request("https://avisia .fr")),
            Err(UtmError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_fragment_stays_after_query() {
        let url = build(&request("https://avisia.fr/page#section")).unwrap();
        assert_eq!(
            url,
            "https://avisia.fr/page?utm_source=newsletter&utm_medium=email&utm_campaign=q4promo#section"
        );
    }

    #[test]
    fn test_fragment_with_existing_query() {
        let url = build(&request("https://avisia.fr/page?ref=1#section")).unwrap();
        assert_eq!(
            url,
            "https://avisia.fr/page?ref=1&utm_source=newsletter&utm_medium=email&utm_campaign=q4promo#section"
        );
    }

    #[test]
    fn test_deterministic_output() {
        let mut req = request("https://avisia.fr?a=1&b=2");
        req.term = Some("kw".to_string());

        let first = build(&req).unwrap();
        let second = build(&req).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("  Black Friday 2026 "), "black-friday-2026");
        assert_eq!(normalize_value("Email"), "email");
        assert_eq!(normalize_value("already-fine"), "already-fine");
    }
}
