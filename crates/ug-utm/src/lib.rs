//! UtmGate UTM URL Builder
//!
//! Deterministic campaign tracking URL assembly plus the session-gated
//! HTTP endpoint exposing it.

pub mod api;
pub mod builder;

pub use api::{utm_router, BuildUtmRequest, BuildUtmResponse, UtmApiState};
pub use builder::{build, normalize_value, UtmError, UtmRequest};
