use std::time::Duration;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Fallback timeout for the answer and guess phases.
const PHASE_TIMEOUT: Duration = Duration::from_millis(600_000);
/// Delay before the automatic round reset once every red has been found.
const AUTO_RESET_DELAY: Duration = Duration::from_millis(10_000);

const DEFAULT_PORT: u16 = 10000;
const DEFAULT_ORIGINS: &str = "http://localhost:5173,http://localhost:5174";

/// Timing knobs for the orchestrator's deferred actions.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub phase: Duration,
    pub auto_reset: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            phase: PHASE_TIMEOUT,
            auto_reset: AUTO_RESET_DELAY,
        }
    }
}

pub fn port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Browser origins allowed by the HTTP layer, read from `CORS_ORIGINS`
/// (comma-separated), defaulting to the local dev frontends.
pub fn cors_layer() -> CorsLayer {
    let origins = std::env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());
    let origins: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|o| o.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
        .allow_credentials(true)
}
