//! HTTP middleware
//!
//! Author: hephaex@gmail.com

pub mod metrics;

pub use metrics::{metrics_middleware, Metrics};

use epis_core::ServerConfig;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Build the CORS layer from server configuration
///
/// Returns `None` when CORS is disabled. A `*` entry allows any origin;
/// credentials are never allowed together with a wildcard.
pub fn cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    if !config.cors_enabled {
        return None;
    }

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_origins.is_empty() || config.cors_origins.iter().any(|o| o.trim() == "*") {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(layer.allow_origin(AllowOrigin::list(origins)))
}
