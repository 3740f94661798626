//! EPIS API - HTTP server for the support assistant
//!
//! Exposes the single `/ask` operation plus health, readiness, Prometheus
//! metrics and the OpenAPI document.
//!
//! Author: hephaex@gmail.com

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use crate::handlers::{ask, health};
use crate::state::AppState;
use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document
#[derive(OpenApi)]
#[openapi(
    info(title = "EPIS Support Assistant API"),
    paths(ask::ask, health::health_check, health::readiness_check),
    components(schemas(
        ask::AskResponse,
        error::ApiError,
        health::HealthResponse,
        health::ReadinessResponse,
        health::ReadinessChecks
    )),
    tags(
        (name = "assistant", description = "Question answering and ticket creation"),
        (name = "health", description = "Liveness and readiness checks")
    )
)]
pub struct ApiDoc;

/// Create the application router
///
/// `/ask` is bounded inside [`epis_rag::RequestHandler`] so an expired request
/// still answers 200 with the apology; the other routes use `TimeoutLayer`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;

    let bounded = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::prometheus_metrics))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )));

    let router = Router::new()
        .route("/ask", get(ask::ask))
        .merge(bounded)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    let router = match middleware::cors_layer(server) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}
