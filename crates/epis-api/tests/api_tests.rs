//! API Integration Tests
//!
//! The router runs against in-memory SQLite and deterministic stand-ins for
//! the vector store and the language model, so no external service is needed.
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use epis_api::{create_router, state::AppState};
use epis_core::{
    AnswerGenerator, AppConfig, KnowledgeRetriever, SqliteTicketStore, TicketRepository,
};
use epis_rag::testing::{
    FailingGenerator, FailingRetriever, FailingTicketStore, ScriptedGenerator, SlowGenerator,
    StaticRetriever,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    tickets: Arc<SqliteTicketStore>,
    generator: Arc<ScriptedGenerator>,
}

async fn test_app_with_config(
    config: AppConfig,
    retriever: Arc<dyn KnowledgeRetriever>,
    generator: Arc<dyn AnswerGenerator>,
    tickets: Arc<dyn TicketRepository>,
) -> Router {
    let state = AppState::with_collaborators(config, retriever, generator, tickets).unwrap();
    create_router(Arc::new(state))
}

async fn test_app_with(
    retriever: Arc<dyn KnowledgeRetriever>,
    generator: Arc<dyn AnswerGenerator>,
    tickets: Arc<dyn TicketRepository>,
) -> Router {
    test_app_with_config(AppConfig::default(), retriever, generator, tickets).await
}

async fn test_app(reply: &str) -> TestApp {
    let tickets = Arc::new(SqliteTicketStore::in_memory().await.unwrap());
    let generator = Arc::new(ScriptedGenerator::new(reply));
    let router = test_app_with(
        Arc::new(StaticRetriever::with_texts(&[
            "Printers: check paper and toner first.",
            "Network: restart the router.",
        ])),
        generator.clone(),
        tickets.clone(),
    )
    .await;

    TestApp {
        router,
        tickets,
        generator,
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(router, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// =============================================================================
// Ask Tests
// =============================================================================

#[tokio::test]
async fn test_ask_general_question() {
    let app = test_app("Restart the router and try again.").await;

    let uri = "/ask?question=how%20do%20I%20reset%20my%20password";
    let (status, json) = get_json(&app.router, uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "Restart the router and try again.");
    assert_eq!(json["follow_up_required"], false);
    assert_eq!(app.generator.calls(), 1);
}

#[tokio::test]
async fn test_ask_problem_report_requires_follow_up() {
    let app = test_app("Check that the printer has paper.").await;

    let uri = "/ask?question=mi%20impresora%20no%20funciona";
    let (status, json) = get_json(&app.router, uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["follow_up_required"], true);
    assert_eq!(
        json["answer"],
        "Check that the printer has paper.\n\nDoes this information solve your problem?"
    );

    let prompt = app.generator.last_prompt().unwrap();
    assert!(prompt.contains("Printers: check paper and toner first."));
    assert!(prompt.contains("Question: mi impresora no funciona"));
}

#[tokio::test]
async fn test_ask_farewell() {
    let app = test_app("unused").await;

    let (status, json) = get_json(&app.router, "/ask?question=thanks,+bye").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["follow_up_required"], false);
    assert!(json["answer"].as_str().unwrap().starts_with("You're welcome"));
    assert_eq!(app.generator.calls(), 0);
}

#[tokio::test]
async fn test_ask_creates_ticket() {
    let app = test_app("unused").await;

    let (status, json) = get_json(
        &app.router,
        "/ask?question=ACTION_CREATE_TICKET:%20%20screen%20is%20black%20",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["follow_up_required"], false);
    assert_eq!(
        json["answer"],
        "Done. I have created support ticket #1 with your problem: 'screen is black'. \
         The technical team will contact you."
    );

    let ticket = app.tickets.get(1).await.unwrap().unwrap();
    assert_eq!(ticket.description, "screen is black");
    assert_eq!(ticket.status, "Open");
    assert_eq!(app.generator.calls(), 0);
}

#[tokio::test]
async fn test_ask_empty_ticket_uses_placeholder() {
    let app = test_app("unused").await;

    let (status, json) = get_json(&app.router, "/ask?question=ACTION_CREATE_TICKET:").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["answer"]
        .as_str()
        .unwrap()
        .contains("'problem not specified by user'"));
    assert_eq!(app.tickets.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_ask_ticket_ids_increase() {
    let app = test_app("unused").await;

    for expected in 1..=3 {
        let (_, json) =
            get_json(&app.router, "/ask?question=ACTION_CREATE_TICKET:%20no%20wifi").await;
        assert!(json["answer"]
            .as_str()
            .unwrap()
            .contains(&format!("#{expected} ")));
    }
    assert_eq!(app.tickets.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_ask_empty_question_is_answered() {
    let app = test_app("I don't have enough information in my documents").await;

    let (status, json) = get_json(&app.router, "/ask?question=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["follow_up_required"], false);
}

#[tokio::test]
async fn test_ask_generator_failure_returns_apology() {
    let router = test_app_with(
        Arc::new(StaticRetriever::with_texts(&["ctx"])),
        Arc::new(FailingGenerator),
        Arc::new(SqliteTicketStore::in_memory().await.unwrap()),
    )
    .await;

    let (status, json) = get_json(&router, "/ask?question=the%20network%20is%20slow").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "Sorry, an internal server error has occurred.");
    assert_eq!(json["follow_up_required"], false);
}

#[tokio::test]
async fn test_ask_ticket_store_failure_returns_apology() {
    let router = test_app_with(
        Arc::new(StaticRetriever::default()),
        Arc::new(ScriptedGenerator::new("unused")),
        Arc::new(FailingTicketStore),
    )
    .await;

    let uri = "/ask?question=ACTION_CREATE_TICKET:%20broken%20mouse";
    let (status, json) = get_json(&router, uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "Sorry, an internal server error has occurred.");
}

#[tokio::test]
async fn test_ask_request_timeout_returns_apology() {
    let mut config = AppConfig::default();
    config.server.request_timeout_secs = 1;
    let router = test_app_with_config(
        config,
        Arc::new(StaticRetriever::with_texts(&["ctx"])),
        Arc::new(SlowGenerator::new(Duration::from_secs(3))),
        Arc::new(SqliteTicketStore::in_memory().await.unwrap()),
    )
    .await;

    let (status, json) = get_json(&router, "/ask?question=hello").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "Sorry, an internal server error has occurred.");
    assert_eq!(json["follow_up_required"], false);
}

#[tokio::test]
async fn test_ask_missing_question_is_bad_request() {
    let app = test_app("unused").await;

    let (status, json) = get_json(&app.router, "/ask").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["message"].is_string());
    assert_eq!(app.generator.calls(), 0);
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = test_app("unused").await;

    let (status, json) = get_json(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let app = test_app("unused").await;

    let (status, json) = get_json(&app.router, "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["ticket_store"], true);
    assert_eq!(json["checks"]["knowledge_base"], true);
}

#[tokio::test]
async fn test_readiness_check_reports_missing_collection() {
    let router = test_app_with(
        Arc::new(FailingRetriever),
        Arc::new(ScriptedGenerator::new("unused")),
        Arc::new(SqliteTicketStore::in_memory().await.unwrap()),
    )
    .await;

    let (status, json) = get_json(&router, "/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["ready"], false);
    assert_eq!(json["checks"]["ticket_store"], true);
    assert_eq!(json["checks"]["knowledge_base"], false);
}

// =============================================================================
// Metrics and Docs Tests
// =============================================================================

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app("unused").await;

    get(&app.router, "/ask?question=goodbye").await;
    get(&app.router, "/ask?question=ACTION_CREATE_TICKET:%20keyboard").await;
    let (status, body) = get(&app.router, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("epis_http_requests_total{endpoint=\"/ask\",status=\"200\"} 2"));
    assert!(text.contains("epis_intents_total{intent=\"farewell\"} 1"));
    assert!(text.contains("epis_intents_total{intent=\"create_ticket\"} 1"));
    assert!(text.contains("epis_tickets_created_total 1"));
    assert!(text.contains("epis_ask_failures_total 0"));
    assert!(text.contains("epis_uptime_seconds"));
}

#[tokio::test]
async fn test_openapi_document() {
    let app = test_app("unused").await;

    let (status, json) = get_json(&app.router, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/ask"].is_object());
    assert!(json["paths"]["/health"].is_object());
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = test_app("unused").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
