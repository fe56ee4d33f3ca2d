//! Integration tests for Phone Sentry

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use phone_sentry::{
    api::{create_router, AppState},
    AppConfig, InvestigationOrchestrator, InvestigationPoll, ModuleManager, PhoneNumber,
    RateLimitConfig, RiskLevel, StartOutcome, TelemetryCollector, TtlCache,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_config() -> AppConfig {
    AppConfig {
        rules_path: None,
        ..AppConfig::default()
    }
}

fn router_with(config: AppConfig) -> Router {
    let state = AppState::new(config).unwrap();
    create_router(Arc::new(state))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", "demo")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-api-key", "demo")
        .body(Body::empty())
        .unwrap()
}

// ============================================
// Engine
// ============================================

#[tokio::test]
async fn test_full_investigation_of_toll_free_number() {
    let telemetry = Arc::new(TelemetryCollector::new());
    let manager = ModuleManager::from_config(&test_config(), telemetry.clone()).unwrap();
    let phone = PhoneNumber::new("+1 (800) 555-1234").unwrap();

    let bundle = manager.execute_all(&phone).await;

    assert_eq!(bundle.phone_number, "+18005551234");
    assert_eq!(bundle.results.len(), 4);
    assert_eq!(bundle.successful_modules(), 4);

    let spam = bundle.results["spam_risk"].data.as_ref().unwrap();
    assert_eq!(spam["risk_score"], 15);
    assert_eq!(spam["risk_level"], "low");

    let info = bundle.results["phone_info"].data.as_ref().unwrap();
    assert_eq!(info["is_valid"], true);
    assert_eq!(info["country_code"], "US");

    let analysis = bundle.ai_analysis.as_ref().unwrap();
    assert_eq!(analysis.risk_level, RiskLevel::Low);
    assert!(analysis
        .insights
        .iter()
        .any(|i| i.contains("Toll-free")));

    assert_eq!(telemetry.request_count(), 4);
}

#[tokio::test]
async fn test_orchestrator_start_is_idempotent() {
    let telemetry = Arc::new(TelemetryCollector::new());
    let manager = ModuleManager::from_config(&test_config(), telemetry).unwrap();
    let orchestrator = InvestigationOrchestrator::new(Arc::new(manager), TtlCache::new());
    let phone = PhoneNumber::new("+19005550000").unwrap();

    assert_eq!(orchestrator.start(phone.clone()), StartOutcome::Started);
    assert_eq!(orchestrator.start(phone.clone()), StartOutcome::AlreadyRunning);

    let mut bundle = None;
    for _ in 0..200 {
        if let InvestigationPoll::Complete(b) = orchestrator.poll(&phone) {
            bundle = Some(b);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let bundle = bundle.expect("investigation should complete");

    assert_eq!(
        bundle.ai_analysis.as_ref().unwrap().risk_level,
        RiskLevel::High
    );
    assert_eq!(orchestrator.start(phone), StartOutcome::Cached);
}

// ============================================
// HTTP API
// ============================================

#[tokio::test]
async fn test_health_endpoint_lists_modules() {
    let app = router_with(test_config());
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["modules"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_invalid_api_key_rejected() {
    let app = router_with(test_config());
    let request = Request::builder()
        .uri("/v1/modules")
        .header("x-api-key", "letmein")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "API_UNAUTHORIZED");
}

#[tokio::test]
async fn test_blank_phone_number_is_bad_request() {
    let app = router_with(test_config());

    let (status, body) = send(
        &app,
        post_json("/v1/investigations", json!({ "phone_number": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INPUT_INVALID_PHONE");
}

#[tokio::test]
async fn test_unknown_module_is_not_found() {
    let app = router_with(test_config());

    let (status, body) = send(
        &app,
        post_json("/v1/modules/carrier_lookup", json!({ "phone_number": "+14158586273" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "MODULE_NOT_FOUND");
}

#[tokio::test]
async fn test_single_module_run_is_cached() {
    let app = router_with(test_config());
    let body = json!({ "phone_number": "+14158586273" });

    let (status, first) = send(&app, post_json("/v1/modules/spam_risk", body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["cached"], false);
    assert_eq!(first["data"]["result"]["data"]["risk_score"], 10);

    let (_, second) = send(&app, post_json("/v1/modules/spam_risk", body)).await;
    assert_eq!(second["data"]["cached"], true);

    let (_, keys) = send(&app, get("/v1/cache/keys?pattern=spam_risk:*")).await;
    assert_eq!(keys["data"]["responses"], json!(["spam_risk:+14158586273"]));
}

#[tokio::test]
async fn test_module_rate_limit_maps_to_429() {
    let mut config = test_config();
    config.module_rate = RateLimitConfig::new(1, Duration::from_secs(60));
    let app = router_with(config);

    let (status, _) = send(
        &app,
        post_json("/v1/modules/spam_risk", json!({ "phone_number": "+14158586273" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post_json("/v1/modules/spam_risk", json!({ "phone_number": "+442071838750" })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "MODULE_RATE_LIMITED");
}

#[tokio::test]
async fn test_caller_rate_limit_headers() {
    let mut config = test_config();
    config.caller_rate = RateLimitConfig::new(2, Duration::from_secs(60));
    let app = router_with(config);

    for expected_remaining in ["1", "0"] {
        let response = app.clone().oneshot(get("/v1/modules")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            expected_remaining
        );
        assert_eq!(response.headers()["x-ratelimit-limit"], "2");
    }

    let response = app.clone().oneshot(get("/v1/modules")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // Health checks bypass the limiter
    let health = Request::builder()
        .uri("/v1/health")
        .header("x-api-key", "demo")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(health).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_synchronous_investigate_subset() {
    let app = router_with(test_config());

    let (status, body) = send(
        &app,
        post_json(
            "/v1/investigate",
            json!({
                "phone_number": "+18005551234",
                "modules": ["spam_risk", "phone_info", "spam_risk", "lookup"],
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["data"]["results"].as_object().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results["spam_risk"]["success"], true);
    assert_eq!(results["lookup"]["error"]["code"], "MODULE_NOT_FOUND");
    assert_eq!(body["data"]["ai_analysis"]["risk_level"], "low");
}

#[tokio::test]
async fn test_start_poll_and_list_over_http() {
    let app = router_with(test_config());
    let phone = json!({ "phone_number": "+1-900-555-0000" });

    let (status, body) = send(&app, post_json("/v1/investigations", phone.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["outcome"], "started");

    // Follow the returned poll URL verbatim
    let status_url = body["data"]["status_url"].as_str().unwrap().to_string();
    assert_eq!(
        status_url,
        "/v1/investigations/status?phone_number=%2B19005550000"
    );

    let mut complete = Value::Null;
    for _ in 0..200 {
        let (_, body) = send(&app, get(&status_url)).await;
        assert_eq!(body["data"]["phone_number"], "+19005550000");
        if body["data"]["status"] == "complete" {
            complete = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(complete["data"]["results"]["results"].as_object().unwrap().len(), 4);

    let (_, body) = send(&app, post_json("/v1/investigations", phone)).await;
    assert_eq!(body["data"]["outcome"], "cached");

    let (status, body) = send(&app, get("/v1/investigations?status=complete")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, _) = send(&app, get("/v1/investigations?status=sleeping")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_reflect_module_calls() {
    let app = router_with(test_config());
    send(
        &app,
        post_json("/v1/investigate", json!({ "phone_number": "+14158586273" })),
    )
    .await;

    let (status, body) = send(&app, get("/v1/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["telemetry"]["total_requests"], 4);
    assert_eq!(body["data"]["investigations_in_flight"], 0);
}
