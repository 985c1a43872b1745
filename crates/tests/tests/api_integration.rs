use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use triage_providers::{FoursquareConfig, FoursquarePlacesClient};
use triage_tests::{app, ScriptedCompletion, StaticPlaces};

fn post_json(uri: &str, body: Value) -> Request<Body> {
    post_raw(uri, body.to_string())
}

fn post_raw(uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

async fn assert_invalid_report(response: axum::response::Response) {
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "invalid_report");
    assert!(parsed["notice"].as_str().unwrap().contains("911"));
    assert!(parsed.get("fallback").is_none());
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn spawn_failing_place_search() -> String {
    let router = Router::new().route(
        "/v3/places/search",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn health_reports_capabilities() {
    let response = app(None, Some(Arc::new(StaticPlaces::default())))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["capabilities"]["ai_classification"], false);
    assert_eq!(parsed["capabilities"]["place_search"], true);
    assert!(parsed["capabilities"]["ai_model"].is_null());

    let response = app(Some(Arc::new(ScriptedCompletion::default())), None)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let parsed = read_json(response).await;
    assert_eq!(parsed["capabilities"]["ai_classification"], true);
    assert_eq!(parsed["capabilities"]["ai_model"], "scripted");
}

#[tokio::test]
async fn cardiac_report_returns_ranked_services() {
    let places = Arc::new(StaticPlaces::default());
    let response = app(
        Some(Arc::new(ScriptedCompletion::returning(
            "Sorry, I cannot produce JSON today.",
        ))),
        Some(places.clone()),
    )
    .oneshot(post_json(
        "/v1/triage",
        json!({
            "text": "Severe chest pain and shortness of breath",
            "location": { "latitude": 40.0, "longitude": -74.0 }
        }),
    ))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let parsed = read_json(response).await;

    assert_eq!(parsed["classification"]["category"], "medical-cardiac");
    assert_eq!(parsed["classification"]["urgency"], "critical");
    let actions = parsed["classification"]["immediate_actions"]
        .as_array()
        .unwrap();
    assert!(actions
        .iter()
        .any(|step| step.as_str().unwrap_or_default().contains("911")));

    let services = parsed["services"].as_array().unwrap();
    let ids = services
        .iter()
        .map(|service| service["id"].as_str().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert_eq!(services[0]["distance"], json!(0.8));
    assert_eq!(services[0]["urgency"], "critical");
    assert_eq!(services[2]["urgency"], "urgent");
    assert_eq!(services[3]["distance"], "unknown");
    assert_eq!(services[3]["urgency"], "standard");
    assert_eq!(services[3]["hours"], "Hours not available");
    assert_eq!(places.call_count(), 1);
}

#[tokio::test]
async fn empty_text_is_rejected_before_collaborators() {
    let completion = Arc::new(ScriptedCompletion::default());
    let places = Arc::new(StaticPlaces::default());
    let response = app(Some(completion.clone()), Some(places.clone()))
        .oneshot(post_json("/v1/triage", json!({ "text": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "invalid_report");
    assert!(parsed["notice"].as_str().unwrap().contains("911"));
    assert_eq!(completion.call_count(), 0);
    assert_eq!(places.call_count(), 0);
}

#[tokio::test]
async fn place_search_500_yields_fallback_classification() {
    let base = spawn_failing_place_search().await;
    let config = FoursquareConfig::new("fsq-test-key", Some(&base)).unwrap();
    let places = FoursquarePlacesClient::new(reqwest::Client::new(), config);

    let response = app(None, Some(Arc::new(places)))
        .oneshot(post_json(
            "/v1/triage",
            json!({ "emergency": "House fire spreading quickly" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "service_search_unavailable");
    assert!(parsed["message"].as_str().unwrap().contains("500"));
    assert_eq!(parsed["fallback"]["category"], "general");
    assert!(parsed["fallback"]["narrative"]
        .as_str()
        .unwrap()
        .contains("911"));
    assert!(parsed["notice"].as_str().unwrap().contains("911"));
}

#[tokio::test]
async fn missing_place_search_credential_is_unavailable() {
    let response = app(None, None)
        .oneshot(post_json(
            "/v1/services",
            json!({ "latitude": 40.7128, "longitude": -74.006, "emergencyType": "police" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "service_search_unavailable");
    assert_eq!(parsed["fallback"]["urgency"], "urgent");
}

#[tokio::test]
async fn services_route_ranks_results() {
    let response = app(None, Some(Arc::new(StaticPlaces::default())))
        .oneshot(post_json(
            "/v1/services",
            json!({ "latitude": 40.7128, "longitude": -74.006, "emergency_type": "medical" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    let services = parsed["services"].as_array().unwrap();
    assert_eq!(services.len(), 4);
    assert_eq!(services[0]["id"], "a");
}

#[tokio::test]
async fn classify_uses_ai_output_when_valid() {
    let completion = ScriptedCompletion::returning(
        json!({
            "emergencyType": "police",
            "immediateActions": ["Call 911 now", "Lock the doors"],
            "urgencyLevel": "urgent",
            "recommendedServices": "police station",
            "aiResponse": "Stay inside and call 911."
        })
        .to_string(),
    );

    let response = app(Some(Arc::new(completion)), None)
        .oneshot(post_json("/v1/classify", json!({ "text": "Break-in in progress" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["source"], "ai");
    assert_eq!(parsed["classification"]["category"], "police");
    assert_eq!(parsed["classification"]["immediate_actions"][1], "Lock the doors");
}

#[tokio::test]
async fn classify_without_completion_falls_back_to_keywords() {
    let response = app(None, None)
        .oneshot(post_json("/v1/classify", json!({ "text": "Car accident with injuries" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["source"], "heuristic");
    assert_eq!(parsed["classification"]["category"], "medical-trauma");
    assert_eq!(parsed["classification"]["recommended_search"], "hospital emergency room");
}

#[tokio::test]
async fn null_text_is_an_invalid_report() {
    let completion = Arc::new(ScriptedCompletion::default());
    let places = Arc::new(StaticPlaces::default());
    let response = app(Some(completion.clone()), Some(places.clone()))
        .oneshot(post_json("/v1/triage", json!({ "text": null })))
        .await
        .unwrap();

    assert_invalid_report(response).await;
    assert_eq!(completion.call_count(), 0);
    assert_eq!(places.call_count(), 0);
}

#[tokio::test]
async fn malformed_bodies_carry_the_911_notice() {
    let router = app(None, Some(Arc::new(StaticPlaces::default())));

    let response = router
        .clone()
        .oneshot(post_raw("/v1/triage", "not json"))
        .await
        .unwrap();
    assert_invalid_report(response).await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/v1/triage",
            json!({ "text": "fire", "location": { "latitude": 40 } }),
        ))
        .await
        .unwrap();
    assert_invalid_report(response).await;

    let response = router
        .clone()
        .oneshot(post_raw("/v1/classify", "{\"text\": "))
        .await
        .unwrap();
    assert_invalid_report(response).await;

    let response = router
        .oneshot(post_json("/v1/services", json!({ "latitude": 40.7128 })))
        .await
        .unwrap();
    assert_invalid_report(response).await;
}

#[tokio::test]
async fn out_of_range_service_location_is_rejected() {
    let places = Arc::new(StaticPlaces::default());
    let response = app(None, Some(places.clone()))
        .oneshot(post_json(
            "/v1/services",
            json!({ "latitude": 123.0, "longitude": -74.006 }),
        ))
        .await
        .unwrap();

    assert_invalid_report(response).await;
    assert_eq!(places.call_count(), 0);
}
