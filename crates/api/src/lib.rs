use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use triage_agents::{Capabilities, ClassificationSource, TriageAgent};
use triage_core::{
    unavailable_fallback, Classification, GeoPoint, RankedServiceList, TriageError,
    TriageOutcome, CALL_911_NOTICE,
};
use triage_observability::{AppMetrics, MetricsSnapshot};
use triage_providers::{
    build_http_client, CompletionClient, FoursquareConfig, FoursquarePlacesClient,
    OpenAiCompletionClient, OpenAiConfig, PlaceSearchClient,
};

const MAX_BODY_BYTES: usize = 16 * 1024;
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<TriageAgent>,
    pub metrics: Arc<AppMetrics>,
    pub allowed_origins: Arc<Vec<String>>,
}

impl ApiState {
    pub fn new(agent: TriageAgent, metrics: Arc<AppMetrics>) -> Self {
        Self {
            agent: Arc::new(agent),
            metrics,
            allowed_origins: Arc::new(parse_allowed_origins()),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: MetricsSnapshot,
    capabilities: Capabilities,
}

#[derive(Debug, Deserialize)]
struct TriageRequest {
    #[serde(default, alias = "emergency")]
    text: Option<String>,
    #[serde(default)]
    location: Option<GeoPoint>,
}

#[derive(Debug, Deserialize)]
struct ServicesRequest {
    latitude: f64,
    longitude: f64,
    #[serde(default, alias = "emergencyType")]
    emergency_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClassifyResponse {
    classification: Classification,
    source: ClassificationSource,
}

#[derive(Debug, Serialize)]
struct ServicesResponse {
    services: RankedServiceList,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    notice: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<Classification>,
}

/// Builds the router with collaborators configured from the environment.
/// A missing credential disables that collaborator instead of failing.
pub fn build_app() -> Result<Router> {
    let metrics = AppMetrics::shared();
    let http = build_http_client().context("failed to build HTTP client")?;

    let completion = OpenAiConfig::from_env()
        .context("invalid OpenAI configuration")?
        .map(|config| {
            Arc::new(OpenAiCompletionClient::new(http.clone(), config)) as Arc<dyn CompletionClient>
        });
    let place_search = FoursquareConfig::from_env()
        .context("invalid Foursquare configuration")?
        .map(|config| {
            Arc::new(FoursquarePlacesClient::new(http.clone(), config))
                as Arc<dyn PlaceSearchClient>
        });

    if completion.is_none() {
        tracing::warn!("TRIAGE_OPENAI_API_KEY not set; classification uses keyword heuristics only");
    }
    if place_search.is_none() {
        tracing::warn!("TRIAGE_FOURSQUARE_API_KEY not set; service search will be unavailable");
    }

    let agent = TriageAgent::new(completion, place_search, metrics.clone());
    Ok(build_router(ApiState::new(agent, metrics)))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/triage", post(triage))
        .route("/v1/classify", post(classify))
        .route("/v1/services", post(services))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        capabilities: state.agent.capabilities(),
    };
    (StatusCode::OK, Json(payload))
}

impl TriageRequest {
    /// A null or absent text is the same as an empty one.
    fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

async fn triage(
    State(state): State<ApiState>,
    payload: Result<Json<TriageRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(&rejection),
    };

    match state.agent.triage(request.text(), request.location).await {
        Ok(outcome @ TriageOutcome::Ranked { .. }) => (StatusCode::OK, Json(outcome)).into_response(),
        Ok(TriageOutcome::Failed { error, fallback }) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorBody {
                error: "service_search_unavailable",
                message: error,
                notice: CALL_911_NOTICE,
                fallback: Some(fallback),
            }),
        )
            .into_response(),
        Err(error) => error_response(&error),
    }
}

async fn classify(
    State(state): State<ApiState>,
    payload: Result<Json<TriageRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(&rejection),
    };

    match state.agent.classify(request.text(), request.location).await {
        Ok(verdict) => (
            StatusCode::OK,
            Json(ClassifyResponse {
                classification: verdict.classification,
                source: verdict.source,
            }),
        )
            .into_response(),
        Err(error) => error_response(&error),
    }
}

async fn services(
    State(state): State<ApiState>,
    payload: Result<Json<ServicesRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(&rejection),
    };
    let location = GeoPoint {
        latitude: request.latitude,
        longitude: request.longitude,
    };
    let label = request.emergency_type.as_deref().unwrap_or_default();

    match state.agent.find_services(location, label).await {
        Ok(services) => (StatusCode::OK, Json(ServicesResponse { services })).into_response(),
        Err(error) => error_response(&error),
    }
}

fn error_response(error: &TriageError) -> Response {
    let (status, fallback) = match error {
        TriageError::InvalidReport(_) => (StatusCode::BAD_REQUEST, None),
        TriageError::ServiceSearchUnavailable(_) => {
            (StatusCode::BAD_GATEWAY, Some(unavailable_fallback()))
        }
        TriageError::ClassificationDegraded(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Some(unavailable_fallback()))
        }
    };

    (
        status,
        Json(ErrorBody {
            error: error.code(),
            message: error.to_string(),
            notice: CALL_911_NOTICE,
            fallback,
        }),
    )
        .into_response()
}

/// Undecodable bodies are reported like any other invalid report.
fn rejection_response(rejection: &JsonRejection) -> Response {
    error_response(&TriageError::InvalidReport(rejection.body_text()))
}

fn parse_allowed_origins() -> Vec<String> {
    env::var("TRIAGE_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGIN.to_string())
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static(DEFAULT_ALLOWED_ORIGIN)]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
