//! HTTP server for the trend API.
//!
//! Exposes the trend cache over a small JSON HTTP API suitable for the
//! consumer-facing site and for an external scheduler.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/trends?region={KR\|US\|JP}` | Latest trending chart for a region |
//! | `POST` | `/analyze-keyword` | Analyze an ad-hoc keyword (cached 6h) |
//! | `POST` | `/cron/refresh` | Retention janitor trigger (bearer secret) |
//! | `GET`  | `/health` | Health check with credential presence flags |
//!
//! # Error Contract
//!
//! Client errors return `{ "error": "..." }`; internal failures add a
//! `message` field:
//!
//! ```json
//! { "error": "Failed to analyze keyword.", "message": "upstream API error (403): ..." }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; preflight `OPTIONS`
//! requests are answered by the CORS layer.

use axum::{
    extract::rejection::JsonRejection,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::annotate::AnnotationService;
use crate::cache::TrendCache;
use crate::config::{self, Config};
use crate::db;
use crate::error::TrendError;
use crate::janitor::RetentionJanitor;
use crate::models::{AnalysisResponse, Region, TrendsResponse};
use crate::store::sqlite::SqliteStore;
use crate::youtube::VideoRankingClient;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    cache: Arc<TrendCache>,
    janitor: Arc<RetentionJanitor>,
}

/// Starts the HTTP server.
///
/// Runs the (idempotent) schema migrations, wires the SQLite store, the
/// YouTube client, and the annotation service into a [`TrendCache`], and
/// serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    crate::migrate::run_migrations(config).await?;

    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool));

    let source = Arc::new(VideoRankingClient::new(&config.youtube)?);
    let annotator = AnnotationService::new(&config.model)?;

    let state = AppState {
        cache: Arc::new(TrendCache::new(
            store.clone(),
            source,
            annotator,
            &config.cache,
        )),
        janitor: Arc::new(RetentionJanitor::new(store, &config.retention)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/trends", get(handle_trends))
        .route("/analyze-keyword", post(handle_analyze_keyword))
        .route("/cron/refresh", post(handle_cron_refresh))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    let bind_addr = &config.server.bind;
    tracing::info!("trend API listening on http://{bind_addr}");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    error: String,
    message: Option<String>,
}

/// JSON error body: `{ "error": "...", "message": "..."? }`.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(error: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        error: error.into(),
        message: None,
    }
}

/// Constructs a 401 Unauthorized error.
fn unauthorized() -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        error: "Unauthorized".to_string(),
        message: None,
    }
}

/// Constructs a 500 error with a leading summary and the cause as `message`.
fn internal(error: impl Into<String>, cause: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        error: error.into(),
        message: Some(cause.into()),
    }
}

/// Map a pipeline error onto the HTTP contract. Validation problems are the
/// caller's fault (400); everything else that escapes the pipeline is a 500
/// with the given summary.
fn classify_error(summary: &str, err: TrendError) -> AppError {
    match err {
        TrendError::Validation(msg) => bad_request(msg),
        other => internal(summary, other.to_string()),
    }
}

// ============ GET /trends ============

#[derive(Deserialize)]
struct TrendsQuery {
    region: Option<String>,
}

/// Handler for `GET /trends`.
///
/// Serves the latest cached batch for the region, refreshing it first when
/// stale. A failed refresh degrades to the previous batch; only a missing
/// upstream credential or a final store failure surfaces as 500.
async fn handle_trends(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<TrendsResponse>, AppError> {
    let code = query.region.unwrap_or_else(|| "KR".to_string());
    let region = Region::parse(&code)
        .ok_or_else(|| bad_request("Invalid region. Use: KR, US, JP"))?;

    if config::youtube_api_key().is_none() {
        return Err(AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "YOUTUBE_API_KEY is not set.".to_string(),
            message: None,
        });
    }

    let response = state
        .cache
        .trending_for_region(region)
        .await
        .map_err(|e| classify_error("Failed to fetch trends.", e))?;

    Ok(Json(response))
}

// ============ POST /analyze-keyword ============

/// Handler for `POST /analyze-keyword`.
///
/// Body: `{ "keyword": "...", "regionCode": "KR"? }`. Returns the cached
/// analysis when one is still live (`fromCache: true`), otherwise runs the
/// search → details → aggregate → annotate pipeline and caches the result.
async fn handle_analyze_keyword(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let Json(body) = payload.map_err(|_| bad_request("Invalid JSON body."))?;

    let keyword = body
        .get("keyword")
        .and_then(|v| v.as_str())
        .ok_or_else(|| bad_request("keyword is required and must be a string."))?;

    let code = body
        .get("regionCode")
        .and_then(|v| v.as_str())
        .unwrap_or("KR");
    let region = Region::parse(code)
        .ok_or_else(|| bad_request("Invalid regionCode. Use: KR, US, JP"))?;

    let response = state
        .cache
        .keyword_analysis(keyword, region)
        .await
        .map_err(|e| classify_error("Failed to analyze keyword.", e))?;

    Ok(Json(response))
}

// ============ POST /cron/refresh ============

#[derive(Serialize)]
struct CronResponse {
    status: String,
    timestamp: String,
    results: Vec<String>,
}

/// Handler for `POST /cron/refresh`.
///
/// Authenticated with `Authorization: Bearer <CRON_SECRET>`. When the secret
/// is not configured every call is rejected. Runs the retention janitor once
/// and reports per-step outcomes.
async fn handle_cron_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CronResponse>, AppError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let expected = config::cron_secret().map(|secret| format!("Bearer {secret}"));
    match (presented, expected) {
        (Some(presented), Some(expected)) if presented == expected => {}
        _ => return Err(unauthorized()),
    }

    let results = state.janitor.run().await;

    Ok(Json(CronResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        results,
    }))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    env: HealthEnv,
}

/// Credential presence flags. Booleans only, never the values.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthEnv {
    has_upstream_key: bool,
    has_model_key: bool,
}

/// Handler for `GET /health`.
///
/// Used by load balancers and monitoring tools.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        env: HealthEnv {
            has_upstream_key: config::youtube_api_key().is_some(),
            has_model_key: config::model_api_key().is_some(),
        },
    })
}
