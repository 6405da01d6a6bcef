//! Verdict HTTP REST API
//!
//! Axum-based HTTP server for feedback submission and review curation.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function returning `(StatusCode, serde_json::Value)`. The inner
//! functions are directly testable without axum dispatch machinery.
//!
//! Endpoints:
//! - GET    /health        - health check with backend and store status
//! - GET    /version       - server version info
//! - POST   /feedback      - rate + review → AI reply, stored as a review
//! - POST   /reply         - rate + review → plain-text reply, nothing stored
//! - GET    /reviews       - list stored reviews
//! - POST   /reviews       - add a review directly
//! - PUT    /reviews/:id   - edit a review
//! - DELETE /reviews/:id   - delete a review
//! - GET    /stats         - total, average rating, latest submission
//! - POST   /analyze       - summary and recommended actions over stored reviews

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;
use verdict_core::store::{validate_rating, StoreError};
use verdict_core::{
    analyze_reviews, generate_feedback, generate_reply, FeedbackRequest, ModelBackend, ReviewDraft,
    ReviewPatch, ReviewStore, VerdictConfig, VerdictError,
};

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub config: VerdictConfig,
    pub backend: Arc<dyn ModelBackend>,
    /// Single writer for the review log.
    pub store: Mutex<ReviewStore>,
}

impl HttpState {
    pub fn new(config: VerdictConfig, backend: Arc<dyn ModelBackend>, store: ReviewStore) -> Self {
        Self {
            config,
            backend,
            store: Mutex::new(store),
        }
    }

    /// Build state from config: model backend from `[model]`, store from `[store]`.
    pub fn from_config(config: VerdictConfig) -> std::result::Result<Self, VerdictError> {
        let backend: Arc<dyn ModelBackend> =
            Arc::from(verdict_core::create_backend(&config.model)?);
        let store = ReviewStore::open(&config.store.path);
        Ok(Self::new(config, backend, store))
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/feedback", post(feedback_handler))
        .route("/reply", post(reply_handler))
        .route("/reviews", get(list_reviews_handler).post(add_review_handler))
        .route(
            "/reviews/:id",
            put(update_review_handler).delete(delete_review_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/analyze", post(analyze_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Verdict HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FeedbackSubmission {
    pub rating: Option<i64>,
    #[serde(default)]
    pub review: String,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }

    fn into_body(self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error,
            "status": self.status,
        })
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check - reports backend name and whether the log is readable.
pub async fn health_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let store = state.store.lock().await;
    match store.list() {
        Ok(records) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "backend": state.backend.name(),
                "store": store.path().display().to_string(),
                "reviews": records.len(),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version - returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "verdict/1",
    })
}

/// Inner feedback - validates the rating, asks the model, stores the review.
///
/// Model and interpretation failures are logged with their diagnostic and
/// answered with a generic message.
pub async fn feedback_inner(
    state: &HttpState,
    req: FeedbackSubmission,
) -> (StatusCode, serde_json::Value) {
    let request = match submission_request(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let feedback = match generate_feedback(
        state.backend.as_ref(),
        &request,
        state.config.model.max_new_tokens,
    )
    .await
    {
        Ok(fb) => fb,
        Err(e) => {
            tracing::error!(error = %e, rating = request.rating, "Feedback generation failed");
            return (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(e.user_message()).into_body(),
            );
        }
    };

    let draft = ReviewDraft {
        rating: request.rating,
        review: request.review,
        ai_response: feedback.user_response.clone(),
        timestamp: None,
    };

    let store = state.store.lock().await;
    match store.add(draft) {
        Ok(record) => (
            StatusCode::OK,
            serde_json::json!({
                "id": record.id,
                "timestamp": record.timestamp,
                "feedback": feedback,
            }),
        ),
        Err(e) => store_error_response(e),
    }
}

/// Inner reply - the short customer-facing reply only. Nothing is stored.
pub async fn reply_inner(
    state: &HttpState,
    req: FeedbackSubmission,
) -> (StatusCode, serde_json::Value) {
    let request = match submission_request(req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match generate_reply(
        state.backend.as_ref(),
        &request,
        state.config.model.max_new_tokens,
    )
    .await
    {
        Ok(reply) => (StatusCode::OK, serde_json::json!({ "reply": reply })),
        Err(e) => {
            tracing::error!(error = %e, rating = request.rating, "Reply generation failed");
            (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(e.user_message()).into_body(),
            )
        }
    }
}

pub async fn list_reviews_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let store = state.store.lock().await;
    match store.list() {
        Ok(records) => (StatusCode::OK, serde_json::json!(records)),
        Err(e) => store_error_response(e),
    }
}

pub async fn add_review_inner(
    state: &HttpState,
    draft: ReviewDraft,
) -> (StatusCode, serde_json::Value) {
    let store = state.store.lock().await;
    match store.add(draft) {
        Ok(record) => (StatusCode::CREATED, serde_json::json!(record)),
        Err(e) => store_error_response(e),
    }
}

pub async fn update_review_inner(
    state: &HttpState,
    id: Uuid,
    patch: ReviewPatch,
) -> (StatusCode, serde_json::Value) {
    let store = state.store.lock().await;
    match store.update(id, patch) {
        Ok(record) => (StatusCode::OK, serde_json::json!(record)),
        Err(e) => store_error_response(e),
    }
}

pub async fn delete_review_inner(state: &HttpState, id: Uuid) -> (StatusCode, serde_json::Value) {
    let store = state.store.lock().await;
    match store.delete(id) {
        Ok(record) => (
            StatusCode::OK,
            serde_json::json!({ "deleted": true, "id": record.id }),
        ),
        Err(e) => store_error_response(e),
    }
}

pub async fn stats_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let store = state.store.lock().await;
    match store.stats() {
        Ok(stats) => (StatusCode::OK, serde_json::json!(stats)),
        Err(e) => store_error_response(e),
    }
}

/// Inner analyze - section-mode report over every stored review.
pub async fn analyze_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let records = {
        let store = state.store.lock().await;
        match store.list() {
            Ok(r) => r,
            Err(e) => return store_error_response(e),
        }
    };

    match analyze_reviews(state.backend.as_ref(), &records, state.config.model.max_new_tokens)
        .await
    {
        Ok(report) => (StatusCode::OK, serde_json::json!(report)),
        Err(e) => {
            tracing::error!(error = %e, reviews = records.len(), "Review analysis failed");
            (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(e.user_message()).into_body(),
            )
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin - delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn feedback_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<FeedbackSubmission>,
) -> impl IntoResponse {
    let (status, body) = feedback_inner(&state, req).await;
    (status, Json(body))
}

pub async fn reply_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<FeedbackSubmission>,
) -> impl IntoResponse {
    let (status, body) = reply_inner(&state, req).await;
    (status, Json(body))
}

pub async fn list_reviews_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = list_reviews_inner(&state).await;
    (status, Json(body))
}

pub async fn add_review_handler(
    State(state): State<Arc<HttpState>>,
    Json(draft): Json<ReviewDraft>,
) -> impl IntoResponse {
    let (status, body) = add_review_inner(&state, draft).await;
    (status, Json(body))
}

pub async fn update_review_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ReviewPatch>,
) -> impl IntoResponse {
    let (status, body) = update_review_inner(&state, id, patch).await;
    (status, Json(body))
}

pub async fn delete_review_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = delete_review_inner(&state, id).await;
    (status, Json(body))
}

pub async fn stats_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = stats_inner(&state).await;
    (status, Json(body))
}

pub async fn analyze_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = analyze_inner(&state).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

/// Check the submitted rating is an integer in 1..=5.
fn submission_request(
    req: FeedbackSubmission,
) -> std::result::Result<FeedbackRequest, (StatusCode, serde_json::Value)> {
    match req.rating.and_then(|r| u8::try_from(r).ok()) {
        Some(r) if validate_rating(r).is_ok() => Ok(FeedbackRequest::new(r, req.review)),
        _ => Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("rating must be an integer between 1 and 5").into_body(),
        )),
    }
}

/// Map a store failure to an HTTP status and error body.
pub fn store_error_response(e: StoreError) -> (StatusCode, serde_json::Value) {
    let status = match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidRating(_) | StoreError::InvalidTimestamp(_) => StatusCode::BAD_REQUEST,
        StoreError::Io(_) | StoreError::Csv(_) => {
            tracing::error!(error = %e, "Review store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, ErrorResponse::new(e.to_string()).into_body())
}

// ============================================================================
// Unit Tests - call inner functions directly
// ============================================================================
