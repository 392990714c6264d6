//! Router construction for the query core's HTTP surface.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app::{App, ExecuteRequest};
use crate::error::SdqcError;
use crate::response::ExecuteResponse;

/// Wraps `SdqcError` for an axum response body, mapping the closed error
/// set onto HTTP status codes.
pub struct AppError(SdqcError);

impl From<SdqcError> for AppError {
    fn from(e: SdqcError) -> Self {
        AppError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use crate::error::ErrorCode::*;
        let status = match self.0.code() {
            IntentUnclear | MissingRequiredFilter | ItemNotFound | WarehouseNotFound | WorkstationNotFound => {
                StatusCode::BAD_REQUEST
            }
            SchemaNotFound | ColumnNotFound | AmbiguousReference | BinderError => StatusCode::UNPROCESSABLE_ENTITY,
            JoinUnguarded => StatusCode::UNPROCESSABLE_ENTITY,
            QueryTimeout => StatusCode::GATEWAY_TIMEOUT,
            OutOfMemory => StatusCode::INSUFFICIENT_STORAGE,
            ConnectionError => StatusCode::BAD_GATEWAY,
            QueryError | InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "code": self.0.code(), "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

pub fn build_router(app: Arc<App>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/execute", post(execute_batch))
        .route("/execute/stream", post(execute_sse))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn execute_batch(State(app): State<Arc<App>>, Json(req): Json<ExecuteRequest>) -> impl IntoResponse {
    let locale = req.locale();
    let (outcome, elapsed) = app.execute_request(&req).await;

    match outcome {
        Ok((resolved, result)) => {
            let response = ExecuteResponse::success(
                req.task_id,
                resolved.sql,
                app.config.system_id.clone(),
                result,
                resolved.ast.limit,
                resolved.ast.offset,
                resolved.token_usage,
                elapsed.as_millis() as u64,
            );
            Json(response).into_response()
        }
        Err(err) => {
            let response = ExecuteResponse::failure(req.task_id, &err, false, &locale, elapsed.as_millis() as u64);
            Json(response).into_response()
        }
    }
}

async fn execute_sse(State(app): State<Arc<App>>, Json(req): Json<ExecuteRequest>) -> impl IntoResponse {
    crate::sse::execute_stream(app, req).await.into_response()
}
