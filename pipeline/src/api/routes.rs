use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::models::ApiResponse;
use crate::models::TupleRequest;
use crate::services::{AppError, PipelineService};

pub async fn store_tuple(
    State(service): State<Arc<PipelineService>>,
    payload: Result<Json<TupleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let handle = service.submit(&request.tuple)?;

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(handle))))
}

pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

// Define all API routes
pub fn routes(service: Arc<PipelineService>) -> Router {
    Router::new()
        .route("/store", post(store_tuple))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use common::config::Settings;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let storage = Arc::new(MemoryStorage::new("test"));
        routes(Arc::new(PipelineService::with_storage(
            storage,
            &Settings::default(),
        )))
    }

    async fn call(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_store(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/store")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = call(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"success": true, "data": "ok", "error": null}));
    }

    #[tokio::test]
    async fn test_store_returns_execution_handle() {
        let (status, body) = call(post_store(r#"{"tuple": "1,2,3"}"#)).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["success"], true);
        assert!(body["data"]["executionId"].is_string());
        assert!(body["data"]["startedAt"].is_string());
    }

    #[tokio::test]
    async fn test_store_rejects_blank_tuple() {
        let (status, body) = call(post_store(r#"{"tuple": "   "}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_store_rejects_malformed_body() {
        let (status, body) = call(post_store(r#"{"row": 1}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
