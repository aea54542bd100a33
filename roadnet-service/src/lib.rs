//! roadnet Service Library
//!
//! HTTP handlers, types and router for the road network service.
//! This library is used by both the roadnet-service binary and integration tests.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use roadnet::RoadGraphService;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers.
pub struct AppState {
    /// Road graph extraction pipeline.
    pub graph_service: RoadGraphService,
}

/// OpenAPI documentation for the road network service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "roadnet Service",
        version = "0.1.0",
        description = "Returns the drivable road network inside a bounding box as GeoJSON.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(handlers::get_graph, handlers::health_check),
    components(schemas(
        handlers::BoundingBoxRequest,
        handlers::ErrorResponse,
        handlers::HealthResponse,
    )),
    tags(
        (name = "graph", description = "Road network extraction"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/get_graph", post(handlers::get_graph))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use handlers::{ApiError, BoundingBoxRequest, ErrorResponse, HealthResponse};

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use roadnet::FileSource;
    use tower::ServiceExt;

    fn app() -> Router {
        let graph_service = RoadGraphService::new(FileSource::new("/nonexistent/roadnet.json"));
        router(Arc::new(AppState { graph_service }))
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_graph_requires_post() {
        let response = app()
            .oneshot(Request::get("/get_graph").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_validation_runs_before_extraction() {
        let request = Request::post("/get_graph")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"north": 1}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Missing south parameter");
    }
}
