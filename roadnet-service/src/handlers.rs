//! HTTP request handlers for the road network service.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use roadnet::{BoundingBox, NetworkType};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::AppState;

/// Keys of the request body, in the order they are checked.
const BBOX_KEYS: [&str; 4] = ["north", "south", "east", "west"];

/// Content type of the success body.
pub const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";

/// Bounding box of the requested road network.
///
/// Values may also be sent as numeric strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct BoundingBoxRequest {
    /// Northern latitude in decimal degrees.
    pub north: f64,
    /// Southern latitude in decimal degrees.
    pub south: f64,
    /// Eastern longitude in decimal degrees.
    pub east: f64,
    /// Western longitude in decimal degrees.
    pub west: f64,
}

impl From<BoundingBoxRequest> for BoundingBox {
    fn from(req: BoundingBoxRequest) -> Self {
        BoundingBox::new(req.north, req.south, req.east, req.west)
    }
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Errors returned by the API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body is absent, not declared as JSON, or not parseable.
    #[error("Missing JSON in request")]
    MissingJson,

    /// A bounding box key is absent.
    #[error("Missing {0} parameter")]
    MissingParameter(&'static str),

    /// A bounding box value is not a number.
    #[error("Invalid coordinate format")]
    InvalidCoordinate,

    /// The body could not be read, e.g. it exceeds the size limit.
    #[error("{message}")]
    Body { status: StatusCode, message: String },

    /// Road network extraction or serialization failed.
    #[error("{0}")]
    Extraction(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingJson | ApiError::MissingParameter(_) | ApiError::InvalidCoordinate => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Body { status, .. } => *status,
            ApiError::Extraction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "Road graph extraction failed");
        } else {
            tracing::debug!(error = %self, "Rejected request");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Get the drivable road network inside a bounding box.
///
/// # Request Body
///
/// JSON object with `north`, `south`, `east` and `west` in decimal degrees.
/// Bodies over axum's default limit of 2 MB are rejected with 413.
///
/// # Returns
///
/// - `200 OK` with a GeoJSON FeatureCollection of road segments
/// - `400 Bad Request` if the body is not JSON, a key is missing, or a
///   value is not a number
/// - `413 Payload Too Large` if the body exceeds the size limit
/// - `500 Internal Server Error` if extraction fails, including for a box
///   with a NaN or infinite bound
#[utoipa::path(
    post,
    path = "/get_graph",
    tag = "graph",
    request_body = BoundingBoxRequest,
    responses(
        (status = 200, description = "GeoJSON FeatureCollection of road segments"),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 413, description = "Body too large", body = ErrorResponse),
        (status = 500, description = "Extraction failed", body = ErrorResponse)
    )
)]
pub async fn get_graph(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body?;
    let request = parse_request(&headers, &body)?;
    tracing::debug!(
        north = request.north,
        south = request.south,
        east = request.east,
        west = request.west,
        "Graph query"
    );

    // extraction does blocking I/O
    let geojson = tokio::task::spawn_blocking(move || {
        state
            .graph_service
            .edges_geojson(&request.into(), NetworkType::Drive, true)
    })
    .await
    .map_err(|e| ApiError::Extraction(e.to_string()))?
    .map_err(|e| ApiError::Extraction(e.to_string()))?;

    tracing::info!(bytes = geojson.len(), "Graph returned");

    Ok(([(header::CONTENT_TYPE, GEOJSON_CONTENT_TYPE)], geojson).into_response())
}

/// Validate the request and extract the bounding box.
pub fn parse_request(headers: &HeaderMap, body: &[u8]) -> Result<BoundingBoxRequest, ApiError> {
    if !is_json(headers) {
        return Err(ApiError::MissingJson);
    }
    let json: Value = serde_json::from_slice(body).map_err(|_| ApiError::MissingJson)?;

    for key in BBOX_KEYS {
        if json.get(key).is_none() {
            return Err(ApiError::MissingParameter(key));
        }
    }

    Ok(BoundingBoxRequest {
        north: coordinate(&json["north"])?,
        south: coordinate(&json["south"])?,
        east: coordinate(&json["east"])?,
        west: coordinate(&json["west"])?,
    })
}

/// `application/json` or any `application/*+json` type.
fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Convert a JSON value to a coordinate.
///
/// Numbers, numeric strings and booleans are accepted.
fn coordinate(value: &Value) -> Result<f64, ApiError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or(ApiError::InvalidCoordinate),
        Value::String(s) => s.trim().parse().map_err(|_| ApiError::InvalidCoordinate),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        _ => Err(ApiError::InvalidCoordinate),
    }
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
