//! roadnet Service - HTTP microservice returning road networks.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PORT` | HTTP server port | 8080 |
//! | `ROADNET_OSM_FILE` | Serve a saved Overpass response instead of querying | None |
//! | `ROADNET_OVERPASS_URL` | Overpass interpreter endpoint | overpass-api.de |
//! | `ROADNET_OVERPASS_TIMEOUT` | Query timeout in seconds | 180 |
//! | `ROADNET_OVERPASS_RETRIES` | Retries on busy responses | 2 |
//! | `ROADNET_BUFFER_METERS` | Download box buffer | 500 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `POST /get_graph` - Road network GeoJSON for `{north, south, east, west}`
//! - `GET /health` - Health check
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use roadnet::RoadGraphServiceBuilder;
use roadnet_service::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roadnet_service=info,roadnet=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = port_from_env()?;

    // The library handles: ROADNET_OSM_FILE, ROADNET_OVERPASS_URL,
    // ROADNET_OVERPASS_TIMEOUT, ROADNET_OVERPASS_RETRIES, ROADNET_BUFFER_METERS
    let graph_service = RoadGraphServiceBuilder::from_env()?.build();

    tracing::info!(
        source = %graph_service.source_description(),
        buffer_meters = graph_service.buffer_meters(),
        port = port,
        "Starting roadnet service"
    );

    let state = Arc::new(AppState { graph_service });
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Read `PORT`, defaulting to 8080 when unset.
fn port_from_env() -> Result<u16, String> {
    match std::env::var("PORT") {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| format!("Invalid PORT value: {value:?}")),
        Err(_) => Ok(8080),
    }
}
