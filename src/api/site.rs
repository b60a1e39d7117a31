//! Site health endpoint
//!
//! Lets load balancers check that the service and its database are up.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};

/// Response for the health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: String,
    pub version: &'static str,
}

/// Build the site router
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health - Ping the database
async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state.pool.ping().await.map_err(|e| {
        tracing::warn!("Health check failed: {:#}", e);
        ApiError::internal_error("Database unavailable")
    })?;

    Ok(Json(HealthResponse {
        status: "ok",
        database: format!("{:?}", state.pool.driver()).to_lowercase(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}
