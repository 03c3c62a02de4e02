//! Health check endpoint handler

use axum::{extract::State, Json};

use crate::api::{models::HealthResponse, routes::AppState};

/// Handler for GET /health
///
/// Always 200. A store that fails its check, or a fallback to the memory
/// store at startup, reports `degraded`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.service.store();
    let mut health = HealthResponse::new(
        store.health_check().await,
        store.backend(),
        state.service.has_generator(),
    );
    if state.store_fallback {
        health.status = "degraded".to_string();
    }
    Json(health)
}
