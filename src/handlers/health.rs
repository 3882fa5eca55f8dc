use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use sea_orm::{ConnectionTrait, Statement};
use serde_json::json;

use crate::AppState;

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Readiness: verifies the database answers a trivial query.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.db.get_database_backend();
    let probe = state
        .db
        .execute(Statement::from_string(backend, "SELECT 1"))
        .await;

    match probe {
        Ok(_) => Json(json!({ "status": "ready" })).into_response(),
        Err(err) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "error": err.to_string() })),
        )
            .into_response(),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
