use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    entities::TargetMode, errors::ServiceError, services::CreateCampaignInput, ApiResponse,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub discount_percent: i16,
    pub target_mode: TargetMode,
    #[serde(default)]
    pub book_ids: Vec<Uuid>,
    #[serde(default)]
    pub genre_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddTargetsRequest {
    #[serde(default)]
    pub book_ids: Vec<Uuid>,
    #[serde(default)]
    pub genre_ids: Vec<Uuid>,
}

async fn create_campaign(
    State(state): State<AppState>,
    Json(payload): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let campaign = state
        .services
        .discounts
        .create_campaign(CreateCampaignInput {
            name: payload.name,
            discount_percent: payload.discount_percent,
            target_mode: payload.target_mode,
            book_ids: payload.book_ids,
            genre_ids: payload.genre_ids,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(campaign))))
}

async fn add_targets(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<AddTargetsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let campaign = state.services.discounts.get_campaign(campaign_id).await?;
    if !payload.book_ids.is_empty() {
        state
            .services
            .discounts
            .add_book_targets(&campaign, &payload.book_ids)
            .await?;
    }
    if !payload.genre_ids.is_empty() {
        state
            .services
            .discounts
            .add_genre_targets(&campaign, &payload.genre_ids)
            .await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn get_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let campaign = state.services.discounts.get_campaign(campaign_id).await?;
    Ok(Json(ApiResponse::ok(campaign)))
}

async fn list_campaigns(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let campaigns = state.services.discounts.list_campaigns().await?;
    Ok(Json(ApiResponse::ok(campaigns)))
}

/// Removing a campaign recomputes the cached discount of every book it
/// covered before the row disappears.
async fn delete_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.discounts.remove_campaign(campaign_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_campaigns).post(create_campaign))
        .route("/:id", get(get_campaign).delete(delete_campaign))
        .route("/:id/targets", post(add_targets))
}
