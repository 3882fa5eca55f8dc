use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{errors::ServiceError, services::PostReviewInput, ApiResponse, AppState};

use super::common::CustomerId;

#[derive(Debug, Deserialize)]
pub struct PostReviewRequest {
    pub score: i16,
    #[serde(default)]
    pub comment: String,
}

async fn post_review(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Path(book_id): Path<Uuid>,
    Json(payload): Json<PostReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let review = state
        .services
        .reviews
        .post_review(PostReviewInput {
            customer_id,
            book_id,
            score: payload.score,
            comment: payload.comment,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(review))))
}

async fn list_reviews(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let reviews = state.services.reviews.list_reviews(book_id).await?;
    Ok(Json(ApiResponse::ok(reviews)))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/:book_id", get(list_reviews).post(post_review))
}
