use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    errors::ServiceError, services::RegisterCustomerInput, ApiResponse, AppState,
};

use super::{books::BookListItem, common::CustomerId};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state
        .services
        .customers
        .register(RegisterCustomerInput {
            email: payload.email,
            display_name: payload.display_name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(customer))))
}

async fn profile(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.get_customer(customer_id).await?;
    Ok(Json(ApiResponse::ok(customer)))
}

/// The customer's digital library: every book they have paid for.
async fn library(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
) -> Result<impl IntoResponse, ServiceError> {
    let books = state.services.customers.library(customer_id).await?;
    let items: Vec<BookListItem> = books.into_iter().map(BookListItem::from).collect();
    Ok(Json(ApiResponse::ok(items)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/me", get(profile))
        .route("/me/library", get(library))
}
