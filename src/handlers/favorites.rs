use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{errors::ServiceError, ApiResponse, AppState};

use super::{
    books::BookListItem,
    common::{CatalogQuery, CustomerId},
};

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub book_id: Uuid,
    pub favorited: bool,
}

async fn toggle_favorite(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let favorited = state
        .services
        .favorites
        .toggle(customer_id, book_id)
        .await?;
    Ok(Json(ApiResponse::ok(ToggleResponse { book_id, favorited })))
}

/// Favorites are a filterable listing like the rest of the catalog.
async fn list_favorites(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let filters = query.filters()?;
    let sort = query.sort_key()?;
    let books = state
        .services
        .catalog
        .favorites(customer_id, &filters, sort)
        .await?;
    let items: Vec<BookListItem> = books.into_iter().map(BookListItem::from).collect();
    Ok(Json(ApiResponse::ok(items)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_favorites))
        .route("/:book_id/toggle", post(toggle_favorite))
}
