use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entities::{book, book_file, book_file::FileFormat, genre, review},
    errors::ServiceError,
    services::{CreateBookInput, UpdateBookInput},
    ApiResponse, AppState,
};

use super::common::{CatalogQuery, CustomerId};

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub name: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub main_image_url: Option<String>,
    pub price: i64,
    pub released: NaiveDate,
    #[serde(default)]
    pub genre_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookRequest {
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub main_image_url: Option<String>,
    pub price: Option<i64>,
    pub released: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct BookListItem {
    #[serde(flatten)]
    pub book: book::Model,
    pub effective_price: i64,
}

impl From<book::Model> for BookListItem {
    fn from(book: book::Model) -> Self {
        Self {
            effective_price: book.effective_price(),
            book,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookDetailResponse {
    #[serde(flatten)]
    pub book: book::Model,
    pub effective_price: i64,
    pub genres: Vec<genre::Model>,
    pub reviews: Vec<review::Model>,
    pub files: Vec<book_file::Model>,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub popular: Vec<BookListItem>,
    pub new_releases: Vec<BookListItem>,
    pub recommended: Vec<BookListItem>,
}

fn list_items(books: Vec<book::Model>) -> Vec<BookListItem> {
    books.into_iter().map(BookListItem::from).collect()
}

async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let filters = query.filters()?;
    let sort = query.sort_key()?;
    let books = state.services.catalog.catalog(&filters, sort).await?;
    Ok(Json(ApiResponse::ok(list_items(books))))
}

async fn new_releases(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let filters = query.filters()?;
    let sort = query.sort_key()?;
    let books = state.services.catalog.new_releases(&filters, sort).await?;
    Ok(Json(ApiResponse::ok(list_items(books))))
}

async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let word = query
        .search
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ServiceError::ValidationError("search requires a non-empty `search` parameter".into())
        })?;
    let filters = query.filters()?;
    let sort = query.sort_key()?;
    let books = state.services.catalog.search(&word, &filters, sort).await?;
    Ok(Json(ApiResponse::ok(list_items(books))))
}

async fn home(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let page = state.services.catalog.home().await?;
    Ok(Json(ApiResponse::ok(HomeResponse {
        popular: list_items(page.popular),
        new_releases: list_items(page.new_releases),
        recommended: list_items(page.recommended),
    })))
}

async fn get_book(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.services.books.get_book_detail(book_id).await?;
    Ok(Json(ApiResponse::ok(BookDetailResponse {
        effective_price: detail.book.effective_price(),
        book: detail.book,
        genres: detail.genres,
        reviews: detail.reviews,
        files: detail.files,
    })))
}

async fn create_book(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let book = state
        .services
        .books
        .create_book(CreateBookInput {
            name: payload.name,
            author: payload.author,
            description: payload.description,
            main_image_url: payload.main_image_url,
            price: payload.price,
            released: payload.released,
            genre_ids: payload.genre_ids,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(book))))
}

async fn update_book(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
    Json(payload): Json<UpdateBookRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let book = state
        .services
        .books
        .update_book(
            book_id,
            UpdateBookInput {
                name: payload.name,
                author: payload.author,
                description: payload.description,
                main_image_url: payload.main_image_url,
                price: payload.price,
                released: payload.released,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(book)))
}

async fn delete_book(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.books.delete_book(book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SetGenresRequest {
    pub genre_ids: Vec<Uuid>,
}

async fn set_genres(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
    Json(payload): Json<SetGenresRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .books
        .set_genres(book_id, payload.genre_ids)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AddFileRequest {
    pub format: String,
    pub object_key: String,
}

async fn add_file(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
    Json(payload): Json<AddFileRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let file = state
        .services
        .books
        .add_file(book_id, &payload.format, payload.object_key)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(file))))
}

/// File listing for a purchased book; ownership gates the download keys.
async fn list_files(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    if !state.services.customers.owns(customer_id, book_id).await? {
        return Err(ServiceError::NotFound(
            "Book is not in your library".to_string(),
        ));
    }
    let detail = state.services.books.get_book_detail(book_id).await?;
    Ok(Json(ApiResponse::ok(detail.files)))
}

/// Resolves a single download by format. An unowned book and a missing
/// rendition both read as absent.
async fn get_file(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Path((book_id, format)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let format = FileFormat::parse(&format).ok_or_else(|| {
        ServiceError::NotFound(format!("Book {} has no {} file", book_id, format))
    })?;
    let file = state
        .services
        .customers
        .library_file(customer_id, book_id, format)
        .await?;
    Ok(Json(ApiResponse::ok(file)))
}

#[derive(Debug, Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
}

async fn create_genre(
    State(state): State<AppState>,
    Json(payload): Json<CreateGenreRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let genre = state.services.books.create_genre(payload.name).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(genre))))
}

async fn list_genres(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let genres = state.services.books.list_genres().await?;
    Ok(Json(ApiResponse::ok(genres)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/home", get(home))
        .route("/new", get(new_releases))
        .route("/search", get(search_books))
        .route(
            "/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/:id/genres", post(set_genres))
        .route("/:id/files", get(list_files).post(add_file))
        .route("/:id/files/:format", get(get_file))
        .route("/genres", get(list_genres).post(create_genre))
}
