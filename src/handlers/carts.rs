use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    entities::book,
    errors::ServiceError,
    services::{CartView, CheckoutOutcome},
    ApiResponse, AppState,
};

use super::common::CustomerId;

#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    #[serde(flatten)]
    pub book: book::Model,
    pub effective_price: i64,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub order_id: Uuid,
    pub lines: Vec<CartLineResponse>,
    pub total: i64,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        Self {
            order_id: view.order_id,
            lines: view
                .lines
                .into_iter()
                .map(|line| CartLineResponse {
                    book: line.book,
                    effective_price: line.effective_price,
                })
                .collect(),
            total: view.total,
        }
    }
}

async fn view_cart(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state.services.carts.cart_view(customer_id).await?;
    Ok(Json(ApiResponse::ok(CartResponse::from(view))))
}

#[derive(Debug, Serialize)]
pub struct ToggleItemResponse {
    pub book_id: Uuid,
    pub in_cart: bool,
}

async fn toggle_item(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let in_cart = state
        .services
        .carts
        .toggle_item(customer_id, book_id)
        .await?;
    Ok(Json(ApiResponse::ok(ToggleItemResponse { book_id, in_cart })))
}

async fn start_checkout(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state.services.checkout.start_checkout(customer_id).await?;
    Ok(Json(ApiResponse::ok(serde_json::json!({
        "order_id": session.order_id,
        "payment_id": session.payment_id,
        "confirmation_url": session.confirmation_url,
        "amount": session.amount,
    }))))
}

/// Polls the gateway for the in-flight payment.
async fn confirm_checkout(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state
        .services
        .checkout
        .confirm_checkout(customer_id)
        .await?;
    let body = match outcome {
        CheckoutOutcome::Paid { order_id } => {
            serde_json::json!({ "status": "paid", "order_id": order_id })
        }
        CheckoutOutcome::Pending => serde_json::json!({ "status": "pending" }),
        CheckoutOutcome::Abandoned => serde_json::json!({ "status": "abandoned" }),
    };
    Ok(Json(ApiResponse::ok(body)))
}

async fn order_history(
    State(state): State<AppState>,
    CustomerId(customer_id): CustomerId,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.carts.order_history(customer_id).await?;
    Ok(Json(ApiResponse::ok(orders)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart))
        .route("/items/:book_id/toggle", post(toggle_item))
        .route("/checkout", post(start_checkout))
        .route("/payment", get(confirm_checkout))
        .route("/history", get(order_history))
}
