pub mod books;
pub mod campaigns;
pub mod carts;
pub mod common;
pub mod customers;
pub mod favorites;
pub mod health;
pub mod reviews;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    BookService, CartService, CatalogService, CheckoutService, CustomerService, DiscountService,
    FavoriteService, HttpPaymentProvider, PaymentProvider, ReviewService,
};
use std::sync::Arc;

pub use crate::AppState;

/// Service container handed to the HTTP handlers through [`AppState`].
#[derive(Clone)]
pub struct AppServices {
    pub books: BookService,
    pub catalog: CatalogService,
    pub discounts: DiscountService,
    pub reviews: ReviewService,
    pub favorites: FavoriteService,
    pub carts: CartService,
    pub customers: CustomerService,
    pub checkout: CheckoutService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let provider: Arc<dyn PaymentProvider> =
            Arc::new(HttpPaymentProvider::new(config.payment.clone()));
        Self::with_payment_provider(db, event_sender, config, provider)
    }

    /// Same wiring with the gateway swapped out, for tests.
    pub fn with_payment_provider(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        let carts = CartService::new(db.clone(), event_sender.clone());
        Self {
            books: BookService::new(db.clone(), event_sender.clone()),
            catalog: CatalogService::new(db.clone(), config.new_release_days),
            discounts: DiscountService::new(db.clone(), event_sender.clone()),
            reviews: ReviewService::new(db.clone(), event_sender.clone()),
            favorites: FavoriteService::new(db.clone(), event_sender.clone()),
            carts: carts.clone(),
            customers: CustomerService::new(db.clone()),
            checkout: CheckoutService::new(db, event_sender, carts, provider),
        }
    }
}
