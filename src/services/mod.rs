//! Service layer: one service per storefront concern, each holding a shared
//! database handle and the event sender.

pub mod books;
pub mod carts;
pub mod catalog;
pub mod customers;
pub mod discounts;
pub mod favorites;
pub mod payments;
pub mod reviews;

pub use books::{BookDetail, BookService, CreateBookInput, UpdateBookInput};
pub use carts::{CartLine, CartService, CartView};
pub use catalog::{CatalogFilters, CatalogService, HomePage, SortField, SortKey};
pub use customers::{CustomerService, RegisterCustomerInput};
pub use discounts::{CampaignTargets, CreateCampaignInput, DiscountService};
pub use favorites::FavoriteService;
pub use payments::{
    Charge, ChargeStatus, CheckoutOutcome, CheckoutService, CheckoutSession, HttpPaymentProvider,
    PaymentProvider,
};
pub use reviews::{PostReviewInput, ReviewService};
