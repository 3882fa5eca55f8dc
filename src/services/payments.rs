use crate::{
    config::PaymentConfig,
    entities::{book, order, purchase, Purchase},
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::carts::{cart_total, CartService};

/// A charge created at the gateway. The shopper finishes payment at
/// `confirmation_url`; we poll for the outcome afterwards.
#[derive(Debug, Clone)]
pub struct Charge {
    pub id: String,
    pub confirmation_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Pending,
    Succeeded,
    Canceled,
}

/// Payment gateway abstraction: create a redirect-style charge, then poll
/// its status. Swapped for a stub in tests.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_charge(&self, amount: i64, description: &str)
        -> Result<Charge, ServiceError>;
    async fn fetch_status(&self, payment_id: &str) -> Result<ChargeStatus, ServiceError>;
}

#[derive(Serialize)]
struct ChargeAmountBody {
    value: String,
    currency: String,
}

#[derive(Serialize)]
struct ChargeConfirmationBody {
    #[serde(rename = "type")]
    kind: String,
    return_url: String,
}

#[derive(Serialize)]
struct CreateChargeBody {
    amount: ChargeAmountBody,
    confirmation: ChargeConfirmationBody,
    capture: bool,
    description: String,
}

#[derive(Deserialize)]
struct ChargeConfirmationResponse {
    confirmation_url: String,
}

#[derive(Deserialize)]
struct ChargeResponse {
    id: String,
    status: String,
    confirmation: Option<ChargeConfirmationResponse>,
}

/// HTTP implementation against a redirect-confirmation payment gateway.
#[derive(Clone)]
pub struct HttpPaymentProvider {
    client: reqwest::Client,
    config: PaymentConfig,
}

impl HttpPaymentProvider {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Gateway amounts are decimal strings in major units.
    fn format_amount(amount: i64) -> String {
        format!("{}.{:02}", amount / 100, amount % 100)
    }

    fn parse_status(raw: &str) -> ChargeStatus {
        match raw {
            "succeeded" => ChargeStatus::Succeeded,
            "canceled" => ChargeStatus::Canceled,
            _ => ChargeStatus::Pending,
        }
    }
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    #[instrument(skip(self, description))]
    async fn create_charge(
        &self,
        amount: i64,
        description: &str,
    ) -> Result<Charge, ServiceError> {
        let body = CreateChargeBody {
            amount: ChargeAmountBody {
                value: Self::format_amount(amount),
                currency: self.config.currency.clone(),
            },
            confirmation: ChargeConfirmationBody {
                kind: "redirect".to_string(),
                return_url: self.config.return_url.clone(),
            },
            capture: true,
            description: description.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/payments", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("Idempotence-Key", Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<ChargeResponse>()
            .await?;

        let confirmation_url = response
            .confirmation
            .map(|c| c.confirmation_url)
            .ok_or_else(|| {
                ServiceError::PaymentFailed("Gateway returned no confirmation URL".to_string())
            })?;

        Ok(Charge {
            id: response.id,
            confirmation_url,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_status(&self, payment_id: &str) -> Result<ChargeStatus, ServiceError> {
        let response = self
            .client
            .get(format!("{}/payments/{}", self.config.base_url, payment_id))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?
            .error_for_status()?
            .json::<ChargeResponse>()
            .await?;

        Ok(Self::parse_status(&response.status))
    }
}

/// Result of polling an in-flight checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Payment confirmed; the order is closed and a fresh cart opened.
    Paid { order_id: Uuid },
    /// Gateway still waiting on the shopper.
    Pending,
    /// Charge canceled; the cart is unlocked for further edits.
    Abandoned,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub order_id: Uuid,
    pub payment_id: String,
    pub confirmation_url: String,
    pub amount: i64,
}

/// Drives a cart through payment: charge creation, status polling, and the
/// close-order bookkeeping on success.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    carts: CartService,
    provider: Arc<dyn PaymentProvider>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        carts: CartService,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            db,
            event_sender,
            carts,
            provider,
        }
    }

    /// Creates a gateway charge for the customer's open cart and locks the
    /// cart by recording the payment id on it.
    #[instrument(skip(self))]
    pub async fn start_checkout(
        &self,
        customer_id: Uuid,
    ) -> Result<CheckoutSession, ServiceError> {
        let cart = self.carts.open_cart(&*self.db, customer_id).await?;
        if cart.payment_id.is_some() {
            return Err(ServiceError::InvalidOperation(
                "A payment for this cart is already in flight".to_string(),
            ));
        }

        let books = self.carts.cart_books(&*self.db, &cart).await?;
        if books.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "Cannot check out an empty cart".to_string(),
            ));
        }

        // Effective prices at the moment of checkout; later discount changes
        // do not reprice an order already sent to the gateway.
        let amount = cart_total(&books);
        let description = format!("Order {} ({} books)", cart.id, books.len());
        let charge = self.provider.create_charge(amount, &description).await?;

        let order_id = cart.id;
        let mut model: order::ActiveModel = cart.into();
        model.payment_id = Set(Some(charge.id.clone()));
        model.amount = Set(amount);
        model.update(&*self.db).await?;

        info!(%order_id, amount, "checkout started");
        self.event_sender
            .send_or_log(Event::CheckoutStarted { order_id, amount })
            .await;

        Ok(CheckoutSession {
            order_id,
            payment_id: charge.id,
            confirmation_url: charge.confirmation_url,
            amount,
        })
    }

    /// Polls the gateway for the in-flight payment and settles the order
    /// accordingly.
    #[instrument(skip(self))]
    pub async fn confirm_checkout(
        &self,
        customer_id: Uuid,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let cart = self.carts.open_cart(&*self.db, customer_id).await?;
        let payment_id = cart.payment_id.clone().ok_or_else(|| {
            ServiceError::InvalidOperation("No payment in flight for this cart".to_string())
        })?;

        match self.provider.fetch_status(&payment_id).await? {
            ChargeStatus::Pending => Ok(CheckoutOutcome::Pending),
            ChargeStatus::Succeeded => {
                let order_id = self.settle_paid_order(customer_id, cart).await?;
                self.event_sender
                    .send_or_log(Event::OrderPaid(order_id))
                    .await;
                Ok(CheckoutOutcome::Paid { order_id })
            }
            ChargeStatus::Canceled => {
                let order_id = cart.id;
                let mut model: order::ActiveModel = cart.into();
                model.payment_id = Set(None);
                model.amount = Set(0);
                model.update(&*self.db).await?;

                warn!(%order_id, "payment canceled, cart unlocked");
                self.event_sender
                    .send_or_log(Event::PaymentAbandoned(order_id))
                    .await;
                Ok(CheckoutOutcome::Abandoned)
            }
        }
    }

    /// Closes the paid order, files its books into the customer's library,
    /// bumps purchase counts and opens a fresh cart.
    async fn settle_paid_order(
        &self,
        customer_id: Uuid,
        cart: order::Model,
    ) -> Result<Uuid, ServiceError> {
        let txn = self.db.begin().await?;

        let books = self.carts.cart_books(&txn, &cart).await?;
        let order_id = cart.id;

        let mut model: order::ActiveModel = cart.into();
        model.closed = Set(true);
        model.closed_at = Set(Some(Utc::now().date_naive()));
        model.update(&txn).await?;

        for book in books {
            let owned = Purchase::find_by_id((customer_id, book.id))
                .one(&txn)
                .await?
                .is_some();
            if !owned {
                purchase::ActiveModel {
                    customer_id: Set(customer_id),
                    book_id: Set(book.id),
                    purchased_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?;
            }

            let purchase_count = book.purchase_count + 1;
            let mut book_model: book::ActiveModel = book.into();
            book_model.purchase_count = Set(purchase_count);
            book_model.update(&txn).await?;
        }

        // The next cart starts empty.
        order::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            amount: Set(0),
            payment_id: Set(None),
            closed: Set(false),
            closed_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(%order_id, "order settled");
        Ok(order_id)
    }
}
