use crate::{
    entities::{book, order, order_item, Book, Order, OrderItem},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Cart total: sum of effective (post-discount) prices, one unit per title.
pub(crate) fn cart_total(books: &[book::Model]) -> i64 {
    books.iter().map(book::Model::effective_price).sum()
}

/// A cart line: the book together with the price it would sell for now.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub book: book::Model,
    pub effective_price: i64,
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub order_id: Uuid,
    pub lines: Vec<CartLine>,
    pub total: i64,
}

/// The cart is the customer's single open order. It is created lazily and a
/// fresh one is opened when checkout closes the previous one.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Finds the customer's open order, creating one if absent.
    pub async fn open_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        customer_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let existing = Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .filter(order::Column::Closed.eq(false))
            .one(conn)
            .await?;
        if let Some(cart) = existing {
            return Ok(cart);
        }

        order::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            amount: Set(0),
            payment_id: Set(None),
            closed: Set(false),
            closed_at: Set(None),
        }
        .insert(conn)
        .await
        .map_err(Into::into)
    }

    /// Cart contents with per-line effective prices and the total.
    #[instrument(skip(self))]
    pub async fn cart_view(&self, customer_id: Uuid) -> Result<CartView, ServiceError> {
        let cart = self.open_cart(&*self.db, customer_id).await?;
        let books = self.cart_books(&*self.db, &cart).await?;

        let total = cart_total(&books);
        let lines = books
            .into_iter()
            .map(|b| CartLine {
                effective_price: b.effective_price(),
                book: b,
            })
            .collect();

        Ok(CartView {
            order_id: cart.id,
            lines,
            total,
        })
    }

    /// Adds the book to the cart, or removes it if already there. Returns
    /// whether the book is in the cart after the call.
    #[instrument(skip(self))]
    pub async fn toggle_item(
        &self,
        customer_id: Uuid,
        book_id: Uuid,
    ) -> Result<bool, ServiceError> {
        Book::find_by_id(book_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Book {} not found", book_id)))?;

        let txn = self.db.begin().await?;
        let cart = self.open_cart(&txn, customer_id).await?;

        if cart.payment_id.is_some() {
            return Err(ServiceError::InvalidOperation(
                "Cart is locked while a payment is in flight".to_string(),
            ));
        }

        let existing = OrderItem::find_by_id((cart.id, book_id)).one(&txn).await?;
        let in_cart = match existing {
            Some(row) => {
                row.delete(&txn).await?;
                false
            }
            None => {
                order_item::ActiveModel {
                    order_id: Set(cart.id),
                    book_id: Set(book_id),
                    added_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?;
                true
            }
        };
        txn.commit().await?;

        info!(%customer_id, %book_id, in_cart, "cart item toggled");
        self.event_sender
            .send_or_log(Event::CartItemToggled {
                order_id: cart.id,
                book_id,
                in_cart,
            })
            .await;
        Ok(in_cart)
    }

    /// Whether the book is in the customer's open cart.
    pub async fn contains(&self, customer_id: Uuid, book_id: Uuid) -> Result<bool, ServiceError> {
        let cart = self.open_cart(&*self.db, customer_id).await?;
        Ok(OrderItem::find_by_id((cart.id, book_id))
            .one(&*self.db)
            .await?
            .is_some())
    }

    /// Past orders, most recently closed first.
    pub async fn order_history(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<order::Model>, ServiceError> {
        Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .filter(order::Column::Closed.eq(true))
            .order_by_desc(order::Column::ClosedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    pub(crate) async fn cart_books<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart: &order::Model,
    ) -> Result<Vec<book::Model>, ServiceError> {
        let books = cart
            .find_related(OrderItem)
            .find_also_related(Book)
            .order_by_asc(order_item::Column::AddedAt)
            .all(conn)
            .await?
            .into_iter()
            .filter_map(|(_, b)| b)
            .collect();
        Ok(books)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn priced_book(price: i64, discount: i16) -> book::Model {
        book::Model {
            id: Uuid::new_v4(),
            name: "Book".to_string(),
            author: "Author".to_string(),
            description: String::new(),
            main_image_url: None,
            price,
            discount,
            purchase_count: 0,
            score: 0,
            released: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            created: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn total_sums_effective_prices() {
        let books = vec![priced_book(1000, 0), priced_book(1000, 25), priced_book(999, 33)];
        assert_eq!(cart_total(&books), 1000 + 750 + 669);
    }

    #[test]
    fn total_of_empty_cart_is_zero() {
        assert_eq!(cart_total(&[]), 0);
    }
}
