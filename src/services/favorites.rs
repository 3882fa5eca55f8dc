use crate::{
    entities::{favorite, Book, Favorite},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Favorite toggling. Listing favorites is a catalog query and lives with
/// the other listings in `CatalogService`.
#[derive(Clone)]
pub struct FavoriteService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl FavoriteService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Adds the book to the customer's favorites, or removes it if already
    /// there. Returns whether the book is favorited after the call.
    #[instrument(skip(self))]
    pub async fn toggle(&self, customer_id: Uuid, book_id: Uuid) -> Result<bool, ServiceError> {
        Book::find_by_id(book_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Book {} not found", book_id)))?;

        let existing = Favorite::find_by_id((customer_id, book_id))
            .one(&*self.db)
            .await?;

        let favorited = match existing {
            Some(row) => {
                row.delete(&*self.db).await?;
                false
            }
            None => {
                favorite::ActiveModel {
                    customer_id: Set(customer_id),
                    book_id: Set(book_id),
                    created_at: Set(Utc::now()),
                }
                .insert(&*self.db)
                .await?;
                true
            }
        };

        info!(%customer_id, %book_id, favorited, "favorite toggled");
        self.event_sender
            .send_or_log(Event::FavoriteToggled {
                customer_id,
                book_id,
                favorited,
            })
            .await;
        Ok(favorited)
    }

    /// Whether the customer has favorited the book.
    pub async fn is_favorited(
        &self,
        customer_id: Uuid,
        book_id: Uuid,
    ) -> Result<bool, ServiceError> {
        Ok(Favorite::find_by_id((customer_id, book_id))
            .one(&*self.db)
            .await?
            .is_some())
    }
}
