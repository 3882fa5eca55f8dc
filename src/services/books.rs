use crate::{
    entities::{
        book, book_file, book_genre, genre, review, Book, BookFile, BookGenre, FileFormat, Genre,
        Review,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Validate)]
pub struct CreateBookInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub author: String,
    pub description: String,
    pub main_image_url: Option<String>,
    /// List price in the smallest currency unit.
    #[validate(range(min = 0))]
    pub price: i64,
    pub released: NaiveDate,
    pub genre_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateBookInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub author: Option<String>,
    pub description: Option<String>,
    pub main_image_url: Option<String>,
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    pub released: Option<NaiveDate>,
}

/// Book with its associated rows, for the detail page.
#[derive(Debug, Clone)]
pub struct BookDetail {
    pub book: book::Model,
    pub genres: Vec<genre::Model>,
    pub reviews: Vec<review::Model>,
    pub files: Vec<book_file::Model>,
}

/// CRUD over books, genres and downloadable files. Discounts and the cached
/// score are maintained elsewhere and deliberately not writable here.
#[derive(Clone)]
pub struct BookService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl BookService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_book(&self, input: CreateBookInput) -> Result<book::Model, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let model = book::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            author: Set(input.author),
            description: Set(input.description),
            main_image_url: Set(input.main_image_url),
            price: Set(input.price),
            discount: Set(0),
            purchase_count: Set(0),
            score: Set(0),
            released: Set(input.released),
            created: Set(Utc::now().date_naive()),
        };
        let saved = model.insert(&txn).await?;

        for genre_id in input.genre_ids {
            self.ensure_genre_exists(&txn, genre_id).await?;
            book_genre::ActiveModel {
                book_id: Set(saved.id),
                genre_id: Set(genre_id),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(book_id = %saved.id, "book created");
        self.event_sender
            .send_or_log(Event::BookCreated(saved.id))
            .await;
        Ok(saved)
    }

    #[instrument(skip(self, input))]
    pub async fn update_book(
        &self,
        book_id: Uuid,
        input: UpdateBookInput,
    ) -> Result<book::Model, ServiceError> {
        input.validate()?;

        let existing = self.get_book(book_id).await?;
        let mut model: book::ActiveModel = existing.into();

        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(author) = input.author {
            model.author = Set(author);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(url) = input.main_image_url {
            model.main_image_url = Set(Some(url));
        }
        if let Some(price) = input.price {
            model.price = Set(price);
        }
        if let Some(released) = input.released {
            model.released = Set(released);
        }

        let updated = model.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::BookUpdated(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_book(&self, book_id: Uuid) -> Result<(), ServiceError> {
        let book = self.get_book(book_id).await?;
        book.delete(&*self.db).await?;

        info!(%book_id, "book deleted");
        self.event_sender
            .send_or_log(Event::BookDeleted(book_id))
            .await;
        Ok(())
    }

    pub async fn get_book(&self, book_id: Uuid) -> Result<book::Model, ServiceError> {
        Book::find_by_id(book_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Book {} not found", book_id)))
    }

    /// Book plus genres, reviews and files for the detail page.
    #[instrument(skip(self))]
    pub async fn get_book_detail(&self, book_id: Uuid) -> Result<BookDetail, ServiceError> {
        let book = self.get_book(book_id).await?;

        let genres = book
            .find_related(BookGenre)
            .find_also_related(Genre)
            .all(&*self.db)
            .await?
            .into_iter()
            .filter_map(|(_, g)| g)
            .collect();

        let reviews = book
            .find_related(Review)
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let files = book.find_related(BookFile).all(&*self.db).await?;

        Ok(BookDetail {
            book,
            genres,
            reviews,
            files,
        })
    }

    /// Replaces the book's genre set.
    #[instrument(skip(self, genre_ids))]
    pub async fn set_genres(
        &self,
        book_id: Uuid,
        genre_ids: Vec<Uuid>,
    ) -> Result<(), ServiceError> {
        self.get_book(book_id).await?;

        let txn = self.db.begin().await?;
        BookGenre::delete_many()
            .filter(book_genre::Column::BookId.eq(book_id))
            .exec(&txn)
            .await?;
        for genre_id in genre_ids {
            self.ensure_genre_exists(&txn, genre_id).await?;
            book_genre::ActiveModel {
                book_id: Set(book_id),
                genre_id: Set(genre_id),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_genre(&self, name: String) -> Result<genre::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Genre name must not be empty".to_string(),
            ));
        }
        genre::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
        }
        .insert(&*self.db)
        .await
        .map_err(Into::into)
    }

    pub async fn list_genres(&self) -> Result<Vec<genre::Model>, ServiceError> {
        Genre::find()
            .order_by_asc(genre::Column::Name)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Registers a downloadable rendition. The blob itself lives in external
    /// storage; only its key is recorded.
    #[instrument(skip(self, object_key))]
    pub async fn add_file(
        &self,
        book_id: Uuid,
        format: &str,
        object_key: String,
    ) -> Result<book_file::Model, ServiceError> {
        let format = FileFormat::parse(format).ok_or_else(|| {
            ServiceError::ValidationError(format!("Unsupported file format: {}", format))
        })?;
        self.get_book(book_id).await?;

        book_file::ActiveModel {
            id: Set(Uuid::new_v4()),
            book_id: Set(book_id),
            format: Set(format),
            object_key: Set(object_key),
        }
        .insert(&*self.db)
        .await
        .map_err(Into::into)
    }

    async fn ensure_genre_exists(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        genre_id: Uuid,
    ) -> Result<(), ServiceError> {
        Genre::find_by_id(genre_id)
            .one(txn)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("Genre {} not found", genre_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_input_rejects_empty_name() {
        let input = CreateBookInput {
            name: String::new(),
            author: "Author".to_string(),
            description: String::new(),
            main_image_url: None,
            price: 1000,
            released: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            genre_ids: vec![],
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn create_input_rejects_negative_price() {
        let input = CreateBookInput {
            name: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            description: String::new(),
            main_image_url: None,
            price: -1,
            released: NaiveDate::from_ymd_opt(1965, 8, 1).unwrap(),
            genre_ids: vec![],
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn update_input_allows_partial_updates() {
        let input = UpdateBookInput {
            price: Some(1500),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }
}
