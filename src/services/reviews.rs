use crate::{
    entities::{book, review, Book, Review},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

pub(crate) mod rules {
    /// Integer mean of review scores, 0 for no reviews. Matches the cached
    /// `books.score` column, which floors rather than rounds.
    pub fn mean_score(scores: &[i16]) -> i16 {
        if scores.is_empty() {
            return 0;
        }
        let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
        (sum / scores.len() as i64) as i16
    }
}

#[derive(Debug, Clone, Validate)]
pub struct PostReviewInput {
    pub customer_id: Uuid,
    pub book_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub score: i16,
    #[validate(length(max = 4000))]
    pub comment: String,
}

/// Reviews plus maintenance of the book's cached score.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Posts a review and recomputes the book's cached score from all of its
    /// reviews. A customer reviewing the same book again replaces their
    /// earlier review.
    #[instrument(skip(self, input), fields(book_id = %input.book_id))]
    pub async fn post_review(&self, input: PostReviewInput) -> Result<review::Model, ServiceError> {
        input.validate()?;

        let book = Book::find_by_id(input.book_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Book {} not found", input.book_id)))?;

        let txn = self.db.begin().await?;

        let existing = Review::find()
            .filter(review::Column::BookId.eq(input.book_id))
            .filter(review::Column::CustomerId.eq(input.customer_id))
            .one(&txn)
            .await?;

        let saved = match existing {
            Some(previous) => {
                let mut model: review::ActiveModel = previous.into();
                model.score = Set(input.score);
                model.comment = Set(input.comment);
                model.created_at = Set(Utc::now());
                model.update(&txn).await?
            }
            None => {
                review::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(input.customer_id),
                    book_id: Set(input.book_id),
                    comment: Set(input.comment),
                    score: Set(input.score),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?
            }
        };

        let scores: Vec<i16> = Review::find()
            .filter(review::Column::BookId.eq(input.book_id))
            .select_only()
            .column(review::Column::Score)
            .into_tuple()
            .all(&txn)
            .await?;
        let score = rules::mean_score(&scores);

        let mut book_model: book::ActiveModel = book.into();
        book_model.score = Set(score);
        book_model.update(&txn).await?;

        txn.commit().await?;

        info!(book_id = %input.book_id, score, "review posted, book score recomputed");
        self.event_sender
            .send_or_log(Event::ReviewPosted {
                book_id: input.book_id,
                score: saved.score,
            })
            .await;
        Ok(saved)
    }

    pub async fn list_reviews(&self, book_id: Uuid) -> Result<Vec<review::Model>, ServiceError> {
        Review::find()
            .filter(review::Column::BookId.eq(book_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_score_is_integer_floor() {
        assert_eq!(rules::mean_score(&[5, 4]), 4);
        assert_eq!(rules::mean_score(&[5, 4, 4]), 4);
        assert_eq!(rules::mean_score(&[1, 2]), 1);
    }

    #[test]
    fn mean_score_empty_is_zero() {
        assert_eq!(rules::mean_score(&[]), 0);
    }

    #[test]
    fn mean_score_single_review() {
        assert_eq!(rules::mean_score(&[3]), 3);
    }

    #[test]
    fn input_rejects_score_out_of_range() {
        let mut input = PostReviewInput {
            customer_id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            score: 0,
            comment: String::new(),
        };
        assert!(input.validate().is_err());
        input.score = 6;
        assert!(input.validate().is_err());
        input.score = 5;
        assert!(input.validate().is_ok());
    }
}
