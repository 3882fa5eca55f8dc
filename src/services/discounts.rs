use crate::{
    entities::{
        book, campaign, campaign_book, campaign_genre, book_genre,
        Book, Campaign, CampaignBook, CampaignGenre, TargetMode,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QuerySelect, Select, Set, TransactionTrait,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Pure discount rules, kept separate from the persistence plumbing.
pub mod rules {
    /// Monotonic raise applied when a book is associated with a campaign:
    /// the stored discount only ever goes up at association time.
    pub fn raise(current: i16, campaign: i16) -> i16 {
        current.max(campaign)
    }

    /// Exact maximum over the campaigns still covering a book after one is
    /// deleted; 0 when none remain. The original storefront short-circuited
    /// this scan, which is only sound as an optimization with identical
    /// results, so the exact maximum is computed here.
    pub fn exact_max(remaining: &[i16]) -> i16 {
        remaining.iter().copied().max().unwrap_or(0)
    }

    /// A discount outside 0..=100 means validation failed upstream. Fatal in
    /// debug builds, clamped in release.
    pub fn clamp(discount: i16) -> i16 {
        debug_assert!(
            (0..=100).contains(&discount),
            "discount {} outside 0..=100",
            discount
        );
        discount.clamp(0, 100)
    }
}

/// The covered set of a campaign as a tagged variant: an explicit book list,
/// the union of the selected genres' books, or the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignTargets {
    Books(Vec<Uuid>),
    Genres(Vec<Uuid>),
    AllBooks,
}

impl CampaignTargets {
    /// Loads the target definition for a campaign from its association rows.
    pub async fn load<C: ConnectionTrait>(
        db: &C,
        campaign: &campaign::Model,
    ) -> Result<Self, ServiceError> {
        match campaign.target_mode {
            TargetMode::Books => {
                let books: Vec<Uuid> = CampaignBook::find()
                    .filter(campaign_book::Column::CampaignId.eq(campaign.id))
                    .select_only()
                    .column(campaign_book::Column::BookId)
                    .into_tuple()
                    .all(db)
                    .await?;
                Ok(Self::Books(books))
            }
            TargetMode::Genres => {
                let genres: Vec<Uuid> = CampaignGenre::find()
                    .filter(campaign_genre::Column::CampaignId.eq(campaign.id))
                    .select_only()
                    .column(campaign_genre::Column::GenreId)
                    .into_tuple()
                    .all(db)
                    .await?;
                Ok(Self::Genres(genres))
            }
            TargetMode::AllBooks => Ok(Self::AllBooks),
        }
    }

    /// Resolves the concrete set of covered book ids. Genre and all-books
    /// targets resolve against live membership.
    pub async fn resolve<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Uuid>, ServiceError> {
        match self {
            Self::Books(ids) => Ok(ids.clone()),
            Self::Genres(genre_ids) => {
                if genre_ids.is_empty() {
                    return Ok(Vec::new());
                }
                let members: Vec<Uuid> = book_genre::Entity::find()
                    .filter(book_genre::Column::GenreId.is_in(genre_ids.iter().copied()))
                    .select_only()
                    .column(book_genre::Column::BookId)
                    .into_tuple()
                    .all(db)
                    .await?;
                // Union: a book in several selected genres counts once.
                let unique: BTreeSet<Uuid> = members.into_iter().collect();
                Ok(unique.into_iter().collect())
            }
            Self::AllBooks => {
                let all: Vec<Uuid> = Book::find()
                    .select_only()
                    .column(book::Column::Id)
                    .into_tuple()
                    .all(db)
                    .await?;
                Ok(all)
            }
        }
    }
}

/// Input for creating a campaign. Exactly one of `book_ids`/`genre_ids` is
/// meaningful, matching `target_mode`.
#[derive(Debug, Clone)]
pub struct CreateCampaignInput {
    pub name: String,
    pub target_mode: TargetMode,
    pub discount_percent: i16,
    pub book_ids: Vec<Uuid>,
    pub genre_ids: Vec<Uuid>,
}

/// Maintains the invariant that every book's cached discount equals the
/// maximum discount among the campaigns currently covering it.
#[derive(Clone)]
pub struct DiscountService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl DiscountService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a campaign, persist its target associations and push the
    /// discount onto every covered book.
    #[instrument(skip(self, input))]
    pub async fn create_campaign(
        &self,
        input: CreateCampaignInput,
    ) -> Result<campaign::Model, ServiceError> {
        ensure_percent(input.discount_percent)?;

        let campaign = campaign::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.clone()),
            target_mode: Set(input.target_mode),
            discount_percent: Set(input.discount_percent),
            created_at: Set(Utc::now()),
        };
        let campaign = campaign.insert(&*self.db).await?;

        match campaign.target_mode {
            TargetMode::Books => {
                self.add_book_targets(&campaign, &input.book_ids).await?;
            }
            TargetMode::Genres => {
                self.add_genre_targets(&campaign, &input.genre_ids).await?;
            }
            TargetMode::AllBooks => {
                let covered = CampaignTargets::AllBooks.resolve(&*self.db).await?;
                self.apply_campaign(&campaign, &covered).await?;
            }
        }

        self.event_sender
            .send_or_log(Event::CampaignCreated(campaign.id))
            .await;
        info!("Created campaign: {}", campaign.id);
        Ok(campaign)
    }

    /// Incrementally associate books with a `Books`-mode campaign and raise
    /// their discounts. Already-associated books are skipped.
    #[instrument(skip(self, book_ids))]
    pub async fn add_book_targets(
        &self,
        campaign: &campaign::Model,
        book_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, ServiceError> {
        if campaign.target_mode != TargetMode::Books {
            return Err(ServiceError::InvalidOperation(format!(
                "Campaign {} does not target individual books",
                campaign.id
            )));
        }

        let existing: Vec<Uuid> = CampaignBook::find()
            .filter(campaign_book::Column::CampaignId.eq(campaign.id))
            .select_only()
            .column(campaign_book::Column::BookId)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let existing: BTreeSet<Uuid> = existing.into_iter().collect();

        let newly_added: Vec<Uuid> = book_ids
            .iter()
            .copied()
            .filter(|id| !existing.contains(id))
            .collect();
        if newly_added.is_empty() {
            return Ok(newly_added);
        }

        CampaignBook::insert_many(newly_added.iter().map(|book_id| {
            campaign_book::ActiveModel {
                campaign_id: Set(campaign.id),
                book_id: Set(*book_id),
            }
        }))
        .exec(&*self.db)
        .await?;

        self.apply_campaign(campaign, &newly_added).await?;

        self.event_sender
            .send_or_log(Event::CampaignTargetsAdded {
                campaign_id: campaign.id,
                books_added: newly_added.len(),
            })
            .await;
        Ok(newly_added)
    }

    /// Incrementally associate genres with a `Genres`-mode campaign; every
    /// book in the newly added genres gets the raise.
    #[instrument(skip(self, genre_ids))]
    pub async fn add_genre_targets(
        &self,
        campaign: &campaign::Model,
        genre_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, ServiceError> {
        if campaign.target_mode != TargetMode::Genres {
            return Err(ServiceError::InvalidOperation(format!(
                "Campaign {} does not target genres",
                campaign.id
            )));
        }

        let existing: Vec<Uuid> = CampaignGenre::find()
            .filter(campaign_genre::Column::CampaignId.eq(campaign.id))
            .select_only()
            .column(campaign_genre::Column::GenreId)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let existing: BTreeSet<Uuid> = existing.into_iter().collect();

        let new_genres: Vec<Uuid> = genre_ids
            .iter()
            .copied()
            .filter(|id| !existing.contains(id))
            .collect();
        if new_genres.is_empty() {
            return Ok(Vec::new());
        }

        CampaignGenre::insert_many(new_genres.iter().map(|genre_id| {
            campaign_genre::ActiveModel {
                campaign_id: Set(campaign.id),
                genre_id: Set(*genre_id),
            }
        }))
        .exec(&*self.db)
        .await?;

        let covered = CampaignTargets::Genres(new_genres)
            .resolve(&*self.db)
            .await?;
        self.apply_campaign(campaign, &covered).await?;

        self.event_sender
            .send_or_log(Event::CampaignTargetsAdded {
                campaign_id: campaign.id,
                books_added: covered.len(),
            })
            .await;
        Ok(covered)
    }

    /// Push a campaign's discount onto newly associated books: each stored
    /// discount is raised to the campaign's percent when that is higher,
    /// otherwise left alone. Pure state mutation, no error conditions beyond
    /// a missing book.
    #[instrument(skip(self, newly_added))]
    pub async fn apply_campaign(
        &self,
        campaign: &campaign::Model,
        newly_added: &[Uuid],
    ) -> Result<(), ServiceError> {
        let percent = rules::clamp(campaign.discount_percent);
        let txn = self.db.begin().await?;
        let mut raised = Vec::new();

        for book_id in newly_added {
            let book = Book::find_by_id(*book_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Book {} not found", book_id)))?;

            let new_discount = rules::raise(book.discount, percent);
            if new_discount == book.discount {
                continue;
            }
            let mut active: book::ActiveModel = book.into();
            active.discount = Set(new_discount);
            active.update(&txn).await?;
            raised.push((*book_id, new_discount));
        }

        txn.commit().await?;

        for (book_id, discount) in raised {
            self.event_sender
                .send_or_log(Event::DiscountRaised { book_id, discount })
                .await;
        }
        Ok(())
    }

    /// Delete a campaign. Every book it covered has its discount recomputed
    /// as the exact maximum over the campaigns still covering it (0 when none
    /// remain) before the campaign row and its associations are purged.
    #[instrument(skip(self))]
    pub async fn remove_campaign(&self, campaign_id: Uuid) -> Result<(), ServiceError> {
        let campaign = Campaign::find_by_id(campaign_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Campaign {} not found", campaign_id))
            })?;

        let txn = self.db.begin().await?;

        // The campaign's own associations are still resolvable here.
        let targets = CampaignTargets::load(&txn, &campaign).await?;
        let covered = targets.resolve(&txn).await?;

        for book_id in &covered {
            let remaining = self.covering_discounts(&txn, *book_id, campaign.id).await?;
            let new_discount = rules::exact_max(&remaining);

            let book = Book::find_by_id(*book_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Book {} not found", book_id)))?;
            if book.discount != new_discount {
                let mut active: book::ActiveModel = book.into();
                active.discount = Set(new_discount);
                active.update(&txn).await?;
            }
        }

        // Association rows go with the campaign (FK cascade).
        Campaign::delete_by_id(campaign.id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CampaignDeleted {
                campaign_id: campaign.id,
                books_recomputed: covered.len(),
            })
            .await;
        info!("Removed campaign: {}", campaign.id);
        Ok(())
    }

    /// Get a campaign by id.
    pub async fn get_campaign(&self, campaign_id: Uuid) -> Result<campaign::Model, ServiceError> {
        Campaign::find_by_id(campaign_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Campaign {} not found", campaign_id)))
    }

    /// List all campaigns.
    pub async fn list_campaigns(&self) -> Result<Vec<campaign::Model>, ServiceError> {
        Campaign::find().all(&*self.db).await.map_err(Into::into)
    }

    /// Discount percents of every campaign other than `exclude` that covers
    /// `book_id` through any target mode, re-resolved live.
    async fn covering_discounts<C: ConnectionTrait>(
        &self,
        db: &C,
        book_id: Uuid,
        exclude: Uuid,
    ) -> Result<Vec<i16>, ServiceError> {
        covering_campaigns_query(book_id, exclude)
            .select_only()
            .column(campaign::Column::DiscountPercent)
            .into_tuple()
            .all(db)
            .await
            .map_err(Into::into)
    }
}

/// Campaigns other than `exclude` covering `book_id`: all-books campaigns,
/// books-mode campaigns with a direct association row, and genres-mode
/// campaigns sharing a genre with the book.
pub(crate) fn covering_campaigns_query(book_id: Uuid, exclude: Uuid) -> Select<campaign::Entity> {
    let direct = Query::select()
        .column(campaign_book::Column::CampaignId)
        .from(campaign_book::Entity)
        .and_where(Expr::col(campaign_book::Column::BookId).eq(book_id))
        .to_owned();

    let book_genres = Query::select()
        .column(book_genre::Column::GenreId)
        .from(book_genre::Entity)
        .and_where(Expr::col(book_genre::Column::BookId).eq(book_id))
        .to_owned();
    let via_genres = Query::select()
        .column(campaign_genre::Column::CampaignId)
        .from(campaign_genre::Entity)
        .and_where(Expr::col(campaign_genre::Column::GenreId).in_subquery(book_genres))
        .to_owned();

    Campaign::find()
        .filter(campaign::Column::Id.ne(exclude))
        .filter(
            Condition::any()
                .add(campaign::Column::TargetMode.eq(TargetMode::AllBooks))
                .add(
                    Condition::all()
                        .add(campaign::Column::TargetMode.eq(TargetMode::Books))
                        .add(campaign::Column::Id.in_subquery(direct)),
                )
                .add(
                    Condition::all()
                        .add(campaign::Column::TargetMode.eq(TargetMode::Genres))
                        .add(campaign::Column::Id.in_subquery(via_genres)),
                ),
        )
}

fn ensure_percent(discount: i16) -> Result<(), ServiceError> {
    if !(0..=100).contains(&discount) {
        return Err(ServiceError::ValidationError(format!(
            "Discount percent {} outside 0..=100",
            discount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    // ==================== Raise Rule Tests ====================

    #[test]
    fn raise_takes_higher_campaign() {
        assert_eq!(rules::raise(10, 30), 30);
    }

    #[test]
    fn raise_keeps_higher_current() {
        assert_eq!(rules::raise(50, 30), 50);
    }

    #[test]
    fn raise_from_zero() {
        assert_eq!(rules::raise(0, 15), 15);
    }

    #[test]
    fn applying_campaigns_is_order_independent() {
        let campaigns = [15_i16, 40, 25, 40, 5];

        let forward = campaigns.iter().fold(0, |d, c| rules::raise(d, *c));
        let backward = campaigns.iter().rev().fold(0, |d, c| rules::raise(d, *c));

        assert_eq!(forward, 40);
        assert_eq!(forward, backward);
    }

    // ==================== Removal Rule Tests ====================

    #[test]
    fn removal_with_equal_remaining_keeps_discount() {
        // Deleted campaign had 30; a remaining campaign also grants 30.
        let remaining = [30_i16, 10];
        assert_eq!(rules::exact_max(&remaining), 30);
    }

    #[test]
    fn removal_falls_back_to_next_highest() {
        // Unique maximal campaign (50) deleted; 35 remains.
        let remaining = [35_i16, 20];
        assert_eq!(rules::exact_max(&remaining), 35);
    }

    #[test]
    fn removal_with_no_remaining_resets_to_zero() {
        assert_eq!(rules::exact_max(&[]), 0);
    }

    #[test]
    fn clamp_passes_valid_range() {
        assert_eq!(rules::clamp(0), 0);
        assert_eq!(rules::clamp(100), 100);
    }

    // ==================== Covering Query Tests ====================

    #[test]
    fn covering_query_excludes_deleted_campaign() {
        let sql = covering_campaigns_query(Uuid::new_v4(), Uuid::new_v4())
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains("\"campaigns\""));
        assert!(sql.contains("<>"));
    }

    #[test]
    fn covering_query_considers_all_three_modes() {
        let sql = covering_campaigns_query(Uuid::new_v4(), Uuid::new_v4())
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains("'all_books'"));
        assert!(sql.contains("'books'"));
        assert!(sql.contains("'genres'"));
        assert!(sql.contains("\"campaign_books\""));
        assert!(sql.contains("\"campaign_genres\""));
        assert!(sql.contains("\"book_genres\""));
    }

    // ==================== Input Validation ====================

    #[test]
    fn percent_out_of_range_rejected() {
        assert!(ensure_percent(101).is_err());
        assert!(ensure_percent(-1).is_err());
        assert!(ensure_percent(100).is_ok());
    }
}
