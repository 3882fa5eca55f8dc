use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Book entity for the storefront catalog.
///
/// `discount` is a cached field maintained by the discount engine: it always
/// holds the maximum discount percent among the campaigns currently covering
/// the book, or 0 when none do. `score` is the integer mean of the book's
/// review scores.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub author: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(nullable)]
    pub main_image_url: Option<String>,
    /// List price in the smallest currency unit.
    pub price: i64,
    /// Cached effective discount percent, 0..=100.
    pub discount: i16,
    pub purchase_count: i64,
    /// 0..=5, derived from reviews.
    pub score: i16,
    pub released: Date,
    /// Set once at insert, never updated.
    pub created: Date,
}

impl Model {
    /// Price after the cached discount, integer floor division.
    pub fn effective_price(&self) -> i64 {
        self.price * (100 - i64::from(self.discount)) / 100
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::book_genre::Entity")]
    BookGenres,
    #[sea_orm(has_many = "super::campaign_book::Entity")]
    CampaignBooks,
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
    #[sea_orm(has_many = "super::book_file::Entity")]
    Files,
}

impl Related<super::book_genre::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookGenres.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::book_file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Files.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
